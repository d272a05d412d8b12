//! Version key → image catalog.
//!
//! Built once from [`DockerConfig`](qnet_core::config::DockerConfig) on top of
//! the known release keys and read-only afterwards.

use std::collections::BTreeMap;

use qnet_core::config::DockerConfig;

use crate::attributes::GethArgs;

const QUORUM_REPO: &str = "quorumengineering/quorum";
const TESSERA_REPO: &str = "quorumengineering/tessera";

/// Quorum releases that predate `--allow-insecure-unlock`.
const LEGACY_QUORUM_KEYS: &[(&str, &str)] = &[("v2.5.0", "2.5.0")];

/// Quorum releases that need `--allow-insecure-unlock`.
const QUORUM_KEYS: &[&str] = &["latest", "21.1.0", "21.4.0", "21.10.0", "2.7.0"];

const TESSERA_KEYS: &[&str] = &["latest", "0.10.5", "21.1.0", "21.10.0"];

/// Catalog entry for the peer image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuorumImage {
    pub image: String,
    /// Arguments this release needs, merged over the node's own overlay.
    pub overlay: GethArgs,
}

/// Immutable image catalog for both container types.
#[derive(Debug, Clone)]
pub struct ImageCatalog {
    quorum: BTreeMap<String, QuorumImage>,
    tessera: BTreeMap<String, String>,
}

impl Default for ImageCatalog {
    fn default() -> Self {
        Self::from_config(&DockerConfig::default())
    }
}

impl ImageCatalog {
    /// Builds the catalog: known releases, then `develop` targets, then
    /// config entries (which win on key collision).
    pub fn from_config(config: &DockerConfig) -> Self {
        let insecure_unlock = GethArgs::new().allow_insecure_unlock(true);

        let mut quorum = BTreeMap::new();
        for (key, tag) in LEGACY_QUORUM_KEYS {
            quorum.insert(
                (*key).to_owned(),
                QuorumImage {
                    image: format!("{QUORUM_REPO}:{tag}"),
                    overlay: GethArgs::new(),
                },
            );
        }
        for key in QUORUM_KEYS {
            quorum.insert(
                (*key).to_owned(),
                QuorumImage {
                    image: format!("{QUORUM_REPO}:{key}"),
                    overlay: insecure_unlock.clone(),
                },
            );
        }
        quorum.insert(
            "develop".to_owned(),
            QuorumImage {
                image: non_blank(config.target_quorum_image.as_deref())
                    .unwrap_or_else(|| format!("{QUORUM_REPO}:develop")),
                overlay: insecure_unlock.clone(),
            },
        );
        for (key, image) in &config.quorum_images {
            quorum.insert(
                key.clone(),
                QuorumImage {
                    image: image.clone(),
                    overlay: insecure_unlock.clone(),
                },
            );
        }

        let mut tessera: BTreeMap<String, String> = TESSERA_KEYS
            .iter()
            .map(|key| ((*key).to_owned(), format!("{TESSERA_REPO}:{key}")))
            .collect();
        tessera.insert(
            "develop".to_owned(),
            non_blank(config.target_tessera_image.as_deref())
                .unwrap_or_else(|| format!("{TESSERA_REPO}:develop")),
        );
        tessera.extend(config.tessera_images.iter().map(|(k, v)| (k.clone(), v.clone())));

        Self { quorum, tessera }
    }

    /// Looks up a quorum entry by version key.
    pub fn quorum(&self, key: &str) -> Option<&QuorumImage> {
        self.quorum.get(key)
    }

    /// Looks up a tessera image by version key.
    pub fn tessera(&self, key: &str) -> Option<&str> {
        self.tessera.get(key).map(String::as_str)
    }

    /// Image for an optional key; empty means "use the template's image".
    pub fn quorum_image_or_empty(&self, key: Option<&str>) -> (String, GethArgs) {
        key.and_then(|k| self.quorum(k))
            .map(|entry| (entry.image.clone(), entry.overlay.clone()))
            .unwrap_or_default()
    }

    /// Image for an optional key; empty means "use the template's image".
    pub fn tessera_image_or_empty(&self, key: Option<&str>) -> String {
        key.and_then(|k| self.tessera(k))
            .map(str::to_owned)
            .unwrap_or_default()
    }

    pub fn quorum_keys(&self) -> impl Iterator<Item = &str> {
        self.quorum.keys().map(String::as_str)
    }

    pub fn tessera_keys(&self) -> impl Iterator<Item = &str> {
        self.tessera.keys().map(String::as_str)
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}
