//! Per-node provisioning intent.
//!
//! [`NodeAttributes`] is built once per provisioning call and handed to the
//! cloner by reference. [`GethArgs`] is the extra command-line overlay passed
//! to the peer container through `ADDITIONAL_GETH_ARGS`.

use std::collections::BTreeMap;
use std::fmt;

/// Composable set of extra geth command-line arguments.
///
/// Keys are flag names (`--gcmode`), values are the flag argument or empty
/// for a bare flag. Rendering is sorted by flag name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GethArgs {
    args: BTreeMap<String, String>,
}

impl GethArgs {
    pub fn new() -> Self {
        Self::default()
    }

    fn toggle(mut self, flag: &str, yes: bool) -> Self {
        if yes {
            self.args.insert(flag.to_owned(), String::new());
        } else {
            self.args.remove(flag);
        }
        self
    }

    /// Adds or removes `--permissioned`.
    pub fn permissioned(self, yes: bool) -> Self {
        self.toggle("--permissioned", yes)
    }

    /// Adds or removes `--raftdnsenable`.
    pub fn raft_dns_enable(self, yes: bool) -> Self {
        self.toggle("--raftdnsenable", yes)
    }

    /// Sets `--gcmode`; a blank mode removes it.
    pub fn gc_mode(mut self, mode: &str) -> Self {
        if mode.trim().is_empty() {
            self.args.remove("--gcmode");
        } else {
            self.args.insert("--gcmode".to_owned(), mode.to_owned());
        }
        self
    }

    /// Sets `--raftjoinexisting`; `None` removes it.
    pub fn raft_join_existing(mut self, raft_id: Option<u32>) -> Self {
        match raft_id {
            Some(id) => {
                self.args
                    .insert("--raftjoinexisting".to_owned(), id.to_string());
            }
            None => {
                self.args.remove("--raftjoinexisting");
            }
        }
        self
    }

    /// Adds or removes `--allow-insecure-unlock` (geth 1.9.7+).
    pub fn allow_insecure_unlock(self, yes: bool) -> Self {
        self.toggle("--allow-insecure-unlock", yes)
    }

    /// Adds or removes `--privacymarker.enable`.
    pub fn privacy_marker_enable(self, yes: bool) -> Self {
        self.toggle("--privacymarker.enable", yes)
    }

    /// Sets an arbitrary flag. An empty value renders as a bare flag.
    pub fn arg(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.args.insert(name.into(), value.into());
        self
    }

    /// Copies every entry of `other` over this overlay.
    pub fn override_with(mut self, other: &GethArgs) -> Self {
        self.args
            .extend(other.args.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.args.get(name).map(String::as_str)
    }
}

impl fmt::Display for GethArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, value)) in self.args.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            f.write_str(name)?;
            if !value.is_empty() {
                write!(f, " {value}")?;
            }
        }
        Ok(())
    }
}

/// What to provision for one logical node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeAttributes {
    node: String,
    fresh_start: bool,
    quorum_version_key: Option<String>,
    tessera_version_key: Option<String>,
    additional_geth_args: Option<GethArgs>,
}

impl NodeAttributes {
    /// Starts a descriptor for `node` with every option off.
    pub fn for_node(node: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            fresh_start: false,
            quorum_version_key: None,
            tessera_version_key: None,
            additional_geth_args: None,
        }
    }

    /// Requests `ALWAYS_REFRESH=true` so the node re-initializes its datadir.
    pub fn with_fresh_start(mut self, yes: bool) -> Self {
        self.fresh_start = yes;
        self
    }

    pub fn with_quorum_version_key(mut self, key: impl Into<String>) -> Self {
        self.quorum_version_key = Some(key.into());
        self
    }

    pub fn with_tessera_version_key(mut self, key: impl Into<String>) -> Self {
        self.tessera_version_key = Some(key.into());
        self
    }

    pub fn with_additional_geth_args(mut self, args: GethArgs) -> Self {
        self.additional_geth_args = Some(args);
        self
    }

    pub fn node(&self) -> &str {
        &self.node
    }

    pub fn fresh_start(&self) -> bool {
        self.fresh_start
    }

    pub fn quorum_version_key(&self) -> Option<&str> {
        self.quorum_version_key.as_deref()
    }

    pub fn tessera_version_key(&self) -> Option<&str> {
        self.tessera_version_key.as_deref()
    }

    pub fn additional_geth_args(&self) -> Option<&GethArgs> {
        self.additional_geth_args.as_ref()
    }
}
