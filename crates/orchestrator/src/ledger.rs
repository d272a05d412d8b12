//! Per-node record of provisioned containers.
//!
//! [`NetworkResources`] maps a logical node name to the ordered list of
//! container ids created for it. It is the only mutable state shared between
//! the fan-out tasks of an aggregate start, so every mutation goes through a
//! single lock.

use std::collections::{BTreeMap, HashMap};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Thread-safe node name → resource id list.
///
/// Lists are append-only and keep duplicates in call order.
#[derive(Debug, Default)]
pub struct NetworkResources {
    inner: RwLock<HashMap<String, Vec<String>>>,
}

impl NetworkResources {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Vec<String>>> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Vec<String>>> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends `resource_id` to the list of `node`.
    pub fn add(&self, node: &str, resource_id: impl Into<String>) {
        self.write()
            .entry(node.to_owned())
            .or_default()
            .push(resource_id.into());
    }

    /// Returns the resources recorded for `node`, empty for an unknown node.
    pub fn resource_ids(&self, node: &str) -> Vec<String> {
        self.read().get(node).cloned().unwrap_or_default()
    }

    /// Returns all node names, sorted.
    pub fn node_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Returns any one node name, if the ledger is not empty.
    pub fn any_node_name(&self) -> Option<String> {
        self.node_names().into_iter().next()
    }

    /// Returns every recorded resource, grouped by node in name order.
    pub fn all_resource_ids(&self) -> Vec<String> {
        self.snapshot().into_values().flatten().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Drops `node` and returns what was recorded for it.
    pub fn remove(&self, node: &str) -> Vec<String> {
        self.write().remove(node).unwrap_or_default()
    }

    /// Sorted copy of the whole ledger.
    pub fn snapshot(&self) -> BTreeMap<String, Vec<String>> {
        self.read()
            .iter()
            .map(|(node, ids)| (node.clone(), ids.clone()))
            .collect()
    }
}

impl From<BTreeMap<String, Vec<String>>> for NetworkResources {
    fn from(map: BTreeMap<String, Vec<String>>) -> Self {
        Self {
            inner: RwLock::new(map.into_iter().filter(|(_, ids)| !ids.is_empty()).collect()),
        }
    }
}

impl Serialize for NetworkResources {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.snapshot().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for NetworkResources {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        BTreeMap::<String, Vec<String>>::deserialize(deserializer).map(Self::from)
    }
}
