//! Runtime-neutral container descriptions exchanged with [`DockerClient`](crate::docker::DockerClient).
//!
//! Host and health-check configuration are carried as the bollard models so that
//! a clone reproduces the template's mounts, resources and probes verbatim.

use std::collections::HashMap;

use bollard::models::{HealthConfig, HostConfig};
use serde::Serialize;

/// Label set on peer-type (quorum) containers.
pub const PEER_LABEL: &str = "QuorumContainer";

/// Label set on alternative-client (besu) containers.
pub const ALT_LABEL: &str = "BesuContainer";

/// Provenance label: id of the template a container was cloned from.
pub const CLONED_FROM_ID_LABEL: &str = "ClonedFromContainerId";

/// Provenance label: name of the template a container was cloned from.
pub const CLONED_FROM_NAME_LABEL: &str = "ClonedFromContainerName";

/// Inspection result for a single container.
#[derive(Debug, Clone, Default)]
pub struct ContainerDetails {
    pub id: String,
    /// Container name without the leading `/`.
    pub name: String,
    pub image: String,
    /// Lifecycle status as reported by the daemon (`created`, `running`, `exited`, ...).
    pub status: String,
    /// Health-check status, absent when no health check is configured.
    pub health: Option<String>,
    pub labels: HashMap<String, String>,
    pub env: Vec<String>,
    pub hostname: Option<String>,
    pub domainname: Option<String>,
    pub exposed_ports: Vec<String>,
    pub entrypoint: Option<Vec<String>>,
    pub healthcheck: Option<HealthConfig>,
    pub host_config: Option<HostConfig>,
    /// Declared network attachments, sorted by network name.
    pub networks: Vec<NetworkAttachment>,
}

impl ContainerDetails {
    /// Returns `true` if the container carries the given label key.
    pub fn has_label(&self, key: &str) -> bool {
        self.labels.contains_key(key)
    }

    /// Returns the first declared network attachment.
    pub fn primary_network(&self) -> Option<&NetworkAttachment> {
        self.networks.first()
    }
}

/// Placement of a container inside one network.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetworkAttachment {
    pub name: String,
    /// Statically assigned IPv4 address (IPAM config), if any.
    pub ipv4_address: Option<String>,
    pub aliases: Vec<String>,
}

/// Everything needed to create a container.
#[derive(Debug, Clone, Default)]
pub struct ContainerSpec {
    pub name: String,
    pub image: String,
    pub hostname: Option<String>,
    pub domainname: Option<String>,
    pub exposed_ports: Vec<String>,
    pub env: Vec<String>,
    pub healthcheck: Option<HealthConfig>,
    pub entrypoint: Option<Vec<String>>,
    pub host_config: Option<HostConfig>,
    /// Network to pin the container to; also becomes the host config network mode.
    pub network: Option<NetworkAttachment>,
    pub labels: HashMap<String, String>,
}

/// Subset of the daemon's system information.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DaemonInfo {
    pub name: String,
    pub server_version: String,
    pub containers: i64,
    pub containers_running: i64,
    pub containers_stopped: i64,
    pub images: i64,
}

/// Shortens a container id to the 12-character form used in logs.
pub fn short_id(id: &str) -> &str {
    match id.char_indices().nth(12) {
        Some((idx, _)) => &id[..idx],
        None => id,
    }
}
