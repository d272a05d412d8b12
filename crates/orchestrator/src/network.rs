//! Network-level operations.
//!
//! [`NetworkOrchestrator`] is the public face of the crate: node start,
//! teardown, health aggregation, datadir wipe, and the single-container
//! operations the scenario glue needs. Fan-out work runs on spawned tasks and
//! is joined before the aggregate result is computed.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use qnet_core::metrics as m;
use serde::Serialize;
use tokio::io::AsyncWrite;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::attributes::NodeAttributes;
use crate::catalog::ImageCatalog;
use crate::cloner::{OnCreate, TemplateCloner};
use crate::config::OrchestratorConfig;
use crate::docker::DockerClient;
use crate::error::OrchestratorError;
use crate::file::{self, ContentModifier};
use crate::health::{self, WaitOutcome};
use crate::ledger::NetworkResources;
use crate::logs;
use crate::state::BasicContainerState;
use crate::types::{ALT_LABEL, DaemonInfo, PEER_LABEL, short_id};

/// Command that wipes the node and privacy-manager datadirs.
const WIPE_DATADIRS_CMD: &str = "rm -rf /data/qdata && rm -rf /data/tm";

/// Two-bit aggregate status: bit 0 running, bit 1 healthy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct NetworkStatus(u8);

impl NetworkStatus {
    pub const RUNNING: u8 = 0b01;
    pub const HEALTHY: u8 = 0b10;

    /// Identity of the AND reduction.
    pub const ALL: Self = Self(Self::RUNNING | Self::HEALTHY);

    /// Status bits of one container.
    pub fn of(state: &BasicContainerState) -> Self {
        let mut bits = 0;
        if state.is_running() {
            bits |= Self::RUNNING;
        }
        if state.is_healthy() {
            bits |= Self::HEALTHY;
        }
        Self(bits)
    }

    pub fn and(self, other: Self) -> Self {
        Self(self.0 & other.0)
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn is_running(self) -> bool {
        self.0 & Self::RUNNING != 0
    }

    pub fn is_healthy(self) -> bool {
        self.0 & Self::HEALTHY != 0
    }
}

impl fmt::Display for NetworkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "running={} healthy={}",
            self.is_running(),
            self.is_healthy()
        )
    }
}

/// Drives a test network through a [`DockerClient`].
///
/// Cheap to clone: all state lives behind `Arc`s.
pub struct NetworkOrchestrator<D: DockerClient> {
    client: Arc<D>,
    config: Arc<OrchestratorConfig>,
    catalog: Arc<ImageCatalog>,
}

impl<D: DockerClient> Clone for NetworkOrchestrator<D> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            config: Arc::clone(&self.config),
            catalog: Arc::clone(&self.catalog),
        }
    }
}

/// Awaits every handle, then returns the first error or the AND of all results.
async fn join_all_and(
    handles: Vec<JoinHandle<Result<bool, OrchestratorError>>>,
) -> Result<bool, OrchestratorError> {
    let mut all_ok = true;
    let mut first_err = None;
    for handle in handles {
        match handle.await {
            Ok(Ok(ok)) => all_ok &= ok,
            Ok(Err(e)) => {
                first_err.get_or_insert(e);
            }
            Err(e) => {
                first_err.get_or_insert(e.into());
            }
        }
    }
    match first_err {
        Some(e) => Err(e),
        None => Ok(all_ok),
    }
}

impl<D: DockerClient> NetworkOrchestrator<D> {
    pub fn new(client: Arc<D>, config: OrchestratorConfig, catalog: ImageCatalog) -> Self {
        Self {
            client,
            config: Arc::new(config),
            catalog: Arc::new(catalog),
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn catalog(&self) -> &ImageCatalog {
        &self.catalog
    }

    fn cloner(&self) -> TemplateCloner<D> {
        TemplateCloner::new(Arc::clone(&self.client), self.config.wait_policy())
    }

    /// Starts the quorum and tessera containers of one node.
    ///
    /// Both templates are cloned concurrently. The quorum catalog overlay is
    /// merged over the node's own argument overlay when the version key is
    /// known.
    ///
    /// # Errors
    ///
    /// `OrchestratorError::UnknownNode` if the node has no templates configured.
    pub async fn start_node(
        &self,
        attrs: &NodeAttributes,
        on_create: OnCreate,
    ) -> Result<bool, OrchestratorError> {
        let templates = self
            .config
            .nodes
            .get(attrs.node())
            .cloned()
            .ok_or_else(|| OrchestratorError::UnknownNode(attrs.node().to_owned()))?;

        let (quorum_image, overlay) = self
            .catalog
            .quorum_image_or_empty(attrs.quorum_version_key());
        let attrs = if quorum_image.is_empty() {
            attrs.clone()
        } else {
            let merged = attrs
                .additional_geth_args()
                .cloned()
                .unwrap_or_default()
                .override_with(&overlay);
            attrs.clone().with_additional_geth_args(merged)
        };
        let tessera_image = self
            .catalog
            .tessera_image_or_empty(attrs.tessera_version_key());

        debug!(
            node = attrs.node(),
            quorum_image = %quorum_image,
            tessera_image = %tessera_image,
            "starting node"
        );

        let attrs = Arc::new(attrs);
        let handles = [
            (templates.quorum_container_id, quorum_image),
            (templates.tessera_container_id, tessera_image),
        ]
        .into_iter()
        .map(|(template_id, image)| {
            let cloner = self.cloner();
            let attrs = Arc::clone(&attrs);
            let on_create = Arc::clone(&on_create);
            tokio::spawn(async move {
                cloner
                    .clone_and_start(&template_id, &attrs, &image, &on_create)
                    .await
            })
        })
        .collect();

        join_all_and(handles).await
    }

    /// Starts every node, recording created containers in `ledger`.
    ///
    /// The grace period is slept only after every node started successfully.
    /// On failure the ledger keeps whatever was created, for teardown.
    pub async fn start_network(
        &self,
        nodes: &[NodeAttributes],
        ledger: Arc<NetworkResources>,
    ) -> Result<bool, OrchestratorError> {
        let handles = nodes
            .iter()
            .map(|attrs| {
                let this = self.clone();
                let attrs = attrs.clone();
                let node = attrs.node().to_owned();
                let ledger = Arc::clone(&ledger);
                let on_create: OnCreate = Arc::new(move |id: &str| ledger.add(&node, id));
                tokio::spawn(async move { this.start_node(&attrs, on_create).await })
            })
            .collect();

        let ok = join_all_and(handles).await?;
        if !ok {
            warn!(nodes = nodes.len(), "not every node became healthy");
            return Ok(false);
        }

        let grace = self.config.consensus_grace_period();
        info!(
            nodes = nodes.len(),
            grace_secs = grace.as_secs(),
            "network started, waiting for consensus to settle"
        );
        tokio::time::sleep(grace).await;
        Ok(true)
    }

    /// Stops then removes each container. Already-stopped is fine.
    pub async fn delete_resources(&self, ids: &[String]) -> Result<bool, OrchestratorError> {
        delete_resources(self.client.as_ref(), ids).await
    }

    /// Tears down every container in `ledger`, one task per node.
    pub async fn delete_network(&self, ledger: &NetworkResources) -> Result<bool, OrchestratorError> {
        if ledger.is_empty() {
            return Ok(true);
        }

        let handles = ledger
            .node_names()
            .into_iter()
            .map(|node| {
                let ids = ledger.resource_ids(&node);
                let client = Arc::clone(&self.client);
                debug!(node = %node, resources = ids.len(), "cleaning up node");
                tokio::spawn(async move { delete_resources(client.as_ref(), &ids).await })
            })
            .collect();

        let ok = join_all_and(handles).await?;
        info!(nodes = ledger.node_names().len(), ok, "network torn down");
        Ok(ok)
    }

    /// AND of the running/healthy bits of every container in `ledger`.
    pub async fn check_network(
        &self,
        ledger: &NetworkResources,
    ) -> Result<NetworkStatus, OrchestratorError> {
        let handles: Vec<JoinHandle<Result<NetworkStatus, OrchestratorError>>> = ledger
            .all_resource_ids()
            .into_iter()
            .map(|id| {
                let client = Arc::clone(&self.client);
                tokio::spawn(async move {
                    let state = BasicContainerState::from(&client.inspect_container(&id).await?);
                    let status = NetworkStatus::of(&state);
                    debug!(container = %state.name, status = status.bits(), "container status");
                    Ok(status)
                })
            })
            .collect();

        let mut status = NetworkStatus::ALL;
        for handle in handles {
            status = status.and(handle.await??);
        }
        Ok(status)
    }

    /// Runs the datadir wipe in every peer-type container of `ledger`.
    pub async fn delete_datadirs(
        &self,
        ledger: &NetworkResources,
    ) -> Result<bool, OrchestratorError> {
        let cmd = vec!["sh".to_owned(), "-c".to_owned(), WIPE_DATADIRS_CMD.to_owned()];
        for id in ledger.all_resource_ids() {
            if !self.is_peer_type(&id).await? {
                continue;
            }
            debug!(container_id = short_id(&id), "deleting datadir");
            self.client.exec_detached(&id, &cmd).await?;
        }
        debug!("datadir deletion completed");
        Ok(true)
    }

    /// Overwrites `path` in the container. Returns `container_id`.
    pub async fn write_file(
        &self,
        container_id: &str,
        path: &str,
        content: &str,
    ) -> Result<String, OrchestratorError> {
        file::write_file(self.client.as_ref(), container_id, path, content).await
    }

    /// Transforms `path` in the container. Returns `container_id`.
    pub async fn modify_file<M>(
        &self,
        container_id: &str,
        path: &str,
        modifier: &M,
    ) -> Result<String, OrchestratorError>
    where
        M: ContentModifier + ?Sized,
    {
        file::modify_file(self.client.as_ref(), container_id, path, modifier).await
    }

    /// `true` for quorum (consensus peer) containers.
    pub async fn is_peer_type(&self, container_id: &str) -> Result<bool, OrchestratorError> {
        Ok(self
            .client
            .inspect_container(container_id)
            .await?
            .has_label(PEER_LABEL))
    }

    /// `true` for besu containers.
    pub async fn is_alt_type(&self, container_id: &str) -> Result<bool, OrchestratorError> {
        Ok(self
            .client
            .inspect_container(container_id)
            .await?
            .has_label(ALT_LABEL))
    }

    pub async fn container_name(&self, container_id: &str) -> Result<String, OrchestratorError> {
        Ok(self.client.inspect_container(container_id).await?.name)
    }

    pub async fn state(
        &self,
        container_id: &str,
    ) -> Result<BasicContainerState, OrchestratorError> {
        let details = self.client.inspect_container(container_id).await?;
        Ok(BasicContainerState::from(&details))
    }

    pub async fn stop_resource(&self, container_id: &str) -> Result<bool, OrchestratorError> {
        debug!(container_id = short_id(container_id), "stopping container");
        self.client.stop_container(container_id).await?;
        Ok(true)
    }

    pub async fn start_resource(&self, container_id: &str) -> Result<bool, OrchestratorError> {
        debug!(container_id = short_id(container_id), "starting container");
        self.client.start_container(container_id).await?;
        Ok(true)
    }

    pub async fn restart_resource(&self, container_id: &str) -> Result<bool, OrchestratorError> {
        debug!(container_id = short_id(container_id), "restarting container");
        self.client.restart_container(container_id).await?;
        Ok(true)
    }

    /// Polls the container with the configured budget; `true` once usable.
    pub async fn wait(&self, container_id: &str) -> Result<bool, OrchestratorError> {
        let outcome =
            health::wait_until_usable(self.client.as_ref(), container_id, self.config.wait_policy())
                .await?;
        Ok(outcome == WaitOutcome::Healthy)
    }

    /// Waits until every configured template container is usable.
    pub async fn wait_for_template_network(&self) -> Result<(), OrchestratorError> {
        let ids: Vec<String> = self
            .config
            .nodes
            .values()
            .flat_map(|c| [c.quorum_container_id.clone(), c.tessera_container_id.clone()])
            .collect();
        health::wait_for_template_network(
            &self.client,
            &ids,
            self.config.network_wait_policy(),
            self.config.consensus_grace_period(),
        )
        .await
    }

    /// `true` if `pattern` shows up in the container log within `timeout`.
    pub async fn grep_log(
        &self,
        container_id: &str,
        pattern: &str,
        timeout: Duration,
    ) -> Result<bool, OrchestratorError> {
        logs::grep_log(self.client.as_ref(), container_id, pattern, timeout).await
    }

    /// Dumps the container log to `writer`. Returns the number of frames.
    pub async fn stream_logs<W>(
        &self,
        container_id: &str,
        writer: &mut W,
    ) -> Result<u64, OrchestratorError>
    where
        W: AsyncWrite + Unpin,
    {
        logs::stream_logs(self.client.as_ref(), container_id, writer).await
    }

    pub async fn info(&self) -> Result<DaemonInfo, OrchestratorError> {
        self.client.info().await
    }

    pub async fn ping(&self) -> Result<(), OrchestratorError> {
        self.client.ping().await
    }
}

async fn delete_resources<D: DockerClient>(
    client: &D,
    ids: &[String],
) -> Result<bool, OrchestratorError> {
    for id in ids {
        debug!(container_id = short_id(id), "deleting container");
        match client.stop_container(id).await {
            Ok(()) => {}
            Err(OrchestratorError::NotModified(_)) => {
                debug!(container_id = short_id(id), "container already stopped");
            }
            Err(e) => return Err(e),
        }
        client.remove_container(id).await?;
        metrics::counter!(m::ORCHESTRATOR_CONTAINERS_REMOVED_TOTAL).increment(1);
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use tokio::time::Instant;

    use super::*;
    use crate::attributes::GethArgs;
    use crate::config::OrchestratorConfigBuilder;
    use crate::docker::mock::MockDockerClient;
    use crate::types::{ContainerDetails, NetworkAttachment};

    fn template(id: &str, name: &str, peer: bool) -> ContainerDetails {
        let mut labels = std::collections::HashMap::new();
        if peer {
            labels.insert(PEER_LABEL.to_owned(), String::new());
        }
        ContainerDetails {
            id: id.to_owned(),
            name: name.to_owned(),
            image: "template/image:1".to_owned(),
            status: "created".to_owned(),
            labels,
            env: vec!["A=1".to_owned()],
            networks: vec![NetworkAttachment {
                name: "net".to_owned(),
                ipv4_address: Some("172.16.239.11".to_owned()),
                aliases: vec![],
            }],
            ..Default::default()
        }
    }

    fn running(id: &str, health: Option<&str>) -> ContainerDetails {
        ContainerDetails {
            id: id.to_owned(),
            name: format!("{id}-name"),
            status: "running".to_owned(),
            health: health.map(str::to_owned),
            ..Default::default()
        }
    }

    fn orchestrator(client: MockDockerClient) -> (NetworkOrchestrator<MockDockerClient>, Arc<MockDockerClient>) {
        let config = OrchestratorConfigBuilder::new()
            .node("Node1", "q1", "t1")
            .node("Node2", "q2", "t2")
            .consensus_grace_period_secs(30)
            .build()
            .unwrap();
        let client = Arc::new(client);
        (
            NetworkOrchestrator::new(Arc::clone(&client), config, ImageCatalog::default()),
            client,
        )
    }

    fn ledger_of(entries: &[(&str, &[&str])]) -> NetworkResources {
        let ledger = NetworkResources::new();
        for (node, ids) in entries {
            for id in *ids {
                ledger.add(node, *id);
            }
        }
        ledger
    }

    #[test]
    fn network_status_bits() {
        let healthy = NetworkStatus::of(&BasicContainerState::from(&running("a", Some("healthy"))));
        let unhealthy =
            NetworkStatus::of(&BasicContainerState::from(&running("b", Some("unhealthy"))));
        assert_eq!(healthy.bits(), 3);
        assert_eq!(unhealthy.bits(), 1);
        assert_eq!(NetworkStatus::ALL.and(unhealthy).bits(), 1);
        assert_eq!(healthy.to_string(), "running=true healthy=true");
    }

    #[tokio::test(start_paused = true)]
    async fn start_node_clones_both_templates() {
        let (orch, client) = orchestrator(
            MockDockerClient::new()
                .with_container(template("q1", "node1_quorum", true))
                .with_container(template("t1", "node1_tessera", false)),
        );
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let on_create: OnCreate = Arc::new(move |id: &str| sink.lock().unwrap().push(id.to_owned()));

        let attrs = NodeAttributes::for_node("Node1")
            .with_quorum_version_key("21.4.0")
            .with_tessera_version_key("21.1.0")
            .with_additional_geth_args(GethArgs::new().permissioned(true));
        let ok = orch.start_node(&attrs, on_create).await.unwrap();

        assert!(ok);
        assert_eq!(seen.lock().unwrap().len(), 2);

        let created = client.created();
        let quorum = created.iter().find(|s| s.name == "node1_quorum-clone").unwrap();
        let tessera = created.iter().find(|s| s.name == "node1_tessera-clone").unwrap();
        assert_eq!(quorum.image, "quorumengineering/quorum:21.4.0");
        assert_eq!(tessera.image, "quorumengineering/tessera:21.1.0");
        assert!(quorum.env.contains(
            &"ADDITIONAL_GETH_ARGS=--allow-insecure-unlock --permissioned".to_owned()
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_version_keys_use_template_images() {
        let (orch, client) = orchestrator(
            MockDockerClient::new()
                .with_container(template("q1", "node1_quorum", true))
                .with_container(template("t1", "node1_tessera", false)),
        );
        let attrs = NodeAttributes::for_node("Node1").with_quorum_version_key("9.9.9");
        orch.start_node(&attrs, Arc::new(|_: &str| {})).await.unwrap();

        for spec in client.created() {
            assert_eq!(spec.image, "template/image:1");
            assert_eq!(spec.env, vec!["A=1"]);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn start_node_rejects_unknown_node() {
        let (orch, _) = orchestrator(MockDockerClient::new());
        let err = orch
            .start_node(&NodeAttributes::for_node("Node7"), Arc::new(|_: &str| {}))
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::UnknownNode(n) if n == "Node7"));
    }

    #[tokio::test(start_paused = true)]
    async fn start_network_records_ledger_and_sleeps_grace_after() {
        let (orch, _) = orchestrator(
            MockDockerClient::new()
                .with_container(template("q1", "node1_quorum", true))
                .with_container(template("t1", "node1_tessera", false))
                .with_container(template("q2", "node2_quorum", true))
                .with_container(template("t2", "node2_tessera", false)),
        );
        let ledger = Arc::new(NetworkResources::new());
        let started = Instant::now();

        let ok = orch
            .start_network(
                &[NodeAttributes::for_node("Node1"), NodeAttributes::for_node("Node2")],
                Arc::clone(&ledger),
            )
            .await
            .unwrap();

        assert!(ok);
        assert_eq!(ledger.resource_ids("Node1").len(), 2);
        assert_eq!(ledger.resource_ids("Node2").len(), 2);
        assert_eq!(started.elapsed(), Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_start_keeps_partial_ledger_and_skips_grace() {
        let (orch, _) = orchestrator(
            MockDockerClient::new()
                .with_container(template("q1", "node1_quorum", true))
                .with_container(template("t1", "node1_tessera", false))
                .with_failing_start(),
        );
        let ledger = Arc::new(NetworkResources::new());
        let started = Instant::now();

        let result = orch
            .start_network(&[NodeAttributes::for_node("Node1")], Arc::clone(&ledger))
            .await;

        assert!(result.is_err());
        assert_eq!(ledger.resource_ids("Node1").len(), 2);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test]
    async fn delete_network_on_empty_ledger_makes_no_calls() {
        let (orch, client) = orchestrator(MockDockerClient::new());
        assert!(orch.delete_network(&NetworkResources::new()).await.unwrap());
        assert!(client.calls().is_empty());
    }

    #[tokio::test]
    async fn delete_resources_tolerates_already_stopped() {
        let (orch, client) = orchestrator(
            MockDockerClient::new()
                .with_container(running("a", None))
                .with_container(running("b", None))
                .with_stopped("a"),
        );
        let ok = orch
            .delete_resources(&["a".to_owned(), "b".to_owned()])
            .await
            .unwrap();
        assert!(ok);
        assert_eq!(
            client.calls(),
            vec!["stop:a", "remove:a", "stop:b", "remove:b"]
        );
    }

    #[tokio::test]
    async fn delete_resources_propagates_other_errors() {
        let (orch, _) = orchestrator(
            MockDockerClient::new()
                .with_container(running("a", None))
                .with_failing_remove(),
        );
        let err = orch.delete_resources(&["a".to_owned()]).await.unwrap_err();
        assert!(matches!(err, OrchestratorError::DockerApi(_)));
    }

    #[tokio::test]
    async fn delete_network_tears_down_every_node() {
        let (orch, client) = orchestrator(MockDockerClient::new());
        let ledger = ledger_of(&[("Node1", &["a", "b"]), ("Node2", &["c"])]);
        assert!(orch.delete_network(&ledger).await.unwrap());
        assert_eq!(client.calls_starting_with("remove:"), 3);
    }

    #[tokio::test]
    async fn check_network_ands_statuses() {
        let (orch, _) = orchestrator(
            MockDockerClient::new()
                .with_container(running("a", Some("healthy")))
                .with_container(running("b", Some("healthy")))
                .with_container(running("c", Some("unhealthy"))),
        );
        let ledger = ledger_of(&[("Node1", &["a", "b"]), ("Node2", &["c"])]);

        let status = orch.check_network(&ledger).await.unwrap();

        assert!(status.is_running());
        assert!(!status.is_healthy());
    }

    #[tokio::test]
    async fn check_network_all_healthy() {
        let (orch, _) = orchestrator(
            MockDockerClient::new()
                .with_container(running("a", Some("healthy")))
                .with_container(running("b", Some("healthy"))),
        );
        let ledger = ledger_of(&[("Node1", &["a", "b"])]);
        assert_eq!(orch.check_network(&ledger).await.unwrap().bits(), 3);
    }

    #[tokio::test]
    async fn delete_datadirs_only_touches_peers() {
        let mut peer = running("q", None);
        peer.labels.insert(PEER_LABEL.to_owned(), String::new());
        let (orch, client) = orchestrator(
            MockDockerClient::new()
                .with_container(peer)
                .with_container(running("t", None)),
        );
        let ledger = ledger_of(&[("Node1", &["q", "t"])]);

        assert!(orch.delete_datadirs(&ledger).await.unwrap());

        let execs: Vec<_> = client
            .calls()
            .into_iter()
            .filter(|c| c.starts_with("exec:"))
            .collect();
        assert_eq!(
            execs,
            vec!["exec:q:sh -c rm -rf /data/qdata && rm -rf /data/tm"]
        );
    }

    #[tokio::test]
    async fn type_checks_use_labels() {
        let mut besu = running("b", None);
        besu.labels.insert(ALT_LABEL.to_owned(), String::new());
        let (orch, _) = orchestrator(MockDockerClient::new().with_container(besu));
        assert!(orch.is_alt_type("b").await.unwrap());
        assert!(!orch.is_peer_type("b").await.unwrap());
    }

    #[tokio::test]
    async fn single_container_operations() {
        let (orch, client) = orchestrator(MockDockerClient::new().with_container(running("a", None)));
        assert!(orch.stop_resource("a").await.unwrap());
        assert!(orch.start_resource("a").await.unwrap());
        assert!(orch.restart_resource("a").await.unwrap());
        assert_eq!(orch.container_name("a").await.unwrap(), "a-name");
        assert!(orch.state("a").await.unwrap().is_running());
        assert_eq!(client.calls_starting_with("restart:a"), 1);
    }
}
