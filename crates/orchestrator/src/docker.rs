//! Docker API abstraction for testability.
//!
//! The [`DockerClient`] trait abstracts the bollard Docker API, allowing
//! production code to use [`BollardDockerClient`] while tests use `MockDockerClient`.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────┐
//! │ NetworkOrchestrator │
//! └──────────┬──────────┘
//!            │
//!   ┌────────┼─────────┬──────────┐
//!   ▼        ▼         ▼          ▼
//! Cloner  HealthPoller FileTx  LogWatcher
//!   └────────┴────┬────┴──────────┘
//!                 ▼
//!          ┌─────────────┐
//!          │DockerClient │ (trait)
//!          └─────────────┘
//!              │     │
//!              ▼     ▼
//!         ┌───────┐ ┌────┐
//!         │Bollard│ │Mock│
//!         └───┬───┘ └────┘
//!             ▼
//!       Docker Daemon
//! ```
//!
//! # Container Reference Validation
//!
//! Every method that accepts a container reference validates it first:
//! - Must be 1-128 characters
//! - Must contain only ASCII alphanumerics, `_`, `.` or `-`
//! - Must not start with `-`
//!
//! Both hex ids and container names pass; anything that could be smuggled
//! into a URL path does not.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use bollard::models::{EndpointIpamConfig, EndpointSettings};
use futures_util::StreamExt;
use futures_util::stream::BoxStream;

use crate::error::OrchestratorError;
use crate::types::{ContainerDetails, ContainerSpec, DaemonInfo, NetworkAttachment};

/// Seconds the daemon waits after SIGTERM before killing on stop/restart.
const STOP_TIMEOUT_SECS: i64 = 10;

/// Connection timeout for the daemon transport, in seconds.
const CONNECT_TIMEOUT_SECS: u64 = 120;

/// Validates a container reference (id or name) before it reaches the API.
pub(crate) fn validate_container_ref(id: &str) -> Result<(), OrchestratorError> {
    if id.is_empty() || id.len() > 128 {
        return Err(OrchestratorError::DockerApi(format!(
            "invalid container reference: length {} (must be 1-128)",
            id.len()
        )));
    }
    if id.starts_with('-') {
        return Err(OrchestratorError::DockerApi(
            "invalid container reference: must not start with '-'".to_owned(),
        ));
    }
    if !id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
    {
        return Err(OrchestratorError::DockerApi(
            "invalid container reference: contains forbidden characters".to_owned(),
        ));
    }
    Ok(())
}

/// Trait abstracting Docker API operations.
///
/// All Docker API calls made by the orchestrator go through this trait.
/// The trait is `Send + Sync + 'static`, so one client can be shared by
/// every fan-out task through an `Arc`.
///
/// # Error Handling
///
/// - **404 responses**: `OrchestratorError::ContainerNotFound`
/// - **304 responses**: `OrchestratorError::NotModified` (e.g. stopping a stopped container)
/// - **Connection errors**: `OrchestratorError::DockerConnection`
/// - **Everything else**: `OrchestratorError::DockerApi`
pub trait DockerClient: Send + Sync + 'static {
    /// Inspects a container and returns its declared and live configuration.
    fn inspect_container(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<ContainerDetails, OrchestratorError>> + Send;

    /// Creates (but does not start) a container and returns its id.
    fn create_container(
        &self,
        spec: &ContainerSpec,
    ) -> impl Future<Output = Result<String, OrchestratorError>> + Send;

    /// Starts a created or stopped container.
    fn start_container(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<(), OrchestratorError>> + Send;

    /// Stops a container with a 10-second grace period.
    ///
    /// # Errors
    ///
    /// `OrchestratorError::NotModified` if the container was already stopped.
    fn stop_container(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<(), OrchestratorError>> + Send;

    /// Restarts a container.
    fn restart_container(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<(), OrchestratorError>> + Send;

    /// Removes a stopped container.
    fn remove_container(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<(), OrchestratorError>> + Send;

    /// Runs `cmd` inside the container in detached mode.
    ///
    /// Resolves once the daemon has accepted the detached exec, not when the
    /// command itself finishes.
    fn exec_detached(
        &self,
        id: &str,
        cmd: &[String],
    ) -> impl Future<Output = Result<(), OrchestratorError>> + Send;

    /// Downloads `path` from the container as a tar archive.
    fn download_archive(
        &self,
        id: &str,
        path: &str,
    ) -> impl Future<Output = Result<Vec<u8>, OrchestratorError>> + Send;

    /// Extracts a tar archive into directory `dir` of the container.
    fn upload_archive(
        &self,
        id: &str,
        dir: &str,
        archive: Vec<u8>,
    ) -> impl Future<Output = Result<(), OrchestratorError>> + Send;

    /// Streams combined stdout/stderr, one item per log frame.
    ///
    /// With `follow == false` the stream ends once it has caught up with the
    /// current end of the log.
    fn log_stream(&self, id: &str, follow: bool) -> BoxStream<'static, Result<String, OrchestratorError>>;

    /// Returns daemon-level system information.
    fn info(&self) -> impl Future<Output = Result<DaemonInfo, OrchestratorError>> + Send;

    /// Checks Docker daemon connectivity.
    fn ping(&self) -> impl Future<Output = Result<(), OrchestratorError>> + Send;
}

/// Production Docker client implementation using `bollard`.
///
/// Internally uses `Arc<bollard::Docker>` for safe sharing across async tasks.
///
/// # Examples
///
/// ```ignore
/// use qnet_orchestrator::BollardDockerClient;
///
/// // DOCKER_HOST or the platform's local socket
/// let client = BollardDockerClient::connect("")?;
///
/// // Explicit TCP endpoint
/// let client = BollardDockerClient::connect("tcp://127.0.0.1:2375")?;
/// # Ok::<(), qnet_orchestrator::OrchestratorError>(())
/// ```
pub struct BollardDockerClient {
    docker: Arc<bollard::Docker>,
}

impl BollardDockerClient {
    /// Connects to the daemon named by `host`.
    ///
    /// - empty: `DOCKER_HOST` if set, otherwise the local socket
    /// - `unix://...` or an absolute path: Unix socket
    /// - `tcp://...` or `http://...`: plain HTTP
    ///
    /// # Errors
    ///
    /// Returns `OrchestratorError::DockerConnection` if the client cannot be built.
    pub fn connect(host: &str) -> Result<Self, OrchestratorError> {
        let host = host.trim();
        let docker = if host.is_empty() {
            bollard::Docker::connect_with_defaults()
        } else if host.starts_with("unix://") || host.starts_with('/') {
            bollard::Docker::connect_with_socket(
                host,
                CONNECT_TIMEOUT_SECS,
                bollard::API_DEFAULT_VERSION,
            )
        } else if host.starts_with("tcp://") || host.starts_with("http://") {
            bollard::Docker::connect_with_http(
                host,
                CONNECT_TIMEOUT_SECS,
                bollard::API_DEFAULT_VERSION,
            )
        } else {
            return Err(OrchestratorError::DockerConnection(format!(
                "unsupported docker host '{host}' (expected unix://, tcp:// or http://)"
            )));
        }
        .map_err(|e| {
            OrchestratorError::DockerConnection(format!("failed to connect to docker: {e}"))
        })?;

        Ok(Self {
            docker: Arc::new(docker),
        })
    }
}

/// Maps a bollard error to the orchestrator taxonomy.
fn map_api_error(id: &str, action: &str, err: bollard::errors::Error) -> OrchestratorError {
    use bollard::errors::Error;

    match err {
        Error::DockerResponseServerError {
            status_code: 404, ..
        } => OrchestratorError::ContainerNotFound(id.to_owned()),
        Error::DockerResponseServerError {
            status_code: 304, ..
        } => OrchestratorError::NotModified(id.to_owned()),
        Error::HyperResponseError { .. } | Error::IOError { .. } => {
            OrchestratorError::DockerConnection(format!("{action} failed: {err}"))
        }
        other => OrchestratorError::DockerApi(format!("{action} failed: {other}")),
    }
}

fn details_from_inspect(
    fallback_id: &str,
    details: bollard::models::ContainerInspectResponse,
) -> ContainerDetails {
    let (status, health) = match details.state {
        Some(state) => (
            state
                .status
                .map(|s| s.to_string())
                .unwrap_or_else(|| "unknown".to_owned()),
            state
                .health
                .and_then(|h| h.status)
                .map(|s| s.to_string())
                .filter(|s| !s.is_empty()),
        ),
        None => ("unknown".to_owned(), None),
    };

    let config = details.config.unwrap_or_default();

    let mut exposed_ports: Vec<String> = config
        .exposed_ports
        .map(|ports| ports.into_keys().collect())
        .unwrap_or_default();
    exposed_ports.sort();

    let mut networks: Vec<NetworkAttachment> = details
        .network_settings
        .and_then(|s| s.networks)
        .map(|networks| {
            networks
                .into_iter()
                .map(|(name, endpoint)| NetworkAttachment {
                    name,
                    ipv4_address: endpoint
                        .ipam_config
                        .and_then(|ipam| ipam.ipv4_address)
                        .filter(|ip| !ip.is_empty()),
                    aliases: endpoint.aliases.unwrap_or_default(),
                })
                .collect()
        })
        .unwrap_or_default();
    networks.sort_by(|a, b| a.name.cmp(&b.name));

    ContainerDetails {
        id: details.id.unwrap_or_else(|| fallback_id.to_owned()),
        name: details
            .name
            .map(|n| n.trim_start_matches('/').to_owned())
            .unwrap_or_default(),
        image: config.image.unwrap_or_default(),
        status,
        health,
        labels: config.labels.unwrap_or_default(),
        env: config.env.unwrap_or_default(),
        hostname: config.hostname,
        domainname: config.domainname,
        exposed_ports,
        entrypoint: config.entrypoint,
        healthcheck: config.healthcheck,
        host_config: details.host_config,
        networks,
    }
}

impl DockerClient for BollardDockerClient {
    async fn inspect_container(&self, id: &str) -> Result<ContainerDetails, OrchestratorError> {
        validate_container_ref(id)?;

        use bollard::container::InspectContainerOptions;

        let details = self
            .docker
            .inspect_container(id, None::<InspectContainerOptions>)
            .await
            .map_err(|e| map_api_error(id, "inspect container", e))?;

        Ok(details_from_inspect(id, details))
    }

    async fn create_container(&self, spec: &ContainerSpec) -> Result<String, OrchestratorError> {
        use bollard::container::{Config, CreateContainerOptions, NetworkingConfig};

        let mut host_config = spec.host_config.clone().unwrap_or_default();
        let networking_config = spec.network.as_ref().map(|net| {
            host_config.network_mode = Some(net.name.clone());
            let endpoint = EndpointSettings {
                ipam_config: net.ipv4_address.clone().map(|ip| EndpointIpamConfig {
                    ipv4_address: Some(ip),
                    ..Default::default()
                }),
                aliases: (!net.aliases.is_empty()).then(|| net.aliases.clone()),
                ..Default::default()
            };
            NetworkingConfig {
                endpoints_config: HashMap::from([(net.name.clone(), endpoint)]),
            }
        });

        let config = Config {
            image: Some(spec.image.clone()),
            hostname: spec.hostname.clone(),
            domainname: spec.domainname.clone(),
            exposed_ports: Some(
                spec.exposed_ports
                    .iter()
                    .map(|port| (port.clone(), HashMap::new()))
                    .collect(),
            ),
            env: Some(spec.env.clone()),
            healthcheck: spec.healthcheck.clone(),
            entrypoint: spec.entrypoint.clone(),
            labels: Some(spec.labels.clone()),
            host_config: Some(host_config),
            networking_config,
            ..Default::default()
        };

        let options = CreateContainerOptions {
            name: spec.name.clone(),
            platform: None,
        };

        let response = self
            .docker
            .create_container(Some(options), config)
            .await
            .map_err(|e| map_api_error(&spec.name, "create container", e))?;

        Ok(response.id)
    }

    async fn start_container(&self, id: &str) -> Result<(), OrchestratorError> {
        validate_container_ref(id)?;

        use bollard::container::StartContainerOptions;

        self.docker
            .start_container(id, None::<StartContainerOptions<String>>)
            .await
            .map_err(|e| map_api_error(id, "start container", e))
    }

    async fn stop_container(&self, id: &str) -> Result<(), OrchestratorError> {
        validate_container_ref(id)?;

        use bollard::container::StopContainerOptions;

        self.docker
            .stop_container(
                id,
                Some(StopContainerOptions {
                    t: STOP_TIMEOUT_SECS,
                }),
            )
            .await
            .map_err(|e| map_api_error(id, "stop container", e))
    }

    async fn restart_container(&self, id: &str) -> Result<(), OrchestratorError> {
        validate_container_ref(id)?;

        use bollard::container::RestartContainerOptions;

        self.docker
            .restart_container(
                id,
                Some(RestartContainerOptions {
                    t: STOP_TIMEOUT_SECS as isize,
                }),
            )
            .await
            .map_err(|e| map_api_error(id, "restart container", e))
    }

    async fn remove_container(&self, id: &str) -> Result<(), OrchestratorError> {
        validate_container_ref(id)?;

        use bollard::container::RemoveContainerOptions;

        self.docker
            .remove_container(id, Some(RemoveContainerOptions::default()))
            .await
            .map_err(|e| map_api_error(id, "remove container", e))
    }

    async fn exec_detached(&self, id: &str, cmd: &[String]) -> Result<(), OrchestratorError> {
        validate_container_ref(id)?;

        use bollard::exec::{CreateExecOptions, StartExecOptions};

        let exec = self
            .docker
            .create_exec(
                id,
                CreateExecOptions {
                    cmd: Some(cmd.to_vec()),
                    attach_stdout: Some(false),
                    attach_stderr: Some(false),
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| map_api_error(id, "create exec", e))?;

        self.docker
            .start_exec(
                &exec.id,
                Some(StartExecOptions {
                    detach: true,
                    ..Default::default()
                }),
            )
            .await
            .map_err(|e| map_api_error(id, "start exec", e))?;

        Ok(())
    }

    async fn download_archive(&self, id: &str, path: &str) -> Result<Vec<u8>, OrchestratorError> {
        validate_container_ref(id)?;

        use bollard::container::DownloadFromContainerOptions;

        let mut stream = self.docker.download_from_container(
            id,
            Some(DownloadFromContainerOptions {
                path: path.to_owned(),
            }),
        );

        let mut archive = Vec::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| map_api_error(id, "download archive", e))?;
            archive.extend_from_slice(&chunk);
        }
        Ok(archive)
    }

    async fn upload_archive(
        &self,
        id: &str,
        dir: &str,
        archive: Vec<u8>,
    ) -> Result<(), OrchestratorError> {
        validate_container_ref(id)?;

        use bollard::container::UploadToContainerOptions;

        self.docker
            .upload_to_container(
                id,
                Some(UploadToContainerOptions {
                    path: dir.to_owned(),
                    ..Default::default()
                }),
                bytes::Bytes::from(archive),
            )
            .await
            .map_err(|e| map_api_error(id, "upload archive", e))
    }

    fn log_stream(&self, id: &str, follow: bool) -> BoxStream<'static, Result<String, OrchestratorError>> {
        if let Err(e) = validate_container_ref(id) {
            return futures_util::stream::once(async move { Err(e) }).boxed();
        }

        use bollard::container::LogsOptions;

        let options = LogsOptions::<String> {
            follow,
            stdout: true,
            stderr: true,
            tail: "all".to_owned(),
            ..Default::default()
        };

        let owned_id = id.to_owned();
        self.docker
            .logs(id, Some(options))
            .map(move |frame| {
                frame
                    .map(|output| output.to_string())
                    .map_err(|e| map_api_error(&owned_id, "stream logs", e))
            })
            .boxed()
    }

    async fn info(&self) -> Result<DaemonInfo, OrchestratorError> {
        let info = self
            .docker
            .info()
            .await
            .map_err(|e| OrchestratorError::DockerConnection(format!("info failed: {e}")))?;

        Ok(DaemonInfo {
            name: info.name.unwrap_or_default(),
            server_version: info.server_version.unwrap_or_default(),
            containers: info.containers.unwrap_or_default(),
            containers_running: info.containers_running.unwrap_or_default(),
            containers_stopped: info.containers_stopped.unwrap_or_default(),
            images: info.images.unwrap_or_default(),
        })
    }

    async fn ping(&self) -> Result<(), OrchestratorError> {
        self.docker
            .ping()
            .await
            .map_err(|e| OrchestratorError::DockerConnection(format!("ping failed: {e}")))?;
        Ok(())
    }
}
