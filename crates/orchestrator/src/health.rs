//! Health polling.
//!
//! ```text
//!            ┌──────────┐  dead    ┌──────┐
//!  started ─▶│ polling  │─────────▶│ Dead │
//!            └────┬─────┘          └──────┘
//!        ▲        │ not ongoing    ┌─────────┐
//!        │ sleep  ├───────────────▶│ Healthy │
//!        └────────┤                └─────────┘
//!                 │ budget spent   ┌───────────┐
//!                 └───────────────▶│ Exhausted │
//!                                  └───────────┘
//! ```
//!
//! The interval sleep between attempts is the only suspension point besides
//! the inspect call itself. Inspect errors are not retried.

use std::sync::Arc;
use std::time::Duration;

use qnet_core::metrics as m;
use tracing::{debug, info, warn};

use crate::docker::DockerClient;
use crate::error::OrchestratorError;
use crate::state::BasicContainerState;
use crate::types::short_id;

/// Attempt budget and spacing for a poll loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl WaitPolicy {
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts,
            interval,
        }
    }
}

impl Default for WaitPolicy {
    /// 30 attempts, 3 seconds apart.
    fn default() -> Self {
        Self::new(30, Duration::from_secs(3))
    }
}

/// Terminal state of a single-container wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Healthy,
    Dead,
    Exhausted,
}

impl WaitOutcome {
    pub fn is_healthy(self) -> bool {
        self == Self::Healthy
    }
}

/// Polls `id` until it is usable, dead, or the budget runs out.
pub async fn wait_until_usable<D: DockerClient>(
    client: &D,
    id: &str,
    policy: WaitPolicy,
) -> Result<WaitOutcome, OrchestratorError> {
    for attempt in 1..=policy.max_attempts {
        let state = BasicContainerState::from(&client.inspect_container(id).await?);

        if state.is_dead() {
            warn!(
                container_id = short_id(id),
                status = %state.status,
                attempt,
                "container is dead, giving up"
            );
            metrics::counter!(m::ORCHESTRATOR_WAIT_FAILURES_TOTAL, m::LABEL_OUTCOME => "dead")
                .increment(1);
            return Ok(WaitOutcome::Dead);
        }

        if !state.is_ongoing() {
            debug!(
                container_id = short_id(id),
                health = state.health.as_deref().unwrap_or("none"),
                attempt,
                "container is usable"
            );
            return Ok(WaitOutcome::Healthy);
        }

        debug!(
            container_id = short_id(id),
            health = state.health.as_deref().unwrap_or("none"),
            attempt,
            max_attempts = policy.max_attempts,
            "container not ready yet"
        );

        if attempt < policy.max_attempts {
            tokio::time::sleep(policy.interval).await;
        }
    }

    warn!(
        container_id = short_id(id),
        max_attempts = policy.max_attempts,
        "container did not become healthy in time"
    );
    metrics::counter!(m::ORCHESTRATOR_WAIT_FAILURES_TOTAL, m::LABEL_OUTCOME => "exhausted")
        .increment(1);
    Ok(WaitOutcome::Exhausted)
}

/// Waits until every template container is usable.
///
/// Any dead container fails immediately. When at least one retry was needed
/// the grace period is slept before returning, so freshly started peers can
/// finish their handshakes.
///
/// # Errors
///
/// `OrchestratorError::NetworkNotReady` for a dead container or a spent budget.
pub async fn wait_for_template_network<D: DockerClient>(
    client: &Arc<D>,
    ids: &[String],
    policy: WaitPolicy,
    grace_period: Duration,
) -> Result<(), OrchestratorError> {
    for attempt in 1..=policy.max_attempts {
        let states = inspect_all(client, ids).await?;

        if let Some(dead) = states.iter().find(|s| s.is_dead()) {
            return Err(OrchestratorError::NetworkNotReady(format!(
                "container {} ({}) is {}",
                dead.name,
                short_id(&dead.id),
                dead.status
            )));
        }

        let pending: Vec<&str> = states
            .iter()
            .filter(|s| s.is_ongoing())
            .map(|s| s.name.as_str())
            .collect();

        if pending.is_empty() {
            info!(containers = ids.len(), attempt, "template network is ready");
            if attempt > 1 && !grace_period.is_zero() {
                info!(
                    grace_secs = grace_period.as_secs(),
                    "waiting for consensus to settle"
                );
                tokio::time::sleep(grace_period).await;
            }
            return Ok(());
        }

        info!(
            attempt,
            max_attempts = policy.max_attempts,
            pending = ?pending,
            "waiting for template network"
        );

        if attempt < policy.max_attempts {
            tokio::time::sleep(policy.interval).await;
        }
    }

    Err(OrchestratorError::NetworkNotReady(format!(
        "not all containers became healthy after {} attempts",
        policy.max_attempts
    )))
}

/// Inspects every container on its own task; the first error wins once all are done.
async fn inspect_all<D: DockerClient>(
    client: &Arc<D>,
    ids: &[String],
) -> Result<Vec<BasicContainerState>, OrchestratorError> {
    let handles: Vec<_> = ids
        .iter()
        .map(|id| {
            let client = Arc::clone(client);
            let id = id.clone();
            tokio::spawn(async move {
                let details = client.inspect_container(&id).await?;
                Ok::<_, OrchestratorError>(BasicContainerState::from(&details))
            })
        })
        .collect();

    let mut states = Vec::with_capacity(handles.len());
    let mut first_err = None;
    for handle in handles {
        match handle.await {
            Ok(Ok(state)) => states.push(state),
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
        None => Ok(states),
    }
}

#[cfg(test)]
mod tests {
    use tokio::time::Instant;

    use super::*;
    use crate::docker::mock::MockDockerClient;
    use crate::types::ContainerDetails;

    fn container(id: &str) -> ContainerDetails {
        ContainerDetails {
            id: id.to_owned(),
            name: format!("{id}-name"),
            status: "running".to_owned(),
            ..Default::default()
        }
    }

    fn policy() -> WaitPolicy {
        WaitPolicy::new(30, Duration::from_secs(3))
    }

    #[tokio::test(start_paused = true)]
    async fn immediately_healthy_returns_on_first_attempt() {
        let client = MockDockerClient::new()
            .with_container(container("c1"))
            .with_states("c1", &[("running", Some("healthy"))]);
        let started = Instant::now();

        let outcome = wait_until_usable(&client, "c1", policy()).await.unwrap();

        assert_eq!(outcome, WaitOutcome::Healthy);
        assert_eq!(client.calls_starting_with("inspect:c1"), 1);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn no_health_check_counts_as_usable() {
        let client = MockDockerClient::new().with_container(container("c1"));
        let outcome = wait_until_usable(&client, "c1", policy()).await.unwrap();
        assert!(outcome.is_healthy());
    }

    #[tokio::test(start_paused = true)]
    async fn dead_on_first_poll_fails_on_first_attempt() {
        let client = MockDockerClient::new()
            .with_container(container("c1"))
            .with_states("c1", &[("dead", None)]);

        let outcome = wait_until_usable(&client, "c1", policy()).await.unwrap();

        assert_eq!(outcome, WaitOutcome::Dead);
        assert_eq!(client.calls_starting_with("inspect:c1"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn exited_while_starting_is_dead() {
        let client = MockDockerClient::new()
            .with_container(container("c1"))
            .with_states("c1", &[("running", Some("starting")), ("exited", Some("unhealthy"))]);

        let outcome = wait_until_usable(&client, "c1", policy()).await.unwrap();

        assert_eq!(outcome, WaitOutcome::Dead);
        assert_eq!(client.calls_starting_with("inspect:c1"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn never_healthy_exhausts_full_budget() {
        let client = MockDockerClient::new()
            .with_container(container("c1"))
            .with_states("c1", &[("running", Some("starting"))]);
        let started = Instant::now();

        let outcome = wait_until_usable(&client, "c1", policy()).await.unwrap();

        assert_eq!(outcome, WaitOutcome::Exhausted);
        assert_eq!(client.calls_starting_with("inspect:c1"), 30);
        assert_eq!(started.elapsed(), Duration::from_secs(29 * 3));
    }

    #[tokio::test(start_paused = true)]
    async fn becomes_healthy_after_a_few_polls() {
        let client = MockDockerClient::new().with_container(container("c1")).with_states(
            "c1",
            &[
                ("running", Some("starting")),
                ("running", Some("starting")),
                ("running", Some("healthy")),
            ],
        );
        let started = Instant::now();

        let outcome = wait_until_usable(&client, "c1", policy()).await.unwrap();

        assert!(outcome.is_healthy());
        assert_eq!(client.calls_starting_with("inspect:c1"), 3);
        assert_eq!(started.elapsed(), Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn inspect_error_propagates() {
        let client = MockDockerClient::new();
        let err = wait_until_usable(&client, "missing", policy()).await.unwrap_err();
        assert!(matches!(err, OrchestratorError::ContainerNotFound(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn ready_network_skips_grace_period() {
        let client = MockDockerClient::new()
            .with_container(container("a"))
            .with_container(container("b"))
            .with_states("a", &[("created", Some("healthy"))]);
        let started = Instant::now();

        wait_for_template_network(
            &Arc::new(client),
            &["a".to_owned(), "b".to_owned()],
            WaitPolicy::new(20, Duration::from_secs(3)),
            Duration::from_secs(30),
        )
        .await
        .unwrap();

        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn network_that_needed_retries_sleeps_grace_period() {
        let client = MockDockerClient::new()
            .with_container(container("a"))
            .with_states("a", &[("running", Some("starting")), ("running", Some("healthy"))]);
        let started = Instant::now();

        wait_for_template_network(
            &Arc::new(client),
            &["a".to_owned()],
            WaitPolicy::new(20, Duration::from_secs(3)),
            Duration::from_secs(30),
        )
        .await
        .unwrap();

        assert_eq!(started.elapsed(), Duration::from_secs(33));
    }

    #[tokio::test(start_paused = true)]
    async fn dead_template_fails_network_wait() {
        let client = Arc::new(
            MockDockerClient::new()
                .with_container(container("a"))
                .with_states("a", &[("exited", None)]),
        );

        let err = wait_for_template_network(
            &client,
            &["a".to_owned()],
            WaitPolicy::new(20, Duration::from_secs(3)),
            Duration::from_secs(30),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, OrchestratorError::NetworkNotReady(_)));
        assert!(err.to_string().contains("a-name"));
    }

    #[tokio::test(start_paused = true)]
    async fn network_budget_exhaustion_is_an_error() {
        let client = Arc::new(
            MockDockerClient::new()
                .with_container(container("a"))
                .with_states("a", &[("running", Some("unhealthy"))]),
        );

        let err = wait_for_template_network(
            &client,
            &["a".to_owned()],
            WaitPolicy::new(4, Duration::from_secs(3)),
            Duration::from_secs(30),
        )
        .await
        .unwrap_err();

        assert!(err.to_string().contains("4 attempts"));
        assert_eq!(client.calls_starting_with("inspect:a"), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn network_wait_inspects_every_template_and_propagates_errors() {
        let client = Arc::new(MockDockerClient::new().with_container(container("a")));

        let err = wait_for_template_network(
            &client,
            &["a".to_owned(), "missing".to_owned()],
            WaitPolicy::new(20, Duration::from_secs(3)),
            Duration::from_secs(30),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, OrchestratorError::ContainerNotFound(_)));
        assert_eq!(client.calls_starting_with("inspect:a"), 1);
    }
}
