//! Coarse container state snapshot.

use serde::Serialize;

use crate::types::ContainerDetails;

/// Identifier, name, status and health of one container at one instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BasicContainerState {
    pub id: String,
    pub name: String,
    pub status: String,
    pub health: Option<String>,
}

impl BasicContainerState {
    /// `dead` or `exited`: the container will not recover without a restart.
    pub fn is_dead(&self) -> bool {
        self.status.eq_ignore_ascii_case("dead") || self.status.eq_ignore_ascii_case("exited")
    }

    /// Health check present and not yet `healthy`.
    ///
    /// A container without a health check is never ongoing, so it counts as
    /// usable as soon as it is not dead.
    pub fn is_ongoing(&self) -> bool {
        self.health
            .as_deref()
            .is_some_and(|h| !h.eq_ignore_ascii_case("healthy"))
    }

    pub fn is_running(&self) -> bool {
        self.status.eq_ignore_ascii_case("running")
    }

    pub fn is_healthy(&self) -> bool {
        self.health
            .as_deref()
            .is_some_and(|h| h.eq_ignore_ascii_case("healthy"))
    }
}

impl From<&ContainerDetails> for BasicContainerState {
    fn from(details: &ContainerDetails) -> Self {
        Self {
            id: details.id.clone(),
            name: details.name.clone(),
            status: details.status.clone(),
            health: details.health.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(status: &str, health: Option<&str>) -> BasicContainerState {
        BasicContainerState {
            id: "abc".to_owned(),
            name: "node1".to_owned(),
            status: status.to_owned(),
            health: health.map(str::to_owned),
        }
    }

    #[test]
    fn dead_and_exited_are_dead() {
        assert!(state("dead", None).is_dead());
        assert!(state("exited", Some("unhealthy")).is_dead());
        assert!(state("EXITED", None).is_dead());
        assert!(!state("running", None).is_dead());
        assert!(!state("restarting", None).is_dead());
    }

    #[test]
    fn ongoing_requires_non_healthy_health() {
        assert!(state("running", Some("starting")).is_ongoing());
        assert!(state("running", Some("unhealthy")).is_ongoing());
        assert!(!state("running", Some("healthy")).is_ongoing());
    }

    #[test]
    fn no_health_check_is_never_ongoing() {
        let s = state("running", None);
        assert!(!s.is_ongoing());
        assert!(!s.is_healthy());
    }

    #[test]
    fn from_details_copies_fields() {
        let details = ContainerDetails {
            id: "id1".to_owned(),
            name: "n".to_owned(),
            status: "running".to_owned(),
            health: Some("healthy".to_owned()),
            ..Default::default()
        };
        let s = BasicContainerState::from(&details);
        assert!(s.is_running());
        assert!(s.is_healthy());
        assert_eq!(s.id, "id1");
    }
}
