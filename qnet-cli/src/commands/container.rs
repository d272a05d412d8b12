//! `qnet wait` and `qnet container` handlers

use std::io::Write;

use serde::Serialize;
use tracing::info;

use qnet_orchestrator::{BasicContainerState, DockerClient, NetworkOrchestrator};

use crate::cli::{ContainerAction, ContainerArgs, ContainerCommandArgs};
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `wait` command.
pub async fn execute_wait<D: DockerClient>(
    args: ContainerArgs,
    orchestrator: &NetworkOrchestrator<D>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let usable = orchestrator.wait(&args.container).await?;
    let state = orchestrator.state(&args.container).await?;
    writer.render(&WaitReport { usable, state })?;

    if !usable {
        return Err(CliError::Unsatisfied(format!(
            "container {} did not become usable",
            args.container
        )));
    }
    Ok(())
}

/// Execute the `container` command.
pub async fn execute<D: DockerClient>(
    args: ContainerCommandArgs,
    orchestrator: &NetworkOrchestrator<D>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let (action, target) = match args.action {
        ContainerAction::State(c) => {
            let state = orchestrator.state(&c.container).await?;
            writer.render(&StateReport(state))?;
            return Ok(());
        }
        ContainerAction::Stop(c) => {
            orchestrator.stop_resource(&c.container).await?;
            ("stopped", c.container)
        }
        ContainerAction::Start(c) => {
            orchestrator.start_resource(&c.container).await?;
            ("started", c.container)
        }
        ContainerAction::Restart(c) => {
            orchestrator.restart_resource(&c.container).await?;
            ("restarted", c.container)
        }
    };

    info!(container = %target, action, "container action completed");
    let state = orchestrator.state(&target).await?;
    writer.render(&ActionReport { action, state })?;
    Ok(())
}

#[derive(Serialize)]
pub struct WaitReport {
    pub usable: bool,
    pub state: BasicContainerState,
}

impl Render for WaitReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        let verdict = if self.usable {
            "USABLE".green().bold()
        } else {
            "NOT USABLE".red().bold()
        };
        writeln!(w, "{}: {}", self.state.name.bold(), verdict)?;
        write_state(w, &self.state)
    }
}

#[derive(Serialize)]
#[serde(transparent)]
pub struct StateReport(pub BasicContainerState);

impl Render for StateReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "{}", self.0.name.bold())?;
        write_state(w, &self.0)
    }
}

#[derive(Serialize)]
pub struct ActionReport {
    pub action: &'static str,
    pub state: BasicContainerState,
}

impl Render for ActionReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "{} {}", self.state.name.bold(), self.action)?;
        write_state(w, &self.state)
    }
}

fn write_state(w: &mut dyn Write, state: &BasicContainerState) -> std::io::Result<()> {
    writeln!(w, "  Id:     {}", state.id)?;
    writeln!(w, "  Status: {}", state.status)?;
    writeln!(w, "  Health: {}", state.health.as_deref().unwrap_or("-"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(health: Option<&str>) -> BasicContainerState {
        BasicContainerState {
            id: "c00000000001".to_owned(),
            name: "node1-quorum-clone".to_owned(),
            status: "running".to_owned(),
            health: health.map(str::to_owned),
        }
    }

    fn rendered<T: Render>(payload: &T) -> String {
        let mut buffer = Vec::new();
        payload
            .render_text(&mut buffer)
            .expect("text rendering should succeed");
        String::from_utf8(buffer).expect("valid UTF-8")
    }

    #[test]
    fn test_state_report_without_health_check() {
        let output = rendered(&StateReport(state(None)));
        assert!(output.contains("node1-quorum-clone"));
        assert!(output.contains("Status: running"));
        assert!(output.contains("Health: -"));
    }

    #[test]
    fn test_state_report_json_is_flat() {
        let json = serde_json::to_value(StateReport(state(Some("healthy")))).expect("serialize");
        assert_eq!(json["name"], "node1-quorum-clone");
        assert_eq!(json["health"], "healthy");
    }

    #[test]
    fn test_wait_report_not_usable() {
        let report = WaitReport {
            usable: false,
            state: state(Some("starting")),
        };
        let output = rendered(&report);
        assert!(output.contains("NOT USABLE"));
        assert!(output.contains("Health: starting"));
    }

    #[test]
    fn test_action_report() {
        let report = ActionReport {
            action: "restarted",
            state: state(Some("healthy")),
        };
        assert!(rendered(&report).contains("restarted"));
    }
}
