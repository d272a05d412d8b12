//! `qnet grep-log` and `qnet logs` handlers

use std::io::Write;
use std::time::Duration;

use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use qnet_orchestrator::{DockerClient, NetworkOrchestrator};

use crate::cli::{ContainerArgs, GrepLogArgs};
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `grep-log` command.
///
/// Exits with the "condition not met" code when the pattern never shows up.
pub async fn execute_grep_log<D: DockerClient>(
    args: GrepLogArgs,
    orchestrator: &NetworkOrchestrator<D>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let matched = orchestrator
        .grep_log(
            &args.container,
            &args.pattern,
            Duration::from_secs(args.timeout_secs),
        )
        .await?;

    writer.render(&GrepReport {
        container: args.container.clone(),
        pattern: args.pattern.clone(),
        matched,
    })?;

    if !matched {
        return Err(CliError::Unsatisfied(format!(
            "pattern '{}' not found in {} within {}s",
            args.pattern, args.container, args.timeout_secs
        )));
    }
    Ok(())
}

/// Execute the `logs` command: the raw log goes straight to stdout.
pub async fn execute_logs<D: DockerClient>(
    args: ContainerArgs,
    orchestrator: &NetworkOrchestrator<D>,
) -> Result<(), CliError> {
    let mut stdout = tokio::io::stdout();
    let frames = orchestrator
        .stream_logs(&args.container, &mut stdout)
        .await?;
    stdout.flush().await?;
    debug!(container = %args.container, frames, "log dump completed");
    Ok(())
}

#[derive(Serialize)]
pub struct GrepReport {
    pub container: String,
    pub pattern: String,
    pub matched: bool,
}

impl Render for GrepReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        let verdict = if self.matched {
            "MATCHED".green().bold()
        } else {
            "NO MATCH".red().bold()
        };
        writeln!(w, "{} /{}/: {}", self.container.bold(), self.pattern, verdict)
    }
}
