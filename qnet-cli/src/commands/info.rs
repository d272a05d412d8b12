//! `qnet info` handler

use std::io::Write;

use serde::Serialize;

use qnet_orchestrator::{DaemonInfo, DockerClient, NetworkOrchestrator};

use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `info` command.
pub async fn execute<D: DockerClient>(
    orchestrator: &NetworkOrchestrator<D>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    orchestrator.ping().await?;
    let info = orchestrator.info().await?;
    writer.render(&InfoReport(info))?;
    Ok(())
}

#[derive(Serialize)]
#[serde(transparent)]
pub struct InfoReport(pub DaemonInfo);

impl Render for InfoReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        let info = &self.0;
        writeln!(w, "Docker daemon: {}", info.name.bold())?;
        writeln!(w, "  Server version: {}", info.server_version)?;
        writeln!(
            w,
            "  Containers:     {} ({} running, {} stopped)",
            info.containers, info.containers_running, info.containers_stopped
        )?;
        writeln!(w, "  Images:         {}", info.images)?;
        Ok(())
    }
}
