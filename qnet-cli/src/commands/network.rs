//! `qnet wait-network`, `start-node`, `teardown`, `check` and `wipe-datadirs` handlers

use std::collections::BTreeMap;
use std::io::Write;
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use qnet_orchestrator::{
    DockerClient, GethArgs, NetworkOrchestrator, NetworkStatus, NodeAttributes,
};

use crate::cli::{LedgerArgs, StartNodeArgs};
use crate::error::CliError;
use crate::ledger_file;
use crate::output::{OutputWriter, Render};

/// Execute the `wait-network` command.
pub async fn execute_wait_network<D: DockerClient>(
    orchestrator: &NetworkOrchestrator<D>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let templates = orchestrator.config().nodes.len() * 2;
    info!(templates, "waiting for template network");

    orchestrator.wait_for_template_network().await?;

    writer.render(&TemplateNetworkReport {
        ready: true,
        templates,
    })?;
    Ok(())
}

/// Execute the `start-node` command.
///
/// The ledger is saved even when startup fails so that `teardown` can remove
/// whatever was created.
pub async fn execute_start_node<D: DockerClient>(
    args: StartNodeArgs,
    orchestrator: &NetworkOrchestrator<D>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let nodes: Vec<String> = if args.nodes.is_empty() {
        orchestrator.config().nodes.keys().cloned().collect()
    } else {
        args.nodes.clone()
    };
    if nodes.is_empty() {
        return Err(CliError::Command(
            "no nodes configured under [docker.nodes]".to_owned(),
        ));
    }

    let overlay = parse_geth_args(&args.geth_args)?;
    let attrs: Vec<NodeAttributes> = nodes
        .iter()
        .map(|node| node_attributes(node, &args, &overlay))
        .collect();

    let ledger = Arc::new(ledger_file::load(&args.ledger).await?);
    let result = orchestrator.start_network(&attrs, Arc::clone(&ledger)).await;
    ledger_file::save(&args.ledger, &ledger).await?;
    let healthy = result?;

    writer.render(&StartReport {
        nodes,
        healthy,
        ledger: args.ledger.display().to_string(),
        resources: ledger.snapshot(),
    })?;

    if !healthy {
        return Err(CliError::Unsatisfied(format!(
            "not every node became healthy; run `qnet teardown --ledger {}` to clean up",
            args.ledger.display()
        )));
    }
    Ok(())
}

fn node_attributes(node: &str, args: &StartNodeArgs, overlay: &GethArgs) -> NodeAttributes {
    let mut attrs = NodeAttributes::for_node(node).with_fresh_start(args.fresh);
    if let Some(key) = &args.quorum_version {
        attrs = attrs.with_quorum_version_key(key.clone());
    }
    if let Some(key) = &args.tessera_version {
        attrs = attrs.with_tessera_version_key(key.clone());
    }
    if !overlay.is_empty() {
        attrs = attrs.with_additional_geth_args(overlay.clone());
    }
    attrs
}

/// Parses `--name=value` and bare `--flag` entries into an overlay.
pub fn parse_geth_args(raw: &[String]) -> Result<GethArgs, CliError> {
    raw.iter().try_fold(GethArgs::new(), |args, entry| {
        let entry = entry.trim();
        if !entry.starts_with("--") || entry.len() < 3 {
            return Err(CliError::Command(format!(
                "invalid geth argument '{}': expected --name or --name=value",
                entry
            )));
        }
        Ok(match entry.split_once('=') {
            Some((name, value)) => args.arg(name, value),
            None => args.arg(entry, ""),
        })
    })
}

/// Execute the `teardown` command.
///
/// The ledger file is deleted once every resource was removed.
pub async fn execute_teardown<D: DockerClient>(
    args: LedgerArgs,
    orchestrator: &NetworkOrchestrator<D>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let ledger = ledger_file::load(&args.ledger).await?;
    let resources = ledger.all_resource_ids().len();
    let nodes = ledger.node_names();

    let ok = orchestrator.delete_network(&ledger).await?;
    if ok {
        ledger_file::remove(&args.ledger).await?;
    } else {
        warn!(ledger = %args.ledger.display(), "teardown incomplete, keeping ledger");
    }

    writer.render(&TeardownReport {
        nodes,
        resources,
        removed: ok,
    })?;

    if !ok {
        return Err(CliError::Unsatisfied("not every resource was removed".to_owned()));
    }
    Ok(())
}

/// Execute the `check` command.
pub async fn execute_check<D: DockerClient>(
    args: LedgerArgs,
    orchestrator: &NetworkOrchestrator<D>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let ledger = ledger_file::load(&args.ledger).await?;
    let status = orchestrator.check_network(&ledger).await?;

    let report = CheckReport::new(ledger.all_resource_ids().len(), status);
    writer.render(&report)?;

    if !(status.is_running() && status.is_healthy()) {
        return Err(CliError::Unsatisfied(format!("network is degraded: {}", status)));
    }
    Ok(())
}

/// Execute the `wipe-datadirs` command.
pub async fn execute_wipe_datadirs<D: DockerClient>(
    args: LedgerArgs,
    orchestrator: &NetworkOrchestrator<D>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let ledger = ledger_file::load(&args.ledger).await?;
    let wiped = orchestrator.delete_datadirs(&ledger).await?;
    writer.render(&WipeReport {
        resources: ledger.all_resource_ids().len(),
        wiped,
    })?;
    Ok(())
}

#[derive(Serialize)]
pub struct TemplateNetworkReport {
    pub ready: bool,
    pub templates: usize,
}

impl Render for TemplateNetworkReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;
        writeln!(
            w,
            "Template network: {} ({} containers)",
            "READY".green().bold(),
            self.templates
        )
    }
}

#[derive(Serialize)]
pub struct StartReport {
    pub nodes: Vec<String>,
    pub healthy: bool,
    pub ledger: String,
    /// Node name -> created container ids
    pub resources: BTreeMap<String, Vec<String>>,
}

impl Render for StartReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        let verdict = if self.healthy {
            "HEALTHY".green().bold()
        } else {
            "UNHEALTHY".red().bold()
        };
        writeln!(w, "Started {} node(s): {}", self.nodes.len(), verdict)?;
        for (node, ids) in &self.resources {
            writeln!(w, "  {}: {}", node.bold(), ids.join(", "))?;
        }
        writeln!(w, "Ledger: {}", self.ledger)?;
        Ok(())
    }
}

#[derive(Serialize)]
pub struct TeardownReport {
    pub nodes: Vec<String>,
    pub resources: usize,
    pub removed: bool,
}

impl Render for TeardownReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        if self.resources == 0 {
            return writeln!(w, "Nothing to tear down");
        }
        let verdict = if self.removed {
            "REMOVED".green().bold()
        } else {
            "INCOMPLETE".red().bold()
        };
        writeln!(
            w,
            "Teardown of {} resource(s) across {} node(s): {}",
            self.resources,
            self.nodes.len(),
            verdict
        )
    }
}

#[derive(Serialize)]
pub struct CheckReport {
    pub resources: usize,
    pub status: NetworkStatus,
    pub running: bool,
    pub healthy: bool,
}

impl CheckReport {
    fn new(resources: usize, status: NetworkStatus) -> Self {
        Self {
            resources,
            status,
            running: status.is_running(),
            healthy: status.is_healthy(),
        }
    }
}

impl Render for CheckReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        let flag = |yes: bool| {
            if yes {
                "yes".green().bold()
            } else {
                "no".red().bold()
            }
        };
        writeln!(w, "Network ({} resources)", self.resources)?;
        writeln!(w, "  Running: {}", flag(self.running))?;
        writeln!(w, "  Healthy: {}", flag(self.healthy))?;
        Ok(())
    }
}

#[derive(Serialize)]
pub struct WipeReport {
    pub resources: usize,
    pub wiped: bool,
}

impl Render for WipeReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        writeln!(
            w,
            "Datadir wipe issued across {} resource(s)",
            self.resources
        )
    }
}
