//! `qnet file` handler

use std::io::Write;

use serde::Serialize;
use serde_json::Value;
use tracing::info;

use qnet_orchestrator::{DockerClient, JsonListAppend, NetworkOrchestrator};

use crate::cli::{FileAction, FileArgs};
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `file` command.
pub async fn execute<D: DockerClient>(
    args: FileArgs,
    orchestrator: &NetworkOrchestrator<D>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let report = match args.action {
        FileAction::Write {
            container,
            path,
            source,
        } => {
            let content = tokio::fs::read_to_string(&source).await?;
            let id = orchestrator.write_file(&container, &path, &content).await?;
            FileReport {
                container: id,
                path,
                action: "written",
            }
        }
        FileAction::AppendJson {
            container,
            path,
            value,
        } => {
            let modifier = JsonListAppend::new(json_value(&value));
            let id = orchestrator.modify_file(&container, &path, &modifier).await?;
            FileReport {
                container: id,
                path,
                action: "appended",
            }
        }
    };

    info!(container = %report.container, path = %report.path, action = report.action, "file updated");
    writer.render(&report)?;
    Ok(())
}

/// Parses `raw` as JSON, falling back to a plain string.
fn json_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_owned()))
}

#[derive(Serialize)]
pub struct FileReport {
    pub container: String,
    pub path: String,
    pub action: &'static str,
}

impl Render for FileReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        writeln!(w, "{} {}:{}", self.action, self.container, self.path)
    }
}
