//! CLI argument parsing using clap derive API
//!
//! This module defines the command-line interface structure using clap's derive macros.
//! It is purely declarative with no side effects or I/O.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Default location of the resource ledger shared between invocations.
pub const DEFAULT_LEDGER_PATH: &str = "qnet-ledger.json";

/// qnet -- ephemeral quorum/tessera test network orchestrator.
///
/// Use `qnet <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "qnet", version, about, long_about = None)]
pub struct Cli {
    /// Path to the qnet.toml configuration file.
    #[arg(short, long, default_value = "qnet.toml", global = true)]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Wait until every configured template container is usable.
    WaitNetwork,

    /// Clone and start nodes from their templates.
    StartNode(StartNodeArgs),

    /// Stop and remove every container recorded in the ledger.
    Teardown(LedgerArgs),

    /// Report the running/healthy status of the recorded network.
    Check(LedgerArgs),

    /// Wait until one container is usable.
    Wait(ContainerArgs),

    /// Wait for a pattern to appear in a container's log.
    GrepLog(GrepLogArgs),

    /// Dump a container's log to stdout.
    Logs(ContainerArgs),

    /// Wipe the data directories of every recorded consensus node.
    WipeDatadirs(LedgerArgs),

    /// Operate on a single container.
    Container(ContainerCommandArgs),

    /// Read-modify-write files inside a container.
    File(FileArgs),

    /// Show container runtime daemon information.
    Info,

    /// Manage configuration.
    Config(ConfigArgs),
}

// ---- start-node ----

/// Clone and start nodes from their templates.
#[derive(Args, Debug)]
pub struct StartNodeArgs {
    /// Node names to start (default: every configured node).
    pub nodes: Vec<String>,

    /// Discard existing datadirs and start from genesis.
    #[arg(long)]
    pub fresh: bool,

    /// Quorum version key from the image catalog.
    #[arg(long)]
    pub quorum_version: Option<String>,

    /// Tessera version key from the image catalog.
    #[arg(long)]
    pub tessera_version: Option<String>,

    /// Extra geth argument, `--name=value` or a bare `--flag` (repeatable).
    #[arg(long = "geth-arg", allow_hyphen_values = true)]
    pub geth_args: Vec<String>,

    /// Ledger file recording created containers.
    #[arg(long, default_value = DEFAULT_LEDGER_PATH)]
    pub ledger: PathBuf,
}

// ---- teardown / check / wipe-datadirs ----

#[derive(Args, Debug)]
pub struct LedgerArgs {
    /// Ledger file recording created containers.
    #[arg(long, default_value = DEFAULT_LEDGER_PATH)]
    pub ledger: PathBuf,
}

// ---- wait / logs ----

#[derive(Args, Debug)]
pub struct ContainerArgs {
    /// Container id or name.
    pub container: String,
}

// ---- grep-log ----

#[derive(Args, Debug)]
pub struct GrepLogArgs {
    /// Container id or name.
    pub container: String,

    /// Regular expression matched against each log frame.
    pub pattern: String,

    /// Give up after this many seconds.
    #[arg(long, default_value_t = 60)]
    pub timeout_secs: u64,
}

// ---- container ----

#[derive(Args, Debug)]
pub struct ContainerCommandArgs {
    #[command(subcommand)]
    pub action: ContainerAction,
}

#[derive(Subcommand, Debug)]
pub enum ContainerAction {
    /// Show name, status and health.
    State(ContainerArgs),
    /// Stop a container.
    Stop(ContainerArgs),
    /// Start a stopped container.
    Start(ContainerArgs),
    /// Restart a container.
    Restart(ContainerArgs),
}

// ---- file ----

#[derive(Args, Debug)]
pub struct FileArgs {
    #[command(subcommand)]
    pub action: FileAction,
}

#[derive(Subcommand, Debug)]
pub enum FileAction {
    /// Overwrite a file in the container with a local file's content.
    Write {
        /// Container id or name.
        container: String,
        /// Absolute path inside the container.
        path: String,
        /// Local file to upload.
        source: PathBuf,
    },
    /// Append a JSON value to a JSON array file in the container.
    AppendJson {
        /// Container id or name.
        container: String,
        /// Absolute path inside the container.
        path: String,
        /// Value to append, parsed as JSON (falls back to a string).
        value: String,
    },
}

// ---- config ----

/// Manage qnet configuration.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors.
    Validate,
    /// Show the effective configuration (file + env overrides + defaults).
    Show {
        /// Show only a specific section (general, docker, network).
        #[arg(long)]
        section: Option<String>,
    },
}
