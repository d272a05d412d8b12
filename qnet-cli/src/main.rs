//! qnet CLI 진입점
//!
//! 설정을 로드하고 로깅을 초기화한 뒤, 서브커맨드를 오케스트레이터에 전달합니다.
//! `config` 서브커맨드는 Docker 데몬 연결 없이 동작합니다.

mod cli;
mod commands;
mod error;
mod ledger_file;
mod logging;
mod output;

use std::sync::Arc;

use clap::Parser;
use colored::Colorize;
use tracing::debug;

use qnet_core::config::QnetConfig;
use qnet_core::error::QnetError;
use qnet_orchestrator::{BollardDockerClient, ImageCatalog, NetworkOrchestrator, OrchestratorConfig};

use crate::cli::{Cli, Commands};
use crate::error::CliError;
use crate::output::OutputWriter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let writer = OutputWriter::new(cli.output);

    // 설정 로드 실패는 config 서브커맨드가 직접 보고하므로 여기서는 보류
    let loaded = QnetConfig::load(&cli.config).await;

    let mut general = loaded
        .as_ref()
        .map(|c| c.general.clone())
        .unwrap_or_default();
    if let Some(level) = &cli.log_level {
        general.log_level = level.clone();
    }
    if let Err(e) = logging::init_tracing(&general) {
        eprintln!("{} {}", "warning:".yellow().bold(), e);
    }
    qnet_core::metrics::describe_all();

    if let Err(e) = run(cli, loaded, &writer).await {
        eprintln!("{} {}", "error:".red().bold(), e);
        std::process::exit(e.exit_code());
    }
}

async fn run(
    cli: Cli,
    loaded: Result<QnetConfig, QnetError>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    use commands::{config, container, file, info, logs, network};

    match cli.command {
        Commands::Config(args) => config::execute(args, &cli.config, writer).await,
        Commands::WaitNetwork => network::execute_wait_network(&connect(loaded)?, writer).await,
        Commands::StartNode(args) => {
            network::execute_start_node(args, &connect(loaded)?, writer).await
        }
        Commands::Teardown(args) => {
            network::execute_teardown(args, &connect(loaded)?, writer).await
        }
        Commands::Check(args) => network::execute_check(args, &connect(loaded)?, writer).await,
        Commands::WipeDatadirs(args) => {
            network::execute_wipe_datadirs(args, &connect(loaded)?, writer).await
        }
        Commands::Wait(args) => container::execute_wait(args, &connect(loaded)?, writer).await,
        Commands::Container(args) => container::execute(args, &connect(loaded)?, writer).await,
        Commands::GrepLog(args) => logs::execute_grep_log(args, &connect(loaded)?, writer).await,
        Commands::Logs(args) => logs::execute_logs(args, &connect(loaded)?).await,
        Commands::File(args) => file::execute(args, &connect(loaded)?, writer).await,
        Commands::Info => info::execute(&connect(loaded)?, writer).await,
    }
}

/// 로드된 설정으로 Docker 클라이언트와 오케스트레이터를 구성합니다.
fn connect(
    loaded: Result<QnetConfig, QnetError>,
) -> Result<NetworkOrchestrator<BollardDockerClient>, CliError> {
    let config = loaded?;

    let orchestrator_config = OrchestratorConfig::from_core(&config.docker, &config.network);
    orchestrator_config.validate()?;
    let catalog = ImageCatalog::from_config(&config.docker);

    let client = BollardDockerClient::connect(&orchestrator_config.docker_host)?;
    debug!(
        host = %orchestrator_config.docker_host,
        nodes = orchestrator_config.nodes.len(),
        "docker client ready"
    );

    Ok(NetworkOrchestrator::new(
        Arc::new(client),
        orchestrator_config,
        catalog,
    ))
}
