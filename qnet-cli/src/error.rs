//! CLI-specific error types and exit code mapping

use qnet_core::error::QnetError;
use qnet_orchestrator::OrchestratorError;

/// CLI-specific error type.
///
/// Each variant carries enough context for a user-friendly message.
/// The `exit_code()` method maps errors to standard Unix exit codes.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading or validation failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// A subcommand-specific operation failed.
    #[error("{0}")]
    Command(String),

    /// Cannot reach the container runtime daemon.
    #[error("docker daemon not reachable: {0}")]
    DaemonUnavailable(String),

    /// The operation ran but its condition was not met (unhealthy, no match, ...).
    #[error("{0}")]
    Unsatisfied(String),

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// IO error (file read, stdout write, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped domain error from qnet-core.
    #[error("{0}")]
    Core(#[from] QnetError),

    /// Orchestrator domain error.
    #[error("orchestrator error: {0}")]
    Orchestrator(OrchestratorError),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                                  |
    /// |------|------------------------------------------|
    /// | 0    | Success                                  |
    /// | 1    | General / command error                  |
    /// | 2    | Configuration error                      |
    /// | 3    | Docker daemon unreachable                |
    /// | 4    | Condition not met (unhealthy, no match)  |
    /// | 10   | IO error                                 |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Core(QnetError::Config(_)) => 2,
            Self::DaemonUnavailable(_) => 3,
            Self::Unsatisfied(_) => 4,
            Self::Io(_) => 10,
            Self::JsonSerialize(_) | Self::Command(_) | Self::Core(_) | Self::Orchestrator(_) => 1,
        }
    }
}

impl From<OrchestratorError> for CliError {
    fn from(e: OrchestratorError) -> Self {
        match e {
            OrchestratorError::DockerConnection(reason) => Self::DaemonUnavailable(reason),
            OrchestratorError::NetworkNotReady(reason) => Self::Unsatisfied(reason),
            OrchestratorError::Config { .. } => Self::Config(e.to_string()),
            OrchestratorError::Io(err) => Self::Io(err),
            other => Self::Orchestrator(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qnet_core::error::ConfigError;

    #[test]
    fn test_exit_code_config_error() {
        let err = CliError::Config("test error".to_owned());
        assert_eq!(err.exit_code(), 2, "config error should return exit code 2");
    }

    #[test]
    fn test_exit_code_core_config_error() {
        let err: CliError = QnetError::Config(ConfigError::FileNotFound {
            path: "qnet.toml".to_owned(),
        })
        .into();
        assert_eq!(err.exit_code(), 2, "core config error should map to exit code 2");
    }

    #[test]
    fn test_exit_code_daemon_unavailable() {
        let err: CliError =
            OrchestratorError::DockerConnection("connection refused".to_owned()).into();
        assert!(matches!(err, CliError::DaemonUnavailable(_)));
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn test_exit_code_network_not_ready() {
        let err: CliError = OrchestratorError::NetworkNotReady(
            "not all containers became healthy after 20 attempts".to_owned(),
        )
        .into();
        assert_eq!(err.exit_code(), 4);
        assert!(err.to_string().contains("20 attempts"));
    }

    #[test]
    fn test_exit_code_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = CliError::Io(io_err);
        assert_eq!(err.exit_code(), 10, "io error should return exit code 10");
    }

    #[test]
    fn test_exit_code_orchestrator_local_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "stdout closed");
        let err: CliError = OrchestratorError::Io(io_err).into();
        assert!(matches!(err, CliError::Io(_)));
        assert_eq!(err.exit_code(), 10);
    }

    #[test]
    fn test_exit_code_orchestrator_error() {
        let err: CliError = OrchestratorError::ContainerNotFound("abc".to_owned()).into();
        assert!(matches!(err, CliError::Orchestrator(_)));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_exit_code_json_serialize_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{invalid json")
            .expect_err("should fail parsing");
        let err = CliError::JsonSerialize(json_err);
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_error_display_command() {
        let err = CliError::Command("execution failed".to_owned());
        assert_eq!(format!("{}", err), "execution failed");
    }

    #[test]
    fn test_error_display_config() {
        let err = CliError::Config("invalid TOML syntax".to_owned());
        let display_str = format!("{}", err);
        assert!(display_str.contains("configuration error"));
        assert!(display_str.contains("invalid TOML syntax"));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let cli_err: CliError = io_err.into();
        match cli_err {
            CliError::Io(e) => assert_eq!(e.kind(), std::io::ErrorKind::PermissionDenied),
            _ => panic!("expected Io error variant"),
        }
    }
}
