//! Ledger persistence between CLI invocations.
//!
//! `start-node` records every container it creates; `teardown`, `check` and
//! `wipe-datadirs` read the same file back.

use std::path::Path;

use tracing::debug;

use qnet_orchestrator::NetworkResources;

use crate::error::CliError;

/// Reads the ledger at `path`. A missing file is an empty ledger.
pub async fn load(path: &Path) -> Result<NetworkResources, CliError> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no ledger file, starting empty");
            return Ok(NetworkResources::new());
        }
        Err(e) => return Err(e.into()),
    };

    if content.trim().is_empty() {
        return Ok(NetworkResources::new());
    }

    serde_json::from_str(&content).map_err(|e| {
        CliError::Command(format!("invalid ledger file {}: {}", path.display(), e))
    })
}

/// Writes `ledger` to `path`, replacing any previous content.
pub async fn save(path: &Path, ledger: &NetworkResources) -> Result<(), CliError> {
    let json = serde_json::to_string_pretty(ledger)?;
    tokio::fs::write(path, json).await?;
    debug!(path = %path.display(), "ledger saved");
    Ok(())
}

/// Deletes the ledger file. A missing file is not an error.
pub async fn remove(path: &Path) -> Result<(), CliError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
