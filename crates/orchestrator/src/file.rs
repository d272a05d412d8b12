//! Read-transform-write of a single file inside a container.
//!
//! Not atomic: a concurrent writer inside the container can be overwritten.

use qnet_core::metrics as m;
use serde_json::Value;
use tracing::debug;

use crate::archive::{pack_single_file, unpack_single_file};
use crate::docker::DockerClient;
use crate::error::OrchestratorError;
use crate::types::short_id;

/// Pure transform applied to the current file content.
pub trait ContentModifier: Send + Sync {
    fn modify(&self, current: &str) -> Result<String, OrchestratorError>;
}

impl<F> ContentModifier for F
where
    F: Fn(&str) -> Result<String, OrchestratorError> + Send + Sync,
{
    fn modify(&self, current: &str) -> Result<String, OrchestratorError> {
        self(current)
    }
}

/// Appends one element to a file holding a JSON array.
#[derive(Debug, Clone)]
pub struct JsonListAppend {
    element: Value,
}

impl JsonListAppend {
    pub fn new(element: impl Into<Value>) -> Self {
        Self {
            element: element.into(),
        }
    }
}

impl ContentModifier for JsonListAppend {
    fn modify(&self, current: &str) -> Result<String, OrchestratorError> {
        let mut list: Vec<Value> = serde_json::from_str(current)
            .map_err(|e| OrchestratorError::Content(format!("not a JSON array: {e}")))?;
        list.push(self.element.clone());
        serde_json::to_string(&list)
            .map_err(|e| OrchestratorError::Content(format!("failed to serialize list: {e}")))
    }
}

/// Splits an absolute container path into (parent directory, base name).
///
/// A trailing `/` names a directory and is a precondition violation.
pub(crate) fn split_path<'a>(
    container_id: &str,
    path: &'a str,
) -> Result<(&'a str, &'a str), OrchestratorError> {
    if !path.starts_with('/') {
        return Err(OrchestratorError::Content(format!(
            "'{path}' is not an absolute file path"
        )));
    }
    let (parent, name) = path.rsplit_once('/').unwrap_or(("", path));
    if name.is_empty() {
        return Err(OrchestratorError::NotAFile {
            container_id: container_id.to_owned(),
            path: path.to_owned(),
        });
    }
    Ok((if parent.is_empty() { "/" } else { parent }, name))
}

/// Reads `path`, runs `modifier` over it and writes the result back.
///
/// Returns `container_id` so calls can be chained.
pub async fn modify_file<D, M>(
    client: &D,
    container_id: &str,
    path: &str,
    modifier: &M,
) -> Result<String, OrchestratorError>
where
    D: DockerClient,
    M: ContentModifier + ?Sized,
{
    split_path(container_id, path)?;

    let archive = client.download_archive(container_id, path).await?;
    let raw = unpack_single_file(&archive, container_id, path)?;
    let current = String::from_utf8(raw)
        .map_err(|e| OrchestratorError::Content(format!("'{path}' is not UTF-8: {e}")))?;

    let updated = modifier.modify(&current)?;
    debug!(
        container_id = short_id(container_id),
        path,
        old_len = current.len(),
        new_len = updated.len(),
        "file content transformed"
    );

    write_file(client, container_id, path, &updated).await
}

/// Overwrites `path` with `content`.
pub async fn write_file<D: DockerClient>(
    client: &D,
    container_id: &str,
    path: &str,
    content: &str,
) -> Result<String, OrchestratorError> {
    let (dir, name) = split_path(container_id, path)?;
    let archive = pack_single_file(name, content.as_bytes())?;

    client.upload_archive(container_id, dir, archive).await?;

    metrics::counter!(m::ORCHESTRATOR_FILE_TRANSACTIONS_TOTAL).increment(1);
    debug!(
        container_id = short_id(container_id),
        path,
        bytes = content.len(),
        "file written"
    );
    Ok(container_id.to_owned())
}
