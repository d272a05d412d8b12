//! Single-entry tar archives.
//!
//! The daemon's copy endpoints move tar streams, not byte ranges, so one file
//! travels as a one-entry archive: entry name = base name, size = exact byte
//! length, mode `0644`.

use std::io::Read;

use crate::error::OrchestratorError;

const FILE_MODE: u32 = 0o644;

/// Wraps `content` into a tar archive holding one regular file named `name`.
pub fn pack_single_file(name: &str, content: &[u8]) -> Result<Vec<u8>, OrchestratorError> {
    if name.is_empty() || name.contains('/') {
        return Err(OrchestratorError::Archive(format!(
            "entry name must be a bare file name, got '{name}'"
        )));
    }

    let mut header = tar::Header::new_gnu();
    header.set_size(content.len() as u64);
    header.set_mode(FILE_MODE);
    header.set_mtime(
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs(),
    );

    // append_data writes a GNU long-name entry for names over 100 bytes
    let mut builder = tar::Builder::new(Vec::new());
    builder
        .append_data(&mut header, name, content)
        .map_err(|e| OrchestratorError::Archive(format!("failed to append '{name}': {e}")))?;
    builder
        .into_inner()
        .map_err(|e| OrchestratorError::Archive(format!("failed to finish archive: {e}")))
}

/// Extracts the content of the only entry of `archive`.
///
/// `container_id` and `path` only label the error.
///
/// # Errors
///
/// - `OrchestratorError::NotAFile` if any entry is not a regular file
/// - `OrchestratorError::Archive` if the archive is unreadable or does not
///   hold exactly one entry
pub fn unpack_single_file(
    archive: &[u8],
    container_id: &str,
    path: &str,
) -> Result<Vec<u8>, OrchestratorError> {
    let mut reader = tar::Archive::new(archive);
    let entries = reader
        .entries()
        .map_err(|e| OrchestratorError::Archive(format!("failed to read archive: {e}")))?;

    let mut content: Option<Vec<u8>> = None;
    for entry in entries {
        let mut entry =
            entry.map_err(|e| OrchestratorError::Archive(format!("failed to read entry: {e}")))?;

        if !entry.header().entry_type().is_file() {
            return Err(OrchestratorError::NotAFile {
                container_id: container_id.to_owned(),
                path: path.to_owned(),
            });
        }
        if content.is_some() {
            return Err(OrchestratorError::Archive(format!(
                "expected a single entry for '{path}', found more"
            )));
        }

        let mut buf = Vec::new();
        entry
            .read_to_end(&mut buf)
            .map_err(|e| OrchestratorError::Archive(format!("failed to read entry: {e}")))?;
        content = Some(buf);
    }

    content.ok_or_else(|| OrchestratorError::Archive(format!("archive for '{path}' is empty")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dir_archive() -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());
        let mut dir = tar::Header::new_gnu();
        dir.set_path("qdata/").unwrap();
        dir.set_entry_type(tar::EntryType::Directory);
        dir.set_mode(0o755);
        dir.set_size(0);
        dir.set_cksum();
        builder.append(&dir, std::io::empty()).unwrap();
        builder.into_inner().unwrap()
    }

    #[test]
    fn packed_entry_has_name_size_and_mode() {
        let archive = pack_single_file("permissioned-nodes.json", b"[1,2]").unwrap();
        let mut reader = tar::Archive::new(archive.as_slice());
        let entries: Vec<_> = reader.entries().unwrap().collect();
        assert_eq!(entries.len(), 1);

        let entry = entries.into_iter().next().unwrap().unwrap();
        let header = entry.header();
        assert_eq!(
            header.path().unwrap().to_str(),
            Some("permissioned-nodes.json")
        );
        assert_eq!(header.size().unwrap(), 5);
        assert_eq!(header.mode().unwrap(), 0o644);
        assert!(header.entry_type().is_file());
    }

    #[test]
    fn unpack_returns_content() {
        let archive = pack_single_file("a.txt", "héllo".as_bytes()).unwrap();
        let content = unpack_single_file(&archive, "c1", "/data/a.txt").unwrap();
        assert_eq!(content, "héllo".as_bytes());
    }

    #[test]
    fn directory_entry_is_not_a_file() {
        let err = unpack_single_file(&dir_archive(), "c1", "/data/qdata").unwrap_err();
        assert!(matches!(err, OrchestratorError::NotAFile { .. }));
        assert!(err.is_precondition());
    }

    #[test]
    fn two_entries_are_rejected() {
        let mut builder = tar::Builder::new(Vec::new());
        for name in ["a", "b"] {
            let mut header = tar::Header::new_gnu();
            header.set_path(name).unwrap();
            header.set_size(1);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append(&header, &b"x"[..]).unwrap();
        }
        let archive = builder.into_inner().unwrap();
        let err = unpack_single_file(&archive, "c1", "/x").unwrap_err();
        assert!(matches!(err, OrchestratorError::Archive(_)));
    }

    #[test]
    fn empty_archive_is_rejected() {
        let archive = tar::Builder::new(Vec::new()).into_inner().unwrap();
        let err = unpack_single_file(&archive, "c1", "/x").unwrap_err();
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn long_entry_name_survives_unpack() {
        let name = format!("{}.json", "n".repeat(120));
        let archive = pack_single_file(&name, b"[]").unwrap();

        let mut reader = tar::Archive::new(archive.as_slice());
        let entry = reader.entries().unwrap().next().unwrap().unwrap();
        assert_eq!(entry.path().unwrap().to_str(), Some(name.as_str()));

        let path = format!("/data/{name}");
        let content = unpack_single_file(&archive, "c1", &path).unwrap();
        assert_eq!(content, b"[]");
    }

    #[test]
    fn path_like_names_are_rejected() {
        assert!(pack_single_file("dir/file", b"x").is_err());
        assert!(pack_single_file("", b"x").is_err());
    }
}
