//! Content store — staged files under the uploads directory.
//!
//! Each staged file is written as `<file_id>-<original_name>`, where the
//! file id is `<unix_ms>-<random>`. Downloads resolve ids by prefix, so a
//! truncated id from a download URL still finds its file.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use parley_core::message::new_file_id;
use parley_core::{now_ms, NodeError};

/// A file placed in the store, ready to be described to peers.
#[derive(Debug, Clone)]
pub struct StagedFile {
    pub file_id: String,
    pub original_name: String,
    pub size: u64,
    pub upload_time: u64,
    pub path: PathBuf,
}

/// Staged upload directory. Bytes are retained until removed externally.
#[derive(Clone)]
pub struct ContentStore {
    root: PathBuf,
}

impl ContentStore {
    pub fn new(root: PathBuf) -> Result<Self, NodeError> {
        std::fs::create_dir_all(&root).map_err(|e| NodeError::storage(&root, e))?;
        Ok(Self { root })
    }

    /// Copy a local file into the store under a fresh id.
    pub fn stage(&self, source: &Path) -> Result<StagedFile, NodeError> {
        let original_name = file_name_of(source)?;
        let file_id = new_file_id();
        let dest = self.root.join(format!("{file_id}-{original_name}"));

        let size = std::fs::copy(source, &dest).map_err(|e| NodeError::storage(source, e))?;
        tracing::debug!(file_id = %file_id, name = %original_name, size, "file staged");

        Ok(StagedFile {
            file_id,
            original_name,
            size,
            upload_time: now_ms(),
            path: dest,
        })
    }

    /// Write received bytes into the store under a fresh id.
    pub fn stage_bytes(&self, original_name: &str, bytes: Bytes) -> Result<StagedFile, NodeError> {
        let original_name = sanitize_name(original_name);
        let file_id = new_file_id();
        let dest = self.root.join(format!("{file_id}-{original_name}"));

        std::fs::write(&dest, &bytes).map_err(|e| NodeError::storage(&dest, e))?;
        tracing::debug!(file_id = %file_id, name = %original_name, size = bytes.len(), "bytes staged");

        Ok(StagedFile {
            file_id,
            original_name,
            size: bytes.len() as u64,
            upload_time: now_ms(),
            path: dest,
        })
    }

    /// Find a staged file whose id starts with `file_id`. Returns the
    /// path and the original name.
    pub fn resolve(&self, file_id: &str) -> Result<(PathBuf, String), NodeError> {
        if file_id.is_empty() {
            return Err(NodeError::FileNotFound(file_id.to_string()));
        }
        let entries =
            std::fs::read_dir(&self.root).map_err(|e| NodeError::storage(&self.root, e))?;
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.starts_with(file_id) {
                continue;
            }
            // stored as "<ms>-<random>-<original_name>"
            let mut parts = name.splitn(3, '-');
            let (Some(_), Some(_), Some(original)) = (parts.next(), parts.next(), parts.next())
            else {
                continue;
            };
            return Ok((entry.path(), original.to_string()));
        }
        Err(NodeError::FileNotFound(file_id.to_string()))
    }
}

fn file_name_of(path: &Path) -> Result<String, NodeError> {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| {
            NodeError::storage(
                path,
                std::io::Error::new(std::io::ErrorKind::InvalidInput, "path has no file name"),
            )
        })
}

/// Keep only the final path component of an untrusted upload name.
fn sanitize_name(name: &str) -> String {
    let trimmed = name.rsplit(['/', '\\']).next().unwrap_or(name);
    if trimmed.is_empty() {
        "upload".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store(tag: &str) -> (ContentStore, PathBuf) {
        let dir = std::env::temp_dir().join(format!("parley-content-{tag}-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        (ContentStore::new(dir.clone()).unwrap(), dir)
    }

    #[test]
    fn stage_and_resolve_by_prefix() {
        let (store, dir) = temp_store("stage");
        let source = dir.join("notes.txt");
        std::fs::write(&source, b"hello world").unwrap();

        let staged = store.stage(&source).unwrap();
        assert_eq!(staged.original_name, "notes.txt");
        assert_eq!(staged.size, 11);

        // full id and a strict prefix both resolve
        let (path, name) = store.resolve(&staged.file_id).unwrap();
        assert_eq!(name, "notes.txt");
        assert_eq!(std::fs::read(path).unwrap(), b"hello world");

        let prefix = &staged.file_id[..staged.file_id.len() - 2];
        assert!(store.resolve(prefix).is_ok());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn stage_bytes_sanitizes_name() {
        let (store, dir) = temp_store("bytes");

        let staged = store
            .stage_bytes("../../etc/passwd", Bytes::from_static(b"x"))
            .unwrap();
        assert_eq!(staged.original_name, "passwd");
        assert!(staged.path.starts_with(&dir));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn resolve_unknown_id_is_not_found() {
        let (store, dir) = temp_store("missing");
        assert!(matches!(
            store.resolve("1700000000000-42"),
            Err(NodeError::FileNotFound(_))
        ));
        assert!(matches!(store.resolve(""), Err(NodeError::FileNotFound(_))));
        let _ = std::fs::remove_dir_all(&dir);
    }
}
