//! Snapshot persistence: one JSON document, replaced wholesale.
//!
//! Every successful mutation rewrites the full snapshot. The write goes to a
//! temp file in the same directory, is flushed and synced, and is renamed
//! over the target, so a reader never observes a partially written document.
//! The snapshot is pretty-printed so the audit trail diffs line by line.

use crate::document::Document;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

/// Errors raised while writing a snapshot.
///
/// Reads have no error surface: any unreadable or unparsable snapshot loads
/// as the empty document (see [`load_or_default`]).
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("{path}: I/O error: {message}")]
    Io { path: String, message: String },

    #[error("serialization error: {0}")]
    Serialize(String),
}

impl SnapshotError {
    fn io(path: &Path, message: impl Into<String>) -> Self {
        Self::Io {
            path: path.display().to_string(),
            message: message.into(),
        }
    }
}

/// Load the snapshot at `path`, falling back to the empty document.
///
/// A missing file is the normal first-boot case. An unreadable or unparsable
/// file is treated the same way, by policy: the tracker restarts empty
/// rather than refusing to start. The log line is the only place the two
/// cases differ.
pub fn load_or_default(path: impl AsRef<Path>) -> Document {
    let path = path.as_ref();

    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no snapshot on disk, starting empty");
            return Document::default();
        }
        Err(err) => {
            warn!(path = %path.display(), %err, "snapshot unreadable, starting empty");
            return Document::default();
        }
    };

    match serde_json::from_slice(&bytes) {
        Ok(document) => document,
        Err(err) => {
            warn!(path = %path.display(), %err, "snapshot unparsable, starting empty");
            Document::default()
        }
    }
}

/// Write the full document to `path`, replacing any previous snapshot
/// atomically from the reader's perspective.
pub fn save_snapshot(path: impl AsRef<Path>, document: &Document) -> Result<(), SnapshotError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| SnapshotError::io(parent, e.to_string()))?;
    }

    let mut body = serde_json::to_vec_pretty(document)
        .map_err(|e| SnapshotError::Serialize(e.to_string()))?;
    body.push(b'\n');

    let tmp_path = tmp_write_path(path);
    let write_result = (|| -> Result<(), SnapshotError> {
        let mut file =
            File::create(&tmp_path).map_err(|e| SnapshotError::io(&tmp_path, e.to_string()))?;
        file.write_all(&body)
            .map_err(|e| SnapshotError::io(&tmp_path, e.to_string()))?;
        file.sync_all()
            .map_err(|e| SnapshotError::io(&tmp_path, e.to_string()))?;
        Ok(())
    })();

    if let Err(error) = write_result {
        let _ = fs::remove_file(&tmp_path);
        return Err(error);
    }

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        SnapshotError::io(path, format!("rename from {}: {e}", tmp_path.display()))
    })?;

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        let dir = File::open(parent).map_err(|e| SnapshotError::io(parent, e.to_string()))?;
        dir.sync_all()
            .map_err(|e| SnapshotError::io(parent, e.to_string()))?;
    }

    Ok(())
}

fn tmp_write_path(path: &Path) -> PathBuf {
    let unique = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let mut tmp: OsString = path.as_os_str().to_os_string();
    tmp.push(format!(".tmp.{}.{}", std::process::id(), unique));
    PathBuf::from(tmp)
}
