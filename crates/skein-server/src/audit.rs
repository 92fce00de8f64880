//! Audit sink: best-effort recorder of human-readable change history.
//!
//! The pipeline invokes the sink after every durable write, logs a failure,
//! and moves on — the audit trail is commentary, never a source of truth.

use skein_git::GitClient;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Opaque audit failure. Only ever logged; never propagated past the
/// durable writer.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct AuditError(String);

impl AuditError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Records one audit entry per persisted mutation.
///
/// `record` is called with the snapshot already durably written; an
/// implementation must not assume its entries are complete, and the caller
/// discards errors by policy after logging them.
pub trait AuditSink: Send + Sync {
    fn record(&self, message: &str, actor: &str) -> Result<(), AuditError>;
}

/// Sink used when no audit mechanism is available.
pub struct NullAuditSink;

impl AuditSink for NullAuditSink {
    fn record(&self, _message: &str, _actor: &str) -> Result<(), AuditError> {
        Ok(())
    }
}

/// Commits the snapshot file to the enclosing git repository, attributing
/// the mutation's actor as commit author.
pub struct GitAuditSink {
    client: GitClient,
    snapshot_path: PathBuf,
}

impl GitAuditSink {
    pub fn new(client: GitClient, snapshot_path: PathBuf) -> Self {
        Self {
            client,
            snapshot_path,
        }
    }
}

impl AuditSink for GitAuditSink {
    fn record(&self, message: &str, actor: &str) -> Result<(), AuditError> {
        self.client
            .commit_file(&self.snapshot_path, message, actor)
            .map_err(|err| AuditError::new(err.to_string()))
    }
}

/// Pick the best available sink for the snapshot at `data_path`.
///
/// Absence of git, or of a repository around `repo_hint`, is a normal
/// detected condition: it is logged once and the tracker runs with the null
/// sink.
pub fn detect_sink(repo_hint: &Path, data_path: &Path) -> Arc<dyn AuditSink> {
    if !GitClient::is_available() {
        info!("git not found in PATH; audit trail disabled");
        return Arc::new(NullAuditSink);
    }

    match GitClient::discover(repo_hint) {
        Ok(client) => {
            info!(repo = %client.repo_root().display(), "audit trail enabled");
            Arc::new(GitAuditSink::new(client, data_path.to_path_buf()))
        }
        Err(err) => {
            info!(%err, "no repository for audit trail; disabled");
            Arc::new(NullAuditSink)
        }
    }
}
