//! Durable writer: full-snapshot persistence plus the audit side effect.

use crate::audit::AuditSink;
use skein_core::{Document, SnapshotError, save_snapshot};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::warn;

/// Writes the whole Document per accepted mutation, then notifies the audit
/// sink. At-most-one write is ever in flight: the mutation serializer is the
/// only caller and it is strictly sequential.
pub struct DurableWriter {
    path: PathBuf,
    sink: Arc<dyn AuditSink>,
}

impl DurableWriter {
    pub fn new(path: PathBuf, sink: Arc<dyn AuditSink>) -> Self {
        Self { path, sink }
    }

    /// Snapshot file this writer owns.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persist `document`, then record the audit entry.
    ///
    /// The snapshot write is mandatory — its failure is the caller's
    /// failure. The audit record operates on what was just written and is
    /// best-effort: a failure is logged and swallowed, and never rolls the
    /// write back.
    pub fn persist(
        &self,
        document: &Document,
        message: &str,
        actor: &str,
    ) -> Result<(), SnapshotError> {
        save_snapshot(&self.path, document)?;

        if let Err(err) = self.sink.record(message, actor) {
            warn!(%err, "audit sink failed; snapshot already durable");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::{AuditError, NullAuditSink};
    use std::sync::Mutex;

    struct RecordingSink {
        entries: Mutex<Vec<(String, String)>>,
        fail: bool,
    }

    impl RecordingSink {
        fn new(fail: bool) -> Self {
            Self {
                entries: Mutex::new(Vec::new()),
                fail,
            }
        }
    }

    impl AuditSink for RecordingSink {
        fn record(&self, message: &str, actor: &str) -> Result<(), AuditError> {
            self.entries
                .lock()
                .expect("sink lock should not be poisoned")
                .push((message.to_string(), actor.to_string()));
            if self.fail {
                Err(AuditError::new("sink unavailable"))
            } else {
                Ok(())
            }
        }
    }

    #[test]
    fn persist_writes_snapshot_then_records_audit() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let path = dir.path().join("issues.json");
        let sink = Arc::new(RecordingSink::new(false));
        let writer = DurableWriter::new(path.clone(), sink.clone());

        writer
            .persist(&Document::default(), "Issue #1 created by alice: Bug A", "alice")
            .expect("persist should succeed");

        assert!(path.exists());
        let entries = sink
            .entries
            .lock()
            .expect("sink lock should not be poisoned");
        assert_eq!(
            entries.as_slice(),
            [(
                "Issue #1 created by alice: Bug A".to_string(),
                "alice".to_string()
            )]
        );
    }

    #[test]
    fn audit_failure_does_not_fail_persist() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let path = dir.path().join("issues.json");
        let writer = DurableWriter::new(path.clone(), Arc::new(RecordingSink::new(true)));

        writer
            .persist(&Document::default(), "msg", "alice")
            .expect("audit failure must not surface");
        assert!(path.exists());
    }

    #[test]
    fn snapshot_failure_skips_the_audit_sink() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        // A file where the parent directory should be makes the write fail.
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"").expect("fixture should write");
        let path = blocker.join("issues.json");

        let sink = Arc::new(RecordingSink::new(false));
        let writer = DurableWriter::new(path, sink.clone());

        writer
            .persist(&Document::default(), "msg", "alice")
            .expect_err("write under a file must fail");
        assert!(
            sink.entries
                .lock()
                .expect("sink lock should not be poisoned")
                .is_empty()
        );
    }

    #[test]
    fn null_sink_persists_quietly() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let path = dir.path().join("issues.json");
        let writer = DurableWriter::new(path.clone(), Arc::new(NullAuditSink));
        writer
            .persist(&Document::default(), "msg", "alice")
            .expect("persist should succeed");
        assert!(path.exists());
    }
}
