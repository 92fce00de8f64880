//! # skein-core
//!
//! State layer for the skein issue tracker.
//!
//! This crate provides:
//! - `Document`, `Issue`, and `Comment` (the root aggregate and its parts)
//! - the three mutation operations (create, status update, comment)
//! - snapshot read/write (one JSON document, replaced wholesale)
//!
//! It intentionally does not orchestrate sequencing, broadcasting, or the
//! audit trail. Those concerns live in `skein-server` and `skein-git`.
//!
//! ## Data model
//!
//! ```text
//! issues.json (on disk, one pretty-printed document)
//!     ↕  load / atomic replace
//! Document (exclusively owned by the mutation serializer)
//! ```

pub mod document;
pub mod snapshot;

pub use document::{Comment, DEFAULT_STATUS, Document, DocumentError, Issue, StatusChange};
pub use snapshot::{SnapshotError, load_or_default, save_snapshot};
