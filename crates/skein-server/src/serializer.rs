//! Mutation serializer: the single sequence point for every mutation.
//!
//! One dedicated worker thread exclusively owns the Document. Requests
//! arrive over an mpsc queue and are processed strictly in arrival order;
//! the full validate → apply → persist → audit span completes before the
//! next request is taken, so two creates can never allocate the same id and
//! an update can never read a snapshot made stale by an interleaved write.
//! Snapshot reads travel through the same queue and therefore never observe
//! a partially applied Document.

use crate::fanout::EventBus;
use crate::protocol::{ClientRequest, EventMeta, ServerEvent};
use crate::writer::DurableWriter;
use chrono::Utc;
use skein_core::{Comment, Document, DocumentError, Issue};
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info};

/// Maximum characters of comment text quoted in a commit description.
const COMMIT_COMMENT_PREVIEW: usize = 80;

/// One of the three ways the Document changes.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    Create {
        title: String,
        description: String,
        by: String,
    },
    UpdateStatus {
        id: u64,
        status: String,
        by: String,
    },
    AddComment {
        id: u64,
        text: String,
        by: String,
    },
}

impl From<ClientRequest> for Mutation {
    fn from(request: ClientRequest) -> Self {
        match request {
            ClientRequest::Add(p) => Self::Create {
                title: p.title,
                description: p.description,
                by: p.by,
            },
            ClientRequest::Update(p) => Self::UpdateStatus {
                id: p.id,
                status: p.status,
                by: p.by,
            },
            ClientRequest::Comment(p) => Self::AddComment {
                id: p.id,
                text: p.text,
                by: p.by,
            },
        }
    }
}

/// The broadcastable result of an accepted mutation.
#[derive(Debug, Clone)]
pub enum Outcome {
    IssueAdded {
        issue: Issue,
        commit_message: String,
    },
    IssueUpdated {
        issue: Issue,
        commit_message: String,
    },
    CommentAdded {
        id: u64,
        comment: Comment,
        commit_message: String,
    },
}

impl Outcome {
    /// The human-readable description recorded in the audit trail.
    pub fn commit_message(&self) -> &str {
        match self {
            Self::IssueAdded { commit_message, .. }
            | Self::IssueUpdated { commit_message, .. }
            | Self::CommentAdded { commit_message, .. } => commit_message,
        }
    }
}

impl From<&Outcome> for ServerEvent {
    fn from(outcome: &Outcome) -> Self {
        match outcome {
            Outcome::IssueAdded {
                issue,
                commit_message,
            } => Self::IssueAdded {
                issue: issue.clone(),
                meta: EventMeta {
                    commit_message: commit_message.clone(),
                },
            },
            Outcome::IssueUpdated {
                issue,
                commit_message,
            } => Self::IssueUpdated {
                issue: issue.clone(),
                meta: EventMeta {
                    commit_message: commit_message.clone(),
                },
            },
            Outcome::CommentAdded {
                id,
                comment,
                commit_message,
            } => Self::CommentAdded {
                id: *id,
                comment: comment.clone(),
                meta: EventMeta {
                    commit_message: commit_message.clone(),
                },
            },
        }
    }
}

/// A mutation-path error scoped to the originating connection.
/// `Display` is the exact wire message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("Issue {0} not found")]
    NotFound(u64),

    /// The durable write failed or the worker is gone; details are in the
    /// server log, the client only learns that its mutation was lost.
    #[error("server error")]
    Internal,
}

enum Job {
    Mutate {
        mutation: Mutation,
        reply: oneshot::Sender<Result<Outcome, Rejection>>,
    },
    Read {
        reply: oneshot::Sender<Document>,
    },
}

/// Clonable handle submitting work to the serializer queue.
#[derive(Clone)]
pub struct SerializerHandle {
    tx: mpsc::UnboundedSender<Job>,
}

impl SerializerHandle {
    /// Queue one mutation and wait for its outcome.
    ///
    /// Not cancellable once queued: the request either completes and is
    /// answered, or is lost with the process.
    pub async fn apply(&self, mutation: Mutation) -> Result<Outcome, Rejection> {
        let (reply, rx) = oneshot::channel();
        if self.tx.send(Job::Mutate { mutation, reply }).is_err() {
            return Err(Rejection::Internal);
        }
        rx.await.map_err(|_| Rejection::Internal)?
    }

    /// Read the current Document through the queue.
    pub async fn snapshot(&self) -> Result<Document, Rejection> {
        let (reply, rx) = oneshot::channel();
        if self.tx.send(Job::Read { reply }).is_err() {
            return Err(Rejection::Internal);
        }
        rx.await.map_err(|_| Rejection::Internal)
    }
}

/// Spawn the worker thread that exclusively owns `document`.
///
/// The worker is a plain thread rather than a task: the persist and audit
/// steps are blocking filesystem and subprocess work, and by contract
/// everything queued behind a mutation must wait for them anyway.
pub fn spawn(
    document: Document,
    writer: DurableWriter,
    bus: EventBus,
) -> std::io::Result<SerializerHandle> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::Builder::new()
        .name("skein-serializer".to_string())
        .spawn(move || worker(document, writer, bus, rx))?;
    Ok(SerializerHandle { tx })
}

fn worker(
    mut document: Document,
    writer: DurableWriter,
    bus: EventBus,
    mut rx: mpsc::UnboundedReceiver<Job>,
) {
    info!(
        issues = document.issues.len(),
        last_id = document.last_id,
        "mutation serializer started"
    );

    while let Some(job) = rx.blocking_recv() {
        match job {
            Job::Read { reply } => {
                let _ = reply.send(document.clone());
            }
            Job::Mutate { mutation, reply } => {
                let result = apply_one(&mut document, &writer, &bus, mutation);
                let _ = reply.send(result);
            }
        }
    }
}

/// Run one mutation to completion: validate and apply on a candidate clone,
/// persist, then adopt the candidate and broadcast. A rejection or persist
/// failure leaves the owned Document exactly as it was.
fn apply_one(
    document: &mut Document,
    writer: &DurableWriter,
    bus: &EventBus,
    mutation: Mutation,
) -> Result<Outcome, Rejection> {
    let now = Utc::now();
    let mut candidate = document.clone();

    let (outcome, actor) = match mutation {
        Mutation::Create {
            title,
            description,
            by,
        } => {
            let issue = candidate.create_issue(&title, &description, &by, now);
            let commit_message =
                format!("Issue #{} created by {}: {}", issue.id, by, issue.title);
            (
                Outcome::IssueAdded {
                    issue,
                    commit_message,
                },
                by,
            )
        }
        Mutation::UpdateStatus { id, status, by } => {
            let (issue, change) = candidate
                .update_status(id, &status, now)
                .map_err(reject)?;
            let commit_message = format!(
                "Issue #{id} status changed from {} to {} by {by}",
                change.from, change.to
            );
            (
                Outcome::IssueUpdated {
                    issue,
                    commit_message,
                },
                by,
            )
        }
        Mutation::AddComment { id, text, by } => {
            let comment = candidate.add_comment(id, &text, &by, now).map_err(reject)?;
            let commit_message =
                format!("Comment on Issue #{id} by {by}: {}", preview(&comment.text));
            (
                Outcome::CommentAdded {
                    id,
                    comment,
                    commit_message,
                },
                by,
            )
        }
    };

    if let Err(err) = writer.persist(&candidate, outcome.commit_message(), &actor) {
        error!(%err, "durable write failed, mutation dropped");
        return Err(Rejection::Internal);
    }

    *document = candidate;
    bus.publish(&ServerEvent::from(&outcome));
    Ok(outcome)
}

fn reject(err: DocumentError) -> Rejection {
    match err {
        DocumentError::IssueNotFound(id) => Rejection::NotFound(id),
    }
}

fn preview(text: &str) -> String {
    text.chars().take(COMMIT_COMMENT_PREVIEW).collect()
}
