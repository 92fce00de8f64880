//! Document model: the single root aggregate and its mutation operations.
//!
//! The `Document` is owned exclusively by the mutation serializer; everything
//! else only ever sees a snapshot clone. All three mutations funnel through
//! the methods here, so `last_id` can never fall behind an allocated issue id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status assigned to every freshly created issue.
pub const DEFAULT_STATUS: &str = "Open";

/// Placeholder title used when a create request carries an empty title.
const UNTITLED: &str = "Untitled";

/// Errors raised by document mutations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DocumentError {
    #[error("Issue {0} not found")]
    IssueNotFound(u64),
}

/// The root aggregate: id counter plus every issue in insertion order.
///
/// `last_id` is monotone and never reused; it is always >= the largest id
/// present in `issues`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    #[serde(default)]
    pub last_id: u64,
    #[serde(default)]
    pub issues: Vec<Issue>,
}

/// A trackable work item.
///
/// `id`, `title`, `description`, `created_by`, and `created_at` are fixed at
/// creation; only `status`, `updated_at`, and `comments` ever change. Status
/// is a permissive free string (no transition graph is enforced).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default)]
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub comments: Vec<Comment>,
}

/// One comment line. Immutable once appended; there is no edit or delete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub text: String,
    pub by: String,
    pub at: DateTime<Utc>,
}

/// The statuses on either side of a status update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub from: String,
    pub to: String,
}

fn default_status() -> String {
    DEFAULT_STATUS.to_string()
}

impl Document {
    /// Lookup one issue by id.
    pub fn issue(&self, id: u64) -> Option<&Issue> {
        self.issues.iter().find(|issue| issue.id == id)
    }

    fn issue_mut(&mut self, id: u64) -> Option<&mut Issue> {
        self.issues.iter_mut().find(|issue| issue.id == id)
    }

    /// Append a new issue and return a snapshot of it.
    ///
    /// Allocates `id = last_id + 1` and advances `last_id`. An empty or
    /// whitespace title becomes the literal `"Untitled"`. Never fails.
    pub fn create_issue(
        &mut self,
        title: &str,
        description: &str,
        by: &str,
        at: DateTime<Utc>,
    ) -> Issue {
        let id = self.last_id + 1;
        let title = if title.trim().is_empty() {
            UNTITLED.to_string()
        } else {
            title.to_string()
        };

        let issue = Issue {
            id,
            title,
            description: description.to_string(),
            status: DEFAULT_STATUS.to_string(),
            created_by: by.to_string(),
            created_at: at,
            updated_at: None,
            comments: Vec::new(),
        };

        self.last_id = id;
        self.issues.push(issue.clone());
        issue
    }

    /// Replace the status of an existing issue.
    ///
    /// Any status string is accepted as-is; there is no allowed-transition
    /// set. Returns the updated issue snapshot and the old/new pair.
    pub fn update_status(
        &mut self,
        id: u64,
        status: &str,
        at: DateTime<Utc>,
    ) -> Result<(Issue, StatusChange), DocumentError> {
        let issue = self
            .issue_mut(id)
            .ok_or(DocumentError::IssueNotFound(id))?;

        let change = StatusChange {
            from: std::mem::replace(&mut issue.status, status.to_string()),
            to: status.to_string(),
        };
        issue.updated_at = Some(at);
        Ok((issue.clone(), change))
    }

    /// Append a comment to an existing issue.
    ///
    /// Sets the issue's `updated_at` to the comment timestamp. Everything
    /// else on the issue is untouched.
    pub fn add_comment(
        &mut self,
        id: u64,
        text: &str,
        by: &str,
        at: DateTime<Utc>,
    ) -> Result<Comment, DocumentError> {
        let issue = self
            .issue_mut(id)
            .ok_or(DocumentError::IssueNotFound(id))?;

        let comment = Comment {
            text: text.to_string(),
            by: by.to_string(),
            at,
        };
        issue.comments.push(comment.clone());
        issue.updated_at = Some(at);
        Ok(comment)
    }
}
