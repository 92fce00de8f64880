//! Wire protocol: the JSON lines exchanged with channel clients.
//!
//! A session opens with the client's first line (the transport's connection
//! announcement — a lone blank line is fine for listen-only clients); the
//! server's first message is always `hello`. Accepted mutations are answered
//! through the fan-out, so every client, the originator included, sees the
//! same `issue_added` / `issue_updated` / `comment_added` stream. Errors go
//! to the originating connection only.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use skein_core::{Comment, Issue};

/// Payload of an `add` request. Missing fields default to empty; an empty
/// title is replaced with `"Untitled"` downstream.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AddPayload {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub by: String,
}

/// Payload of an `update` request. Any status string is accepted.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UpdatePayload {
    pub id: u64,
    pub status: String,
    #[serde(default)]
    pub by: String,
}

/// Payload of a `comment` request.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CommentPayload {
    pub id: u64,
    pub text: String,
    #[serde(default)]
    pub by: String,
}

/// A decoded inbound mutation request.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientRequest {
    Add(AddPayload),
    Update(UpdatePayload),
    Comment(CommentPayload),
}

/// Why an inbound line was turned away. `Display` is the exact wire message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// Not JSON at all, or a payload that does not match the expected
    /// structure.
    #[error("invalid json")]
    Malformed,

    /// Well-formed JSON whose `type` names no known request.
    #[error("unknown message type")]
    UnknownType,
}

/// Decode one inbound line.
pub fn parse_request(line: &str) -> Result<ClientRequest, ParseError> {
    let value: Value = serde_json::from_str(line).map_err(|_| ParseError::Malformed)?;
    let kind = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or(ParseError::Malformed)?;
    let payload = value.get("payload").cloned().unwrap_or(Value::Null);

    match kind {
        "add" => serde_json::from_value(payload)
            .map(ClientRequest::Add)
            .map_err(|_| ParseError::Malformed),
        "update" => serde_json::from_value(payload)
            .map(ClientRequest::Update)
            .map_err(|_| ParseError::Malformed),
        "comment" => serde_json::from_value(payload)
            .map(ClientRequest::Comment)
            .map_err(|_| ParseError::Malformed),
        _ => Err(ParseError::UnknownType),
    }
}

/// Commit metadata attached to every broadcast outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventMeta {
    #[serde(rename = "commitMessage")]
    pub commit_message: String,
}

/// An outbound line: the greeting, the three outcome events, or an error
/// scoped to one connection.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    Hello {
        message: String,
    },
    IssueAdded {
        issue: Issue,
        meta: EventMeta,
    },
    IssueUpdated {
        issue: Issue,
        meta: EventMeta,
    },
    CommentAdded {
        id: u64,
        comment: Comment,
        meta: EventMeta,
    },
    Error {
        message: String,
    },
}

impl ServerEvent {
    /// The greeting sent as a session's first outbound line.
    pub fn hello() -> Self {
        Self::Hello {
            message: "connected".to_string(),
        }
    }

    /// An error line for the originating connection only.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    #[test]
    fn parse_add_request() {
        let request = parse_request(
            r#"{"type":"add","payload":{"title":"Bug A","description":"repro steps","by":"alice"}}"#,
        )
        .expect("add should parse");
        assert_eq!(
            request,
            ClientRequest::Add(AddPayload {
                title: "Bug A".to_string(),
                description: "repro steps".to_string(),
                by: "alice".to_string(),
            })
        );
    }

    #[test]
    fn parse_add_defaults_missing_fields() {
        let request =
            parse_request(r#"{"type":"add","payload":{}}"#).expect("empty payload should parse");
        assert_eq!(
            request,
            ClientRequest::Add(AddPayload {
                title: String::new(),
                description: String::new(),
                by: String::new(),
            })
        );
    }

    #[test]
    fn parse_update_request() {
        let request =
            parse_request(r#"{"type":"update","payload":{"id":1,"status":"In Progress","by":"bob"}}"#)
                .expect("update should parse");
        assert_eq!(
            request,
            ClientRequest::Update(UpdatePayload {
                id: 1,
                status: "In Progress".to_string(),
                by: "bob".to_string(),
            })
        );
    }

    #[test]
    fn parse_comment_request() {
        let request = parse_request(
            r#"{"type":"comment","payload":{"id":1,"text":"looking into it","by":"carol"}}"#,
        )
        .expect("comment should parse");
        assert_eq!(
            request,
            ClientRequest::Comment(CommentPayload {
                id: 1,
                text: "looking into it".to_string(),
                by: "carol".to_string(),
            })
        );
    }

    #[test]
    fn unknown_type_is_distinguished_from_bad_json() {
        let err = parse_request(r#"{"type":"destroy","payload":{}}"#)
            .expect_err("unknown type must be rejected");
        assert_eq!(err, ParseError::UnknownType);
        assert_eq!(err.to_string(), "unknown message type");

        let err = parse_request("not json at all").expect_err("non-json must be rejected");
        assert_eq!(err, ParseError::Malformed);
        assert_eq!(err.to_string(), "invalid json");
    }

    #[test]
    fn missing_or_mistyped_payload_is_malformed() {
        let err = parse_request(r#"{"type":"update"}"#).expect_err("missing payload");
        assert_eq!(err, ParseError::Malformed);

        let err = parse_request(r#"{"type":"update","payload":{"status":"Closed"}}"#)
            .expect_err("missing id");
        assert_eq!(err, ParseError::Malformed);

        let err = parse_request(r#"{"payload":{"id":1}}"#).expect_err("missing type");
        assert_eq!(err, ParseError::Malformed);
    }

    #[test]
    fn hello_serializes_to_documented_shape() {
        let json = serde_json::to_value(ServerEvent::hello()).expect("hello should serialize");
        assert_eq!(
            json,
            serde_json::json!({"type": "hello", "message": "connected"})
        );
    }

    #[test]
    fn issue_added_serializes_with_commit_meta() {
        let at = DateTime::from_timestamp(1, 0).expect("timestamp should be in range");
        let issue = Issue {
            id: 1,
            title: "Bug A".to_string(),
            description: String::new(),
            status: "Open".to_string(),
            created_by: "alice".to_string(),
            created_at: at,
            updated_at: None,
            comments: Vec::new(),
        };
        let event = ServerEvent::IssueAdded {
            issue,
            meta: EventMeta {
                commit_message: "Issue #1 created by alice: Bug A".to_string(),
            },
        };

        let json = serde_json::to_value(&event).expect("event should serialize");
        assert_eq!(json["type"], "issue_added");
        assert_eq!(json["issue"]["id"], 1);
        assert_eq!(json["issue"]["createdBy"], "alice");
        assert_eq!(
            json["meta"]["commitMessage"],
            "Issue #1 created by alice: Bug A"
        );
    }

    #[test]
    fn comment_added_carries_issue_id_and_comment() {
        let at = DateTime::from_timestamp(2, 0).expect("timestamp should be in range");
        let event = ServerEvent::CommentAdded {
            id: 1,
            comment: Comment {
                text: "looking into it".to_string(),
                by: "carol".to_string(),
                at,
            },
            meta: EventMeta {
                commit_message: "Comment on Issue #1 by carol: looking into it".to_string(),
            },
        };

        let json = serde_json::to_value(&event).expect("event should serialize");
        assert_eq!(json["type"], "comment_added");
        assert_eq!(json["id"], 1);
        assert_eq!(json["comment"]["by"], "carol");
        assert_eq!(json["comment"]["text"], "looking into it");
    }

    #[test]
    fn error_event_serializes_message_only() {
        let json = serde_json::to_value(ServerEvent::error("Issue 99 not found"))
            .expect("error should serialize");
        assert_eq!(
            json,
            serde_json::json!({"type": "error", "message": "Issue 99 not found"})
        );
    }
}
