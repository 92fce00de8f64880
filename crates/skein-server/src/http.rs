//! Read-only snapshot endpoint, served over minimal HTTP/1.1.
//!
//! One-shot: parse the request line the listener already consumed, answer,
//! close. New channel clients use this to catch up, since the fan-out keeps
//! no backlog. No pagination, no filtering.

use crate::serializer::SerializerHandle;
use serde_json::{Value, json};
use tokio::io::{AsyncWrite, AsyncWriteExt};

#[derive(Debug, Clone, PartialEq, Eq)]
struct HttpResponse {
    status: u16,
    body: Value,
}

/// Answer one HTTP request line and return; the caller closes the stream.
pub async fn handle<W>(
    writer: &mut W,
    request_line: &str,
    serializer: &SerializerHandle,
) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let response = respond(request_line, serializer).await;
    write_json_response(writer, response).await
}

async fn respond(request_line: &str, serializer: &SerializerHandle) -> HttpResponse {
    let (method, target) = match parse_request_line(request_line) {
        Ok(parts) => parts,
        Err(message) => {
            return HttpResponse {
                status: 400,
                body: json!({ "error": message }),
            };
        }
    };

    if method != "GET" {
        return HttpResponse {
            status: 405,
            body: json!({ "error": "method not allowed; use GET" }),
        };
    }

    if !is_snapshot_path(target) {
        return HttpResponse {
            status: 404,
            body: json!({ "error": format!("unknown route: {target}") }),
        };
    }

    match serializer.snapshot().await {
        Ok(document) => match serde_json::to_value(&document) {
            Ok(body) => HttpResponse { status: 200, body },
            Err(err) => HttpResponse {
                status: 500,
                body: json!({ "error": format!("snapshot failed to serialize: {err}") }),
            },
        },
        Err(err) => HttpResponse {
            status: 500,
            body: json!({ "error": err.to_string() }),
        },
    }
}

fn parse_request_line(line: &str) -> Result<(&str, &str), String> {
    let mut parts = line.split_whitespace();
    let method = parts.next().ok_or_else(|| "missing method".to_string())?;
    let target = parts.next().ok_or_else(|| "missing target".to_string())?;
    Ok((method, target))
}

fn is_snapshot_path(target: &str) -> bool {
    let path = target.split_once('?').map_or(target, |(path, _)| path);
    matches!(path, "/" | "/issues")
}

async fn write_json_response<W>(writer: &mut W, response: HttpResponse) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let body = serde_json::to_vec_pretty(&response.body).map_err(std::io::Error::other)?;
    let header = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nAccess-Control-Allow-Origin: *\r\nAccess-Control-Allow-Methods: GET\r\nConnection: close\r\n\r\n",
        response.status,
        reason_phrase(response.status),
        body.len()
    );
    writer.write_all(header.as_bytes()).await?;
    writer.write_all(&body).await?;
    writer.flush().await
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        405 => "Method Not Allowed",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::NullAuditSink;
    use crate::fanout::EventBus;
    use crate::serializer::{self, Mutation};
    use crate::writer::DurableWriter;
    use skein_core::Document;
    use std::sync::Arc;

    fn pipeline(dir: &tempfile::TempDir) -> SerializerHandle {
        let writer = DurableWriter::new(dir.path().join("issues.json"), Arc::new(NullAuditSink));
        serializer::spawn(Document::default(), writer, EventBus::default())
            .expect("serializer thread should spawn")
    }

    async fn request(serializer: &SerializerHandle, line: &str) -> (String, Value) {
        let mut out: Vec<u8> = Vec::new();
        handle(&mut out, line, serializer)
            .await
            .expect("handler should write a response");
        let raw = String::from_utf8(out).expect("response should be utf-8");
        let (head, body) = raw
            .split_once("\r\n\r\n")
            .expect("response should have a header/body split");
        let status_line = head.lines().next().expect("status line").to_string();
        let body: Value = serde_json::from_str(body).expect("body should be json");
        (status_line, body)
    }

    #[tokio::test]
    async fn get_serves_the_full_snapshot() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let serializer = pipeline(&dir);
        serializer
            .apply(Mutation::Create {
                title: "Bug A".to_string(),
                description: String::new(),
                by: "alice".to_string(),
            })
            .await
            .expect("create should succeed");

        for target in ["GET / HTTP/1.1", "GET /issues HTTP/1.1"] {
            let (status, body) = request(&serializer, target).await;
            assert_eq!(status, "HTTP/1.1 200 OK");
            assert_eq!(body["lastId"], 1);
            assert_eq!(body["issues"][0]["title"], "Bug A");
        }
    }

    #[tokio::test]
    async fn read_endpoint_is_idempotent() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let serializer = pipeline(&dir);
        serializer
            .apply(Mutation::Create {
                title: "Bug A".to_string(),
                description: String::new(),
                by: "alice".to_string(),
            })
            .await
            .expect("create should succeed");

        let (_, first) = request(&serializer, "GET /issues HTTP/1.1").await;
        let (_, second) = request(&serializer, "GET /issues HTTP/1.1").await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn unknown_route_is_404() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let serializer = pipeline(&dir);
        let (status, body) = request(&serializer, "GET /nope HTTP/1.1").await;
        assert_eq!(status, "HTTP/1.1 404 Not Found");
        assert_eq!(body["error"], "unknown route: /nope");
    }

    #[tokio::test]
    async fn non_get_is_405() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let serializer = pipeline(&dir);
        let (status, _) = request(&serializer, "POST /issues HTTP/1.1").await;
        assert_eq!(status, "HTTP/1.1 405 Method Not Allowed");
    }

    #[test]
    fn snapshot_paths_ignore_query_strings() {
        assert!(is_snapshot_path("/"));
        assert!(is_snapshot_path("/issues"));
        assert!(is_snapshot_path("/issues?pretty=1"));
        assert!(!is_snapshot_path("/issues/1"));
    }
}
