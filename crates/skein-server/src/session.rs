//! Connection session: decode inbound requests, forward outbound events.
//!
//! One task per connection. Inbound lines route to the mutation serializer;
//! outbound is the merge of this session's own error replies and the shared
//! fan-out. Every failure here is scoped to this one connection.

use crate::fanout::EventBus;
use crate::protocol::{self, ServerEvent};
use crate::serializer::SerializerHandle;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

/// Drive one channel session until the peer closes or falls behind.
///
/// `first_line` is the line the listener consumed while classifying the
/// connection; it is handled as the session's first request, after hello.
/// A blank announcement line is skipped, so listen-only clients can open a
/// session without issuing a mutation.
pub async fn run<R, W>(
    reader: R,
    mut writer: W,
    first_line: Option<String>,
    serializer: SerializerHandle,
    bus: EventBus,
) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut events = bus.subscribe();
    send_line(&mut writer, &ServerEvent::hello()).await?;

    if let Some(line) = first_line
        && !line.trim().is_empty()
        && let Some(reply) = handle_line(&line, &serializer).await
    {
        send_line(&mut writer, &reply).await?;
    }

    let mut lines = reader.lines();
    loop {
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    if let Some(reply) = handle_line(&line, &serializer).await {
                        send_line(&mut writer, &reply).await?;
                    }
                }
                // Peer closed its half; the session is over.
                None => return Ok(()),
            },
            event = events.recv() => match event {
                Ok(json) => {
                    writer.write_all(json.as_bytes()).await?;
                    writer.write_all(b"\n").await?;
                    writer.flush().await?;
                }
                Err(RecvError::Lagged(missed)) => {
                    warn!(missed, "session fell behind the fan-out, disconnecting");
                    return Ok(());
                }
                Err(RecvError::Closed) => return Ok(()),
            },
        }
    }
}

/// Decode one inbound line and route it. Returns the event owed to this
/// connection alone: parse errors and rejections. Accepted mutations answer
/// every listener through the fan-out instead.
async fn handle_line(line: &str, serializer: &SerializerHandle) -> Option<ServerEvent> {
    match protocol::parse_request(line) {
        Ok(request) => match serializer.apply(request.into()).await {
            Ok(_) => None,
            Err(rejection) => Some(ServerEvent::error(rejection.to_string())),
        },
        Err(err) => {
            debug!(%err, "rejected inbound line");
            Some(ServerEvent::error(err.to_string()))
        }
    }
}

async fn send_line<W>(writer: &mut W, event: &ServerEvent) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let json = serde_json::to_string(event).map_err(std::io::Error::other)?;
    writer.write_all(json.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await
}
