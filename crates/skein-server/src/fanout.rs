//! Broadcast fan-out: serialize once, deliver to every live session.

use crate::protocol::ServerEvent;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::error;

/// Events a slow session may fall behind before it is disconnected.
pub const DEFAULT_CAPACITY: usize = 256;

/// Fan-out channel for outcome events.
///
/// Delivery is best-effort, at most once per listener. A stalled or closed
/// listener never affects the publisher or any other listener. There is no
/// backlog: listeners that subscribe after an event was published catch up
/// through the snapshot read endpoint instead.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<Arc<str>>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Serialize `event` once and offer the line to every subscriber.
    /// Having no subscribers is not an error.
    pub fn publish(&self, event: &ServerEvent) {
        let json = match serde_json::to_string(event) {
            Ok(json) => json,
            Err(err) => {
                error!(%err, "event failed to serialize, not broadcast");
                return;
            }
        };
        let _ = self.tx.send(Arc::from(json.as_str()));
    }

    /// Subscribe to events published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<str>> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
