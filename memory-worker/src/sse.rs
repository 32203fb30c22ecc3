//! The SSE hub (§4.7): a broadcast channel every `/events` connection
//! subscribes to. A slow or dead client is dropped rather than allowed to
//! stall the broadcast, matching `broadcast::Sender`'s own lagged-receiver
//! semantics — a client that falls behind sees `RecvError::Lagged` and we
//! just resume from the next event rather than buffering unboundedly.

use memory_core::model::{Observation, Summary};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 256;

/// One fan-out event, tagged the way the ingest/summary/session pipelines
/// emit them (§4.7: `observation-created`, `summary-created`,
/// `session-completed`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum HubEvent {
    ObservationCreated(Observation),
    SummaryCreated(Summary),
    SessionCompleted { session_id: i64, project: String },
}

impl HubEvent {
    /// The SSE `event:` field name for this variant.
    #[must_use]
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::ObservationCreated(_) => "observation-created",
            Self::SummaryCreated(_) => "summary-created",
            Self::SessionCompleted { .. } => "session-completed",
        }
    }
}

/// Shared broadcast hub. Cheap to clone: the sender is reference-counted.
#[derive(Clone)]
pub struct Hub {
    tx: broadcast::Sender<HubEvent>,
}

impl Hub {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Subscribe a new SSE client.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<HubEvent> {
        self.tx.subscribe()
    }

    /// Publish an event to every current subscriber. Non-blocking: a
    /// `SendError` only occurs when there are zero subscribers, which is
    /// not an error for a fire-and-forget fan-out.
    pub fn publish(&self, event: HubEvent) {
        let _ = self.tx.send(event);
    }

    /// Number of currently connected clients, for `/health`.
    #[must_use]
    pub fn connected_clients(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let hub = Hub::new();
        let mut rx = hub.subscribe();
        hub.publish(HubEvent::SessionCompleted { session_id: 1, project: "demo".to_string() });
        let event = rx.recv().await.unwrap();
        assert_eq!(event.event_name(), "session-completed");
    }

    #[tokio::test]
    async fn connected_clients_reflects_active_subscriptions() {
        let hub = Hub::new();
        assert_eq!(hub.connected_clients(), 0);
        let _rx = hub.subscribe();
        assert_eq!(hub.connected_clients(), 1);
    }
}
