//! `GET /events` — a typed SSE stream over the [`crate::sse::Hub`] broadcast
//! channel.
//!
//! The obvious shape for this is `async_stream::stream!` the way
//! `tombelieber-claude-view`'s indexing route builds its SSE stream, but
//! neither `async-stream` nor `tokio-stream` are in this workspace's
//! dependency set. `futures::stream::unfold` (already a dependency) gets the
//! same `Stream<Item = Result<Event, Infallible>>` out of a
//! `broadcast::Receiver` without adding one.

use crate::sse::HubEvent;
use crate::state::AppState;
use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::{self, Stream};
use futures::StreamExt;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::broadcast;

fn to_event(hub_event: HubEvent) -> Option<Event> {
    serde_json::to_string(&hub_event).ok().map(|payload| Event::default().event(hub_event.event_name()).data(payload))
}

async fn next_event(mut rx: broadcast::Receiver<HubEvent>) -> Option<(Event, broadcast::Receiver<HubEvent>)> {
    loop {
        match rx.recv().await {
            Ok(hub_event) => {
                if let Some(event) = to_event(hub_event) {
                    return Some((event, rx));
                }
            }
            Err(broadcast::error::RecvError::Lagged(_)) => continue,
            Err(broadcast::error::RecvError::Closed) => return None,
        }
    }
}

async fn stream_events(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.hub.subscribe();
    let stream = stream::unfold(rx, next_event).map(Ok);
    Sse::new(stream).keep_alive(KeepAlive::default())
}

pub fn router() -> axum::Router<Arc<AppState>> {
    axum::Router::new().route("/events", axum::routing::get(stream_events))
}
