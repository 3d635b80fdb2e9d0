use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Router,
};
use futures::stream::Stream;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use crate::file::FileStore;

/// Path of the development push channel.
pub const EVENTS_ENDPOINT: &str = "/__slidev/events";

#[derive(Clone)]
pub struct SseState {
    pub store: Arc<FileStore>,
}

pub fn router(store: Arc<FileStore>) -> Router {
    let state = SseState { store };

    Router::new()
        .route(EVENTS_ENDPOINT, get(subscribe_to_events))
        .with_state(state)
}

async fn subscribe_to_events(
    State(state): State<SseState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let connection_id = uuid::Uuid::new_v4();
    let mut rx = state.store.subscribe();
    let mut closed = state.store.closed();
    let already_closed = state.store.is_shut_down();
    debug!("[sse] Client {} subscribed", connection_id);

    let stream = async_stream::stream! {
        if already_closed {
            return;
        }
        loop {
            let received = tokio::select! {
                _ = closed.changed() => None,
                received = rx.recv() => Some(received),
            };
            let Some(received) = received else {
                debug!("[sse] Server shutting down, closing client {}", connection_id);
                break;
            };
            match received {
                Ok(event) => {
                    if !is_valid_event_name(event.name()) {
                        warn!("[sse] Dropping event with invalid name {:?}", event.name());
                        continue;
                    }
                    let data = match event.data() {
                        Ok(data) => data,
                        Err(e) => {
                            warn!("[sse] Dropping unencodable {} event: {}", event.name(), e);
                            continue;
                        }
                    };
                    yield Ok(Event::default().event(event.name()).data(data));
                }
                // No replay: a lagging client just misses the skipped events.
                Err(RecvError::Lagged(skipped)) => {
                    warn!("[sse] Client {} lagged, skipped {} events", connection_id, skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
        debug!("[sse] Client {} stream ended", connection_id);
    };

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}

/// An SSE `event:` field cannot span lines.
fn is_valid_event_name(name: &str) -> bool {
    !name.contains(['\n', '\r'])
}
