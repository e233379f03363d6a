use std::convert::Infallible;
use std::time::Duration;

use axum::response::sse::{Event, Sse};
use calc_control::SessionGuard;
use calc_models::{unix_timestamp, JsonRpcResponse};
use futures::stream::{self, Stream, StreamExt};
use serde_json::json;
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::error;

struct SessionStream {
    guard: SessionGuard,
    receiver: mpsc::Receiver<JsonRpcResponse>,
    heartbeat: Interval,
    shutdown: CancellationToken,
}

enum Next {
    Message(Option<JsonRpcResponse>),
    Heartbeat,
    Shutdown,
}

/// The event stream for one SSE client: a `connected` event, then queued
/// responses as `message` events and periodic `heartbeat` events. It ends
/// when the session is replaced or the server shuts down.
pub fn session_events(
    guard: SessionGuard,
    receiver: mpsc::Receiver<JsonRpcResponse>,
    heartbeat: Duration,
    shutdown: CancellationToken,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let connected = Event::default().event("connected").data(
        json!({"client_id": guard.client_id(), "status": "connected"}).to_string(),
    );

    let mut heartbeat = interval_at(Instant::now() + heartbeat, heartbeat);
    heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let state = SessionStream {
        guard,
        receiver,
        heartbeat,
        shutdown,
    };

    let updates = stream::unfold(state, |mut state| async move {
        loop {
            let next = tokio::select! {
                biased;
                _ = state.shutdown.cancelled() => Next::Shutdown,
                message = state.receiver.recv() => Next::Message(message),
                _ = state.heartbeat.tick() => Next::Heartbeat,
            };

            match next {
                Next::Message(Some(response)) => match serde_json::to_string(&response) {
                    Ok(data) => {
                        let event = Event::default().event("message").data(data);
                        return Some((Ok::<_, Infallible>(event), state));
                    }
                    Err(e) => error!(
                        "Dropping unserializable response for client {}: {}",
                        state.guard.client_id(),
                        e
                    ),
                },
                Next::Heartbeat => {
                    let data = json!({"timestamp": unix_timestamp()}).to_string();
                    let event = Event::default().event("heartbeat").data(data);
                    return Some((Ok(event), state));
                }
                Next::Message(None) | Next::Shutdown => return None,
            }
        }
    });

    Sse::new(stream::once(async move { Ok::<_, Infallible>(connected) }).chain(updates))
}
