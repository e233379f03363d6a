use std::sync::Arc;
use std::time::Instant;

use calc_models::{unix_timestamp, CalcError, JsonRpcResponse};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Snapshot returned by `GET /sse/status`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SseStatus {
    pub active_connections: usize,
    pub connected_clients: Vec<String>,
    pub timestamp: f64,
}

struct Session {
    connection_id: Uuid,
    sender: mpsc::Sender<JsonRpcResponse>,
}

/// Connected SSE clients, each with a bounded queue of responses waiting to
/// be written to its stream.
#[derive(Clone)]
pub struct SessionRegistry {
    inner: Arc<DashMap<String, Session>>,
    capacity: usize,
}

impl SessionRegistry {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
            capacity: capacity.max(1),
        }
    }

    /// Open a session. A missing or empty id gets a fresh UUID; an id that is
    /// already connected is taken over, which ends the previous stream.
    pub fn register(
        &self,
        client_id: Option<String>,
    ) -> (SessionGuard, mpsc::Receiver<JsonRpcResponse>) {
        let client_id = client_id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let connection_id = Uuid::new_v4();
        let (sender, receiver) = mpsc::channel(self.capacity);

        let previous = self.inner.insert(
            client_id.clone(),
            Session {
                connection_id,
                sender,
            },
        );
        if previous.is_some() {
            warn!("SSE client {} reconnected, replacing previous stream", client_id);
        }
        info!("Registered SSE client {}", client_id);

        let guard = SessionGuard {
            registry: self.clone(),
            client_id,
            connection_id,
            opened_at: Instant::now(),
        };
        (guard, receiver)
    }

    /// Queue a response for a connected client.
    pub fn deliver(&self, client_id: &str, response: JsonRpcResponse) -> Result<(), CalcError> {
        let not_connected = || CalcError::ClientNotConnected {
            client_id: client_id.to_string(),
        };

        // Clone the sender out so no shard lock is held while sending or
        // removing below.
        let (sender, connection_id) = match self.inner.get(client_id) {
            Some(session) => (session.sender.clone(), session.connection_id),
            None => return Err(not_connected()),
        };

        match sender.try_send(response) {
            Ok(()) => {
                debug!("Queued SSE response for client {}", client_id);
                Ok(())
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("SSE queue full for client {}", client_id);
                Err(CalcError::SessionQueueFull {
                    client_id: client_id.to_string(),
                })
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.remove(client_id, connection_id);
                Err(not_connected())
            }
        }
    }

    pub fn is_connected(&self, client_id: &str) -> bool {
        self.inner.contains_key(client_id)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn status(&self) -> SseStatus {
        let mut connected_clients: Vec<String> =
            self.inner.iter().map(|entry| entry.key().clone()).collect();
        connected_clients.sort();
        SseStatus {
            active_connections: connected_clients.len(),
            connected_clients,
            timestamp: unix_timestamp(),
        }
    }

    fn remove(&self, client_id: &str, connection_id: Uuid) -> bool {
        self.inner
            .remove_if(client_id, |_, session| session.connection_id == connection_id)
            .is_some()
    }
}

/// Keeps a session registered for as long as its stream is alive.
pub struct SessionGuard {
    registry: SessionRegistry,
    client_id: String,
    connection_id: Uuid,
    opened_at: Instant,
}

impl SessionGuard {
    pub fn client_id(&self) -> &str {
        &self.client_id
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        // A newer connection under the same id is left alone.
        if self.registry.remove(&self.client_id, self.connection_id) {
            info!(
                "SSE stream ended for client {} after {:?}",
                self.client_id,
                self.opened_at.elapsed()
            );
        }
    }
}
