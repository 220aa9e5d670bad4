use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, warn};
use uuid::Uuid;

pub mod events;

pub use events::StreamEvent;

/// Frames buffered per client before the stream counts as broken
pub const STREAM_BUFFER: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryStatus {
    Delivered,
    Offline,
}

struct LiveConnection {
    connection_id: Uuid,
    sender: mpsc::Sender<StreamEvent>,
}

/// Process-local map of user id -> open event stream. At most one live handle
/// per user; a reconnect replaces the previous handle, which is never written
/// to again. Cross-process fan-out is out of scope for this registry.
#[derive(Default, Clone)]
pub struct ConnectionRegistry {
    inner: Arc<RwLock<HashMap<Uuid, LiveConnection>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `sender` as the user's current live connection, replacing any
    /// prior one, and emit the initial `connected` frame on it. Returns the
    /// connection id that guards later unregistration.
    pub async fn register(&self, user_id: Uuid, sender: mpsc::Sender<StreamEvent>) -> Uuid {
        let connection_id = Uuid::new_v4();
        if let Err(e) = sender.try_send(StreamEvent::connected()) {
            warn!(%user_id, error = %e, "could not write connected frame to new stream");
        }
        let mut guard = self.inner.write().await;
        let replaced = guard
            .insert(
                user_id,
                LiveConnection {
                    connection_id,
                    sender,
                },
            )
            .is_some();
        if replaced {
            debug!(%user_id, %connection_id, "replaced previous live connection");
        } else {
            debug!(%user_id, %connection_id, "live connection registered");
        }
        connection_id
    }

    /// Push one frame to the user's stream if one is open. A missing entry is
    /// the normal offline case. A write failure (closed or backed-up channel)
    /// evicts the entry and reports the recipient offline for this call;
    /// nothing here blocks on the recipient.
    pub async fn deliver(&self, user_id: Uuid, event: StreamEvent) -> DeliveryStatus {
        let dead_connection = {
            let guard = self.inner.read().await;
            match guard.get(&user_id) {
                None => {
                    debug!(%user_id, "recipient has no live connection");
                    return DeliveryStatus::Offline;
                }
                Some(conn) => match conn.sender.try_send(event) {
                    Ok(()) => return DeliveryStatus::Delivered,
                    Err(e) => {
                        warn!(
                            %user_id,
                            connection_id = %conn.connection_id,
                            error = %e,
                            "stream write failed, evicting live connection"
                        );
                        conn.connection_id
                    }
                },
            }
        };

        // Drop the dead entry unless a newer connection took its place meanwhile
        let mut guard = self.inner.write().await;
        if guard
            .get(&user_id)
            .is_some_and(|c| c.connection_id == dead_connection)
        {
            guard.remove(&user_id);
        }
        DeliveryStatus::Offline
    }

    /// Remove the mapping only if it still belongs to `connection_id`. A close
    /// signal from a handle that was already replaced must not tear down the
    /// newer connection.
    pub async fn unregister(&self, user_id: Uuid, connection_id: Uuid) {
        let mut guard = self.inner.write().await;
        if guard
            .get(&user_id)
            .is_some_and(|c| c.connection_id == connection_id)
        {
            guard.remove(&user_id);
            debug!(%user_id, %connection_id, "live connection unregistered");
        } else {
            debug!(%user_id, %connection_id, "stale unregister ignored");
        }
    }

    pub async fn connected_users(&self) -> usize {
        self.inner.read().await.len()
    }
}
