use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, mpsc};
use tracing::debug;
use uuid::Uuid;

use parley_types::events::GatewayEvent;

/// Push side of the gateway, as seen by code that produces events.
pub trait Notifier: Send + Sync {
    /// Deliver `event` to the user's live connection. Returns `false` if the
    /// user has no connection; delivery is fire-and-forget otherwise.
    fn notify(&self, user_id: Uuid, event: GatewayEvent) -> impl Future<Output = bool> + Send;
}

/// Receiving half of a registered connection.
pub struct ConnectionHandle {
    pub conn_id: Uuid,
    pub events: mpsc::UnboundedReceiver<GatewayEvent>,
}

/// Presence registry: which users are connected, and how to reach them.
#[derive(Clone, Default)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

#[derive(Default)]
struct DispatcherInner {
    /// user_id -> (conn_id, sender). One entry per user, last connection wins.
    connections: RwLock<HashMap<Uuid, (Uuid, mpsc::UnboundedSender<GatewayEvent>)>>,
}

type Connections = HashMap<Uuid, (Uuid, mpsc::UnboundedSender<GatewayEvent>)>;

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection for `user_id`, replacing any older one, and
    /// broadcast the new online set to everyone (the new connection included).
    pub async fn connect(&self, user_id: Uuid) -> ConnectionHandle {
        let conn_id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();

        let mut connections = self.inner.connections.write().await;
        if connections.insert(user_id, (conn_id, tx)).is_some() {
            debug!("{} reconnected, dropping previous connection", user_id);
        }
        broadcast_online(&connections);

        ConnectionHandle {
            conn_id,
            events: rx,
        }
    }

    /// Unregister a connection, but only if `conn_id` still owns the entry.
    /// Returns whether anything was removed.
    pub async fn disconnect(&self, user_id: Uuid, conn_id: Uuid) -> bool {
        let mut connections = self.inner.connections.write().await;

        let is_current = connections
            .get(&user_id)
            .is_some_and(|(stored, _)| *stored == conn_id);
        if !is_current {
            // A newer connection has taken over, leave it alone
            return false;
        }

        connections.remove(&user_id);
        broadcast_online(&connections);
        true
    }

    /// Send a targeted event to a specific user.
    pub async fn send_to_user(&self, user_id: Uuid, event: GatewayEvent) -> bool {
        let connections = self.inner.connections.read().await;
        connections
            .get(&user_id)
            .is_some_and(|(_, tx)| tx.send(event).is_ok())
    }

    pub async fn online_users(&self) -> Vec<Uuid> {
        online_ids(&*self.inner.connections.read().await)
    }

    pub async fn is_online(&self, user_id: Uuid) -> bool {
        self.inner.connections.read().await.contains_key(&user_id)
    }
}

impl Notifier for Dispatcher {
    async fn notify(&self, user_id: Uuid, event: GatewayEvent) -> bool {
        self.send_to_user(user_id, event).await
    }
}

fn online_ids(connections: &Connections) -> Vec<Uuid> {
    let mut ids: Vec<Uuid> = connections.keys().copied().collect();
    ids.sort();
    ids
}

// Called with the write lock held so every connection sees presence changes
// in the order they happened.
fn broadcast_online(connections: &Connections) {
    let event = GatewayEvent::GetOnlineUsers(online_ids(connections));
    for (_, tx) in connections.values() {
        let _ = tx.send(event.clone());
    }
}
