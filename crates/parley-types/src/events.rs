use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::Message;

/// Events pushed over the WebSocket gateway.
///
/// Serialized as `{"type": "getOnlineUsers", "data": [...]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum GatewayEvent {
    /// Full set of currently connected user ids. Sent to every connection
    /// whenever someone connects or disconnects.
    GetOnlineUsers(Vec<Uuid>),

    /// A message addressed to the receiving user was just stored
    NewMessage(Message),
}
