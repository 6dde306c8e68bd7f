use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use parley_db::Database;
use parley_db::models::{MessageRow, timestamp};
use parley_gateway::Notifier;
use parley_types::events::GatewayEvent;
use parley_types::models::{Message, PublicUser};

use crate::error::{ApiError, ApiResult};

/// Validated message body: at least one of text or image is present.
#[derive(Debug, Clone)]
pub struct MessageContent {
    text: Option<String>,
    image: Option<String>,
}

impl MessageContent {
    /// Blank text and blank image references count as absent.
    pub fn new(text: Option<String>, image: Option<String>) -> ApiResult<Self> {
        let text = text.filter(|t| !t.trim().is_empty());
        let image = image.filter(|i| !i.trim().is_empty());
        if text.is_none() && image.is_none() {
            return Err(ApiError::validation("Message must contain text or an image"));
        }
        Ok(Self { text, image })
    }

    pub fn image(&self) -> Option<&str> {
        self.image.as_deref()
    }

    pub fn with_image(self, image: String) -> Self {
        Self {
            image: Some(image),
            ..self
        }
    }
}

/// NotFound unless `receiver_id` belongs to a registered user.
pub async fn check_receiver(db: &Database, receiver_id: Uuid) -> ApiResult<()> {
    let id = receiver_id.to_string();
    db.run(move |db| db.get_user_by_id(&id))
        .await?
        .map(|_| ())
        .ok_or_else(receiver_not_found)
}

/// Persist a message, then push it to the receiver if they are connected.
///
/// Delivery is best-effort: an offline receiver sees the message next time
/// they fetch the conversation.
pub async fn send<N: Notifier>(
    db: &Database,
    notifier: &N,
    sender_id: Uuid,
    receiver_id: Uuid,
    content: MessageContent,
) -> ApiResult<Message> {
    let row = MessageRow {
        id: Uuid::new_v4().to_string(),
        sender_id: sender_id.to_string(),
        receiver_id: receiver_id.to_string(),
        text: content.text,
        image: content.image,
        created_at: timestamp(Utc::now()),
    };

    let stored = db
        .run(move |db| {
            if db.get_user_by_id(&row.receiver_id)?.is_none() {
                return Ok(None);
            }
            db.insert_message(&row)?;
            Ok(Some(row))
        })
        .await?
        .ok_or_else(receiver_not_found)?;

    let message = stored.to_message()?;

    let delivered = notifier
        .notify(receiver_id, GatewayEvent::NewMessage(message.clone()))
        .await;
    debug!(
        "Message {} {} -> {} ({})",
        message.id,
        sender_id,
        receiver_id,
        if delivered { "pushed" } else { "stored" }
    );

    Ok(message)
}

fn receiver_not_found() -> ApiError {
    ApiError::not_found("Receiver not found")
}

/// Every message between `a` and `b`, oldest first. Symmetric in its arguments.
pub async fn conversation(db: &Database, a: Uuid, b: Uuid) -> ApiResult<Vec<Message>> {
    let (a, b) = (a.to_string(), b.to_string());
    let rows = db.run(move |db| db.get_conversation(&a, &b)).await?;

    let messages = rows
        .iter()
        .map(MessageRow::to_message)
        .collect::<anyhow::Result<Vec<_>>>()?;
    Ok(messages)
}

/// Everyone `me` could talk to.
pub async fn sidebar_users(db: &Database, me: Uuid) -> ApiResult<Vec<PublicUser>> {
    let me = me.to_string();
    let rows = db.run(move |db| db.list_users_except(&me)).await?;

    let users = rows
        .iter()
        .map(|row| row.to_public())
        .collect::<anyhow::Result<Vec<_>>>()?;
    Ok(users)
}
