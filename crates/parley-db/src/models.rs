//! Database row types. These map directly to SQLite rows.
//! Distinct from parley-types API models to keep the DB layer independent.

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;

use parley_types::models::{Message, PublicUser};

pub struct UserRow {
    pub id: String,
    pub full_name: String,
    pub email: String,
    pub password: String,
    pub profile_pic: String,
    pub created_at: String,
    pub updated_at: String,
}

pub struct MessageRow {
    pub id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub text: Option<String>,
    pub image: Option<String>,
    pub created_at: String,
}

impl UserRow {
    pub fn to_public(&self) -> Result<PublicUser> {
        Ok(PublicUser {
            id: parse_id(&self.id)?,
            full_name: self.full_name.clone(),
            email: self.email.clone(),
            profile_pic: self.profile_pic.clone(),
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}

impl MessageRow {
    pub fn to_message(&self) -> Result<Message> {
        Ok(Message {
            id: parse_id(&self.id)?,
            sender_id: parse_id(&self.sender_id)?,
            receiver_id: parse_id(&self.receiver_id)?,
            text: self.text.clone(),
            image: self.image.clone(),
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}

/// Timestamps are stored as fixed-width RFC 3339 so they sort as text.
pub fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    let parsed = DateTime::parse_from_rfc3339(raw)
        .with_context(|| format!("corrupt timestamp '{}'", raw))?;
    Ok(parsed.with_timezone(&Utc))
}

fn parse_id(raw: &str) -> Result<Uuid> {
    raw.parse().with_context(|| format!("corrupt id '{}'", raw))
}
