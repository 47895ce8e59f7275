use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use uuid::Uuid;

use super::platform::LogStatus;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LogEntry {
    pub id: Uuid,
    pub store_id: Option<Uuid>,
    pub event_type: String,
    /// `{ "message": ..., "context": ... }`
    pub payload: JsonValue,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl LogEntry {
    pub fn message(&self) -> Option<&str> {
        self.payload.get("message").and_then(|m| m.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct NewLogEntry {
    pub store_id: Option<Uuid>,
    pub event_type: String,
    pub message: String,
    pub context: Option<JsonValue>,
    pub status: LogStatus,
}
