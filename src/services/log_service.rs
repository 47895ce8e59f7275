use crate::database::LogRepository;
use crate::error::Result;
use crate::models::log_entry::{LogEntry, NewLogEntry};
use crate::models::platform::LogStatus;
use crate::utils::time::Clock;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use uuid::Uuid;

/// Append-only audit trail shared by every component.
///
/// A write is dropped when an entry with the same message, store scope and
/// event type was already stored inside the dedup window.
#[derive(Clone)]
pub struct LogService {
    repo: Arc<dyn LogRepository>,
    clock: Arc<dyn Clock>,
    dedup_window: chrono::Duration,
}

impl LogService {
    pub fn new(
        repo: Arc<dyn LogRepository>,
        clock: Arc<dyn Clock>,
        dedup_window_secs: i64,
    ) -> Self {
        Self {
            repo,
            clock,
            dedup_window: chrono::Duration::seconds(dedup_window_secs),
        }
    }

    pub async fn log(
        &self,
        store_id: Option<Uuid>,
        event_type: &str,
        message: impl Into<String>,
        context: Option<JsonValue>,
        status: LogStatus,
    ) -> Result<Option<LogEntry>> {
        let entry = NewLogEntry {
            store_id,
            event_type: event_type.to_string(),
            message: message.into(),
            context,
            status,
        };

        let now = self.clock.now();
        if self.repo.exists_since(&entry, now - self.dedup_window).await? {
            tracing::debug!(event_type, message = %entry.message, "duplicate log entry dropped");
            return Ok(None);
        }

        match status {
            LogStatus::Error => tracing::error!(
                store_id = ?store_id, event_type, context = ?entry.context, "{}", entry.message
            ),
            LogStatus::Warning => tracing::warn!(
                store_id = ?store_id, event_type, context = ?entry.context, "{}", entry.message
            ),
            LogStatus::Info | LogStatus::Success => tracing::info!(
                store_id = ?store_id, event_type, status = status.as_str(), "{}", entry.message
            ),
        }

        let row = self.repo.insert(&entry, now).await?;
        Ok(Some(row))
    }

    pub async fn info(
        &self,
        store_id: Option<Uuid>,
        event_type: &str,
        message: impl Into<String>,
        context: Option<JsonValue>,
    ) {
        self.record(store_id, event_type, message, context, LogStatus::Info)
            .await
    }

    pub async fn success(
        &self,
        store_id: Option<Uuid>,
        event_type: &str,
        message: impl Into<String>,
        context: Option<JsonValue>,
    ) {
        self.record(store_id, event_type, message, context, LogStatus::Success)
            .await
    }

    pub async fn warning(
        &self,
        store_id: Option<Uuid>,
        event_type: &str,
        message: impl Into<String>,
        context: Option<JsonValue>,
    ) {
        self.record(store_id, event_type, message, context, LogStatus::Warning)
            .await
    }

    pub async fn error(
        &self,
        store_id: Option<Uuid>,
        event_type: &str,
        message: impl Into<String>,
        context: Option<JsonValue>,
    ) {
        self.record(store_id, event_type, message, context, LogStatus::Error)
            .await
    }

    /// Like `log`, but a failing audit write never fails the caller.
    async fn record(
        &self,
        store_id: Option<Uuid>,
        event_type: &str,
        message: impl Into<String>,
        context: Option<JsonValue>,
        status: LogStatus,
    ) {
        if let Err(e) = self.log(store_id, event_type, message, context, status).await {
            tracing::error!(error = ?e, event_type, "failed to write log entry");
        }
    }

    pub async fn recent(&self, store_id: Option<Uuid>, limit: i64) -> Result<Vec<LogEntry>> {
        self.repo.list(store_id, limit.clamp(1, 500)).await
    }
}
