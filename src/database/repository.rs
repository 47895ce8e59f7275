//! Storage contracts. The services only ever talk to these traits, so the
//! relational engine behind them can be swapped (Postgres in production,
//! the in-memory maps in tests).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{
    log_entry::{LogEntry, NewLogEntry},
    order::{NewOrder, Order, OrderFilter},
    platform::{OrderStatus, PlatformKind, WebhookStatus},
    store::{NewStore, OAuthCredentials, Store},
};

#[async_trait]
pub trait StoreRepository: Send + Sync {
    async fn insert(&self, store: NewStore) -> Result<Store>;
    async fn get(&self, id: Uuid) -> Result<Option<Store>>;
    async fn find_by_site_id(&self, site_id: &str) -> Result<Option<Store>>;
    /// First store (oldest first) of the platform that has a site id set.
    async fn first_with_site(&self, platform: PlatformKind) -> Result<Option<Store>>;
    async fn list(&self) -> Result<Vec<Store>>;
    async fn update_credentials(&self, id: Uuid, credentials: &OAuthCredentials) -> Result<Store>;
    async fn update_site(&self, id: Uuid, site_id: &str, title: Option<&str>) -> Result<Store>;
    async fn update_webhook_status(&self, id: Uuid, status: WebhookStatus) -> Result<Store>;
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Fails with `Error::Conflict` when `(platform, platform_order_id)` already exists.
    async fn insert(&self, order: &NewOrder) -> Result<Order>;
    /// Merges a freshly normalized order into an existing row. Optional fields
    /// that are `None` keep their stored value; `raw_payload` is replaced.
    async fn update(&self, id: Uuid, order: &NewOrder) -> Result<Order>;
    async fn update_status(
        &self,
        id: Uuid,
        status: OrderStatus,
        raw_payload: &JsonValue,
    ) -> Result<Order>;
    async fn update_raw_payload(&self, id: Uuid, raw_payload: &JsonValue) -> Result<Order>;
    async fn get(&self, id: Uuid) -> Result<Option<Order>>;
    async fn find_by_platform_id(
        &self,
        platform: &str,
        platform_order_id: &str,
    ) -> Result<Option<Order>>;
    async fn list(&self, filter: &OrderFilter, limit: i64, offset: i64) -> Result<Vec<Order>>;
    async fn count(&self, filter: &OrderFilter) -> Result<i64>;
}

#[async_trait]
pub trait LogRepository: Send + Sync {
    async fn insert(&self, entry: &NewLogEntry, at: DateTime<Utc>) -> Result<LogEntry>;
    /// Whether an entry with the same message, store scope and event type was
    /// written at or after `since`.
    async fn exists_since(&self, entry: &NewLogEntry, since: DateTime<Utc>) -> Result<bool>;
    async fn list(&self, store_id: Option<Uuid>, limit: i64) -> Result<Vec<LogEntry>>;
}

#[async_trait]
pub trait SettingsRepository: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> Result<()>;
}
