//! In-process implementations of the repository contracts. They enforce the
//! same uniqueness rules as the SQL schema and are used by the test suites
//! and for running the service without a database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{json, Value as JsonValue};
use sqlx::types::Json;
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

use super::repository::{LogRepository, OrderRepository, SettingsRepository, StoreRepository};
use crate::error::{Error, Result};
use crate::models::{
    log_entry::{LogEntry, NewLogEntry},
    order::{NewOrder, Order, OrderFilter},
    platform::{OrderStatus, PlatformKind, WebhookStatus},
    store::{NewStore, OAuthCredentials, Store},
};

fn not_found(what: &str, id: Uuid) -> Error {
    Error::NotFound(format!("{} {} not found", what, id))
}

fn site_taken(site_id: &str) -> Error {
    Error::Conflict(format!("Site {} is already linked to a store", site_id))
}

#[derive(Default)]
pub struct MemoryStoreRepository {
    rows: RwLock<Vec<Store>>,
}

impl MemoryStoreRepository {
    fn modify<F>(&self, id: Uuid, apply: F) -> Result<Store>
    where
        F: FnOnce(&mut Store),
    {
        let mut rows = self.rows.write().expect("store lock poisoned");
        let store = rows
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| not_found("Store", id))?;
        apply(store);
        store.updated_at = Utc::now();
        Ok(store.clone())
    }
}

#[async_trait]
impl StoreRepository for MemoryStoreRepository {
    async fn insert(&self, store: NewStore) -> Result<Store> {
        let mut rows = self.rows.write().expect("store lock poisoned");
        if let Some(site_id) = store.platform_site_id.as_deref() {
            if rows.iter().any(|s| s.platform_site_id.as_deref() == Some(site_id)) {
                return Err(site_taken(site_id));
            }
        }
        let now = Utc::now();
        let row = Store {
            id: Uuid::new_v4(),
            title: store.title,
            platform_type: store.platform.as_str().to_string(),
            platform_site_id: store.platform_site_id,
            oauth_credentials: store.oauth_credentials.map(Json),
            webhook_status: WebhookStatus::Pending.as_str().to_string(),
            created_at: now,
            updated_at: now,
        };
        rows.push(row.clone());
        Ok(row)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Store>> {
        let rows = self.rows.read().expect("store lock poisoned");
        Ok(rows.iter().find(|s| s.id == id).cloned())
    }

    async fn find_by_site_id(&self, site_id: &str) -> Result<Option<Store>> {
        let rows = self.rows.read().expect("store lock poisoned");
        Ok(rows
            .iter()
            .find(|s| s.platform_site_id.as_deref() == Some(site_id))
            .cloned())
    }

    async fn first_with_site(&self, platform: PlatformKind) -> Result<Option<Store>> {
        let rows = self.rows.read().expect("store lock poisoned");
        Ok(rows
            .iter()
            .find(|s| s.platform_type == platform.as_str() && s.platform_site_id.is_some())
            .cloned())
    }

    async fn list(&self) -> Result<Vec<Store>> {
        let rows = self.rows.read().expect("store lock poisoned");
        let mut stores = rows.clone();
        stores.reverse();
        Ok(stores)
    }

    async fn update_credentials(&self, id: Uuid, credentials: &OAuthCredentials) -> Result<Store> {
        let credentials = credentials.clone();
        self.modify(id, |s| s.oauth_credentials = Some(Json(credentials)))
    }

    async fn update_site(&self, id: Uuid, site_id: &str, title: Option<&str>) -> Result<Store> {
        {
            let rows = self.rows.read().expect("store lock poisoned");
            if rows
                .iter()
                .any(|s| s.id != id && s.platform_site_id.as_deref() == Some(site_id))
            {
                return Err(site_taken(site_id));
            }
        }
        self.modify(id, |s| {
            s.platform_site_id = Some(site_id.to_string());
            if let Some(title) = title {
                s.title = title.to_string();
            }
        })
    }

    async fn update_webhook_status(&self, id: Uuid, status: WebhookStatus) -> Result<Store> {
        self.modify(id, |s| s.webhook_status = status.as_str().to_string())
    }
}

#[derive(Default)]
pub struct MemoryOrderRepository {
    rows: RwLock<Vec<Order>>,
}

impl MemoryOrderRepository {
    fn modify<F>(&self, id: Uuid, apply: F) -> Result<Order>
    where
        F: FnOnce(&mut Order),
    {
        let mut rows = self.rows.write().expect("order lock poisoned");
        let order = rows
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or_else(|| not_found("Order", id))?;
        apply(order);
        order.updated_at = Utc::now();
        Ok(order.clone())
    }
}

fn matches_filter(order: &Order, filter: &OrderFilter) -> bool {
    if filter.store_id.is_some() && order.store_id != filter.store_id {
        return false;
    }
    if let Some(platform) = &filter.platform {
        if &order.platform != platform {
            return false;
        }
    }
    if let Some(status) = &filter.status {
        if &order.status != status {
            return false;
        }
    }
    match filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(needle) => {
            let needle = needle.to_lowercase();
            [
                order.order_number.as_deref(),
                order.customer_name.as_deref(),
                order.customer_email.as_deref(),
                Some(order.platform_order_id.as_str()),
            ]
            .iter()
            .flatten()
            .any(|field| field.to_lowercase().contains(&needle))
        }
        None => true,
    }
}

#[async_trait]
impl OrderRepository for MemoryOrderRepository {
    async fn insert(&self, order: &NewOrder) -> Result<Order> {
        let mut rows = self.rows.write().expect("order lock poisoned");
        let duplicate = rows.iter().any(|o| {
            o.platform == order.platform.as_str() && o.platform_order_id == order.platform_order_id
        });
        if duplicate {
            return Err(Error::Conflict(format!(
                "order {}/{} already exists",
                order.platform, order.platform_order_id
            )));
        }
        let now = Utc::now();
        let row = Order {
            id: Uuid::new_v4(),
            store_id: order.store_id,
            platform: order.platform.as_str().to_string(),
            platform_order_id: order.platform_order_id.clone(),
            order_number: order.order_number.clone(),
            status: order.status.as_str().to_string(),
            customer_name: order.customer_name.clone(),
            customer_email: order.customer_email.clone(),
            total_amount: order.total_amount,
            currency: order.currency.clone(),
            order_date: order.order_date,
            raw_payload: order.raw_payload.clone(),
            created_at: now,
            updated_at: now,
        };
        rows.push(row.clone());
        Ok(row)
    }

    async fn update(&self, id: Uuid, order: &NewOrder) -> Result<Order> {
        self.modify(id, |row| {
            if order.store_id.is_some() {
                row.store_id = order.store_id;
            }
            if order.order_number.is_some() {
                row.order_number = order.order_number.clone();
            }
            if order.customer_name.is_some() {
                row.customer_name = order.customer_name.clone();
            }
            if order.customer_email.is_some() {
                row.customer_email = order.customer_email.clone();
            }
            row.status = order.status.as_str().to_string();
            row.total_amount = order.total_amount;
            row.currency = order.currency.clone();
            row.order_date = order.order_date;
            row.raw_payload = order.raw_payload.clone();
        })
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: OrderStatus,
        raw_payload: &JsonValue,
    ) -> Result<Order> {
        self.modify(id, |row| {
            row.status = status.as_str().to_string();
            row.raw_payload = raw_payload.clone();
        })
    }

    async fn update_raw_payload(&self, id: Uuid, raw_payload: &JsonValue) -> Result<Order> {
        self.modify(id, |row| row.raw_payload = raw_payload.clone())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Order>> {
        let rows = self.rows.read().expect("order lock poisoned");
        Ok(rows.iter().find(|o| o.id == id).cloned())
    }

    async fn find_by_platform_id(
        &self,
        platform: &str,
        platform_order_id: &str,
    ) -> Result<Option<Order>> {
        let rows = self.rows.read().expect("order lock poisoned");
        Ok(rows
            .iter()
            .find(|o| o.platform == platform && o.platform_order_id == platform_order_id)
            .cloned())
    }

    async fn list(&self, filter: &OrderFilter, limit: i64, offset: i64) -> Result<Vec<Order>> {
        let rows = self.rows.read().expect("order lock poisoned");
        let mut matching: Vec<Order> = rows
            .iter()
            .filter(|o| matches_filter(o, filter))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.order_date.cmp(&a.order_date));
        Ok(matching
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn count(&self, filter: &OrderFilter) -> Result<i64> {
        let rows = self.rows.read().expect("order lock poisoned");
        Ok(rows.iter().filter(|o| matches_filter(o, filter)).count() as i64)
    }
}

#[derive(Default)]
pub struct MemoryLogRepository {
    rows: RwLock<Vec<LogEntry>>,
}

#[async_trait]
impl LogRepository for MemoryLogRepository {
    async fn insert(&self, entry: &NewLogEntry, at: DateTime<Utc>) -> Result<LogEntry> {
        let row = LogEntry {
            id: Uuid::new_v4(),
            store_id: entry.store_id,
            event_type: entry.event_type.clone(),
            payload: json!({ "message": entry.message, "context": entry.context }),
            status: entry.status.as_str().to_string(),
            created_at: at,
        };
        self.rows
            .write()
            .expect("log lock poisoned")
            .push(row.clone());
        Ok(row)
    }

    async fn exists_since(&self, entry: &NewLogEntry, since: DateTime<Utc>) -> Result<bool> {
        let rows = self.rows.read().expect("log lock poisoned");
        Ok(rows.iter().any(|row| {
            row.message() == Some(entry.message.as_str())
                && row.store_id == entry.store_id
                && row.event_type == entry.event_type
                && row.created_at >= since
        }))
    }

    async fn list(&self, store_id: Option<Uuid>, limit: i64) -> Result<Vec<LogEntry>> {
        let rows = self.rows.read().expect("log lock poisoned");
        Ok(rows
            .iter()
            .rev()
            .filter(|row| store_id.is_none() || row.store_id == store_id)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct MemorySettingsRepository {
    values: RwLock<HashMap<String, String>>,
}

#[async_trait]
impl SettingsRepository for MemorySettingsRepository {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let values = self.values.read().expect("settings lock poisoned");
        Ok(values.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.values
            .write()
            .expect("settings lock poisoned")
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn new_order(id: &str) -> NewOrder {
        NewOrder {
            store_id: None,
            platform: PlatformKind::Webflow,
            platform_order_id: id.to_string(),
            order_number: Some(id.to_string()),
            status: OrderStatus::Pending,
            customer_name: Some("Jane Doe".into()),
            customer_email: None,
            total_amount: Decimal::new(1000, 2),
            currency: "USD".into(),
            order_date: Utc::now(),
            raw_payload: json!({ "orderId": id }),
        }
    }

    #[tokio::test]
    async fn rejects_duplicate_platform_order_key() {
        let repo = MemoryOrderRepository::default();
        repo.insert(&new_order("X")).await.unwrap();
        let err = repo.insert(&new_order("X")).await.unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
        assert_eq!(repo.count(&OrderFilter::default()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn update_keeps_fields_missing_from_new_payload() {
        let repo = MemoryOrderRepository::default();
        let created = repo.insert(&new_order("X")).await.unwrap();
        let mut changed = new_order("X");
        changed.customer_name = None;
        changed.status = OrderStatus::Completed;
        let updated = repo.update(created.id, &changed).await.unwrap();
        assert_eq!(updated.customer_name.as_deref(), Some("Jane Doe"));
        assert_eq!(updated.status, "completed");
    }

    #[tokio::test]
    async fn opaque_token_survives_storage() {
        let repo = MemoryStoreRepository::default();
        let token = "a+b/c==  \u{00e9}<&>'\"";
        let store = repo
            .insert(NewStore {
                title: "Shop".into(),
                platform: PlatformKind::Webflow,
                platform_site_id: None,
                oauth_credentials: None,
            })
            .await
            .unwrap();
        let creds = OAuthCredentials {
            access_token: token.into(),
            token_type: "bearer".into(),
            expires_in: None,
            refresh_token: None,
        };
        repo.update_credentials(store.id, &creds).await.unwrap();
        let loaded = repo.get(store.id).await.unwrap().unwrap();
        assert_eq!(loaded.access_token().unwrap().as_bytes(), token.as_bytes());
    }
}
