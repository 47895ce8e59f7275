use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{json, Value as JsonValue};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use super::repository::{LogRepository, OrderRepository, SettingsRepository, StoreRepository};
use crate::error::{Error, Result};
use crate::models::{
    log_entry::{LogEntry, NewLogEntry},
    order::{NewOrder, Order, OrderFilter},
    platform::{OrderStatus, PlatformKind, WebhookStatus},
    store::{NewStore, OAuthCredentials, Store},
};

const STORE_COLUMNS: &str = "id, title, platform_type, platform_site_id, oauth_credentials, \
     webhook_status, created_at, updated_at";

const ORDER_COLUMNS: &str = "id, store_id, platform, platform_order_id, order_number, status, \
     customer_name, customer_email, total_amount, currency, order_date, raw_payload, \
     created_at, updated_at";

const ORDER_FILTER: &str = "($1::uuid IS NULL OR store_id = $1)
      AND ($2::text IS NULL OR platform = $2)
      AND ($3::text IS NULL OR status = $3)
      AND ($4::text IS NULL OR (order_number ILIKE $4 ESCAPE '\\'
           OR customer_name ILIKE $4 ESCAPE '\\'
           OR customer_email ILIKE $4 ESCAPE '\\'
           OR platform_order_id ILIKE $4 ESCAPE '\\'))";

#[derive(Clone)]
pub struct PgStoreRepository {
    pool: PgPool,
}

impl PgStoreRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StoreRepository for PgStoreRepository {
    async fn insert(&self, store: NewStore) -> Result<Store> {
        let sql = format!(
            "INSERT INTO stores (title, platform_type, platform_site_id, oauth_credentials, webhook_status)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {}",
            STORE_COLUMNS
        );
        let row = sqlx::query_as::<_, Store>(&sql)
            .bind(&store.title)
            .bind(store.platform.as_str())
            .bind(&store.platform_site_id)
            .bind(store.oauth_credentials.map(Json))
            .bind(WebhookStatus::Pending.as_str())
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Store>> {
        let sql = format!("SELECT {} FROM stores WHERE id = $1", STORE_COLUMNS);
        let row = sqlx::query_as::<_, Store>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn find_by_site_id(&self, site_id: &str) -> Result<Option<Store>> {
        let sql = format!(
            "SELECT {} FROM stores WHERE platform_site_id = $1 ORDER BY created_at ASC LIMIT 1",
            STORE_COLUMNS
        );
        let row = sqlx::query_as::<_, Store>(&sql)
            .bind(site_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn first_with_site(&self, platform: PlatformKind) -> Result<Option<Store>> {
        let sql = format!(
            "SELECT {} FROM stores
             WHERE platform_type = $1 AND platform_site_id IS NOT NULL
             ORDER BY created_at ASC LIMIT 1",
            STORE_COLUMNS
        );
        let row = sqlx::query_as::<_, Store>(&sql)
            .bind(platform.as_str())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn list(&self) -> Result<Vec<Store>> {
        let sql = format!("SELECT {} FROM stores ORDER BY created_at DESC", STORE_COLUMNS);
        let rows = sqlx::query_as::<_, Store>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn update_credentials(&self, id: Uuid, credentials: &OAuthCredentials) -> Result<Store> {
        let sql = format!(
            "UPDATE stores SET oauth_credentials = $2, updated_at = NOW() WHERE id = $1 RETURNING {}",
            STORE_COLUMNS
        );
        let row = sqlx::query_as::<_, Store>(&sql)
            .bind(id)
            .bind(Json(credentials))
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }

    async fn update_site(&self, id: Uuid, site_id: &str, title: Option<&str>) -> Result<Store> {
        let sql = format!(
            "UPDATE stores
             SET platform_site_id = $2, title = COALESCE($3, title), updated_at = NOW()
             WHERE id = $1
             RETURNING {}",
            STORE_COLUMNS
        );
        let row = sqlx::query_as::<_, Store>(&sql)
            .bind(id)
            .bind(site_id)
            .bind(title)
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }

    async fn update_webhook_status(&self, id: Uuid, status: WebhookStatus) -> Result<Store> {
        let sql = format!(
            "UPDATE stores SET webhook_status = $2, updated_at = NOW() WHERE id = $1 RETURNING {}",
            STORE_COLUMNS
        );
        let row = sqlx::query_as::<_, Store>(&sql)
            .bind(id)
            .bind(status.as_str())
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }
}

#[derive(Clone)]
pub struct PgOrderRepository {
    pool: PgPool,
}

impl PgOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn search_pattern(filter: &OrderFilter) -> Option<String> {
    filter
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| format!("%{}%", escape_like(s)))
}

/// Search text is matched literally, so LIKE wildcards in it are escaped.
fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[async_trait]
impl OrderRepository for PgOrderRepository {
    async fn insert(&self, order: &NewOrder) -> Result<Order> {
        let sql = format!(
            "INSERT INTO orders (
                store_id, platform, platform_order_id, order_number, status,
                customer_name, customer_email, total_amount, currency, order_date, raw_payload
             ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
             RETURNING {}",
            ORDER_COLUMNS
        );
        let row = sqlx::query_as::<_, Order>(&sql)
            .bind(order.store_id)
            .bind(order.platform.as_str())
            .bind(&order.platform_order_id)
            .bind(&order.order_number)
            .bind(order.status.as_str())
            .bind(&order.customer_name)
            .bind(&order.customer_email)
            .bind(order.total_amount)
            .bind(&order.currency)
            .bind(order.order_date)
            .bind(&order.raw_payload)
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }

    async fn update(&self, id: Uuid, order: &NewOrder) -> Result<Order> {
        let sql = format!(
            "UPDATE orders SET
                store_id = COALESCE($2, store_id),
                order_number = COALESCE($3, order_number),
                status = $4,
                customer_name = COALESCE($5, customer_name),
                customer_email = COALESCE($6, customer_email),
                total_amount = $7,
                currency = $8,
                order_date = $9,
                raw_payload = $10,
                updated_at = NOW()
             WHERE id = $1
             RETURNING {}",
            ORDER_COLUMNS
        );
        let row = sqlx::query_as::<_, Order>(&sql)
            .bind(id)
            .bind(order.store_id)
            .bind(&order.order_number)
            .bind(order.status.as_str())
            .bind(&order.customer_name)
            .bind(&order.customer_email)
            .bind(order.total_amount)
            .bind(&order.currency)
            .bind(order.order_date)
            .bind(&order.raw_payload)
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: OrderStatus,
        raw_payload: &JsonValue,
    ) -> Result<Order> {
        let sql = format!(
            "UPDATE orders SET status = $2, raw_payload = $3, updated_at = NOW()
             WHERE id = $1 RETURNING {}",
            ORDER_COLUMNS
        );
        let row = sqlx::query_as::<_, Order>(&sql)
            .bind(id)
            .bind(status.as_str())
            .bind(raw_payload)
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }

    async fn update_raw_payload(&self, id: Uuid, raw_payload: &JsonValue) -> Result<Order> {
        let sql = format!(
            "UPDATE orders SET raw_payload = $2, updated_at = NOW() WHERE id = $1 RETURNING {}",
            ORDER_COLUMNS
        );
        let row = sqlx::query_as::<_, Order>(&sql)
            .bind(id)
            .bind(raw_payload)
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Order>> {
        let sql = format!("SELECT {} FROM orders WHERE id = $1", ORDER_COLUMNS);
        let row = sqlx::query_as::<_, Order>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn find_by_platform_id(
        &self,
        platform: &str,
        platform_order_id: &str,
    ) -> Result<Option<Order>> {
        let sql = format!(
            "SELECT {} FROM orders WHERE platform = $1 AND platform_order_id = $2",
            ORDER_COLUMNS
        );
        let row = sqlx::query_as::<_, Order>(&sql)
            .bind(platform)
            .bind(platform_order_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn list(&self, filter: &OrderFilter, limit: i64, offset: i64) -> Result<Vec<Order>> {
        let sql = format!(
            "SELECT {} FROM orders WHERE {} ORDER BY order_date DESC LIMIT $5 OFFSET $6",
            ORDER_COLUMNS, ORDER_FILTER
        );
        let rows = sqlx::query_as::<_, Order>(&sql)
            .bind(filter.store_id)
            .bind(&filter.platform)
            .bind(&filter.status)
            .bind(search_pattern(filter))
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn count(&self, filter: &OrderFilter) -> Result<i64> {
        let sql = format!("SELECT COUNT(*) FROM orders WHERE {}", ORDER_FILTER);
        let total: i64 = sqlx::query_scalar(&sql)
            .bind(filter.store_id)
            .bind(&filter.platform)
            .bind(&filter.status)
            .bind(search_pattern(filter))
            .fetch_one(&self.pool)
            .await?;
        Ok(total)
    }
}

#[derive(Clone)]
pub struct PgLogRepository {
    pool: PgPool,
}

impl PgLogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LogRepository for PgLogRepository {
    async fn insert(&self, entry: &NewLogEntry, at: DateTime<Utc>) -> Result<LogEntry> {
        let payload = json!({ "message": entry.message, "context": entry.context });
        let row = sqlx::query_as::<_, LogEntry>(
            r#"
            INSERT INTO log_entries (store_id, event_type, payload, status, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, store_id, event_type, payload, status, created_at
            "#,
        )
        .bind(entry.store_id)
        .bind(&entry.event_type)
        .bind(payload)
        .bind(entry.status.as_str())
        .bind(at)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn exists_since(&self, entry: &NewLogEntry, since: DateTime<Utc>) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM log_entries
                WHERE payload->>'message' = $1
                  AND store_id IS NOT DISTINCT FROM $2
                  AND event_type = $3
                  AND created_at >= $4
            )
            "#,
        )
        .bind(&entry.message)
        .bind(entry.store_id)
        .bind(&entry.event_type)
        .bind(since)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn list(&self, store_id: Option<Uuid>, limit: i64) -> Result<Vec<LogEntry>> {
        let rows = sqlx::query_as::<_, LogEntry>(
            r#"
            SELECT id, store_id, event_type, payload, status, created_at
            FROM log_entries
            WHERE ($1::uuid IS NULL OR store_id = $1)
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(store_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

#[derive(Clone)]
pub struct PgSettingsRepository {
    pool: PgPool,
}

impl PgSettingsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SettingsRepository for PgSettingsRepository {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let value: Option<String> =
            sqlx::query_scalar("SELECT value FROM settings WHERE key = $1")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO settings (key, value) VALUES ($1, $2)
            ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = NOW()
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(Error::from)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_pattern_matches_wildcards_literally() {
        let filter = OrderFilter {
            search: Some(" a_b%c\\d ".to_string()),
            ..Default::default()
        };
        assert_eq!(
            search_pattern(&filter).as_deref(),
            Some("%a\\_b\\%c\\\\d%")
        );
        assert_eq!(search_pattern(&OrderFilter::default()), None);
    }
}
