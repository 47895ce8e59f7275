use crate::database::OrderRepository;
use crate::error::{Error, Result};
use crate::models::order::{NewOrder, Order, OrderFilter, OrderList};
use crate::models::platform::OrderStatus;
use crate::services::cache_service::QueryCache;
use crate::utils::time::Clock;
use serde_json::{Map, Value as JsonValue};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct UpsertOutcome {
    pub order: Order,
    pub created: bool,
}

#[derive(Clone)]
pub struct OrderService {
    repo: Arc<dyn OrderRepository>,
    list_cache: QueryCache<Vec<Order>>,
    count_cache: QueryCache<i64>,
}

impl OrderService {
    pub fn new(repo: Arc<dyn OrderRepository>, clock: Arc<dyn Clock>, cache_ttl_secs: u64) -> Self {
        Self {
            repo,
            list_cache: QueryCache::new(cache_ttl_secs, clock.clone()),
            count_cache: QueryCache::new(cache_ttl_secs, clock),
        }
    }

    /// Insert-if-absent / update-if-present keyed by `(platform, platform_order_id)`.
    ///
    /// Two deliveries racing past the lookup both try to insert; the storage
    /// unique constraint rejects one, which then falls back to an update.
    pub async fn upsert(&self, order: NewOrder) -> Result<UpsertOutcome> {
        let platform = order.platform.as_str();
        let outcome = match self
            .repo
            .find_by_platform_id(platform, &order.platform_order_id)
            .await?
        {
            Some(existing) => UpsertOutcome {
                order: self.repo.update(existing.id, &order).await?,
                created: false,
            },
            None => match self.repo.insert(&order).await {
                Ok(inserted) => UpsertOutcome {
                    order: inserted,
                    created: true,
                },
                Err(Error::Conflict(_)) => {
                    let existing = self
                        .repo
                        .find_by_platform_id(platform, &order.platform_order_id)
                        .await?
                        .ok_or_else(|| {
                            Error::Internal("order vanished after unique conflict".to_string())
                        })?;
                    UpsertOutcome {
                        order: self.repo.update(existing.id, &order).await?,
                        created: false,
                    }
                }
                Err(e) => return Err(e),
            },
        };
        self.invalidate();
        Ok(outcome)
    }

    pub async fn get(&self, id: Uuid) -> Result<Order> {
        self.repo
            .get(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Order {} not found", id)))
    }

    pub async fn find_by_platform_id(
        &self,
        platform: &str,
        platform_order_id: &str,
    ) -> Result<Option<Order>> {
        self.repo.find_by_platform_id(platform, platform_order_id).await
    }

    pub async fn list(&self, filter: OrderFilter, page: i64, per_page: i64) -> Result<OrderList> {
        let page = page.max(1);
        let per_page = per_page.clamp(1, 100);
        let key = QueryCache::<Vec<Order>>::key("orders:list", &(&filter, page, per_page));

        let items = match self.list_cache.get(&key) {
            Some(items) => items,
            None => {
                let items = self
                    .repo
                    .list(&filter, per_page, (page - 1) * per_page)
                    .await?;
                self.list_cache.insert(key, items.clone());
                items
            }
        };
        let total = self.count(&filter).await?;
        let total_pages = ((total as f64) / (per_page as f64)).ceil() as i64;

        Ok(OrderList {
            items,
            total,
            page,
            per_page,
            total_pages,
        })
    }

    pub async fn count(&self, filter: &OrderFilter) -> Result<i64> {
        let key = QueryCache::<i64>::key("orders:count", filter);
        if let Some(total) = self.count_cache.get(&key) {
            return Ok(total);
        }
        let total = self.repo.count(filter).await?;
        self.count_cache.insert(key, total);
        Ok(total)
    }

    /// Replaces status and the retained raw payload after a remote status change.
    pub async fn apply_status(
        &self,
        id: Uuid,
        status: OrderStatus,
        raw_payload: &JsonValue,
    ) -> Result<Order> {
        let order = self.repo.update_status(id, status, raw_payload).await?;
        self.invalidate();
        Ok(order)
    }

    /// Shallow-merges `fields` into the retained raw payload.
    pub async fn merge_raw_payload(
        &self,
        id: Uuid,
        fields: Map<String, JsonValue>,
    ) -> Result<Order> {
        let order = self.get(id).await?;
        let mut raw = match order.raw_payload {
            JsonValue::Object(map) => map,
            other => {
                let mut map = Map::new();
                map.insert("original".to_string(), other);
                map
            }
        };
        raw.extend(fields);
        let order = self
            .repo
            .update_raw_payload(id, &JsonValue::Object(raw))
            .await?;
        self.invalidate();
        Ok(order)
    }

    fn invalidate(&self) {
        self.list_cache.invalidate_all();
        self.count_cache.invalidate_all();
    }
}

/// Refunded is terminal: no fulfill, unfulfill or refund afterwards.
pub fn ensure_status_change_allowed(order: &Order) -> Result<()> {
    if order.status().is_terminal() {
        return Err(Error::OrderLocked(format!(
            "Order {} has been refunded and can no longer change status",
            order.order_number.as_deref().unwrap_or(&order.platform_order_id)
        )));
    }
    Ok(())
}
