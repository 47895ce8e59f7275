use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use uuid::Uuid;

use super::platform::{OrderStatus, PlatformKind};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Order {
    pub id: Uuid,
    pub store_id: Option<Uuid>,
    pub platform: String,
    pub platform_order_id: String,
    pub order_number: Option<String>,
    pub status: String,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub total_amount: Decimal,
    pub currency: String,
    pub order_date: DateTime<Utc>,
    pub raw_payload: JsonValue,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn status(&self) -> OrderStatus {
        self.status.parse().unwrap_or(OrderStatus::Pending)
    }

    pub fn platform(&self) -> Option<PlatformKind> {
        self.platform.parse().ok()
    }
}

/// Canonical order produced by a normalizer, ready to be upserted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    pub store_id: Option<Uuid>,
    pub platform: PlatformKind,
    pub platform_order_id: String,
    pub order_number: Option<String>,
    pub status: OrderStatus,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub total_amount: Decimal,
    pub currency: String,
    pub order_date: DateTime<Utc>,
    pub raw_payload: JsonValue,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct OrderFilter {
    pub store_id: Option<Uuid>,
    pub platform: Option<String>,
    pub status: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderList {
    pub items: Vec<Order>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub total_pages: i64,
}
