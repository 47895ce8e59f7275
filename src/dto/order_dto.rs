use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::models::order::OrderFilter;
use crate::services::platform::{OrderUpdateFields, RefundReason};

#[derive(Debug, Deserialize, Validate)]
pub struct OrderListQuery {
    pub store_id: Option<Uuid>,
    pub platform: Option<String>,
    pub status: Option<String>,
    #[validate(length(max = 200))]
    pub search: Option<String>,
    #[validate(range(min = 1))]
    pub page: Option<i64>,
    #[validate(range(min = 1, max = 100))]
    pub per_page: Option<i64>,
}

impl OrderListQuery {
    pub fn filter(&self) -> OrderFilter {
        let non_empty = |v: &Option<String>| v.clone().filter(|s| !s.trim().is_empty());
        OrderFilter {
            store_id: self.store_id,
            platform: non_empty(&self.platform),
            status: non_empty(&self.status),
            search: non_empty(&self.search).map(|s| s.trim().to_string()),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct FulfillPayload {
    #[serde(default)]
    pub send_email: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct RefundPayload {
    pub reason: Option<RefundReason>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateOrderPayload {
    #[validate(length(max = 2000))]
    pub comment: Option<String>,
    #[validate(length(max = 255))]
    pub shipping_provider: Option<String>,
    #[validate(length(max = 255))]
    pub shipping_tracking: Option<String>,
    #[validate(url)]
    pub shipping_tracking_url: Option<String>,
}

impl From<UpdateOrderPayload> for OrderUpdateFields {
    fn from(p: UpdateOrderPayload) -> Self {
        Self {
            comment: p.comment,
            shipping_provider: p.shipping_provider,
            shipping_tracking: p.shipping_tracking,
            shipping_tracking_url: p.shipping_tracking_url,
        }
    }
}
