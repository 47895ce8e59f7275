use crate::error::{Error, Result};
use crate::models::order::Order;
use crate::models::platform::PlatformKind;
use crate::models::store::Store;
use crate::services::log_service::LogService;
use crate::services::normalizer;
use crate::services::order_service::{ensure_status_change_allowed, OrderService};
use crate::services::platform::{OrderUpdateFields, PlatformRegistry, RefundReason};
use crate::services::store_service::StoreService;
use crate::utils::time::Clock;
use serde_json::{json, Value as JsonValue};
use std::sync::Arc;
use uuid::Uuid;

const LOG_EVENT: &str = "order_action";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderAction {
    Fulfill { send_email: bool },
    Unfulfill,
    Refund { reason: Option<RefundReason> },
}

impl OrderAction {
    fn name(&self) -> &'static str {
        match self {
            Self::Fulfill { .. } => "fulfill",
            Self::Unfulfill => "unfulfill",
            Self::Refund { .. } => "refund",
        }
    }
}

/// Order mutations that go through the remote platform first and are then
/// mirrored into the local order store.
#[derive(Clone)]
pub struct FulfillmentService {
    orders: OrderService,
    stores: StoreService,
    platforms: PlatformRegistry,
    clock: Arc<dyn Clock>,
    logs: LogService,
}

struct Target {
    order: Order,
    store: Store,
    platform: PlatformKind,
    site_id: String,
    token: String,
}

impl FulfillmentService {
    pub fn new(
        orders: OrderService,
        stores: StoreService,
        platforms: PlatformRegistry,
        clock: Arc<dyn Clock>,
        logs: LogService,
    ) -> Self {
        Self {
            orders,
            stores,
            platforms,
            clock,
            logs,
        }
    }

    async fn target(&self, order_id: Uuid) -> Result<Target> {
        let order = self.orders.get(order_id).await?;
        let platform = order.platform().ok_or_else(|| {
            Error::Internal(format!("Order {} has unknown platform {}", order.id, order.platform))
        })?;
        let store_id = order.store_id.ok_or_else(|| {
            Error::BadRequest(format!("Order {} is not attached to a store", order.id))
        })?;
        let store = self.stores.get(store_id).await?;
        let site_id = store
            .platform_site_id
            .clone()
            .ok_or_else(|| Error::BadRequest("Store has no site selected".to_string()))?;
        let token = store
            .access_token()
            .ok_or_else(|| Error::Unauthorized("Store is not connected".to_string()))?
            .to_string();
        Ok(Target {
            order,
            store,
            platform,
            site_id,
            token,
        })
    }

    pub async fn fulfill(&self, order_id: Uuid, send_email: bool) -> Result<Order> {
        self.change_status(order_id, OrderAction::Fulfill { send_email })
            .await
    }

    pub async fn unfulfill(&self, order_id: Uuid) -> Result<Order> {
        self.change_status(order_id, OrderAction::Unfulfill).await
    }

    pub async fn refund(&self, order_id: Uuid, reason: Option<RefundReason>) -> Result<Order> {
        self.change_status(order_id, OrderAction::Refund { reason })
            .await
    }

    async fn change_status(&self, order_id: Uuid, action: OrderAction) -> Result<Order> {
        let target = self.target(order_id).await?;
        if let Err(e) = ensure_status_change_allowed(&target.order) {
            self.logs
                .warning(
                    Some(target.store.id),
                    LOG_EVENT,
                    format!("Rejected {} on refunded order", action.name()),
                    Some(json!({ "order_id": target.order.id })),
                )
                .await;
            return Err(e);
        }

        let client = self.platforms.client_for(target.platform, action.name())?;
        let remote_id = target.order.platform_order_id.as_str();
        let result = match action {
            OrderAction::Fulfill { send_email } => {
                client
                    .fulfill_order(&target.site_id, remote_id, &target.token, send_email)
                    .await
            }
            OrderAction::Unfulfill => {
                client
                    .unfulfill_order(&target.site_id, remote_id, &target.token)
                    .await
            }
            OrderAction::Refund { reason } => {
                client
                    .refund_order(&target.site_id, remote_id, &target.token, reason)
                    .await
            }
        };

        let remote = match result {
            Ok(remote) => remote,
            Err(e) => {
                self.logs
                    .error(
                        Some(target.store.id),
                        LOG_EVENT,
                        format!("Could not {} order #{}", action.name(), remote_id),
                        Some(json!({ "error": e.to_string() })),
                    )
                    .await;
                return Err(e.into());
            }
        };

        let updated = self.mirror_remote(&target, &remote).await?;
        self.logs
            .success(
                Some(target.store.id),
                LOG_EVENT,
                format!("Order #{} {} succeeded", remote_id, action.name()),
                Some(json!({ "status": updated.status })),
            )
            .await;
        Ok(updated)
    }

    /// Replaces status and raw payload from the order the platform returned.
    /// An empty or unrecognised response leaves the stored order as is.
    async fn mirror_remote(&self, target: &Target, remote: &JsonValue) -> Result<Order> {
        match normalizer::normalize(
            target.platform,
            remote,
            Some(target.store.id),
            self.clock.now(),
        ) {
            Ok(normalized) => {
                self.orders
                    .apply_status(target.order.id, normalized.status, &normalized.raw_payload)
                    .await
            }
            Err(Error::InvalidOrderData(reason)) => {
                tracing::warn!(
                    order_id = %target.order.id,
                    reason,
                    "platform response carried no order"
                );
                Ok(target.order.clone())
            }
            Err(e) => Err(e),
        }
    }

    /// Pushes comment/shipping fields to the platform, then merges exactly
    /// those fields into the retained raw payload.
    pub async fn update_order(&self, order_id: Uuid, fields: OrderUpdateFields) -> Result<Order> {
        if fields.is_empty() {
            return Err(Error::BadRequest("No fields to update".to_string()));
        }
        let target = self.target(order_id).await?;
        let client = self.platforms.client_for(target.platform, "update_order")?;

        if let Err(e) = client
            .update_order(
                &target.site_id,
                &target.order.platform_order_id,
                &target.token,
                &fields,
            )
            .await
        {
            self.logs
                .error(
                    Some(target.store.id),
                    LOG_EVENT,
                    format!("Could not update order #{}", target.order.platform_order_id),
                    Some(json!({ "error": e.to_string() })),
                )
                .await;
            return Err(e.into());
        }

        let updated = self
            .orders
            .merge_raw_payload(target.order.id, fields.to_body())
            .await?;
        self.logs
            .success(
                Some(target.store.id),
                LOG_EVENT,
                format!("Order #{} updated", target.order.platform_order_id),
                Some(JsonValue::Object(fields.to_body())),
            )
            .await;
        Ok(updated)
    }
}
