use crate::dto::webhook_dto::WebhookEnvelope;
use crate::error::{Error, Result};
use crate::models::platform::PlatformKind;
use crate::models::store::Store;
use crate::services::log_service::LogService;
use crate::services::normalizer;
use crate::services::order_service::OrderService;
use crate::services::platform::webflow::{
    TRIGGER_INVENTORY_CHANGED, TRIGGER_NEW_ORDER, TRIGGER_ORDER_CHANGED,
};
use crate::services::store_service::StoreService;
use crate::utils::time::Clock;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

const LOG_EVENT: &str = "webhook";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEvent {
    NewOrder,
    OrderChanged,
    InventoryChanged,
    Other(String),
}

impl WebhookEvent {
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            TRIGGER_NEW_ORDER | "new_order" => Self::NewOrder,
            TRIGGER_ORDER_CHANGED | "order_changed" => Self::OrderChanged,
            TRIGGER_INVENTORY_CHANGED | "inventory_changed" => Self::InventoryChanged,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn is_order_event(&self) -> bool {
        matches!(self, Self::NewOrder | Self::OrderChanged)
    }
}

/// How the owning store was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreResolution {
    SiteId,
    ExistingOrder,
    /// First store of the platform with a site id. Best effort only.
    Fallback,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    OrderProcessed { order_id: Uuid, created: bool },
    InventoryProcessed,
    Ignored { event: String },
    StoreUnresolved,
    Failed { error: String },
}

#[derive(Clone)]
pub struct WebhookService {
    stores: StoreService,
    orders: OrderService,
    clock: Arc<dyn Clock>,
    logs: LogService,
}

impl WebhookService {
    pub fn new(
        stores: StoreService,
        orders: OrderService,
        clock: Arc<dyn Clock>,
        logs: LogService,
    ) -> Self {
        Self {
            stores,
            orders,
            clock,
            logs,
        }
    }

    /// Entry point for the webhook endpoint. Never fails: every problem is
    /// logged and reported through the outcome.
    pub async fn handle(&self, body: &[u8]) -> DispatchOutcome {
        let envelope: WebhookEnvelope = match serde_json::from_slice(body) {
            Ok(envelope) => envelope,
            Err(e) => {
                self.logs
                    .error(
                        None,
                        LOG_EVENT,
                        "Malformed webhook body",
                        Some(json!({ "error": e.to_string() })),
                    )
                    .await;
                return DispatchOutcome::Failed {
                    error: e.to_string(),
                };
            }
        };

        match self.dispatch(&envelope).await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.logs
                    .error(
                        None,
                        LOG_EVENT,
                        format!("Webhook processing failed: {}", e),
                        Some(json!({
                            "trigger_type": envelope.trigger_type,
                            "site_id": envelope.site_id,
                        })),
                    )
                    .await;
                DispatchOutcome::Failed {
                    error: e.to_string(),
                }
            }
        }
    }

    pub async fn dispatch(&self, envelope: &WebhookEnvelope) -> Result<DispatchOutcome> {
        let platform = match envelope.platform.as_deref() {
            None | Some("") => PlatformKind::Webflow,
            Some(raw) => raw
                .parse::<PlatformKind>()
                .map_err(|_| Error::BadRequest(format!("Unknown platform `{}`", raw)))?,
        };
        let event = WebhookEvent::parse(envelope.trigger_type.as_deref().unwrap_or_default());

        let Some((store, resolution)) = self.resolve_store(platform, &event, envelope).await?
        else {
            self.logs
                .warning(
                    None,
                    LOG_EVENT,
                    "Webhook store could not be resolved",
                    Some(json!({
                        "platform": platform.as_str(),
                        "site_id": envelope.site_id,
                        "trigger_type": envelope.trigger_type,
                    })),
                )
                .await;
            return Ok(DispatchOutcome::StoreUnresolved);
        };

        if resolution == StoreResolution::Fallback {
            self.logs
                .warning(
                    Some(store.id),
                    LOG_EVENT,
                    "Webhook attributed to store by platform fallback",
                    Some(json!({ "site_id": envelope.site_id })),
                )
                .await;
        }

        match event {
            WebhookEvent::NewOrder | WebhookEvent::OrderChanged => {
                let order = normalizer::normalize(
                    platform,
                    &envelope.payload,
                    Some(store.id),
                    self.clock.now(),
                )?;
                let outcome = self.orders.upsert(order).await?;
                let message = if outcome.created {
                    "Order received"
                } else {
                    "Order updated"
                };
                self.logs
                    .success(
                        Some(store.id),
                        LOG_EVENT,
                        format!("{} #{}", message, outcome.order.platform_order_id),
                        Some(json!({
                            "order_id": outcome.order.id,
                            "status": outcome.order.status,
                        })),
                    )
                    .await;
                Ok(DispatchOutcome::OrderProcessed {
                    order_id: outcome.order.id,
                    created: outcome.created,
                })
            }
            // Inventory sync has no consumer yet.
            WebhookEvent::InventoryChanged => Ok(DispatchOutcome::InventoryProcessed),
            WebhookEvent::Other(name) => {
                self.logs
                    .info(
                        Some(store.id),
                        LOG_EVENT,
                        format!("Ignored webhook event `{}`", name),
                        None,
                    )
                    .await;
                Ok(DispatchOutcome::Ignored { event: name })
            }
        }
    }

    async fn resolve_store(
        &self,
        platform: PlatformKind,
        event: &WebhookEvent,
        envelope: &WebhookEnvelope,
    ) -> Result<Option<(Store, StoreResolution)>> {
        if let Some(site_id) = envelope.site_id.as_deref().filter(|s| !s.is_empty()) {
            if let Some(store) = self.stores.find_by_site_id(site_id).await? {
                return Ok(Some((store, StoreResolution::SiteId)));
            }
        }

        if event.is_order_event() {
            if let Some(order_id) = normalizer::extract_order_id(platform, &envelope.payload) {
                let existing = self
                    .orders
                    .find_by_platform_id(platform.as_str(), &order_id)
                    .await?;
                if let Some(store_id) = existing.and_then(|o| o.store_id) {
                    match self.stores.get(store_id).await {
                        Ok(store) => return Ok(Some((store, StoreResolution::ExistingOrder))),
                        Err(Error::NotFound(_)) => {}
                        Err(e) => return Err(e),
                    }
                }
            }
        }

        Ok(self
            .stores
            .first_with_site(platform)
            .await?
            .map(|store| (store, StoreResolution::Fallback)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trigger_types_and_canonical_names_both_route() {
        assert_eq!(WebhookEvent::parse("ecomm_new_order"), WebhookEvent::NewOrder);
        assert_eq!(WebhookEvent::parse("new_order"), WebhookEvent::NewOrder);
        assert_eq!(
            WebhookEvent::parse("ecomm_order_changed"),
            WebhookEvent::OrderChanged
        );
        assert_eq!(
            WebhookEvent::parse("inventory_changed"),
            WebhookEvent::InventoryChanged
        );
        assert_eq!(
            WebhookEvent::parse("site_publish"),
            WebhookEvent::Other("site_publish".to_string())
        );
    }
}
