use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::collections::HashMap;
use std::sync::Arc;

use crate::models::platform::PlatformKind;

pub mod webflow;

/// Failure of a single outbound platform call. None of these abort the
/// calling process; callers decide whether to surface or retry.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PlatformError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("missing OAuth scopes: {message}")]
    MissingScopes { message: String },

    #[error("unexpected response: {0}")]
    Decode(String),

    #[error("webhook registration failed: {}", errors.join("; "))]
    WebhooksFailed { errors: Vec<String> },

    #[error("{operation} is not supported for {platform}")]
    Unsupported {
        platform: PlatformKind,
        operation: &'static str,
    },
}

/// OAuth endpoints and scopes a platform requires for a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthEndpoints {
    pub authorize_url: String,
    pub token_url: String,
    pub scopes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteSite {
    pub id: String,
    #[serde(alias = "displayName")]
    pub name: String,
    #[serde(default, alias = "shortName")]
    pub short_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteWebhook {
    pub id: String,
    #[serde(alias = "triggerType")]
    pub trigger_type: String,
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct WebhookRegistration {
    /// Subscriptions created by this call.
    pub webhooks: Vec<RemoteWebhook>,
    /// Trigger types already registered for the callback URL.
    pub skipped: Vec<String>,
    /// Per-trigger failures, `"<trigger>: <reason>"`.
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefundReason {
    Duplicate,
    Fraudulent,
    Requested,
}

/// Order fields an operator may change without touching status. Only the
/// fields that are `Some` are sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderUpdateFields {
    pub comment: Option<String>,
    pub shipping_provider: Option<String>,
    pub shipping_tracking: Option<String>,
    pub shipping_tracking_url: Option<String>,
}

impl OrderUpdateFields {
    pub fn is_empty(&self) -> bool {
        self.comment.is_none()
            && self.shipping_provider.is_none()
            && self.shipping_tracking.is_none()
            && self.shipping_tracking_url.is_none()
    }

    /// Body in the platform's camelCase field names.
    pub fn to_body(&self) -> Map<String, JsonValue> {
        let mut body = Map::new();
        let fields = [
            ("comment", &self.comment),
            ("shippingProvider", &self.shipping_provider),
            ("shippingTracking", &self.shipping_tracking),
            ("shippingTrackingURL", &self.shipping_tracking_url),
        ];
        for (name, value) in fields {
            if let Some(value) = value {
                body.insert(name.to_string(), JsonValue::String(value.clone()));
            }
        }
        body
    }
}

/// Heuristic for a 403 caused by an OAuth grant that lacks a scope.
pub fn is_missing_scopes(status: u16, body: &str) -> bool {
    if status != 403 {
        return false;
    }
    let body = body.to_lowercase();
    let forbidden = body.contains("forbidden") || body.contains("not_authorized");
    (forbidden && body.contains("missing") && body.contains("scopes"))
        || body.contains("ecommerce:write")
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PlatformClient: Send + Sync {
    fn kind(&self) -> PlatformKind;

    fn oauth_endpoints(&self) -> Option<OAuthEndpoints> {
        None
    }

    /// Soft-fails to an empty list.
    async fn list_remote_stores(&self, token: &str) -> Vec<RemoteSite>;

    /// Idempotent: trigger types already registered for the callback URL are
    /// skipped. Errors only when every attempted registration failed.
    async fn create_webhooks(
        &self,
        site_id: &str,
        token: &str,
    ) -> Result<WebhookRegistration, PlatformError>;

    async fn get_webhooks(
        &self,
        site_id: &str,
        token: &str,
    ) -> Result<Vec<RemoteWebhook>, PlatformError>;

    async fn update_order(
        &self,
        site_id: &str,
        order_id: &str,
        token: &str,
        fields: &OrderUpdateFields,
    ) -> Result<JsonValue, PlatformError>;

    async fn fulfill_order(
        &self,
        site_id: &str,
        order_id: &str,
        token: &str,
        send_email: bool,
    ) -> Result<JsonValue, PlatformError>;

    async fn unfulfill_order(
        &self,
        site_id: &str,
        order_id: &str,
        token: &str,
    ) -> Result<JsonValue, PlatformError>;

    async fn refund_order(
        &self,
        site_id: &str,
        order_id: &str,
        token: &str,
        reason: Option<RefundReason>,
    ) -> Result<JsonValue, PlatformError>;
}

/// Lookup from platform variant to its client.
#[derive(Clone, Default)]
pub struct PlatformRegistry {
    clients: HashMap<PlatformKind, Arc<dyn PlatformClient>>,
}

impl PlatformRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(mut self, client: Arc<dyn PlatformClient>) -> Self {
        self.clients.insert(client.kind(), client);
        self
    }

    pub fn client_for(
        &self,
        kind: PlatformKind,
        operation: &'static str,
    ) -> Result<Arc<dyn PlatformClient>, PlatformError> {
        self.clients
            .get(&kind)
            .cloned()
            .ok_or(PlatformError::Unsupported {
                platform: kind,
                operation,
            })
    }
}
