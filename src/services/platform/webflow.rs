use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use std::collections::HashSet;

use super::{
    is_missing_scopes, OAuthEndpoints, OrderUpdateFields, PlatformClient, PlatformError,
    RefundReason, RemoteSite, RemoteWebhook, WebhookRegistration,
};
use crate::models::platform::PlatformKind;
use crate::services::log_service::LogService;

pub const TRIGGER_NEW_ORDER: &str = "ecomm_new_order";
pub const TRIGGER_ORDER_CHANGED: &str = "ecomm_order_changed";
pub const TRIGGER_INVENTORY_CHANGED: &str = "ecomm_inventory_changed";

pub const WEBHOOK_TRIGGERS: [&str; 3] = [
    TRIGGER_NEW_ORDER,
    TRIGGER_ORDER_CHANGED,
    TRIGGER_INVENTORY_CHANGED,
];

/// Read is needed to receive order/inventory webhooks, write to mutate orders.
pub const REQUIRED_SCOPES: [&str; 4] = [
    "sites:read",
    "sites:write",
    "ecommerce:read",
    "ecommerce:write",
];

const LOG_EVENT: &str = "webflow_api";

#[derive(Debug, Deserialize)]
struct SitesResponse {
    #[serde(default)]
    sites: Vec<RemoteSite>,
}

#[derive(Debug, Deserialize)]
struct WebhooksResponse {
    #[serde(default)]
    webhooks: Vec<RemoteWebhook>,
}

#[derive(Clone)]
pub struct WebflowClient {
    http: Client,
    api_base: String,
    authorize_url: String,
    token_url: String,
    callback_url: String,
    logs: LogService,
}

impl WebflowClient {
    pub fn new(
        http: Client,
        api_base: impl Into<String>,
        authorize_url: impl Into<String>,
        token_url: impl Into<String>,
        callback_url: impl Into<String>,
        logs: LogService,
    ) -> Self {
        Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            authorize_url: authorize_url.into(),
            token_url: token_url.into(),
            callback_url: callback_url.into(),
            logs,
        }
    }

    pub fn callback_url(&self) -> &str {
        &self.callback_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    fn order_url(&self, site_id: &str, order_id: &str, action: Option<&str>) -> String {
        match action {
            Some(action) => self.url(&format!("/sites/{}/orders/{}/{}", site_id, order_id, action)),
            None => self.url(&format!("/sites/{}/orders/{}", site_id, order_id)),
        }
    }

    /// Sends an authenticated request and decodes the JSON body. Every
    /// failure is written to the audit log with status and response body.
    async fn send(
        &self,
        request: RequestBuilder,
        token: &str,
        operation: &str,
        context: JsonValue,
    ) -> Result<JsonValue, PlatformError> {
        let response = match request
            .bearer_auth(token)
            .header("accept", "application/json")
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => {
                self.logs
                    .error(
                        None,
                        LOG_EVENT,
                        format!("Webflow {} request failed", operation),
                        Some(json!({ "error": e.to_string(), "request": context })),
                    )
                    .await;
                return Err(PlatformError::Transport(e.to_string()));
            }
        };

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            let code = status.as_u16();
            self.logs
                .error(
                    None,
                    LOG_EVENT,
                    format!("Webflow {} returned HTTP {}", operation, code),
                    Some(json!({ "status": code, "body": body, "request": context })),
                )
                .await;
            if is_missing_scopes(code, &body) {
                return Err(PlatformError::MissingScopes {
                    message: "The connection is missing required permissions. \
                              Please reconnect the store to grant e-commerce write access."
                        .to_string(),
                });
            }
            return Err(PlatformError::Http { status: code, body });
        }

        if body.trim().is_empty() {
            return Ok(JsonValue::Null);
        }
        serde_json::from_str(&body).map_err(|e| PlatformError::Decode(e.to_string()))
    }

    async fn register_webhook(
        &self,
        site_id: &str,
        token: &str,
        trigger: &str,
    ) -> Result<RemoteWebhook, PlatformError> {
        let request = self
            .http
            .post(self.url(&format!("/sites/{}/webhooks", site_id)))
            .json(&json!({ "triggerType": trigger, "url": self.callback_url }));
        let value = self
            .send(
                request,
                token,
                "create_webhook",
                json!({ "site_id": site_id, "trigger_type": trigger }),
            )
            .await?;
        serde_json::from_value(value).map_err(|e| PlatformError::Decode(e.to_string()))
    }
}

fn same_callback(a: &str, b: &str) -> bool {
    a.trim_end_matches('/') == b.trim_end_matches('/')
}

#[async_trait]
impl PlatformClient for WebflowClient {
    fn kind(&self) -> PlatformKind {
        PlatformKind::Webflow
    }

    fn oauth_endpoints(&self) -> Option<OAuthEndpoints> {
        Some(OAuthEndpoints {
            authorize_url: self.authorize_url.clone(),
            token_url: self.token_url.clone(),
            scopes: REQUIRED_SCOPES.iter().map(|s| s.to_string()).collect(),
        })
    }

    async fn list_remote_stores(&self, token: &str) -> Vec<RemoteSite> {
        let request = self.http.get(self.url("/sites"));
        match self.send(request, token, "list_sites", json!({})).await {
            Ok(value) => match serde_json::from_value::<SitesResponse>(value) {
                Ok(parsed) => parsed.sites,
                Err(e) => {
                    tracing::warn!(error = %e, "could not decode Webflow sites response");
                    Vec::new()
                }
            },
            Err(_) => Vec::new(),
        }
    }

    async fn create_webhooks(
        &self,
        site_id: &str,
        token: &str,
    ) -> Result<WebhookRegistration, PlatformError> {
        let existing = match self.get_webhooks(site_id, token).await {
            Ok(hooks) => hooks,
            Err(e) => {
                tracing::warn!(
                    site_id,
                    error = %e,
                    "could not list existing webhooks, registering all"
                );
                Vec::new()
            }
        };
        let registered: HashSet<&str> = existing
            .iter()
            .filter(|hook| same_callback(&hook.url, &self.callback_url))
            .map(|hook| hook.trigger_type.as_str())
            .collect();

        let mut outcome = WebhookRegistration::default();
        let mut attempted = 0usize;
        for trigger in WEBHOOK_TRIGGERS {
            if registered.contains(trigger) {
                outcome.skipped.push(trigger.to_string());
                continue;
            }
            attempted += 1;
            match self.register_webhook(site_id, token, trigger).await {
                Ok(hook) => outcome.webhooks.push(hook),
                Err(e) => outcome.errors.push(format!("{}: {}", trigger, e)),
            }
        }

        if attempted > 0 && outcome.webhooks.is_empty() {
            self.logs
                .error(
                    None,
                    LOG_EVENT,
                    "Failed to register any webhook",
                    Some(json!({ "site_id": site_id, "errors": outcome.errors })),
                )
                .await;
            return Err(PlatformError::WebhooksFailed {
                errors: outcome.errors,
            });
        }

        if !outcome.errors.is_empty() {
            self.logs
                .warning(
                    None,
                    LOG_EVENT,
                    "Some webhooks could not be registered",
                    Some(json!({
                        "site_id": site_id,
                        "created": outcome.webhooks.len(),
                        "errors": outcome.errors,
                    })),
                )
                .await;
        } else {
            tracing::info!(
                site_id,
                created = outcome.webhooks.len(),
                skipped = outcome.skipped.len(),
                "webhooks registered"
            );
        }

        Ok(outcome)
    }

    async fn get_webhooks(
        &self,
        site_id: &str,
        token: &str,
    ) -> Result<Vec<RemoteWebhook>, PlatformError> {
        let request = self
            .http
            .get(self.url(&format!("/sites/{}/webhooks", site_id)));
        let value = self
            .send(request, token, "list_webhooks", json!({ "site_id": site_id }))
            .await?;
        let parsed: WebhooksResponse =
            serde_json::from_value(value).map_err(|e| PlatformError::Decode(e.to_string()))?;
        Ok(parsed.webhooks)
    }

    async fn update_order(
        &self,
        site_id: &str,
        order_id: &str,
        token: &str,
        fields: &OrderUpdateFields,
    ) -> Result<JsonValue, PlatformError> {
        let request = self
            .http
            .patch(self.order_url(site_id, order_id, None))
            .json(&fields.to_body());
        self.send(
            request,
            token,
            "update_order",
            json!({ "site_id": site_id, "order_id": order_id }),
        )
        .await
    }

    async fn fulfill_order(
        &self,
        site_id: &str,
        order_id: &str,
        token: &str,
        send_email: bool,
    ) -> Result<JsonValue, PlatformError> {
        let request = self
            .http
            .post(self.order_url(site_id, order_id, Some("fulfill")))
            .json(&json!({ "sendOrderFulfilledEmail": send_email }));
        self.send(
            request,
            token,
            "fulfill_order",
            json!({ "site_id": site_id, "order_id": order_id }),
        )
        .await
    }

    async fn unfulfill_order(
        &self,
        site_id: &str,
        order_id: &str,
        token: &str,
    ) -> Result<JsonValue, PlatformError> {
        let request = self
            .http
            .post(self.order_url(site_id, order_id, Some("unfulfill")))
            .json(&json!({}));
        self.send(
            request,
            token,
            "unfulfill_order",
            json!({ "site_id": site_id, "order_id": order_id }),
        )
        .await
    }

    async fn refund_order(
        &self,
        site_id: &str,
        order_id: &str,
        token: &str,
        reason: Option<RefundReason>,
    ) -> Result<JsonValue, PlatformError> {
        let body = match reason {
            Some(reason) => json!({ "reason": reason }),
            None => json!({}),
        };
        let request = self
            .http
            .post(self.order_url(site_id, order_id, Some("refund")))
            .json(&body);
        self.send(
            request,
            token,
            "refund_order",
            json!({ "site_id": site_id, "order_id": order_id }),
        )
        .await
    }
}
