use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Inbound webhook body. Field names follow either the platform's camelCase
/// or snake_case spelling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEnvelope {
    #[serde(alias = "triggerType", alias = "event_type")]
    pub trigger_type: Option<String>,
    #[serde(alias = "siteId")]
    pub site_id: Option<String>,
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub payload: JsonValue,
}

#[derive(Debug, Clone, Serialize)]
pub struct WebhookAck {
    pub success: bool,
}
