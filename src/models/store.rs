use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use super::platform::PlatformKind;

/// Token bundle returned by the platform's token endpoint.
///
/// `access_token` is opaque and kept byte-for-byte: it is never trimmed,
/// escaped or otherwise sanitized on its way in or out of storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthCredentials {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Store {
    pub id: Uuid,
    pub title: String,
    pub platform_type: String,
    pub platform_site_id: Option<String>,
    #[serde(skip)]
    pub oauth_credentials: Option<Json<OAuthCredentials>>,
    pub webhook_status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Store {
    pub fn platform(&self) -> Option<PlatformKind> {
        self.platform_type.parse().ok()
    }

    pub fn credentials(&self) -> Option<&OAuthCredentials> {
        self.oauth_credentials.as_ref().map(|c| &c.0)
    }

    pub fn access_token(&self) -> Option<&str> {
        self.credentials().map(|c| c.access_token.as_str())
    }

    pub fn is_connected(&self) -> bool {
        self.access_token().is_some()
    }
}

#[derive(Debug, Clone)]
pub struct NewStore {
    pub title: String,
    pub platform: PlatformKind,
    pub platform_site_id: Option<String>,
    pub oauth_credentials: Option<OAuthCredentials>,
}
