use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::config::{CredentialSource, ResolvedCredentials};

#[derive(Debug, Deserialize)]
pub struct AuthorizeQuery {
    pub store_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateOAuthSettingsPayload {
    #[validate(length(min = 1, max = 255))]
    pub client_id: String,
    #[validate(length(min = 1, max = 255))]
    pub client_secret: Option<String>,
}

/// Resolved client credentials without the secret.
#[derive(Debug, Serialize)]
pub struct OAuthSettingsView {
    pub client_id: Option<String>,
    pub has_client_secret: bool,
    pub source: CredentialSource,
    pub read_only: bool,
    pub redirect_uri: String,
}

impl OAuthSettingsView {
    pub fn new(resolved: ResolvedCredentials, redirect_uri: String) -> Self {
        Self {
            client_id: resolved.client_id,
            has_client_secret: resolved.client_secret.is_some(),
            source: resolved.source,
            read_only: resolved.read_only,
            redirect_uri,
        }
    }
}
