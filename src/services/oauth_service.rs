use crate::config::{
    resolve_oauth_credentials, Config, ResolvedCredentials, SETTING_WEBFLOW_CLIENT_ID,
    SETTING_WEBFLOW_CLIENT_SECRET,
};
use crate::database::SettingsRepository;
use crate::error::{Error, Result};
use crate::models::platform::PlatformKind;
use crate::models::store::{NewStore, OAuthCredentials, Store};
use crate::services::log_service::LogService;
use crate::services::platform::{OAuthEndpoints, PlatformRegistry};
use crate::services::store_service::StoreService;
use crate::utils::crypto::{create_nonce, verify_nonce};
use crate::utils::time::Clock;
use serde::Serialize;
use serde_json::{json, Value as JsonValue};
use std::sync::Arc;
use url::Url;
use uuid::Uuid;

pub const STATE_ACTION: &str = "oauth_connect";
const STATE_DELIMITER: char = '|';
const OPERATOR_DELIMITER: char = '.';
const LOG_EVENT: &str = "oauth";

/// Who started a connect flow and for which store, recovered from the state
/// parameter alone since the platform redirect carries no session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedState {
    pub operator: String,
    pub store_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthorizationRequest {
    pub authorization_url: String,
    pub state: String,
}

pub fn build_authorization_url(
    authorize_url: &str,
    client_id: &str,
    redirect_uri: &str,
    scopes: &[String],
    state: &str,
) -> Result<String> {
    let mut url = Url::parse(authorize_url)
        .map_err(|e| Error::Config(format!("Invalid authorization URL: {}", e)))?;
    url.query_pairs_mut()
        .append_pair("client_id", client_id)
        .append_pair("response_type", "code")
        .append_pair("redirect_uri", redirect_uri)
        .append_pair("scope", &scopes.join(" "))
        .append_pair("state", state);
    Ok(url.into())
}

pub fn compose_state(nonce: &str, store_id: Option<Uuid>) -> String {
    match store_id {
        Some(id) => format!("{}{}{}", nonce, STATE_DELIMITER, id),
        None => nonce.to_string(),
    }
}

/// Splits `<nonce>|<store_id>` on the last delimiter only.
pub fn split_state(state: &str) -> (&str, Option<&str>) {
    match state.rsplit_once(STATE_DELIMITER) {
        Some((nonce, store)) => (nonce, Some(store)),
        None => (state, None),
    }
}

fn state_subject(operator: &str, store_id: Option<&str>) -> String {
    format!("{}{}{}", operator, STATE_DELIMITER, store_id.unwrap_or_default())
}

/// `<hex operator>.<nonce>`; hex keeps both delimiters out of the operator part.
fn state_token(operator: &str, nonce: &str) -> String {
    format!("{}{}{}", hex::encode(operator), OPERATOR_DELIMITER, nonce)
}

fn split_token(token: &str) -> Option<(String, &str)> {
    let (operator, nonce) = token.split_once(OPERATOR_DELIMITER)?;
    let operator = String::from_utf8(hex::decode(operator).ok()?).ok()?;
    Some((operator, nonce))
}

/// Token endpoint call. The access token is stored exactly as received.
pub async fn exchange_code_for_token(
    http: &reqwest::Client,
    token_url: &str,
    code: &str,
    client_id: &str,
    client_secret: &str,
    redirect_uri: &str,
) -> Result<OAuthCredentials> {
    let params = [
        ("client_id", client_id),
        ("client_secret", client_secret),
        ("code", code),
        ("grant_type", "authorization_code"),
        ("redirect_uri", redirect_uri),
    ];

    let response = http
        .post(token_url)
        .header("accept", "application/json")
        .form(&params)
        .send()
        .await
        .map_err(|e| Error::OAuthExchangeFailed(e.to_string()))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| Error::OAuthExchangeFailed(e.to_string()))?;
    if !status.is_success() {
        return Err(Error::OAuthExchangeFailed(format!(
            "token endpoint returned HTTP {}: {}",
            status.as_u16(),
            body
        )));
    }

    let value: JsonValue = serde_json::from_str(&body)
        .map_err(|e| Error::OAuthResponseInvalid(format!("response is not JSON: {}", e)))?;
    let access_token = value
        .get("access_token")
        .and_then(JsonValue::as_str)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| Error::OAuthResponseInvalid("no access_token in response".to_string()))?;

    Ok(OAuthCredentials {
        access_token: access_token.to_string(),
        token_type: value
            .get("token_type")
            .and_then(JsonValue::as_str)
            .unwrap_or("bearer")
            .to_string(),
        expires_in: value.get("expires_in").and_then(JsonValue::as_i64),
        refresh_token: value
            .get("refresh_token")
            .and_then(JsonValue::as_str)
            .map(str::to_string),
    })
}

#[derive(Clone)]
pub struct OAuthService {
    config: Arc<Config>,
    settings: Arc<dyn SettingsRepository>,
    stores: StoreService,
    platforms: PlatformRegistry,
    http: reqwest::Client,
    clock: Arc<dyn Clock>,
    logs: LogService,
}

impl OAuthService {
    pub fn new(
        config: Arc<Config>,
        settings: Arc<dyn SettingsRepository>,
        stores: StoreService,
        platforms: PlatformRegistry,
        http: reqwest::Client,
        clock: Arc<dyn Clock>,
        logs: LogService,
    ) -> Self {
        Self {
            config,
            settings,
            stores,
            platforms,
            http,
            clock,
            logs,
        }
    }

    pub async fn credentials(&self) -> Result<ResolvedCredentials> {
        let stored_id = self.settings.get(SETTING_WEBFLOW_CLIENT_ID).await?;
        let stored_secret = self.settings.get(SETTING_WEBFLOW_CLIENT_SECRET).await?;
        Ok(resolve_oauth_credentials(&self.config, stored_id, stored_secret))
    }

    /// Deployment constants win; stored values may only be edited when none is set.
    pub async fn save_stored_credentials(
        &self,
        client_id: &str,
        client_secret: Option<&str>,
    ) -> Result<ResolvedCredentials> {
        if self.credentials().await?.read_only {
            return Err(Error::BadRequest(
                "OAuth credentials are defined by the deployment and cannot be changed here"
                    .to_string(),
            ));
        }
        self.settings.set(SETTING_WEBFLOW_CLIENT_ID, client_id.trim()).await?;
        if let Some(secret) = client_secret {
            self.settings
                .set(SETTING_WEBFLOW_CLIENT_SECRET, secret.trim())
                .await?;
        }
        self.credentials().await
    }

    /// State is `<hex operator>.<nonce>|<store_id>`. The nonce signs operator
    /// and store together, so neither can be swapped on the way back.
    pub fn issue_state(&self, operator: &str, store_id: Option<Uuid>) -> String {
        let store = store_id.map(|id| id.to_string());
        let nonce = create_nonce(
            &self.config.jwt_secret,
            STATE_ACTION,
            &state_subject(operator, store.as_deref()),
            self.clock.now(),
        );
        compose_state(&state_token(operator, &nonce), store_id)
    }

    pub fn verify_state(&self, state: &str) -> Result<VerifiedState> {
        let (token, store) = split_state(state);
        let store = store.filter(|s| !s.is_empty());
        let (operator, nonce) = split_token(token).ok_or_else(|| {
            tracing::warn!("OAuth state is malformed");
            Error::SecurityCheckFailed
        })?;
        if !verify_nonce(
            &self.config.jwt_secret,
            STATE_ACTION,
            &state_subject(&operator, store),
            nonce,
            self.clock.now(),
        ) {
            tracing::warn!(operator = %operator, "OAuth state verification failed");
            return Err(Error::SecurityCheckFailed);
        }
        let store_id = store
            .map(|raw| raw.parse::<Uuid>().map_err(|_| Error::SecurityCheckFailed))
            .transpose()?;
        Ok(VerifiedState { operator, store_id })
    }

    fn endpoints(&self) -> Result<OAuthEndpoints> {
        self.platforms
            .client_for(PlatformKind::Webflow, "oauth")?
            .oauth_endpoints()
            .ok_or_else(|| Error::Config("Platform has no OAuth endpoints".to_string()))
    }

    pub async fn authorization_request(
        &self,
        operator: &str,
        store_id: Option<Uuid>,
    ) -> Result<AuthorizationRequest> {
        if let Some(id) = store_id {
            self.stores.get(id).await?;
        }
        let credentials = self.credentials().await?;
        let (client_id, _) = credentials.require()?;
        let endpoints = self.endpoints()?;
        let state = self.issue_state(operator, store_id);
        let authorization_url = build_authorization_url(
            &endpoints.authorize_url,
            client_id,
            &self.config.oauth_redirect_uri(),
            &endpoints.scopes,
            &state,
        )?;
        Ok(AuthorizationRequest {
            authorization_url,
            state,
        })
    }

    /// Verifies state, exchanges the code and persists the token bundle on the
    /// referenced store, creating one when the flow was not started from a store.
    pub async fn handle_callback(&self, code: &str, state: &str) -> Result<Store> {
        let VerifiedState { operator, store_id } = self.verify_state(state)?;
        if code.trim().is_empty() {
            return Err(Error::BadRequest("Missing authorization code".to_string()));
        }

        let credentials = self.credentials().await?;
        let (client_id, client_secret) = credentials.require()?;
        let endpoints = self.endpoints()?;

        let token = match exchange_code_for_token(
            &self.http,
            &endpoints.token_url,
            code,
            client_id,
            client_secret,
            &self.config.oauth_redirect_uri(),
        )
        .await
        {
            Ok(token) => token,
            Err(e) => {
                self.logs
                    .error(
                        store_id,
                        LOG_EVENT,
                        "OAuth token exchange failed",
                        Some(json!({ "error": e.to_string() })),
                    )
                    .await;
                return Err(e);
            }
        };

        let mut store = match store_id {
            Some(id) => {
                self.stores.get(id).await?;
                self.stores.save_credentials(id, &token).await?
            }
            None => {
                self.stores
                    .create(NewStore {
                        title: "Webflow store".to_string(),
                        platform: PlatformKind::Webflow,
                        platform_site_id: None,
                        oauth_credentials: Some(token.clone()),
                    })
                    .await?
            }
        };

        if store.platform_site_id.is_none() {
            let client = self.platforms.client_for(PlatformKind::Webflow, "list_sites")?;
            let sites = client.list_remote_stores(&token.access_token).await;
            if let [site] = sites.as_slice() {
                store = self
                    .stores
                    .select_site(store.id, &site.id, Some(&site.name))
                    .await?;
            }
        }

        self.logs
            .success(
                Some(store.id),
                LOG_EVENT,
                "Store connected",
                Some(json!({ "site_id": store.platform_site_id, "operator": operator })),
            )
            .await;
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authorization_url_carries_every_parameter() {
        let url = build_authorization_url(
            "https://webflow.com/oauth/authorize",
            "client-1",
            "https://shop.example/api/oauth/callback",
            &["sites:read".to_string(), "ecommerce:write".to_string()],
            "abc|123",
        )
        .unwrap();
        let parsed = Url::parse(&url).unwrap();
        let pairs: Vec<(String, String)> = parsed
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert!(pairs.contains(&("client_id".into(), "client-1".into())));
        assert!(pairs.contains(&("response_type".into(), "code".into())));
        assert!(pairs.contains(&(
            "redirect_uri".into(),
            "https://shop.example/api/oauth/callback".into()
        )));
        assert!(pairs.contains(&("scope".into(), "sites:read ecommerce:write".into())));
        assert!(pairs.contains(&("state".into(), "abc|123".into())));
    }

    #[test]
    fn state_splits_on_last_delimiter_once() {
        assert_eq!(split_state("nonce|store"), ("nonce", Some("store")));
        assert_eq!(split_state("a|b|c"), ("a|b", Some("c")));
        assert_eq!(split_state("nonce"), ("nonce", None));
    }

    #[test]
    fn state_token_round_trips_operator_with_delimiters() {
        let token = state_token("ops|team.lead", "0123456789abcdef0123");
        assert!(!token.contains(STATE_DELIMITER));
        let (operator, nonce) = split_token(&token).unwrap();
        assert_eq!(operator, "ops|team.lead");
        assert_eq!(nonce, "0123456789abcdef0123");
        assert!(split_token("zz.0123").is_none());
        assert!(split_token("no-delimiter").is_none());
    }

    #[test]
    fn compose_then_split_keeps_store_id() {
        let id = Uuid::new_v4();
        let state = compose_state("0123456789abcdef0123", Some(id));
        let (nonce, store) = split_state(&state);
        assert_eq!(nonce, "0123456789abcdef0123");
        assert_eq!(store, Some(id.to_string().as_str()));
    }
}
