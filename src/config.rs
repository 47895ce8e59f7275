use crate::error::{Error, Result};
use dotenvy::dotenv;
use std::env;
use std::sync::OnceLock;

pub const DEFAULT_WEBFLOW_API_BASE: &str = "https://api.webflow.com/v2";
pub const DEFAULT_WEBFLOW_AUTHORIZE_URL: &str = "https://webflow.com/oauth/authorize";
pub const DEFAULT_WEBFLOW_TOKEN_URL: &str = "https://api.webflow.com/oauth/access_token";

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub database_url: String,
    pub jwt_secret: String,
    pub public_base_url: String,
    /// Deployment constants. When set they win over anything stored in `settings`.
    pub webflow_client_id: Option<String>,
    pub webflow_client_secret: Option<String>,
    pub webflow_api_base: String,
    pub webflow_authorize_url: String,
    pub webflow_token_url: String,
    pub http_timeout_secs: u64,
    pub list_cache_ttl_secs: u64,
    pub log_dedup_window_secs: i64,
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        Ok(Self {
            server_address: get_env("SERVER_ADDRESS")?,
            database_url: get_env("DATABASE_URL")?,
            jwt_secret: get_env("JWT_SECRET")?,
            public_base_url: get_env("PUBLIC_BASE_URL")?
                .trim_end_matches('/')
                .to_string(),
            webflow_client_id: get_env_opt("WEBFLOW_CLIENT_ID"),
            webflow_client_secret: get_env_opt("WEBFLOW_CLIENT_SECRET"),
            webflow_api_base: get_env_or("WEBFLOW_API_BASE", DEFAULT_WEBFLOW_API_BASE),
            webflow_authorize_url: get_env_or(
                "WEBFLOW_AUTHORIZE_URL",
                DEFAULT_WEBFLOW_AUTHORIZE_URL,
            ),
            webflow_token_url: get_env_or("WEBFLOW_TOKEN_URL", DEFAULT_WEBFLOW_TOKEN_URL),
            http_timeout_secs: get_env_parse_or("HTTP_TIMEOUT_SECS", 30)?,
            list_cache_ttl_secs: get_env_parse_or("LIST_CACHE_TTL_SECS", 300)?,
            log_dedup_window_secs: get_env_parse_or("LOG_DEDUP_WINDOW_SECS", 2)?,
        })
    }

    pub fn webhook_callback_url(&self) -> String {
        format!("{}/webhook", self.public_base_url)
    }

    pub fn oauth_redirect_uri(&self) -> String {
        format!("{}/api/oauth/callback", self.public_base_url)
    }
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_env_opt(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn get_env_or(name: &str, default: &str) -> String {
    get_env_opt(name).unwrap_or_else(|| default.to_string())
}

fn get_env_parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match get_env_opt(name) {
        Some(raw) => raw
            .parse()
            .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e))),
        None => Ok(default),
    }
}

pub fn init_config() -> Result<()> {
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| Error::Config("Configuration has already been initialized".to_string()))?;
    Ok(())
}

pub fn get_config() -> &'static Config {
    CONFIG
        .get()
        .expect("Configuration has not been initialized")
}

pub const SETTING_WEBFLOW_CLIENT_ID: &str = "webflow_client_id";
pub const SETTING_WEBFLOW_CLIENT_SECRET: &str = "webflow_client_secret";

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialSource {
    Constant,
    Stored,
    Missing,
}

/// Client id/secret after applying constant-over-stored precedence.
#[derive(Debug, Clone)]
pub struct ResolvedCredentials {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub source: CredentialSource,
    pub read_only: bool,
}

impl ResolvedCredentials {
    pub fn require(&self) -> Result<(&str, &str)> {
        match (self.client_id.as_deref(), self.client_secret.as_deref()) {
            (Some(id), Some(secret)) => Ok((id, secret)),
            _ => Err(Error::Config(
                "OAuth client id and secret are not configured".to_string(),
            )),
        }
    }
}

pub fn resolve_oauth_credentials(
    config: &Config,
    stored_client_id: Option<String>,
    stored_client_secret: Option<String>,
) -> ResolvedCredentials {
    let read_only = config.webflow_client_id.is_some() || config.webflow_client_secret.is_some();
    let client_id = config
        .webflow_client_id
        .clone()
        .or_else(|| stored_client_id.filter(|v| !v.is_empty()));
    let client_secret = config
        .webflow_client_secret
        .clone()
        .or_else(|| stored_client_secret.filter(|v| !v.is_empty()));

    let source = if read_only {
        CredentialSource::Constant
    } else if client_id.is_some() || client_secret.is_some() {
        CredentialSource::Stored
    } else {
        CredentialSource::Missing
    };

    ResolvedCredentials {
        client_id,
        client_secret,
        source,
        read_only,
    }
}
