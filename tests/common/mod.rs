#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::Value as JsonValue;
use storefront_sync::{
    config::Config, database::Repositories, middleware::auth::Claims, router,
    utils::time::SystemClock, AppState,
};
use tower::ServiceExt;

pub const JWT_SECRET: &str = "test_secret_key";
pub const PUBLIC_BASE_URL: &str = "https://sync.example.com";

/// Config pointing every Webflow endpoint at `platform_base`.
pub fn test_config(platform_base: &str) -> Config {
    Config {
        server_address: "127.0.0.1:0".to_string(),
        database_url: "postgres://unused".to_string(),
        jwt_secret: JWT_SECRET.to_string(),
        public_base_url: PUBLIC_BASE_URL.to_string(),
        webflow_client_id: Some("client-123".to_string()),
        webflow_client_secret: Some("secret-456".to_string()),
        webflow_api_base: platform_base.to_string(),
        webflow_authorize_url: format!("{}/oauth/authorize", platform_base),
        webflow_token_url: format!("{}/oauth/access_token", platform_base),
        http_timeout_secs: 5,
        list_cache_ttl_secs: 300,
        log_dedup_window_secs: 2,
    }
}

pub fn memory_state(config: Config) -> AppState {
    AppState::from_repositories(
        Arc::new(config),
        Repositories::in_memory(),
        Arc::new(SystemClock),
    )
    .expect("state")
}

pub fn app(state: &AppState) -> Router {
    router(state.clone())
}

pub fn bearer(sub: &str) -> String {
    let claims = Claims {
        sub: sub.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::hours(1)).timestamp() as usize,
        role: Some("admin".to_string()),
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("encode jwt");
    format!("Bearer {}", token)
}

pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    auth: Option<&str>,
    body: Option<JsonValue>,
) -> (StatusCode, JsonValue) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(auth) = auth {
        builder = builder.header("authorization", auth);
    }
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    let resp = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        JsonValue::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(JsonValue::Null)
    };
    (status, json)
}
