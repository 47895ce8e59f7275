mod common;

use axum::http::StatusCode;
use serde_json::json;
use storefront_sync::{
    error::Error, models::platform::PlatformKind, models::store::NewStore,
    services::oauth_service::exchange_code_for_token,
};
use wiremock::{
    matchers::{body_string_contains, header, method, path},
    Mock, MockServer, ResponseTemplate,
};

const OPAQUE_TOKEN: &str = "wf+a/b=c==d%2Bq&x";

#[tokio::test]
async fn token_exchange_posts_form_and_keeps_token_bytes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/access_token"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=auth-code-1"))
        .and(body_string_contains("client_id=client-123"))
        .and(body_string_contains("client_secret=secret-456"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": OPAQUE_TOKEN,
            "token_type": "bearer"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let token = exchange_code_for_token(
        &reqwest::Client::new(),
        &format!("{}/oauth/access_token", server.uri()),
        "auth-code-1",
        "client-123",
        "secret-456",
        "https://sync.example.com/api/oauth/callback",
    )
    .await
    .unwrap();

    assert_eq!(token.access_token.as_bytes(), OPAQUE_TOKEN.as_bytes());
    assert_eq!(token.token_type, "bearer");
    assert_eq!(token.refresh_token, None);
}

#[tokio::test]
async fn token_exchange_failures_are_classified() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rejected"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({ "error": "invalid_grant" })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/empty"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "token_type": "bearer" })))
        .mount(&server)
        .await;

    let http = reqwest::Client::new();
    let rejected = exchange_code_for_token(
        &http,
        &format!("{}/rejected", server.uri()),
        "c",
        "id",
        "secret",
        "https://x/cb",
    )
    .await;
    assert!(matches!(rejected, Err(Error::OAuthExchangeFailed(_))));

    let empty = exchange_code_for_token(
        &http,
        &format!("{}/empty", server.uri()),
        "c",
        "id",
        "secret",
        "https://x/cb",
    )
    .await;
    assert!(matches!(empty, Err(Error::OAuthResponseInvalid(_))));

    let unreachable = exchange_code_for_token(
        &http,
        "http://127.0.0.1:9/token",
        "c",
        "id",
        "secret",
        "https://x/cb",
    )
    .await;
    assert!(matches!(unreachable, Err(Error::OAuthExchangeFailed(_))));
}

#[tokio::test]
async fn connect_flow_persists_token_and_selects_single_site() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/access_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": OPAQUE_TOKEN,
            "token_type": "bearer"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/sites"))
        .and(header("authorization", format!("Bearer {}", OPAQUE_TOKEN).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "sites": [{ "id": "site_123", "displayName": "Jane's Shop", "shortName": "janes" }]
        })))
        .mount(&server)
        .await;

    let state = common::memory_state(common::test_config(&server.uri()));
    let app = common::app(&state);
    let auth = common::bearer("operator-1");
    let store = state
        .store_service
        .create(NewStore {
            title: "Pending connection".into(),
            platform: PlatformKind::Webflow,
            platform_site_id: None,
            oauth_credentials: None,
        })
        .await
        .unwrap();

    let (status, body) = common::send(
        &app,
        "GET",
        &format!("/api/oauth/authorize?store_id={}", store.id),
        Some(&auth),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let state_param = body["state"].as_str().unwrap().to_string();
    assert!(state_param.ends_with(&format!("|{}", store.id)));
    let url = url::Url::parse(body["authorization_url"].as_str().unwrap()).unwrap();
    let scope = url
        .query_pairs()
        .find(|(k, _)| k == "scope")
        .map(|(_, v)| v.into_owned())
        .unwrap();
    assert!(scope.split(' ').any(|s| s == "ecommerce:write"));

    let callback = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("code", "auth-code-1")
        .append_pair("state", &state_param)
        .finish();
    // The platform redirects the browser here, so no bearer token is sent.
    let (status, body) = common::send(
        &app,
        "GET",
        &format!("/api/oauth/callback?{}", callback),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["id"], json!(store.id));
    assert_eq!(body["connected"], true);
    assert_eq!(body["platform_site_id"], "site_123");
    assert_eq!(body["title"], "Jane's Shop");
    assert!(body.get("oauth_credentials").is_none());

    let stored = state.store_service.get(store.id).await.unwrap();
    assert_eq!(stored.access_token(), Some(OPAQUE_TOKEN));
}

#[tokio::test]
async fn callback_without_bearer_creates_store_for_operator() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/access_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": OPAQUE_TOKEN,
            "token_type": "bearer"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/sites"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "sites": [] })))
        .mount(&server)
        .await;

    let state = common::memory_state(common::test_config(&server.uri()));
    let app = common::app(&state);
    let issued = state.oauth_service.issue_state("operator-1", None);

    let (status, body) = common::send(
        &app,
        "GET",
        &format!("/api/oauth/callback?code=abc&state={}", issued),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["connected"], true);
    assert!(body["platform_site_id"].is_null());

    let verified = state.oauth_service.verify_state(&issued).unwrap();
    assert_eq!(verified.operator, "operator-1");
    assert_eq!(verified.store_id, None);
}

#[tokio::test]
async fn forged_or_tampered_state_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/access_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access_token": "t" })))
        .expect(0)
        .mount(&server)
        .await;

    let state = common::memory_state(common::test_config(&server.uri()));
    let app = common::app(&state);
    let store_a = uuid::Uuid::new_v4();
    let store_b = uuid::Uuid::new_v4();

    let issued = state.oauth_service.issue_state("operator-1", Some(store_a));
    let (token, _) = issued.rsplit_once('|').unwrap();
    let (_, nonce) = token.split_once('.').unwrap();

    let rejected = [
        // store swapped after signing
        format!("{}|{}", token, store_b),
        // operator swapped after signing
        format!("{}.{}|{}", hex::encode("operator-2"), nonce, store_a),
        // store dropped after signing
        token.to_string(),
        format!("{}.00000000000000000000", hex::encode("operator-1")),
        "00000000000000000000".to_string(),
    ];
    for forged in rejected {
        let query = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("code", "c")
            .append_pair("state", &forged)
            .finish();
        let (status, _) = common::send(
            &app,
            "GET",
            &format!("/api/oauth/callback?{}", query),
            None,
            None,
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN, "state {}", forged);
    }

    let (status, _) =
        common::send(&app, "GET", "/api/oauth/callback?code=c", None, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn deployment_constants_make_settings_read_only() {
    let state = common::memory_state(common::test_config("http://127.0.0.1:9"));
    let app = common::app(&state);
    let auth = common::bearer("operator-1");

    let (status, body) = common::send(&app, "GET", "/api/settings/oauth", Some(&auth), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["source"], "constant");
    assert_eq!(body["read_only"], true);
    assert_eq!(body["client_id"], "client-123");
    assert!(body.get("client_secret").is_none());

    let (status, _) = common::send(
        &app,
        "PUT",
        "/api/settings/oauth",
        Some(&auth),
        Some(json!({ "client_id": "other", "client_secret": "other" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn stored_settings_apply_without_constants() {
    let mut config = common::test_config("http://127.0.0.1:9");
    config.webflow_client_id = None;
    config.webflow_client_secret = None;
    let state = common::memory_state(config);
    let app = common::app(&state);
    let auth = common::bearer("operator-1");

    let (_, body) = common::send(&app, "GET", "/api/settings/oauth", Some(&auth), None).await;
    assert_eq!(body["source"], "missing");

    let (status, body) = common::send(
        &app,
        "PUT",
        "/api/settings/oauth",
        Some(&auth),
        Some(json!({ "client_id": "stored-id", "client_secret": "stored-secret" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["source"], "stored");
    assert_eq!(body["read_only"], false);
    assert_eq!(body["client_id"], "stored-id");
    assert_eq!(body["has_client_secret"], true);
}

#[tokio::test]
async fn operator_routes_require_bearer_token() {
    let state = common::memory_state(common::test_config("http://127.0.0.1:9"));
    let app = common::app(&state);

    let (status, _) = common::send(&app, "GET", "/api/stores", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = common::send(&app, "GET", "/api/stores", Some("Bearer nope"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = common::send(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
}
