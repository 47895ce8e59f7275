pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use crate::{
    config::Config,
    database::Repositories,
    error::{Error, Result},
    services::{
        fulfillment_service::FulfillmentService,
        log_service::LogService,
        oauth_service::OAuthService,
        order_service::OrderService,
        platform::{webflow::WebflowClient, PlatformRegistry},
        store_service::StoreService,
        webhook_service::WebhookService,
    },
    utils::time::{Clock, SystemClock},
};
use axum::{
    routing::{get, post},
    Router,
};
use reqwest::Client;
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub log_service: LogService,
    pub store_service: StoreService,
    pub order_service: OrderService,
    pub oauth_service: OAuthService,
    pub platforms: PlatformRegistry,
    pub webhook_service: WebhookService,
    pub fulfillment_service: FulfillmentService,
}

impl AppState {
    pub fn new(pool: PgPool, config: Arc<Config>) -> Result<Self> {
        Self::from_repositories(config, Repositories::postgres(pool), Arc::new(SystemClock))
    }

    pub fn from_repositories(
        config: Arc<Config>,
        repos: Repositories,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.http_timeout_secs))
            .build()
            .map_err(|e| Error::Internal(format!("Failed to build HTTP client: {}", e)))?;

        let log_service = LogService::new(
            repos.logs.clone(),
            clock.clone(),
            config.log_dedup_window_secs,
        );
        let store_service =
            StoreService::new(repos.stores.clone(), clock.clone(), config.list_cache_ttl_secs);
        let order_service =
            OrderService::new(repos.orders.clone(), clock.clone(), config.list_cache_ttl_secs);

        let webflow = WebflowClient::new(
            http_client.clone(),
            config.webflow_api_base.clone(),
            config.webflow_authorize_url.clone(),
            config.webflow_token_url.clone(),
            config.webhook_callback_url(),
            log_service.clone(),
        );
        let platforms = PlatformRegistry::new().with_client(Arc::new(webflow));

        let oauth_service = OAuthService::new(
            config.clone(),
            repos.settings.clone(),
            store_service.clone(),
            platforms.clone(),
            http_client,
            clock.clone(),
            log_service.clone(),
        );
        let webhook_service = WebhookService::new(
            store_service.clone(),
            order_service.clone(),
            clock.clone(),
            log_service.clone(),
        );
        let fulfillment_service = FulfillmentService::new(
            order_service.clone(),
            store_service.clone(),
            platforms.clone(),
            clock,
            log_service.clone(),
        );

        Ok(Self {
            config,
            log_service,
            store_service,
            order_service,
            oauth_service,
            platforms,
            webhook_service,
            fulfillment_service,
        })
    }
}

/// Every route of the service. Transport layers (tracing, CORS, body limits)
/// are added by the binary.
pub fn router(state: AppState) -> Router {
    let operator_api = Router::new()
        .route("/api/oauth/authorize", get(routes::oauth::authorize))
        .route(
            "/api/settings/oauth",
            get(routes::settings::get_oauth_settings).put(routes::settings::update_oauth_settings),
        )
        .route(
            "/api/stores",
            get(routes::stores::list_stores).post(routes::stores::create_store),
        )
        .route("/api/stores/:id", get(routes::stores::get_store))
        .route("/api/stores/:id/sites", get(routes::stores::list_sites))
        .route("/api/stores/:id/site", post(routes::stores::select_site))
        .route(
            "/api/stores/:id/webhooks",
            get(routes::stores::get_webhooks).post(routes::stores::create_webhooks),
        )
        .route("/api/orders", get(routes::orders::list_orders))
        .route(
            "/api/orders/:id",
            get(routes::orders::get_order).patch(routes::orders::update_order),
        )
        .route("/api/orders/:id/fulfill", post(routes::orders::fulfill_order))
        .route(
            "/api/orders/:id/unfulfill",
            post(routes::orders::unfulfill_order),
        )
        .route("/api/orders/:id/refund", post(routes::orders::refund_order))
        .route("/api/logs", get(routes::logs::list_logs))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_operator,
        ));

    Router::new()
        .route("/health", get(routes::health::health))
        .route("/webhook", post(routes::webhook::receive))
        .route("/api/oauth/callback", get(routes::oauth::callback))
        .merge(operator_api)
        .with_state(state)
}
