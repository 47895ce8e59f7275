use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::store_dto::{CreateStorePayload, SelectSitePayload, StoreView},
    error::{Error, Result},
    models::{platform::WebhookStatus, store::NewStore},
    AppState,
};

#[axum::debug_handler]
pub async fn list_stores(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let stores = state.store_service.list().await?;
    let items: Vec<StoreView> = stores.into_iter().map(StoreView::from).collect();
    Ok(Json(items))
}

#[axum::debug_handler]
pub async fn create_store(
    State(state): State<AppState>,
    Json(payload): Json<CreateStorePayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let store = state
        .store_service
        .create(NewStore {
            title: payload.title,
            platform: payload.platform,
            platform_site_id: payload.platform_site_id,
            oauth_credentials: None,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(StoreView::from(store))))
}

#[axum::debug_handler]
pub async fn get_store(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let store = state.store_service.get(id).await?;
    Ok(Json(StoreView::from(store)))
}

#[axum::debug_handler]
pub async fn list_sites(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let store = state.store_service.get(id).await?;
    let token = store
        .access_token()
        .ok_or_else(|| Error::Unauthorized("Store is not connected".to_string()))?;
    let platform = store
        .platform()
        .ok_or_else(|| Error::Internal(format!("Unknown platform {}", store.platform_type)))?;
    let client = state.platforms.client_for(platform, "list_sites")?;
    let sites = client.list_remote_stores(token).await;
    Ok(Json(json!({ "sites": sites })))
}

#[axum::debug_handler]
pub async fn select_site(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SelectSitePayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let store = state
        .store_service
        .select_site(id, &payload.site_id, payload.title.as_deref())
        .await?;
    Ok(Json(StoreView::from(store)))
}

#[axum::debug_handler]
pub async fn get_webhooks(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let store = state.store_service.get(id).await?;
    let (client, site_id, token) = connected_site(&state, &store, "get_webhooks")?;
    let webhooks = client.get_webhooks(&site_id, &token).await?;
    Ok(Json(json!({ "webhooks": webhooks })))
}

#[axum::debug_handler]
pub async fn create_webhooks(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let store = state.store_service.get(id).await?;
    let (client, site_id, token) = connected_site(&state, &store, "create_webhooks")?;

    match client.create_webhooks(&site_id, &token).await {
        Ok(registration) => {
            state
                .store_service
                .set_webhook_status(id, WebhookStatus::Active)
                .await?;
            state
                .log_service
                .success(
                    Some(id),
                    "webhooks",
                    "Webhooks registered",
                    Some(json!({
                        "created": registration.webhooks.len(),
                        "skipped": registration.skipped,
                    })),
                )
                .await;
            Ok(Json(registration))
        }
        Err(e) => {
            state
                .store_service
                .set_webhook_status(id, WebhookStatus::Failed)
                .await?;
            Err(e.into())
        }
    }
}

fn connected_site(
    state: &AppState,
    store: &crate::models::store::Store,
    operation: &'static str,
) -> Result<(
    std::sync::Arc<dyn crate::services::platform::PlatformClient>,
    String,
    String,
)> {
    let platform = store
        .platform()
        .ok_or_else(|| Error::Internal(format!("Unknown platform {}", store.platform_type)))?;
    let client = state.platforms.client_for(platform, operation)?;
    let site_id = store
        .platform_site_id
        .clone()
        .ok_or_else(|| Error::BadRequest("Store has no site selected".to_string()))?;
    let token = store
        .access_token()
        .ok_or_else(|| Error::Unauthorized("Store is not connected".to_string()))?
        .to_string();
    Ok((client, site_id, token))
}
