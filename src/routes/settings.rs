use axum::{
    extract::State,
    response::{IntoResponse, Json},
};
use validator::Validate;

use crate::{
    dto::oauth_dto::{OAuthSettingsView, UpdateOAuthSettingsPayload},
    error::Result,
    AppState,
};

#[axum::debug_handler]
pub async fn get_oauth_settings(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let resolved = state.oauth_service.credentials().await?;
    Ok(Json(OAuthSettingsView::new(
        resolved,
        state.config.oauth_redirect_uri(),
    )))
}

#[axum::debug_handler]
pub async fn update_oauth_settings(
    State(state): State<AppState>,
    Json(payload): Json<UpdateOAuthSettingsPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let resolved = state
        .oauth_service
        .save_stored_credentials(&payload.client_id, payload.client_secret.as_deref())
        .await?;
    Ok(Json(OAuthSettingsView::new(
        resolved,
        state.config.oauth_redirect_uri(),
    )))
}
