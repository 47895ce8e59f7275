use axum::{
    extract::{Query, State},
    response::{IntoResponse, Json},
    Extension,
};

use crate::{
    dto::{
        oauth_dto::{AuthorizeQuery, CallbackQuery},
        store_dto::StoreView,
    },
    error::{Error, Result},
    middleware::auth::Claims,
    AppState,
};

#[axum::debug_handler]
pub async fn authorize(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<AuthorizeQuery>,
) -> Result<impl IntoResponse> {
    let request = state
        .oauth_service
        .authorization_request(&claims.sub, query.store_id)
        .await?;
    Ok(Json(request))
}

/// Redirect target of the platform consent screen. The browser arrives
/// without a bearer token; the signed state identifies the operator.
#[axum::debug_handler]
pub async fn callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> Result<impl IntoResponse> {
    if let Some(error) = query.error {
        let detail = query.error_description.unwrap_or_default();
        let reason = format!("{} {}", error, detail).trim().to_string();
        return Err(Error::OAuthExchangeFailed(reason));
    }
    let state_param = query.state.ok_or(Error::SecurityCheckFailed)?;
    let code = query
        .code
        .ok_or_else(|| Error::BadRequest("Missing authorization code".to_string()))?;

    let store = state
        .oauth_service
        .handle_callback(&code, &state_param)
        .await?;
    Ok(Json(StoreView::from(store)))
}
