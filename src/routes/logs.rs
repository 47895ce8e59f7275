use axum::{
    extract::{Query, State},
    response::{IntoResponse, Json},
};

use crate::{dto::log_dto::LogQuery, error::Result, AppState};

#[axum::debug_handler]
pub async fn list_logs(
    State(state): State<AppState>,
    Query(query): Query<LogQuery>,
) -> Result<impl IntoResponse> {
    let entries = state
        .log_service
        .recent(query.store_id, query.limit.unwrap_or(100))
        .await?;
    Ok(Json(entries))
}
