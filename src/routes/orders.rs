use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Json},
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::order_dto::{FulfillPayload, OrderListQuery, RefundPayload, UpdateOrderPayload},
    error::Result,
    AppState,
};

#[axum::debug_handler]
pub async fn list_orders(
    State(state): State<AppState>,
    Query(query): Query<OrderListQuery>,
) -> Result<impl IntoResponse> {
    query.validate()?;
    let list = state
        .order_service
        .list(
            query.filter(),
            query.page.unwrap_or(1),
            query.per_page.unwrap_or(20),
        )
        .await?;
    Ok(Json(list))
}

#[axum::debug_handler]
pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let order = state.order_service.get(id).await?;
    Ok(Json(order))
}

#[axum::debug_handler]
pub async fn fulfill_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    payload: Option<Json<FulfillPayload>>,
) -> Result<impl IntoResponse> {
    let payload = payload.map(|Json(p)| p).unwrap_or_default();
    let order = state
        .fulfillment_service
        .fulfill(id, payload.send_email)
        .await?;
    Ok(Json(order))
}

#[axum::debug_handler]
pub async fn unfulfill_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let order = state.fulfillment_service.unfulfill(id).await?;
    Ok(Json(order))
}

#[axum::debug_handler]
pub async fn refund_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    payload: Option<Json<RefundPayload>>,
) -> Result<impl IntoResponse> {
    let payload = payload.map(|Json(p)| p).unwrap_or_default();
    let order = state.fulfillment_service.refund(id, payload.reason).await?;
    Ok(Json(order))
}

#[axum::debug_handler]
pub async fn update_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateOrderPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let order = state
        .fulfillment_service
        .update_order(id, payload.into())
        .await?;
    Ok(Json(order))
}
