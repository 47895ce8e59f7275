use axum::{body::Bytes, extract::State, http::StatusCode, Json};

use crate::{dto::webhook_dto::WebhookAck, services::webhook_service::DispatchOutcome, AppState};

/// Always acknowledges with 200 so the platform does not retry-storm on an
/// internal problem. Failures end up in the audit log.
#[axum::debug_handler]
pub async fn receive(
    State(state): State<AppState>,
    body: Bytes,
) -> (StatusCode, Json<WebhookAck>) {
    let outcome = state.webhook_service.handle(&body).await;
    match &outcome {
        DispatchOutcome::Failed { error } => {
            tracing::warn!(error = %error, "webhook not processed")
        }
        other => tracing::debug!(outcome = ?other, "webhook processed"),
    }
    (StatusCode::OK, Json(WebhookAck { success: true }))
}
