use astroledger_core::services::webhook_service::{WebhookOutcome, WebhookService};
use astroledger_core::AppState;
use astroledger_primitives::error::{ApiError, ApiErrorResponse};
use axum::body::Bytes;
use axum::extract::State;
use http::{HeaderMap, StatusCode};
use std::sync::Arc;
use tracing::debug;

#[utoipa::path(
    post,
    path = "/api/webhooks/gateway",
    tag = "Webhooks",
    summary = "Receive payment gateway events",
    description = "Public endpoint. The `x-gateway-signature` header must carry the hex \
                   HMAC-SHA256 of the raw body under the webhook secret. Verified events are \
                   acknowledged with 200, redeliveries included.",
    request_body(content = String, description = "Raw JSON event payload"),
    responses(
        (status = 200, description = "Event acknowledged"),
        (status = 400, description = "Missing or invalid signature", body = ApiErrorResponse),
        (status = 500, description = "Temporary failure, the gateway should redeliver", body = ApiErrorResponse)
    ),
    security(()),
)]
pub async fn gateway_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let outcome: WebhookOutcome = WebhookService::handle_event(&state, &headers, &body).await?;
    debug!(outcome = ?outcome, "Webhook handled");
    Ok(StatusCode::OK)
}
