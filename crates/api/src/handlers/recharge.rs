use astroledger_core::services::payment_service::PaymentService;
use astroledger_core::{AppState, Claims};
use astroledger_primitives::error::{ApiError, ApiErrorResponse};
use astroledger_primitives::models::dtos::wallet_dto::{RechargeRequest, RechargeResponse};
use astroledger_primitives::models::entities::enum_types::TransactionStatus;
use axum::extract::{Extension, Json, State};
use http::StatusCode;
use std::sync::Arc;

#[utoipa::path(
    post,
    path = "/api/wallet/recharge",
    request_body = RechargeRequest,
    responses(
        (status = 200, description = "Recharge completed, or already recorded for this payment id", body = RechargeResponse),
        (status = 202, description = "Recharge pending gateway checkout or confirmation", body = RechargeResponse),
        (status = 400, description = "Invalid amount or request", body = ApiErrorResponse),
        (status = 401, description = "Unauthorized", body = ApiErrorResponse),
        (status = 402, description = "Payment declined by the gateway", body = ApiErrorResponse),
        (status = 503, description = "Gateway unavailable, retry later", body = ApiErrorResponse)
    ),
    security(("bearerAuth" = [])),
    tag = "Wallet"
)]
pub async fn recharge(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<RechargeRequest>,
) -> Result<(StatusCode, Json<RechargeResponse>), ApiError> {
    let user_id = claims.user_id()?;
    let response = PaymentService::recharge(&state, user_id, req).await?;

    let status = match response.status {
        TransactionStatus::Pending => StatusCode::ACCEPTED,
        _ => StatusCode::OK,
    };
    Ok((status, Json(response)))
}
