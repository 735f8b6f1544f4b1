use astroledger_core::services::payment_service::PaymentService;
use astroledger_core::{AppState, Claims};
use astroledger_primitives::error::{ApiError, ApiErrorResponse};
use astroledger_primitives::models::dtos::wallet_dto::{WithdrawRequest, WithdrawResponse};
use astroledger_primitives::models::entities::enum_types::UserRole;
use axum::extract::{Extension, Json, State};
use http::StatusCode;
use std::sync::Arc;

#[utoipa::path(
    post,
    path = "/api/wallet/withdraw",
    request_body = WithdrawRequest,
    responses(
        (status = 202, description = "Withdrawal requested, awaiting payout", body = WithdrawResponse),
        (status = 400, description = "Invalid amount", body = ApiErrorResponse),
        (status = 403, description = "Only astrologers can withdraw", body = ApiErrorResponse),
        (status = 422, description = "Insufficient balance", body = ApiErrorResponse)
    ),
    security(("bearerAuth" = [])),
    tag = "Wallet"
)]
pub async fn withdraw(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<WithdrawRequest>,
) -> Result<(StatusCode, Json<WithdrawResponse>), ApiError> {
    let user_id = claims.require_role(UserRole::Astrologer)?;
    let response = PaymentService::request_withdrawal(&state, user_id, req).await?;
    Ok((StatusCode::ACCEPTED, Json(response)))
}
