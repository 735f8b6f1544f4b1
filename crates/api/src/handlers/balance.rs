use astroledger_core::services::transaction_service::TransactionService;
use astroledger_core::{AppState, Claims};
use astroledger_primitives::error::{ApiError, ApiErrorResponse};
use astroledger_primitives::models::dtos::wallet_dto::BalanceResponse;
use axum::extract::{Extension, Json, State};
use std::sync::Arc;

#[utoipa::path(
    get,
    path = "/api/wallet/balance",
    responses(
        (status = 200, description = "Current wallet balance and ledger sum", body = BalanceResponse),
        (status = 401, description = "Unauthorized", body = ApiErrorResponse),
        (status = 404, description = "User not found", body = ApiErrorResponse)
    ),
    security(("bearerAuth" = [])),
    tag = "Wallet"
)]
pub async fn wallet_balance(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<BalanceResponse>, ApiError> {
    let user_id = claims.user_id()?;
    Ok(Json(TransactionService::balance(&state, user_id).await?))
}
