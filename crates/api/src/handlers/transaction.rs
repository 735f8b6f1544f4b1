use astroledger_core::services::transaction_service::TransactionService;
use astroledger_core::{AppState, Claims};
use astroledger_primitives::error::{ApiError, ApiErrorResponse};
use astroledger_primitives::models::dtos::transaction_dto::TransactionDto;
use axum::extract::{Extension, Json, Path, State};
use std::sync::Arc;

#[utoipa::path(
    get,
    path = "/api/transactions/{transaction_id}",
    params(
        ("transaction_id" = String, Path, description = "Transaction id or reference id")
    ),
    responses(
        (status = 200, body = TransactionDto),
        (status = 401, body = ApiErrorResponse),
        (status = 403, body = ApiErrorResponse),
        (status = 404, body = ApiErrorResponse)
    ),
    tag = "Transactions",
    security(("bearerAuth" = [])),
)]
pub async fn get_transaction(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(transaction_id): Path<String>,
) -> Result<Json<TransactionDto>, ApiError> {
    Ok(Json(
        TransactionService::get(&state, &claims, &transaction_id).await?,
    ))
}
