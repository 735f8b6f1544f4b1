use astroledger_core::services::dispute_service::DisputeService;
use astroledger_core::{AppState, Claims};
use astroledger_primitives::error::{ApiError, ApiErrorResponse};
use astroledger_primitives::models::dtos::dispute_dto::ResolveTransactionRequest;
use astroledger_primitives::models::dtos::transaction_dto::TransactionDto;
use axum::extract::{Extension, Json, Path, State};
use std::sync::Arc;

#[utoipa::path(
    patch,
    path = "/api/transactions/{transaction_id}",
    summary = "Resolve a pending or disputed transaction",
    description = "Administrator only. Moves a pending transaction to a terminal status and \
                   records the administrator's action. Completing a transaction applies its \
                   wallet effect atomically.",
    params(
        ("transaction_id" = String, Path, description = "Transaction id or reference id")
    ),
    request_body = ResolveTransactionRequest,
    responses(
        (status = 200, description = "Transaction resolved", body = TransactionDto),
        (status = 400, description = "Invalid target status", body = ApiErrorResponse),
        (status = 403, description = "Administrator role required", body = ApiErrorResponse),
        (status = 404, description = "Transaction not found", body = ApiErrorResponse),
        (status = 409, description = "Transaction already finalized", body = ApiErrorResponse),
        (status = 422, description = "Balance cannot cover the withdrawal", body = ApiErrorResponse)
    ),
    tag = "Transactions",
    security(("bearerAuth" = [])),
)]
pub async fn resolve_transaction(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(transaction_id): Path<String>,
    Json(req): Json<ResolveTransactionRequest>,
) -> Result<Json<TransactionDto>, ApiError> {
    Ok(Json(
        DisputeService::resolve(&state, &claims, &transaction_id, req).await?,
    ))
}
