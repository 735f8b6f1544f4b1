use astroledger_core::services::transaction_service::TransactionService;
use astroledger_core::{AppState, Claims};
use astroledger_primitives::error::{ApiError, ApiErrorResponse};
use astroledger_primitives::models::dtos::transaction_dto::{TransactionPage, TransactionQuery};
use axum::extract::{Extension, Json, Query, State};
use std::sync::Arc;

#[utoipa::path(
    get,
    path = "/api/transactions",
    params(TransactionQuery),
    responses(
        (status = 200, description = "Newest first, keyset paginated", body = TransactionPage),
        (status = 400, description = "Invalid cursor or limit", body = ApiErrorResponse),
        (status = 401, description = "Unauthorized", body = ApiErrorResponse),
        (status = 403, description = "Listing another user's transactions", body = ApiErrorResponse)
    ),
    tag = "Transactions",
    security(("bearerAuth" = [])),
)]
pub async fn list_transactions(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<TransactionQuery>,
) -> Result<Json<TransactionPage>, ApiError> {
    Ok(Json(TransactionService::list(&state, &claims, query).await?))
}
