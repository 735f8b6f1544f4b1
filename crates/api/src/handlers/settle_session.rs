use astroledger_core::services::commission_service::CommissionService;
use astroledger_core::{AppState, Claims};
use astroledger_primitives::error::{ApiError, ApiErrorResponse};
use astroledger_primitives::models::dtos::commission_dto::SettlementResponse;
use axum::extract::{Extension, Json, Path, State};
use std::sync::Arc;
use uuid::Uuid;

#[utoipa::path(
    post,
    path = "/api/sessions/{session_id}/settle",
    summary = "Settle a completed consultation",
    description = "Debits the customer and credits the astrologer's commission in one \
                   transaction. Settling twice returns the original pair.",
    params(("session_id" = Uuid, Path)),
    responses(
        (status = 200, body = SettlementResponse),
        (status = 400, description = "Session not completed", body = ApiErrorResponse),
        (status = 403, body = ApiErrorResponse),
        (status = 404, body = ApiErrorResponse),
        (status = 422, description = "Customer balance too low", body = ApiErrorResponse)
    ),
    security(("bearerAuth" = [])),
    tag = "Commission"
)]
pub async fn settle_session(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SettlementResponse>, ApiError> {
    claims.require_admin()?;
    Ok(Json(
        CommissionService::settle_session(&state, session_id).await?,
    ))
}
