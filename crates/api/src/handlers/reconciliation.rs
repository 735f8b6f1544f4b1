use astroledger_core::services::reconciliation_service::ReconciliationService;
use astroledger_core::{AppState, Claims};
use astroledger_primitives::error::{ApiError, ApiErrorResponse};
use astroledger_primitives::models::dtos::reconciliation_dto::{
    ReconciliationReport, ReconciliationTrigger,
};
use axum::extract::{Extension, Json, State};
use std::sync::Arc;
use tracing::info;

#[utoipa::path(
    post,
    path = "/api/admin/reconciliation/run",
    summary = "Run reconciliation now",
    description = "Resolves stale pending gateway transactions and repairs derived state. \
                   Returns `skipped = true` when another run holds the lock.",
    responses(
        (status = 200, body = ReconciliationReport),
        (status = 403, body = ApiErrorResponse)
    ),
    security(("bearerAuth" = [])),
    tag = "Reconciliation"
)]
pub async fn run_reconciliation(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<ReconciliationReport>, ApiError> {
    let admin_id = claims.require_admin()?;
    info!(admin_id = %admin_id, "On-demand reconciliation requested");

    Ok(Json(
        ReconciliationService::run(&state, ReconciliationTrigger::OnDemand).await?,
    ))
}
