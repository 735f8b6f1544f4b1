use astroledger_core::services::commission_service::CommissionService;
use astroledger_core::{AppState, Claims};
use astroledger_primitives::error::{ApiError, ApiErrorResponse};
use astroledger_primitives::models::dtos::commission_dto::{CommissionReport, CommissionReportQuery};
use axum::extract::{Extension, Json, Query, State};
use std::sync::Arc;

#[utoipa::path(
    get,
    path = "/api/admin/commission-report",
    params(CommissionReportQuery),
    responses(
        (status = 200, body = CommissionReport),
        (status = 400, body = ApiErrorResponse),
        (status = 403, body = ApiErrorResponse)
    ),
    security(("bearerAuth" = [])),
    tag = "Commission"
)]
pub async fn commission_report(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<CommissionReportQuery>,
) -> Result<Json<CommissionReport>, ApiError> {
    claims.require_admin()?;
    Ok(Json(
        CommissionService::report(&state, query.from, query.to).await?,
    ))
}
