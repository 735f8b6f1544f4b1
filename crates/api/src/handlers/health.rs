use astroledger_core::AppState;
use astroledger_primitives::models::dtos::health_dto::HealthStatus;
use axum::{extract::State, http::StatusCode, Json};
use diesel::prelude::*;
use std::sync::Arc;
use tracing::error;

#[utoipa::path(
    get,
    path = "/api/health",
    tag = "Health",
    summary = "Health check endpoint",
    description = "Returns 200 when the database answers, 503 otherwise. Public.",
    operation_id = "healthCheck",
    responses(
        (status = 200, description = "Service is healthy", body = HealthStatus),
        (status = 503, description = "Database unreachable", body = HealthStatus),
    ),
    security(()),
)]
pub async fn health_check(State(state): State<Arc<AppState>>) -> (StatusCode, Json<HealthStatus>) {
    let database = match state.db.get() {
        Ok(mut conn) => match diesel::sql_query("SELECT 1").execute(&mut conn) {
            Ok(_) => Ok(()),
            Err(e) => {
                error!("Health check DB query failed: {}", e);
                Err(())
            }
        },
        Err(e) => {
            error!("Health check DB connection failed: {}", e);
            Err(())
        }
    };

    match database {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthStatus {
                status: "ok".into(),
                database: "ok".into(),
            }),
        ),
        Err(()) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthStatus {
                status: "degraded".into(),
                database: "unavailable".into(),
            }),
        ),
    }
}
