use crate::app_state::AppState;
use crate::repositories::audit_repository::AuditLogRepository;
use astroledger_primitives::error::ApiError;
use astroledger_primitives::models::entities::audit_log::{AuditEvent, NewAuditLog};
use tracing::warn;
use uuid::Uuid;

pub struct AuditService;

impl AuditService {
    pub async fn log_event(
        state: &AppState,
        user_id: Option<Uuid>,
        event: AuditEvent,
        target_type: Option<&str>,
        target_id: Option<&str>,
        metadata: serde_json::Value,
    ) -> Result<(), ApiError> {
        let mut conn = state
            .db
            .get()
            .map_err(|e| ApiError::DatabaseConnection(e.to_string()))?;

        let new_log = NewAuditLog {
            id: Uuid::new_v4(),
            user_id,
            event_type: event.to_string(),
            target_type: target_type.map(|s| s.to_string()),
            target_id: target_id.map(|s| s.to_string()),
            metadata,
            ip_address: None,
        };

        AuditLogRepository::create(&mut conn, new_log).inspect_err(|e| {
            warn!(error = %e, event = %event, "Failed to write audit log");
        })
    }

    pub async fn log_transaction(
        state: &AppState,
        actor: Option<Uuid>,
        event: AuditEvent,
        transaction_id: &str,
        metadata: serde_json::Value,
    ) -> Result<(), ApiError> {
        let mut conn = state
            .db
            .get()
            .map_err(|e| ApiError::DatabaseConnection(e.to_string()))?;

        AuditLogRepository::create(
            &mut conn,
            NewAuditLog::for_transaction(event, actor, transaction_id, metadata),
        )
        .inspect_err(|e| {
            warn!(error = %e, event = %event, "Failed to write audit log");
        })
    }
}
