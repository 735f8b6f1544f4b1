use crate::app_state::AppState;
use crate::repositories::transaction_repository::TransactionRepository;
use crate::security::Claims;
use crate::services::audit_service::AuditService;
use crate::services::balance_service::BalanceService;
use crate::services::order_service::OrderService;
use astroledger_primitives::error::ApiError;
use astroledger_primitives::models::dtos::dispute_dto::ResolveTransactionRequest;
use astroledger_primitives::models::dtos::transaction_dto::TransactionDto;
use astroledger_primitives::models::entities::audit_log::AuditEvent;
use astroledger_primitives::models::entities::enum_types::{TransactionPurpose, TransactionStatus, TransactionType};
use diesel::prelude::*;
use serde_json::json;
use tracing::info;
use validator::Validate;

pub struct DisputeService;

impl DisputeService {
    /// Administrator override of a stuck transaction. Completing it applies
    /// the wallet effect in the same database transaction.
    pub async fn resolve(
        state: &AppState,
        claims: &Claims,
        transaction_id: &str,
        req: ResolveTransactionRequest,
    ) -> Result<TransactionDto, ApiError> {
        let admin_id = claims.require_admin()?;
        req.validate()?;

        let mut conn = state.db.get()?;

        let (previous, resolved) = conn.transaction::<_, ApiError, _>(|conn| {
            let tx = TransactionRepository::find_by_public_id_for_update(conn, transaction_id)?
                .ok_or_else(|| {
                    ApiError::NotFound(format!("Transaction {} not found", transaction_id))
                })?;

            let target = tx.status.transition(req.status)?;
            let resolved = TransactionRepository::resolve(
                conn,
                tx.id,
                target,
                admin_id,
                &req.admin_action,
                req.admin_notes.as_deref(),
            )?;

            if target == TransactionStatus::Completed && !resolved.balance_applied {
                BalanceService::apply(conn, &resolved)?;
            }

            if let Some(order_id) = resolved.order_id {
                let funds_order = target == TransactionStatus::Completed
                    && resolved.transaction_type == TransactionType::Credit
                    && resolved.purpose == TransactionPurpose::ProductPurchase;
                if funds_order {
                    OrderService::settle_gateway_credit(conn, &resolved)?;
                } else {
                    OrderService::refresh_projection(conn, order_id)?;
                }
            }

            let resolved = TransactionRepository::find_by_id(conn, resolved.id)?
                .ok_or_else(|| ApiError::Internal("resolved transaction vanished".into()))?;
            Ok((tx.status, resolved))
        })?;

        info!(
            transaction_id = %resolved.transaction_id,
            admin_id = %admin_id,
            from = %previous,
            to = %resolved.status,
            action = %req.admin_action,
            "Transaction resolved by administrator"
        );

        let _ = AuditService::log_transaction(
            state,
            Some(admin_id),
            AuditEvent::TransactionResolved,
            &resolved.transaction_id,
            json!({
                "from": previous,
                "to": resolved.status,
                "admin_action": req.admin_action,
                "balance_applied": resolved.balance_applied,
            }),
        )
        .await;

        Ok(TransactionDto::from(resolved))
    }
}
