use crate::repositories::order_repository::OrderRepository;
use crate::repositories::transaction_repository::TransactionRepository;
use crate::services::balance_service::{BalanceService, LedgerEntry};
use astroledger_primitives::error::ApiError;
use astroledger_primitives::models::entities::enum_types::{
    OrderPaymentStatus, TransactionPurpose, TransactionStatus, TransactionType,
};
use astroledger_primitives::models::transaction::Transaction;
use diesel::prelude::*;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

/// Keeps `orders.payment_status` in step with the order's transactions.
pub struct OrderService;

impl OrderService {
    /// Recomputes the projection. Returns the status and whether it changed.
    pub fn refresh_projection(
        conn: &mut PgConnection,
        order_id: Uuid,
    ) -> Result<(OrderPaymentStatus, bool), ApiError> {
        let order = OrderRepository::find_by_id(conn, order_id)?
            .ok_or_else(|| ApiError::NotFound(format!("Order {} not found", order_id)))?;

        let history: Vec<(TransactionType, TransactionStatus)> =
            TransactionRepository::for_order(conn, order_id)?
                .iter()
                .map(|tx| (tx.transaction_type, tx.status))
                .collect();

        let projected = OrderPaymentStatus::project(&history);
        if projected == order.payment_status {
            return Ok((projected, false));
        }

        OrderRepository::set_payment_status(conn, order_id, projected)?;
        info!(
            order_id = %order_id,
            from = %order.payment_status,
            to = %projected,
            "Order payment status updated"
        );
        Ok((projected, true))
    }

    /// Spends a completed gateway credit on the order it was raised for.
    /// When the order is already paid the money stays in the wallet.
    pub fn settle_gateway_credit(
        conn: &mut PgConnection,
        credit: &Transaction,
    ) -> Result<Option<Transaction>, ApiError> {
        let Some(order_id) = credit.order_id else {
            return Ok(None);
        };

        conn.transaction::<_, ApiError, _>(|conn| {
            let order = OrderRepository::find_by_id_for_update(conn, order_id)?;

            let already_paid = TransactionRepository::for_order(conn, order_id)?
                .iter()
                .any(|tx| {
                    tx.transaction_type == TransactionType::Debit
                        && tx.status == TransactionStatus::Completed
                });

            let debit = if already_paid {
                info!(
                    order_id = %order_id,
                    transaction_id = %credit.transaction_id,
                    "Order already paid, gateway credit kept in wallet"
                );
                None
            } else {
                Some(BalanceService::debit(
                    conn,
                    LedgerEntry::new(
                        order.customer_id,
                        TransactionType::Debit,
                        TransactionPurpose::ProductPurchase,
                        order.total_amount,
                    )
                    .order(Some(order_id))
                    .payment_method(credit.payment_method.as_deref())
                    .description("Order payment")
                    .metadata(json!({ "funded_by": credit.transaction_id })),
                )?)
            };

            Self::refresh_projection(conn, order_id)?;
            Ok(debit)
        })
    }
}
