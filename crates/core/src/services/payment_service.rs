use crate::app_state::AppState;
use crate::repositories::order_repository::OrderRepository;
use crate::repositories::transaction_repository::TransactionRepository;
use crate::repositories::user_repository::UserRepository;
use crate::services::audit_service::AuditService;
use crate::services::balance_service::{BalanceService, LedgerEntry};
use crate::services::order_service::OrderService;
use astroledger_primitives::error::{ApiError, GatewayError};
use astroledger_primitives::models::dtos::order_dto::{
    OrderPaymentMethod, OrderPaymentRequest, OrderPaymentResponse,
};
use astroledger_primitives::models::dtos::providers::gateway::{
    GatewayOrderRequest, GatewayPayment, PaymentConfirmation, NOTE_ORDER_ID, NOTE_PURPOSE,
    NOTE_RECEIPT, NOTE_USER_ID,
};
use astroledger_primitives::models::dtos::transaction_dto::TransactionDto;
use astroledger_primitives::models::dtos::wallet_dto::{
    RechargeRequest, RechargeResponse, WithdrawRequest, WithdrawResponse,
};
use astroledger_primitives::models::entities::audit_log::AuditEvent;
use astroledger_primitives::models::entities::enum_types::{
    OrderPaymentStatus, TransactionPurpose, TransactionStatus, TransactionType,
};
use astroledger_primitives::models::order::Order;
use astroledger_primitives::models::transaction::Transaction;
use astroledger_primitives::utility::validate_amount;
use diesel::prelude::*;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

/// Result of feeding one gateway confirmation through the idempotency guard.
#[derive(Debug)]
pub struct ConfirmationOutcome {
    pub transaction: Transaction,
    /// The payment had already been recorded; nothing changed.
    pub duplicate: bool,
    /// Debit spending a product-order credit, when one was appended.
    pub order_debit: Option<Transaction>,
}

impl ConfirmationOutcome {
    fn duplicate(transaction: Transaction) -> Self {
        Self {
            transaction,
            duplicate: true,
            order_debit: None,
        }
    }

    fn recorded(transaction: Transaction, order_debit: Option<Transaction>) -> Self {
        Self {
            transaction,
            duplicate: false,
            order_debit,
        }
    }
}

pub struct PaymentService;

impl PaymentService {
    pub async fn recharge(
        state: &AppState,
        user_id: Uuid,
        req: RechargeRequest,
    ) -> Result<RechargeResponse, ApiError> {
        req.validate()?;
        validate_amount(req.amount)?;

        let response = match req.payment_id.as_deref() {
            Some(payment_id) => Self::recharge_with_payment(state, user_id, &req, payment_id).await?,
            None => Self::recharge_via_checkout(state, user_id, &req).await?,
        };

        let _ = AuditService::log_transaction(
            state,
            Some(user_id),
            AuditEvent::RechargeInitiated,
            &response.transaction_id,
            json!({
                "amount": req.amount,
                "payment_method": req.payment_method,
                "payment_id": req.payment_id,
                "status": response.status,
                "duplicate": response.duplicate,
            }),
        )
        .await;

        Ok(response)
    }

    async fn recharge_with_payment(
        state: &AppState,
        user_id: Uuid,
        req: &RechargeRequest,
        payment_id: &str,
    ) -> Result<RechargeResponse, ApiError> {
        {
            let mut conn = state.db.get()?;
            if let Some(existing) =
                TransactionRepository::find_by_payment_reference(&mut conn, payment_id)?
            {
                if existing.user_id != user_id {
                    return Err(ApiError::Forbidden(
                        "Payment is recorded for another user".into(),
                    ));
                }
                if existing.status.is_terminal() {
                    info!(payment_id, transaction_id = %existing.transaction_id, "Recharge replayed");
                    return Self::recharge_response(&mut conn, existing, true);
                }
            }
        }

        match state.gateway.fetch_payment(payment_id).await {
            Ok(Some(payment)) if payment.is_captured() => {
                if payment.amount != req.amount {
                    return Err(ApiError::BadRequest(format!(
                        "Captured amount {} does not match requested amount {}",
                        payment.amount, req.amount
                    )));
                }
                if payment.noted_user().is_some_and(|noted| noted != user_id) {
                    return Err(ApiError::Forbidden("Payment belongs to another user".into()));
                }

                let mut confirmation = PaymentConfirmation::from_payment(&payment);
                confirmation.user_id = Some(user_id);
                confirmation.expected_owner = Some(user_id);
                if confirmation.method.is_none() {
                    confirmation.method = Some(req.payment_method.clone());
                }

                let outcome = Self::record_confirmation(state, confirmation).await?;
                let mut conn = state.db.get()?;
                Self::recharge_response(&mut conn, outcome.transaction, outcome.duplicate)
            }
            Ok(Some(payment)) if payment.is_failed() => {
                let mut conn = state.db.get()?;
                let entry = LedgerEntry::new(
                    user_id,
                    TransactionType::Credit,
                    TransactionPurpose::Recharge,
                    req.amount,
                )
                .payment_reference(Some(payment_id))
                .payment_method(Some(&req.payment_method))
                .gateway_order(payment.order_id.as_deref())
                .description("Wallet recharge")
                .metadata(json!({ "gateway_error": payment.error_description }));

                match BalanceService::record_failed(&mut conn, entry) {
                    Ok(_) | Err(ApiError::DuplicatePaymentReference(_)) => {}
                    Err(e) => return Err(e),
                }

                Err(ApiError::PaymentFailed(
                    payment
                        .error_description
                        .unwrap_or_else(|| "Payment was declined".into()),
                ))
            }
            Ok(Some(payment)) => {
                info!(payment_id, status = ?payment.status, "Payment not captured yet");
                let mut conn = state.db.get()?;
                Self::record_pending_reference(&mut conn, user_id, req, payment_id)
            }
            Ok(None) => Err(ApiError::NotFound(format!(
                "Payment {} not found at gateway",
                payment_id
            ))),
            Err(GatewayError::Unavailable(msg)) | Err(GatewayError::InvalidResponse(msg)) => {
                warn!(payment_id, error = %msg, "Gateway unavailable, recharge left pending");
                let mut conn = state.db.get()?;
                Self::record_pending_reference(&mut conn, user_id, req, payment_id)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn recharge_via_checkout(
        state: &AppState,
        user_id: Uuid,
        req: &RechargeRequest,
    ) -> Result<RechargeResponse, ApiError> {
        let mut conn = state.db.get()?;
        UserRepository::find_by_id(&mut conn, user_id)?
            .ok_or_else(|| ApiError::NotFound(format!("User {} not found", user_id)))?;

        let tx = BalanceService::record_pending(
            &mut conn,
            LedgerEntry::new(
                user_id,
                TransactionType::Credit,
                TransactionPurpose::Recharge,
                req.amount,
            )
            .payment_method(Some(&req.payment_method))
            .description("Wallet recharge"),
        )?;

        let gateway_order_id = Self::open_gateway_order(state, &mut conn, &tx, None).await?;
        Self::recharge_response_with_order(&mut conn, tx, Some(gateway_order_id), false)
    }

    /// Creates the gateway order for a pending credit. On failure the credit
    /// is failed, since nothing can ever be paid against it.
    async fn open_gateway_order(
        state: &AppState,
        conn: &mut PgConnection,
        tx: &Transaction,
        order_id: Option<Uuid>,
    ) -> Result<String, ApiError> {
        let mut notes = json!({
            NOTE_USER_ID: tx.user_id.to_string(),
            NOTE_PURPOSE: tx.purpose.to_string(),
            NOTE_RECEIPT: tx.reference_id,
        });
        if let Some(order_id) = order_id {
            notes[NOTE_ORDER_ID] = json!(order_id.to_string());
        }

        let request = GatewayOrderRequest {
            amount: tx.amount,
            currency: state.config.currency.clone(),
            receipt: tx.reference_id.clone(),
            notes,
        };

        match state.gateway.create_order(&request).await {
            Ok(order) => {
                TransactionRepository::set_gateway_order(conn, tx.id, &order.id)?;
                info!(
                    transaction_id = %tx.transaction_id,
                    gateway_order_id = %order.id,
                    "Gateway order created"
                );
                Ok(order.id)
            }
            Err(e) => {
                warn!(
                    transaction_id = %tx.transaction_id,
                    error = %e,
                    "Gateway order creation failed"
                );
                let failed = TransactionRepository::finalize(
                    conn,
                    tx.id,
                    TransactionStatus::Failed,
                    None,
                    None,
                )?;
                if let Some(order_id) = failed.order_id {
                    OrderService::refresh_projection(conn, order_id)?;
                }
                Err(e.into())
            }
        }
    }

    fn record_pending_reference(
        conn: &mut PgConnection,
        user_id: Uuid,
        req: &RechargeRequest,
        payment_id: &str,
    ) -> Result<RechargeResponse, ApiError> {
        let entry = LedgerEntry::new(
            user_id,
            TransactionType::Credit,
            TransactionPurpose::Recharge,
            req.amount,
        )
        .payment_reference(Some(payment_id))
        .payment_method(Some(&req.payment_method))
        .description("Wallet recharge");

        match BalanceService::record_pending(conn, entry) {
            Ok(tx) => Self::recharge_response(conn, tx, false),
            Err(ApiError::DuplicatePaymentReference(existing)) => {
                Self::recharge_response(conn, *existing, true)
            }
            Err(e) => Err(e),
        }
    }

    fn recharge_response(
        conn: &mut PgConnection,
        tx: Transaction,
        duplicate: bool,
    ) -> Result<RechargeResponse, ApiError> {
        let gateway_order_id = tx.gateway_order_id.clone();
        Self::recharge_response_with_order(conn, tx, gateway_order_id, duplicate)
    }

    fn recharge_response_with_order(
        conn: &mut PgConnection,
        tx: Transaction,
        gateway_order_id: Option<String>,
        duplicate: bool,
    ) -> Result<RechargeResponse, ApiError> {
        let user = UserRepository::find_by_id(conn, tx.user_id)?
            .ok_or_else(|| ApiError::NotFound(format!("User {} not found", tx.user_id)))?;

        let gateway_order_id = match tx.status {
            TransactionStatus::Pending => gateway_order_id,
            _ => None,
        };

        Ok(RechargeResponse {
            transaction_id: tx.transaction_id,
            reference_id: tx.reference_id,
            status: tx.status,
            new_balance: user.wallet_balance,
            gateway_order_id,
            duplicate,
        })
    }

    /// Records a captured payment at most once. A concurrent delivery that
    /// loses the race on the unique payment reference is retried once and
    /// then observes the winner's row.
    pub async fn record_confirmation(
        state: &AppState,
        confirmation: PaymentConfirmation,
    ) -> Result<ConfirmationOutcome, ApiError> {
        let mut conn = state.db.get()?;

        let outcome = match Self::confirm(&mut conn, &confirmation) {
            Err(e) if e.is_unique_violation() => {
                warn!(
                    payment_id = %confirmation.payment_id,
                    "Concurrent confirmation detected, retrying"
                );
                Self::confirm(&mut conn, &confirmation)?
            }
            other => other?,
        };

        if outcome.duplicate {
            info!(
                payment_id = %confirmation.payment_id,
                transaction_id = %outcome.transaction.transaction_id,
                "Duplicate payment confirmation ignored"
            );
            return Ok(outcome);
        }

        info!(
            payment_id = %confirmation.payment_id,
            transaction_id = %outcome.transaction.transaction_id,
            amount = outcome.transaction.amount,
            "Payment confirmed"
        );

        let _ = AuditService::log_transaction(
            state,
            Some(outcome.transaction.user_id),
            AuditEvent::PaymentConfirmed,
            &outcome.transaction.transaction_id,
            json!({
                "payment_id": confirmation.payment_id,
                "gateway_order_id": confirmation.gateway_order_id,
                "amount": confirmation.amount,
                "order_debit": outcome.order_debit.as_ref().map(|d| d.transaction_id.clone()),
            }),
        )
        .await;

        Ok(outcome)
    }

    /// The idempotency guard itself, inside one database transaction.
    pub fn confirm(
        conn: &mut PgConnection,
        confirmation: &PaymentConfirmation,
    ) -> Result<ConfirmationOutcome, ApiError> {
        validate_amount(confirmation.amount)?;

        conn.transaction::<_, ApiError, _>(|conn| {
            if let Some(existing) = TransactionRepository::find_by_payment_reference_for_update(
                conn,
                &confirmation.payment_id,
            )? {
                Self::ensure_owner(&existing, confirmation)?;
                if existing.status.is_terminal() {
                    return Ok(ConfirmationOutcome::duplicate(existing));
                }
                return Self::complete_pending(conn, &existing, confirmation);
            }

            let by_order = match confirmation.gateway_order_id.as_deref() {
                Some(gateway_order_id) => {
                    TransactionRepository::find_pending_by_gateway_order_for_update(
                        conn,
                        gateway_order_id,
                    )?
                }
                None => None,
            };

            let pending = match (by_order, confirmation.receipt.as_deref()) {
                (Some(tx), _) => Some(tx),
                (None, Some(receipt)) => {
                    TransactionRepository::find_pending_by_reference_id_for_update(conn, receipt)?
                }
                (None, None) => None,
            };

            if let Some(tx) = pending {
                Self::ensure_owner(&tx, confirmation)?;
                return Self::complete_pending(conn, &tx, confirmation);
            }

            let user_id = confirmation.expected_owner.or(confirmation.user_id).ok_or_else(|| {
                ApiError::BadRequest(format!(
                    "Payment {} matches no transaction and names no user",
                    confirmation.payment_id
                ))
            })?;
            UserRepository::find_by_id(conn, user_id)?
                .ok_or_else(|| ApiError::NotFound(format!("User {} not found", user_id)))?;

            let entry = LedgerEntry::new(
                user_id,
                TransactionType::Credit,
                TransactionPurpose::Recharge,
                confirmation.amount,
            )
            .payment_reference(Some(&confirmation.payment_id))
            .payment_method(confirmation.method.as_deref())
            .gateway_order(confirmation.gateway_order_id.as_deref())
            .description("Wallet recharge")
            .metadata(json!({
                "source": "unmatched_capture",
                "noted_purpose": confirmation.purpose,
                "noted_order_id": confirmation.order_id,
            }));

            match BalanceService::credit(conn, entry)? {
                (tx, true) => Ok(ConfirmationOutcome::recorded(tx, None)),
                (existing, false) => {
                    Self::ensure_owner(&existing, confirmation)?;
                    Ok(ConfirmationOutcome::duplicate(existing))
                }
            }
        })
    }

    fn ensure_owner(tx: &Transaction, confirmation: &PaymentConfirmation) -> Result<(), ApiError> {
        match confirmation.expected_owner {
            Some(owner) if owner != tx.user_id => {
                warn!(
                    payment_id = %confirmation.payment_id,
                    transaction_id = %tx.transaction_id,
                    "Payment is bound to another user's transaction"
                );
                Err(ApiError::Forbidden("Payment belongs to another user".into()))
            }
            _ => Ok(()),
        }
    }

    fn complete_pending(
        conn: &mut PgConnection,
        tx: &Transaction,
        confirmation: &PaymentConfirmation,
    ) -> Result<ConfirmationOutcome, ApiError> {
        if tx.amount != confirmation.amount {
            warn!(
                transaction_id = %tx.transaction_id,
                expected = tx.amount,
                captured = confirmation.amount,
                "Captured amount mismatch, transaction left pending"
            );
            return Err(ApiError::BadRequest(format!(
                "Captured amount {} does not match transaction amount {}",
                confirmation.amount, tx.amount
            )));
        }

        let purpose_differs = confirmation.purpose.is_some_and(|p| p != tx.purpose);
        let order_differs = confirmation
            .order_id
            .is_some_and(|order_id| tx.order_id != Some(order_id));
        if purpose_differs || order_differs {
            warn!(
                transaction_id = %tx.transaction_id,
                noted_purpose = ?confirmation.purpose,
                noted_order_id = ?confirmation.order_id,
                "Payment notes disagree with transaction, left pending"
            );
            return Err(ApiError::BadRequest(format!(
                "Payment {} was not raised for transaction {}",
                confirmation.payment_id, tx.transaction_id
            )));
        }

        let method = confirmation
            .method
            .as_deref()
            .or(tx.payment_method.as_deref());
        let completed =
            BalanceService::complete(conn, tx, Some(&confirmation.payment_id), method)?;

        let order_debit = match completed.purpose {
            TransactionPurpose::ProductPurchase => {
                OrderService::settle_gateway_credit(conn, &completed)?
            }
            _ => None,
        };

        Ok(ConfirmationOutcome::recorded(completed, order_debit))
    }

    /// Fails the pending transaction bound to a declined payment. Failures on
    /// a gateway order are not final, since the customer may retry on it.
    pub async fn record_failure(
        state: &AppState,
        payment: &GatewayPayment,
    ) -> Result<Option<Transaction>, ApiError> {
        let mut conn = state.db.get()?;

        let failed = conn.transaction::<_, ApiError, _>(|conn| {
            let Some(tx) =
                TransactionRepository::find_by_payment_reference_for_update(conn, &payment.id)?
            else {
                return Ok(None);
            };

            if tx.status.is_terminal() {
                return Ok(None);
            }

            let failed =
                TransactionRepository::finalize(conn, tx.id, TransactionStatus::Failed, None, None)?;
            if let Some(order_id) = failed.order_id {
                OrderService::refresh_projection(conn, order_id)?;
            }
            Ok(Some(failed))
        })?;

        match &failed {
            Some(tx) => {
                info!(payment_id = %payment.id, transaction_id = %tx.transaction_id, "Payment failed");
                let _ = AuditService::log_transaction(
                    state,
                    Some(tx.user_id),
                    AuditEvent::PaymentFailed,
                    &tx.transaction_id,
                    json!({
                        "payment_id": payment.id,
                        "reason": payment.error_description,
                    }),
                )
                .await;
            }
            None => info!(
                payment_id = %payment.id,
                gateway_order_id = ?payment.order_id,
                "Payment failure not bound to a pending transaction"
            ),
        }

        Ok(failed)
    }

    pub async fn pay_order(
        state: &AppState,
        user_id: Uuid,
        order_id: Uuid,
        req: OrderPaymentRequest,
    ) -> Result<OrderPaymentResponse, ApiError> {
        match req.method {
            OrderPaymentMethod::Wallet => Self::pay_order_from_wallet(state, user_id, order_id).await,
            OrderPaymentMethod::Gateway => {
                Self::pay_order_via_gateway(state, user_id, order_id).await
            }
        }
    }

    async fn pay_order_from_wallet(
        state: &AppState,
        user_id: Uuid,
        order_id: Uuid,
    ) -> Result<OrderPaymentResponse, ApiError> {
        let mut conn = state.db.get()?;

        let (tx, payment_status) = conn.transaction::<_, ApiError, _>(|conn| {
            let order = OrderRepository::find_by_id_for_update(conn, order_id)?;
            Self::check_payable(&order, user_id)?;

            let tx = BalanceService::debit(
                conn,
                LedgerEntry::new(
                    user_id,
                    TransactionType::Debit,
                    TransactionPurpose::ProductPurchase,
                    order.total_amount,
                )
                .order(Some(order.id))
                .payment_method(Some("wallet"))
                .description("Order payment"),
            )?;

            let (payment_status, _) = OrderService::refresh_projection(conn, order.id)?;
            Ok((tx, payment_status))
        })?;

        let _ = AuditService::log_transaction(
            state,
            Some(user_id),
            AuditEvent::OrderPaid,
            &tx.transaction_id,
            json!({ "order_id": order_id, "amount": tx.amount, "method": "wallet" }),
        )
        .await;

        Ok(OrderPaymentResponse {
            order_id,
            payment_status,
            transaction: TransactionDto::from(tx).redacted(),
            gateway_order_id: None,
        })
    }

    async fn pay_order_via_gateway(
        state: &AppState,
        user_id: Uuid,
        order_id: Uuid,
    ) -> Result<OrderPaymentResponse, ApiError> {
        let mut conn = state.db.get()?;

        let (tx, reused) = conn.transaction::<_, ApiError, _>(|conn| {
            let order = OrderRepository::find_by_id_for_update(conn, order_id)?;
            Self::check_payable(&order, user_id)?;

            if let Some(existing) = TransactionRepository::pending_order_credit(conn, order.id)? {
                if existing.gateway_order_id.is_some() {
                    return Ok((existing, true));
                }
            }

            let tx = BalanceService::record_pending(
                conn,
                LedgerEntry::new(
                    user_id,
                    TransactionType::Credit,
                    TransactionPurpose::ProductPurchase,
                    order.total_amount,
                )
                .order(Some(order.id))
                .payment_method(Some("gateway"))
                .description("Order checkout"),
            )?;
            OrderService::refresh_projection(conn, order.id)?;
            Ok((tx, false))
        })?;

        let gateway_order_id = match (&tx.gateway_order_id, reused) {
            (Some(existing), true) => existing.clone(),
            _ => Self::open_gateway_order(state, &mut conn, &tx, Some(order_id)).await?,
        };

        Ok(OrderPaymentResponse {
            order_id,
            payment_status: OrderPaymentStatus::AwaitingPayment,
            transaction: TransactionDto::from(tx).redacted(),
            gateway_order_id: Some(gateway_order_id),
        })
    }

    fn check_payable(order: &Order, user_id: Uuid) -> Result<(), ApiError> {
        if order.customer_id != user_id {
            return Err(ApiError::Forbidden("Order belongs to another customer".into()));
        }
        if order.payment_status == OrderPaymentStatus::Paid {
            return Err(ApiError::AlreadyFinalized(format!(
                "Order {} is already paid",
                order.id
            )));
        }
        Ok(())
    }

    /// Reserves a payout. It must fit the balance net of other pending
    /// withdrawals; the wallet is debited when an administrator completes it.
    pub async fn request_withdrawal(
        state: &AppState,
        user_id: Uuid,
        req: WithdrawRequest,
    ) -> Result<WithdrawResponse, ApiError> {
        validate_amount(req.amount)?;
        let mut conn = state.db.get()?;

        let (tx, available) = conn.transaction::<_, ApiError, _>(|conn| {
            let user = UserRepository::find_by_id_for_update(conn, user_id)?;
            let reserved = TransactionRepository::pending_withdrawal_total(conn, user_id)?;
            let available = user.wallet_balance - reserved;

            if req.amount > available {
                return Err(ApiError::InsufficientBalance {
                    requested: req.amount,
                    available: available.max(0),
                });
            }

            let tx = BalanceService::record_pending(
                conn,
                LedgerEntry::new(
                    user_id,
                    TransactionType::Withdrawal,
                    TransactionPurpose::Payout,
                    req.amount,
                )
                .description("Wallet withdrawal"),
            )?;
            Ok((tx, available - req.amount))
        })?;

        let _ = AuditService::log_transaction(
            state,
            Some(user_id),
            AuditEvent::WithdrawalRequested,
            &tx.transaction_id,
            json!({ "amount": tx.amount, "available_after": available }),
        )
        .await;

        Ok(WithdrawResponse {
            transaction_id: tx.transaction_id,
            reference_id: tx.reference_id,
            status: tx.status,
            available_balance: available,
        })
    }
}
