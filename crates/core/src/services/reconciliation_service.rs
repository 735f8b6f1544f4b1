use crate::app_state::{AppState, DbPool};
use crate::repositories::order_repository::OrderRepository;
use crate::repositories::transaction_repository::TransactionRepository;
use crate::repositories::user_repository::UserRepository;
use crate::services::audit_service::AuditService;
use crate::services::balance_service::BalanceService;
use crate::services::order_service::OrderService;
use crate::services::payment_service::PaymentService;
use astroledger_primitives::error::{ApiError, GatewayError};
use astroledger_primitives::models::app_state::reconciliation_details::ReconciliationInfo;
use astroledger_primitives::models::dtos::providers::gateway::{
    GatewayPayment, PaymentConfirmation,
};
use astroledger_primitives::models::dtos::reconciliation_dto::{
    ReconciliationReport, ReconciliationTrigger,
};
use astroledger_primitives::models::entities::audit_log::AuditEvent;
use astroledger_primitives::models::entities::enum_types::{
    TransactionPurpose, TransactionStatus,
};
use astroledger_primitives::models::transaction::Transaction;
use chrono::{Duration, Utc};
use diesel::r2d2::{ConnectionManager, PooledConnection};
use diesel::sql_types::{BigInt, Bool};
use diesel::{PgConnection, QueryableByName, RunQueryDsl};
use serde_json::json;
use tracing::{debug, error, info, warn};

/// Key of the session-level advisory lock held for the duration of a run.
pub const RECONCILIATION_LOCK_KEY: i64 = 0x4153_5452_4f4c_4447;

/// What the gateway knows about a pending transaction.
#[derive(Debug, Clone)]
pub enum LookupOutcome {
    Captured {
        payment: GatewayPayment,
        /// `transaction_id` of another row already holding this payment.
        already_recorded_by: Option<String>,
    },
    Failed {
        payment_id: String,
    },
    NotFound,
    Unavailable(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Complete,
    CancelDuplicate,
    Fail,
    Defer,
    LeavePending,
}

/// Pure decision for one pending transaction of the given age.
pub fn decide(age: Duration, outcome: &LookupOutcome, failure_after: Duration) -> Resolution {
    match outcome {
        LookupOutcome::Captured {
            already_recorded_by: Some(_),
            ..
        } => Resolution::CancelDuplicate,
        LookupOutcome::Captured { .. } => Resolution::Complete,
        LookupOutcome::Failed { .. } => Resolution::Fail,
        LookupOutcome::Unavailable(_) => Resolution::Defer,
        LookupOutcome::NotFound if age >= failure_after => Resolution::Fail,
        LookupOutcome::NotFound => Resolution::LeavePending,
    }
}

#[derive(QueryableByName)]
struct LockRow {
    #[diesel(sql_type = Bool)]
    locked: bool,
}

/// Holds the advisory lock on a dedicated pooled connection and releases
/// it on drop.
pub struct ReconciliationLock {
    conn: PooledConnection<ConnectionManager<PgConnection>>,
}

impl ReconciliationLock {
    pub fn try_acquire(pool: &DbPool) -> Result<Option<Self>, ApiError> {
        let mut conn = pool.get()?;
        let row = diesel::sql_query("SELECT pg_try_advisory_lock($1) AS locked")
            .bind::<BigInt, _>(RECONCILIATION_LOCK_KEY)
            .get_result::<LockRow>(&mut conn)?;

        if row.locked {
            Ok(Some(Self { conn }))
        } else {
            Ok(None)
        }
    }
}

impl Drop for ReconciliationLock {
    fn drop(&mut self) {
        let released = diesel::sql_query("SELECT pg_advisory_unlock($1) AS locked")
            .bind::<BigInt, _>(RECONCILIATION_LOCK_KEY)
            .get_result::<LockRow>(&mut *self.conn);

        match released {
            Ok(row) if row.locked => debug!("Reconciliation lock released"),
            Ok(_) => warn!("Reconciliation lock was not held at release"),
            Err(e) => error!(error = %e, "Failed to release reconciliation lock"),
        }
    }
}

pub struct ReconciliationService;

impl ReconciliationService {
    pub async fn run(
        state: &AppState,
        trigger: ReconciliationTrigger,
    ) -> Result<ReconciliationReport, ApiError> {
        let Some(_lock) = ReconciliationLock::try_acquire(&state.db)? else {
            info!(trigger = %trigger, "Reconciliation already running, skipped");
            return Ok(ReconciliationReport::skipped(trigger));
        };

        let policy = state.config.reconciliation_details.clone();
        let mut report = ReconciliationReport::new(trigger);
        let mut conn = state.db.get()?;

        Self::resolve_pending(state, &mut conn, &policy, &mut report).await?;
        Self::apply_unapplied(&mut conn, &policy, &mut report)?;
        Self::resync_orders(&mut conn, &policy, &mut report)?;
        Self::check_balances(&mut conn, &policy, &mut report)?;

        report.finished_at = Some(Utc::now());
        info!(
            trigger = %trigger,
            examined = report.examined,
            completed = report.completed,
            failed = report.failed,
            cancelled_duplicates = report.cancelled_duplicates,
            deferred = report.deferred,
            balances_applied = report.balances_applied,
            orders_resynced = report.orders_resynced,
            drifted_users = report.drifted_users,
            drift_repaired = report.drift_repaired,
            "Reconciliation finished"
        );

        if report.made_changes() || report.drifted_users > 0 {
            let _ = AuditService::log_event(
                state,
                None,
                AuditEvent::ReconciliationRun,
                Some("reconciliation"),
                None,
                json!(report),
            )
            .await;
        }

        Ok(report)
    }

    async fn resolve_pending(
        state: &AppState,
        conn: &mut PgConnection,
        policy: &ReconciliationInfo,
        report: &mut ReconciliationReport,
    ) -> Result<(), ApiError> {
        let now = Utc::now();
        let candidates = TransactionRepository::pending_gateway_candidates(
            conn,
            now - Duration::minutes(policy.grace_minutes),
            policy.batch_size,
        )?;
        let failure_after = Duration::hours(policy.failure_hours);
        let examined: Vec<_> = candidates.iter().map(|tx| tx.id).collect();

        for tx in candidates {
            report.examined += 1;

            let outcome = Self::lookup(state, conn, &tx, policy).await?;
            let resolution = decide(now - tx.created_at, &outcome, failure_after);
            debug!(
                transaction_id = %tx.transaction_id,
                resolution = ?resolution,
                "Reconciliation decision"
            );

            match Self::apply_resolution(conn, &tx, &outcome, resolution) {
                Ok(()) => match resolution {
                    Resolution::Complete => report.completed += 1,
                    Resolution::CancelDuplicate => report.cancelled_duplicates += 1,
                    Resolution::Fail => report.failed += 1,
                    Resolution::Defer => report.deferred += 1,
                    Resolution::LeavePending => report.left_pending += 1,
                },
                Err(ApiError::AlreadyFinalized(_)) => {
                    debug!(transaction_id = %tx.transaction_id, "Finalized concurrently");
                }
                Err(e) => {
                    warn!(
                        transaction_id = %tx.transaction_id,
                        error = %e,
                        "Could not reconcile transaction, deferred"
                    );
                    report.deferred += 1;
                }
            }
        }

        // Rows still pending go to the back of the next batch.
        TransactionRepository::mark_examined(conn, &examined, now)?;
        Ok(())
    }

    fn apply_resolution(
        conn: &mut PgConnection,
        tx: &Transaction,
        outcome: &LookupOutcome,
        resolution: Resolution,
    ) -> Result<(), ApiError> {
        match (resolution, outcome) {
            (Resolution::Complete, LookupOutcome::Captured { payment, .. }) => {
                let mut confirmation = PaymentConfirmation::from_payment(payment);
                // Bind to this row even when the payment was found by correlation.
                confirmation.receipt = Some(tx.reference_id.clone());
                confirmation.user_id = Some(tx.user_id);
                confirmation.expected_owner = Some(tx.user_id);
                let outcome = PaymentService::confirm(conn, &confirmation)?;
                info!(
                    transaction_id = %outcome.transaction.transaction_id,
                    payment_id = %payment.id,
                    "Pending transaction completed by reconciliation"
                );
                Ok(())
            }
            (Resolution::CancelDuplicate, LookupOutcome::Captured { payment, already_recorded_by }) => {
                TransactionRepository::finalize(conn, tx.id, TransactionStatus::Cancelled, None, None)?;
                Self::refresh_order(conn, tx)?;
                info!(
                    transaction_id = %tx.transaction_id,
                    payment_id = %payment.id,
                    recorded_by = ?already_recorded_by,
                    "Duplicate pending transaction cancelled"
                );
                Ok(())
            }
            (Resolution::Fail, _) => {
                TransactionRepository::finalize(conn, tx.id, TransactionStatus::Failed, None, None)?;
                Self::refresh_order(conn, tx)?;
                info!(transaction_id = %tx.transaction_id, "Pending transaction failed by reconciliation");
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn refresh_order(conn: &mut PgConnection, tx: &Transaction) -> Result<(), ApiError> {
        if let Some(order_id) = tx.order_id {
            OrderService::refresh_projection(conn, order_id)?;
        }
        Ok(())
    }

    /// Asks the gateway by payment id, then by gateway order, then by
    /// correlating user, amount, purpose and time.
    async fn lookup(
        state: &AppState,
        conn: &mut PgConnection,
        tx: &Transaction,
        policy: &ReconciliationInfo,
    ) -> Result<LookupOutcome, ApiError> {
        if let Some(reference) = tx.payment_reference.as_deref() {
            match state.gateway.fetch_payment(reference).await {
                Ok(Some(payment)) if payment.is_captured() => {
                    return Self::captured(conn, tx, payment);
                }
                Ok(Some(payment)) if payment.is_failed() => {
                    return Ok(LookupOutcome::Failed {
                        payment_id: payment.id,
                    });
                }
                Ok(_) => {}
                Err(e) => {
                    if let Some(outcome) = Self::unavailable(e) {
                        return Ok(outcome);
                    }
                }
            }
        }

        if let Some(gateway_order_id) = tx.gateway_order_id.as_deref() {
            match state.gateway.fetch_order_payments(gateway_order_id).await {
                Ok(payments) => {
                    if let Some(payment) = payments.into_iter().find(GatewayPayment::is_captured) {
                        return Self::captured(conn, tx, payment);
                    }
                }
                Err(e) => {
                    if let Some(outcome) = Self::unavailable(e) {
                        return Ok(outcome);
                    }
                }
            }
        }

        let window = Duration::minutes(policy.correlation_minutes);
        let from = (tx.created_at - window).timestamp();
        let to = (tx.created_at + window).timestamp();

        let payments = match state.gateway.list_payments(from, to).await {
            Ok(payments) => payments,
            Err(e) => return Ok(Self::unavailable(e).unwrap_or(LookupOutcome::NotFound)),
        };

        let matching: Vec<GatewayPayment> = payments
            .into_iter()
            .filter(|p| correlates(tx, p))
            .collect();
        let ids: Vec<String> = matching.iter().map(|p| p.id.clone()).collect();
        let recorded = TransactionRepository::recorded_references(conn, &ids)?;

        let best = matching
            .into_iter()
            .filter(|p| !recorded.contains(&p.id))
            .min_by_key(|p| (p.created_at - tx.created_at.timestamp()).abs());

        Ok(match best {
            Some(payment) => LookupOutcome::Captured {
                payment,
                already_recorded_by: None,
            },
            None => LookupOutcome::NotFound,
        })
    }

    fn captured(
        conn: &mut PgConnection,
        tx: &Transaction,
        payment: GatewayPayment,
    ) -> Result<LookupOutcome, ApiError> {
        let already_recorded_by = TransactionRepository::find_by_payment_reference(conn, &payment.id)?
            .filter(|owner| owner.id != tx.id)
            .map(|owner| owner.transaction_id);

        Ok(LookupOutcome::Captured {
            payment,
            already_recorded_by,
        })
    }

    fn unavailable(err: GatewayError) -> Option<LookupOutcome> {
        match err {
            GatewayError::Unavailable(msg) | GatewayError::InvalidResponse(msg) => {
                warn!(error = %msg, "Gateway unavailable during reconciliation");
                Some(LookupOutcome::Unavailable(msg))
            }
            GatewayError::NotFound(_) | GatewayError::Rejected(_) => None,
        }
    }

    fn apply_unapplied(
        conn: &mut PgConnection,
        policy: &ReconciliationInfo,
        report: &mut ReconciliationReport,
    ) -> Result<(), ApiError> {
        for tx in TransactionRepository::completed_unapplied(conn, policy.batch_size)? {
            match BalanceService::apply(conn, &tx) {
                Ok(true) => report.balances_applied += 1,
                Ok(false) => {}
                Err(e) => warn!(
                    transaction_id = %tx.transaction_id,
                    error = %e,
                    "Could not apply wallet effect"
                ),
            }
        }
        Ok(())
    }

    fn resync_orders(
        conn: &mut PgConnection,
        policy: &ReconciliationInfo,
        report: &mut ReconciliationReport,
    ) -> Result<(), ApiError> {
        for order in OrderRepository::unpaid_with_transactions(conn, policy.batch_size)? {
            if let (_, true) = OrderService::refresh_projection(conn, order.id)? {
                report.orders_resynced += 1;
            }
        }
        Ok(())
    }

    fn check_balances(
        conn: &mut PgConnection,
        policy: &ReconciliationInfo,
        report: &mut ReconciliationReport,
    ) -> Result<(), ApiError> {
        for drift in UserRepository::balance_drift(conn)? {
            report.drifted_users += 1;
            warn!(
                user_id = %drift.user_id,
                wallet_balance = drift.wallet_balance,
                ledger_balance = drift.ledger_balance,
                "Wallet balance drift detected"
            );

            if !policy.repair_balance_drift {
                continue;
            }
            if drift.ledger_balance < 0 {
                error!(user_id = %drift.user_id, "Ledger sum is negative, not repaired");
                continue;
            }
            if UserRepository::restore_balance(conn, &drift)? {
                report.drift_repaired += 1;
            }
        }
        Ok(())
    }
}

/// Whether a gateway payment plausibly settles this pending transaction.
pub fn correlates(tx: &Transaction, payment: &GatewayPayment) -> bool {
    if !payment.is_captured() || payment.amount != tx.amount {
        return false;
    }
    if payment.noted_user() != Some(tx.user_id) {
        return false;
    }
    match payment.noted_purpose() {
        Some(purpose) => purpose == tx.purpose,
        None => tx.purpose == TransactionPurpose::Recharge,
    }
}
