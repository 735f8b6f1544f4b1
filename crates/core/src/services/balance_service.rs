use crate::repositories::transaction_repository::TransactionRepository;
use crate::repositories::user_repository::UserRepository;
use astroledger_primitives::error::ApiError;
use astroledger_primitives::models::entities::enum_types::{
    TransactionPurpose, TransactionStatus, TransactionType,
};
use astroledger_primitives::models::transaction::{NewTransaction, Transaction};
use astroledger_primitives::utility::{
    generate_reference_id, generate_transaction_id, validate_amount,
};
use diesel::prelude::*;
use serde_json::Value;
use tracing::{debug, info};
use uuid::Uuid;

/// Everything needed to write one ledger row.
#[derive(Debug, Clone)]
pub struct LedgerEntry<'a> {
    pub user_id: Uuid,
    pub transaction_type: TransactionType,
    pub purpose: TransactionPurpose,
    pub amount: i64,
    pub payment_reference: Option<&'a str>,
    pub payment_method: Option<&'a str>,
    pub gateway_order_id: Option<&'a str>,
    pub session_id: Option<Uuid>,
    pub order_id: Option<Uuid>,
    pub commission_rate: Option<i32>,
    pub platform_fee: Option<i64>,
    pub description: Option<&'a str>,
    pub metadata: Value,
}

impl<'a> LedgerEntry<'a> {
    pub fn new(
        user_id: Uuid,
        transaction_type: TransactionType,
        purpose: TransactionPurpose,
        amount: i64,
    ) -> Self {
        Self {
            user_id,
            transaction_type,
            purpose,
            amount,
            payment_reference: None,
            payment_method: None,
            gateway_order_id: None,
            session_id: None,
            order_id: None,
            commission_rate: None,
            platform_fee: None,
            description: None,
            metadata: Value::Object(Default::default()),
        }
    }

    pub fn payment_reference(mut self, reference: Option<&'a str>) -> Self {
        self.payment_reference = reference;
        self
    }

    pub fn payment_method(mut self, method: Option<&'a str>) -> Self {
        self.payment_method = method;
        self
    }

    pub fn gateway_order(mut self, gateway_order_id: Option<&'a str>) -> Self {
        self.gateway_order_id = gateway_order_id;
        self
    }

    pub fn session(mut self, session_id: Uuid) -> Self {
        self.session_id = Some(session_id);
        self
    }

    pub fn order(mut self, order_id: Option<Uuid>) -> Self {
        self.order_id = order_id;
        self
    }

    pub fn commission(mut self, rate: i32, platform_fee: i64) -> Self {
        self.commission_rate = Some(rate);
        self.platform_fee = Some(platform_fee);
        self
    }

    pub fn description(mut self, description: &'a str) -> Self {
        self.description = Some(description);
        self
    }

    pub fn metadata(mut self, metadata: Value) -> Self {
        self.metadata = metadata;
        self
    }
}

/// The only writer of `users.wallet_balance`.
pub struct BalanceService;

impl BalanceService {
    /// Credits the wallet at most once per payment reference. A reference
    /// already on file returns its transaction with `false` and moves nothing.
    pub fn credit(
        conn: &mut PgConnection,
        entry: LedgerEntry,
    ) -> Result<(Transaction, bool), ApiError> {
        if !entry.transaction_type.is_inflow() {
            return Err(ApiError::Internal(format!(
                "{} is not a credit",
                entry.transaction_type
            )));
        }

        match Self::record_completed(conn, entry) {
            Ok(tx) => Ok((tx, true)),
            Err(ApiError::DuplicatePaymentReference(existing)) => {
                debug!(
                    transaction_id = %existing.transaction_id,
                    "Payment reference already credited"
                );
                Ok((*existing, false))
            }
            Err(e) => Err(e),
        }
    }

    /// Fails with `InsufficientBalance` when the wallet cannot cover it.
    pub fn debit(conn: &mut PgConnection, entry: LedgerEntry) -> Result<Transaction, ApiError> {
        if entry.transaction_type.is_inflow() {
            return Err(ApiError::Internal(format!(
                "{} is not a debit",
                entry.transaction_type
            )));
        }
        Self::record_completed(conn, entry)
    }

    /// Appends a completed row and moves the balance in the same database
    /// transaction. A debit the balance cannot cover leaves nothing behind.
    fn record_completed(
        conn: &mut PgConnection,
        entry: LedgerEntry,
    ) -> Result<Transaction, ApiError> {
        validate_amount(entry.amount)?;

        conn.transaction::<_, ApiError, _>(|conn| {
            let tx = Self::append(conn, &entry, TransactionStatus::Completed, true)?;
            let new_balance = Self::adjust(conn, tx.user_id, tx.transaction_type, tx.amount)?;

            info!(
                transaction_id = %tx.transaction_id,
                user_id = %tx.user_id,
                kind = %tx.transaction_type,
                amount = tx.amount,
                new_balance,
                "Ledger entry recorded"
            );
            Ok(tx)
        })
    }

    /// Appends a pending row; the balance moves when it completes.
    pub fn record_pending(
        conn: &mut PgConnection,
        entry: LedgerEntry,
    ) -> Result<Transaction, ApiError> {
        validate_amount(entry.amount)?;
        Self::append(conn, &entry, TransactionStatus::Pending, false)
    }

    /// Appends a row that is already terminal without a wallet effect.
    pub fn record_failed(
        conn: &mut PgConnection,
        entry: LedgerEntry,
    ) -> Result<Transaction, ApiError> {
        validate_amount(entry.amount)?;
        Self::append(conn, &entry, TransactionStatus::Failed, false)
    }

    /// Applies the wallet effect of a completed transaction at most once.
    /// Returns `false` when it had already been applied.
    pub fn apply(conn: &mut PgConnection, tx: &Transaction) -> Result<bool, ApiError> {
        conn.transaction::<_, ApiError, _>(|conn| {
            if !TransactionRepository::mark_balance_applied(conn, tx.id)? {
                debug!(transaction_id = %tx.transaction_id, "Wallet effect already applied");
                return Ok(false);
            }

            let new_balance = Self::adjust(conn, tx.user_id, tx.transaction_type, tx.amount)?;
            info!(
                transaction_id = %tx.transaction_id,
                user_id = %tx.user_id,
                amount = tx.signed_amount(),
                new_balance,
                "Wallet effect applied"
            );
            Ok(true)
        })
    }

    /// Completes a pending row and applies its wallet effect.
    pub fn complete(
        conn: &mut PgConnection,
        tx: &Transaction,
        payment_reference: Option<&str>,
        payment_method: Option<&str>,
    ) -> Result<Transaction, ApiError> {
        tx.status.transition(TransactionStatus::Completed)?;

        conn.transaction::<_, ApiError, _>(|conn| {
            let completed = TransactionRepository::finalize(
                conn,
                tx.id,
                TransactionStatus::Completed,
                payment_reference,
                payment_method,
            )?;
            Self::apply(conn, &completed)?;

            TransactionRepository::find_by_id(conn, completed.id)?
                .ok_or_else(|| ApiError::Internal("completed transaction vanished".into()))
        })
    }

    fn append(
        conn: &mut PgConnection,
        entry: &LedgerEntry,
        status: TransactionStatus,
        balance_applied: bool,
    ) -> Result<Transaction, ApiError> {
        let reference_id = generate_reference_id(entry.transaction_type, entry.purpose);
        let transaction_id = generate_transaction_id();

        TransactionRepository::append(
            conn,
            &NewTransaction {
                user_id: entry.user_id,
                transaction_type: entry.transaction_type,
                purpose: entry.purpose,
                amount: entry.amount,
                payment_reference: entry.payment_reference,
                reference_id: &reference_id,
                transaction_id: &transaction_id,
                status,
                balance_applied,
                payment_method: entry.payment_method,
                gateway_order_id: entry.gateway_order_id,
                session_id: entry.session_id,
                order_id: entry.order_id,
                commission_rate: entry.commission_rate,
                platform_fee: entry.platform_fee,
                description: entry.description,
                metadata: entry.metadata.clone(),
            },
        )
    }

    fn adjust(
        conn: &mut PgConnection,
        user_id: Uuid,
        kind: TransactionType,
        amount: i64,
    ) -> Result<i64, ApiError> {
        if kind.is_inflow() {
            UserRepository::credit_balance(conn, user_id, amount)
        } else {
            UserRepository::debit_balance(conn, user_id, amount)
        }
    }
}
