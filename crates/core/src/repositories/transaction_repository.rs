use chrono::{DateTime, Utc};
use diesel::prelude::*;
use astroledger_primitives::error::ApiError;
use astroledger_primitives::models::entities::enum_types::{
    TransactionPurpose, TransactionStatus, TransactionType,
};
use astroledger_primitives::models::transaction::{NewTransaction, Transaction};
use astroledger_primitives::schema::transactions;
use uuid::Uuid;

/// Filters for a keyset-paginated listing, newest first.
#[derive(Debug, Default, Clone)]
pub struct TransactionFilter {
    pub user_id: Option<Uuid>,
    pub transaction_type: Option<TransactionType>,
    pub status: Option<TransactionStatus>,
    pub purpose: Option<TransactionPurpose>,
    /// Position of the last row of the previous page.
    pub after: Option<(DateTime<Utc>, Uuid)>,
    pub limit: i64,
}

pub struct TransactionRepository;

impl TransactionRepository {
    /// Inserts a transaction. A payment reference already on file yields
    /// `DuplicatePaymentReference` carrying the row that owns it.
    pub fn append(
        conn: &mut PgConnection,
        new_tx: &NewTransaction,
    ) -> Result<Transaction, ApiError> {
        let inserted = diesel::insert_into(transactions::table)
            .values(new_tx)
            .on_conflict(transactions::payment_reference)
            .do_nothing()
            .get_result::<Transaction>(conn)
            .optional()?;

        if let Some(tx) = inserted {
            return Ok(tx);
        }

        let reference = new_tx
            .payment_reference
            .ok_or_else(|| ApiError::Internal("insert skipped without a conflict".into()))?;

        let existing = Self::find_by_payment_reference(conn, reference)?
            .ok_or_else(|| ApiError::Internal("conflicting payment reference vanished".into()))?;

        Err(ApiError::DuplicatePaymentReference(Box::new(existing)))
    }

    pub fn find_by_id(conn: &mut PgConnection, id: Uuid) -> Result<Option<Transaction>, ApiError> {
        transactions::table
            .find(id)
            .first::<Transaction>(conn)
            .optional()
            .map_err(ApiError::from)
    }

    /// Accepts either the opaque `transaction_id` or the `reference_id`.
    pub fn find_by_public_id(
        conn: &mut PgConnection,
        public_id: &str,
    ) -> Result<Option<Transaction>, ApiError> {
        transactions::table
            .filter(
                transactions::transaction_id
                    .eq(public_id)
                    .or(transactions::reference_id.eq(public_id)),
            )
            .first::<Transaction>(conn)
            .optional()
            .map_err(ApiError::from)
    }

    pub fn find_by_public_id_for_update(
        conn: &mut PgConnection,
        public_id: &str,
    ) -> Result<Option<Transaction>, ApiError> {
        transactions::table
            .filter(
                transactions::transaction_id
                    .eq(public_id)
                    .or(transactions::reference_id.eq(public_id)),
            )
            .for_update()
            .first::<Transaction>(conn)
            .optional()
            .map_err(ApiError::from)
    }

    pub fn find_by_payment_reference(
        conn: &mut PgConnection,
        reference: &str,
    ) -> Result<Option<Transaction>, ApiError> {
        transactions::table
            .filter(transactions::payment_reference.eq(reference))
            .first::<Transaction>(conn)
            .optional()
            .map_err(ApiError::from)
    }

    pub fn find_by_payment_reference_for_update(
        conn: &mut PgConnection,
        reference: &str,
    ) -> Result<Option<Transaction>, ApiError> {
        transactions::table
            .filter(transactions::payment_reference.eq(reference))
            .for_update()
            .first::<Transaction>(conn)
            .optional()
            .map_err(ApiError::from)
    }

    pub fn find_pending_by_gateway_order_for_update(
        conn: &mut PgConnection,
        gateway_order_id: &str,
    ) -> Result<Option<Transaction>, ApiError> {
        transactions::table
            .filter(transactions::gateway_order_id.eq(gateway_order_id))
            .filter(transactions::status.eq(TransactionStatus::Pending))
            .filter(transactions::transaction_type.eq(TransactionType::Credit))
            .order(transactions::created_at.asc())
            .for_update()
            .first::<Transaction>(conn)
            .optional()
            .map_err(ApiError::from)
    }

    pub fn find_pending_by_reference_id_for_update(
        conn: &mut PgConnection,
        reference_id: &str,
    ) -> Result<Option<Transaction>, ApiError> {
        transactions::table
            .filter(transactions::reference_id.eq(reference_id))
            .filter(transactions::status.eq(TransactionStatus::Pending))
            .filter(transactions::transaction_type.eq(TransactionType::Credit))
            .for_update()
            .first::<Transaction>(conn)
            .optional()
            .map_err(ApiError::from)
    }

    /// Moves a pending row to a terminal status, optionally binding the
    /// gateway payment that settled it. `payment_method` replaces the stored
    /// one when a reference is bound.
    pub fn finalize(
        conn: &mut PgConnection,
        id: Uuid,
        status: TransactionStatus,
        payment_reference: Option<&str>,
        payment_method: Option<&str>,
    ) -> Result<Transaction, ApiError> {
        let target = transactions::table
            .filter(transactions::id.eq(id))
            .filter(transactions::status.eq(TransactionStatus::Pending));

        let updated = match payment_reference {
            Some(reference) => diesel::update(target)
                .set((
                    transactions::status.eq(status),
                    transactions::payment_reference.eq(reference),
                    transactions::payment_method.eq(payment_method),
                    transactions::updated_at.eq(Utc::now()),
                ))
                .get_result::<Transaction>(conn)
                .optional()?,
            None => diesel::update(target)
                .set((
                    transactions::status.eq(status),
                    transactions::updated_at.eq(Utc::now()),
                ))
                .get_result::<Transaction>(conn)
                .optional()?,
        };

        updated.ok_or_else(|| ApiError::AlreadyFinalized(format!("Transaction {} is not pending", id)))
    }

    pub fn resolve(
        conn: &mut PgConnection,
        id: Uuid,
        status: TransactionStatus,
        admin_id: Uuid,
        admin_action: &str,
        admin_notes: Option<&str>,
    ) -> Result<Transaction, ApiError> {
        let now = Utc::now();

        diesel::update(
            transactions::table
                .filter(transactions::id.eq(id))
                .filter(transactions::status.eq(TransactionStatus::Pending)),
        )
        .set((
            transactions::status.eq(status),
            transactions::admin_action.eq(admin_action),
            transactions::admin_notes.eq(admin_notes),
            transactions::admin_id.eq(admin_id),
            transactions::admin_updated_at.eq(now),
            transactions::updated_at.eq(now),
        ))
        .get_result::<Transaction>(conn)
        .optional()?
        .ok_or_else(|| ApiError::AlreadyFinalized(format!("Transaction {} is not pending", id)))
    }

    pub fn set_gateway_order(
        conn: &mut PgConnection,
        id: Uuid,
        gateway_order_id: &str,
    ) -> Result<(), ApiError> {
        diesel::update(transactions::table.find(id))
            .set((
                transactions::gateway_order_id.eq(gateway_order_id),
                transactions::updated_at.eq(Utc::now()),
            ))
            .execute(conn)?;
        Ok(())
    }

    /// Claims the wallet effect of a completed row. Returns `false` when it
    /// was already claimed.
    pub fn mark_balance_applied(conn: &mut PgConnection, id: Uuid) -> Result<bool, ApiError> {
        let rows = diesel::update(
            transactions::table
                .filter(transactions::id.eq(id))
                .filter(transactions::status.eq(TransactionStatus::Completed))
                .filter(transactions::balance_applied.eq(false)),
        )
        .set((
            transactions::balance_applied.eq(true),
            transactions::updated_at.eq(Utc::now()),
        ))
        .execute(conn)?;

        Ok(rows == 1)
    }

    /// Loads `limit + 1` rows so the caller can tell whether a next page exists.
    pub fn list(
        conn: &mut PgConnection,
        filter: &TransactionFilter,
    ) -> Result<Vec<Transaction>, ApiError> {
        let mut query = transactions::table.into_boxed();

        if let Some(user_id) = filter.user_id {
            query = query.filter(transactions::user_id.eq(user_id));
        }
        if let Some(kind) = filter.transaction_type {
            query = query.filter(transactions::transaction_type.eq(kind));
        }
        if let Some(status) = filter.status {
            query = query.filter(transactions::status.eq(status));
        }
        if let Some(purpose) = filter.purpose {
            query = query.filter(transactions::purpose.eq(purpose));
        }
        if let Some((created_at, id)) = filter.after {
            query = query.filter(
                transactions::created_at.lt(created_at).or(transactions::created_at
                    .eq(created_at)
                    .and(transactions::id.lt(id))),
            );
        }

        query
            .order((transactions::created_at.desc(), transactions::id.desc()))
            .limit(filter.limit + 1)
            .load::<Transaction>(conn)
            .map_err(ApiError::from)
    }

    /// Pending gateway-funded credits created before `older_than`. Rows never
    /// examined come first, then the ones examined longest ago.
    pub fn pending_gateway_candidates(
        conn: &mut PgConnection,
        older_than: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Transaction>, ApiError> {
        transactions::table
            .filter(transactions::status.eq(TransactionStatus::Pending))
            .filter(transactions::transaction_type.eq(TransactionType::Credit))
            .filter(
                transactions::purpose
                    .eq(TransactionPurpose::Recharge)
                    .or(transactions::purpose.eq(TransactionPurpose::ProductPurchase)),
            )
            .filter(transactions::created_at.lt(older_than))
            .order((
                transactions::reconciled_at.asc().nulls_first(),
                transactions::created_at.asc(),
                transactions::id.asc(),
            ))
            .limit(limit)
            .load::<Transaction>(conn)
            .map_err(ApiError::from)
    }

    /// Stamps rows a reconciliation pass examined and left pending.
    pub fn mark_examined(
        conn: &mut PgConnection,
        ids: &[Uuid],
        at: DateTime<Utc>,
    ) -> Result<usize, ApiError> {
        diesel::update(
            transactions::table
                .filter(transactions::id.eq_any(ids))
                .filter(transactions::status.eq(TransactionStatus::Pending)),
        )
        .set(transactions::reconciled_at.eq(Some(at)))
        .execute(conn)
        .map_err(ApiError::from)
    }

    pub fn completed_unapplied(
        conn: &mut PgConnection,
        limit: i64,
    ) -> Result<Vec<Transaction>, ApiError> {
        transactions::table
            .filter(transactions::status.eq(TransactionStatus::Completed))
            .filter(transactions::balance_applied.eq(false))
            .order(transactions::created_at.asc())
            .limit(limit)
            .load::<Transaction>(conn)
            .map_err(ApiError::from)
    }

    pub fn for_order(conn: &mut PgConnection, order_id: Uuid) -> Result<Vec<Transaction>, ApiError> {
        transactions::table
            .filter(transactions::order_id.eq(order_id))
            .order((transactions::created_at.asc(), transactions::id.asc()))
            .load::<Transaction>(conn)
            .map_err(ApiError::from)
    }

    pub fn pending_order_credit(
        conn: &mut PgConnection,
        order_id: Uuid,
    ) -> Result<Option<Transaction>, ApiError> {
        transactions::table
            .filter(transactions::order_id.eq(order_id))
            .filter(transactions::transaction_type.eq(TransactionType::Credit))
            .filter(transactions::status.eq(TransactionStatus::Pending))
            .first::<Transaction>(conn)
            .optional()
            .map_err(ApiError::from)
    }

    pub fn settlement_legs(
        conn: &mut PgConnection,
        session_id: Uuid,
    ) -> Result<Vec<Transaction>, ApiError> {
        transactions::table
            .filter(transactions::session_id.eq(session_id))
            .load::<Transaction>(conn)
            .map_err(ApiError::from)
    }

    /// Subset of `references` already recorded against some transaction.
    pub fn recorded_references(
        conn: &mut PgConnection,
        references: &[String],
    ) -> Result<Vec<String>, ApiError> {
        if references.is_empty() {
            return Ok(Vec::new());
        }

        transactions::table
            .filter(transactions::payment_reference.eq_any(references))
            .select(transactions::payment_reference.assume_not_null())
            .load::<String>(conn)
            .map_err(ApiError::from)
    }

    pub fn pending_withdrawal_total(conn: &mut PgConnection, user_id: Uuid) -> Result<i64, ApiError> {
        let amounts = transactions::table
            .filter(transactions::user_id.eq(user_id))
            .filter(transactions::transaction_type.eq(TransactionType::Withdrawal))
            .filter(transactions::status.eq(TransactionStatus::Pending))
            .select(transactions::amount)
            .load::<i64>(conn)?;

        Ok(amounts.iter().sum())
    }

    /// Signed sum of the user's completed transactions.
    pub fn ledger_balance(conn: &mut PgConnection, user_id: Uuid) -> Result<i64, ApiError> {
        let rows = transactions::table
            .filter(transactions::user_id.eq(user_id))
            .filter(transactions::status.eq(TransactionStatus::Completed))
            .select((transactions::transaction_type, transactions::amount))
            .load::<(TransactionType, i64)>(conn)?;

        Ok(rows.iter().map(|(kind, amount)| kind.signed(*amount)).sum())
    }
}
