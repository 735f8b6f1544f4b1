use chrono::Utc;
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Uuid as SqlUuid};
use astroledger_primitives::error::ApiError;
use astroledger_primitives::models::user::{NewUser, User};
use astroledger_primitives::schema::users;
use uuid::Uuid;

/// A user whose stored balance disagrees with the applied ledger.
#[derive(Debug, Clone, QueryableByName)]
pub struct BalanceDrift {
    #[diesel(sql_type = SqlUuid)]
    pub user_id: Uuid,
    #[diesel(sql_type = BigInt)]
    pub wallet_balance: i64,
    #[diesel(sql_type = BigInt)]
    pub ledger_balance: i64,
}

const BALANCE_DRIFT_SQL: &str = r#"
    SELECT u.id AS user_id,
           u.wallet_balance AS wallet_balance,
           COALESCE(SUM(CASE WHEN t.transaction_type IN ('credit', 'commission')
                             THEN t.amount ELSE -t.amount END), 0)::BIGINT AS ledger_balance
    FROM users u
    LEFT JOIN transactions t
           ON t.user_id = u.id AND t.status = 'completed' AND t.balance_applied
    GROUP BY u.id, u.wallet_balance
    HAVING u.wallet_balance <> COALESCE(SUM(CASE WHEN t.transaction_type IN ('credit', 'commission')
                                                 THEN t.amount ELSE -t.amount END), 0)
"#;

pub struct UserRepository;

impl UserRepository {
    pub fn create(conn: &mut PgConnection, new_user: NewUser) -> Result<User, ApiError> {
        diesel::insert_into(users::table)
            .values(&new_user)
            .get_result::<User>(conn)
            .map_err(ApiError::from)
    }

    pub fn find_by_id(conn: &mut PgConnection, id: Uuid) -> Result<Option<User>, ApiError> {
        users::table
            .find(id)
            .first::<User>(conn)
            .optional()
            .map_err(ApiError::from)
    }

    pub fn find_by_id_for_update(conn: &mut PgConnection, id: Uuid) -> Result<User, ApiError> {
        users::table
            .find(id)
            .for_update()
            .first::<User>(conn)
            .optional()?
            .ok_or_else(|| ApiError::NotFound(format!("User {} not found", id)))
    }

    pub fn credit_balance(conn: &mut PgConnection, id: Uuid, amount: i64) -> Result<i64, ApiError> {
        diesel::update(users::table.find(id))
            .set((
                users::wallet_balance.eq(users::wallet_balance + amount),
                users::updated_at.eq(Utc::now()),
            ))
            .returning(users::wallet_balance)
            .get_result::<i64>(conn)
            .optional()?
            .ok_or_else(|| ApiError::NotFound(format!("User {} not found", id)))
    }

    /// Decrements only when the balance covers the amount.
    pub fn debit_balance(conn: &mut PgConnection, id: Uuid, amount: i64) -> Result<i64, ApiError> {
        let updated = diesel::update(
            users::table
                .filter(users::id.eq(id))
                .filter(users::wallet_balance.ge(amount)),
        )
        .set((
            users::wallet_balance.eq(users::wallet_balance - amount),
            users::updated_at.eq(Utc::now()),
        ))
        .returning(users::wallet_balance)
        .get_result::<i64>(conn)
        .optional()?;

        match updated {
            Some(balance) => Ok(balance),
            None => {
                let user = Self::find_by_id(conn, id)?
                    .ok_or_else(|| ApiError::NotFound(format!("User {} not found", id)))?;
                Err(ApiError::InsufficientBalance {
                    requested: amount,
                    available: user.wallet_balance,
                })
            }
        }
    }

    pub fn balance_drift(conn: &mut PgConnection) -> Result<Vec<BalanceDrift>, ApiError> {
        diesel::sql_query(BALANCE_DRIFT_SQL)
            .load::<BalanceDrift>(conn)
            .map_err(ApiError::from)
    }

    /// Overwrites the balance with the ledger sum, unless it moved since it was read.
    pub fn restore_balance(conn: &mut PgConnection, drift: &BalanceDrift) -> Result<bool, ApiError> {
        let rows = diesel::update(
            users::table
                .filter(users::id.eq(drift.user_id))
                .filter(users::wallet_balance.eq(drift.wallet_balance)),
        )
        .set((
            users::wallet_balance.eq(drift.ledger_balance),
            users::updated_at.eq(Utc::now()),
        ))
        .execute(conn)?;

        Ok(rows == 1)
    }
}
