use crate::app_state::AppState;
use crate::repositories::transaction_repository::{TransactionFilter, TransactionRepository};
use crate::repositories::user_repository::UserRepository;
use crate::security::Claims;
use astroledger_primitives::error::ApiError;
use astroledger_primitives::models::dtos::transaction_dto::{
    TransactionDto, TransactionPage, TransactionQuery, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE,
};
use astroledger_primitives::models::dtos::wallet_dto::BalanceResponse;
use chrono::{DateTime, Utc};
use uuid::Uuid;

pub struct TransactionService;

impl TransactionService {
    pub async fn list(
        state: &AppState,
        claims: &Claims,
        query: TransactionQuery,
    ) -> Result<TransactionPage, ApiError> {
        let viewer = claims.user_id()?;
        let is_admin = claims.is_admin();

        let user_id = match query.user_id {
            Some(requested) if !is_admin && requested != viewer => {
                return Err(ApiError::Forbidden(
                    "Cannot list another user's transactions".into(),
                ))
            }
            Some(requested) => Some(requested),
            None if is_admin => None,
            None => Some(viewer),
        };

        let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE);
        if !(1..=MAX_PAGE_SIZE).contains(&limit) {
            return Err(ApiError::BadRequest(format!(
                "limit must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }

        let filter = TransactionFilter {
            user_id,
            transaction_type: query.transaction_type,
            status: query.status,
            purpose: query.purpose,
            after: query.cursor.as_deref().map(decode_cursor).transpose()?,
            limit,
        };

        let mut conn = state.db.get()?;
        let mut rows = TransactionRepository::list(&mut conn, &filter)?;

        let next_cursor = if rows.len() as i64 > limit {
            rows.truncate(limit as usize);
            rows.last().map(|tx| encode_cursor(tx.created_at, tx.id))
        } else {
            None
        };

        Ok(TransactionPage {
            transactions: rows
                .into_iter()
                .map(|tx| TransactionDto::for_viewer(tx, is_admin))
                .collect(),
            next_cursor,
        })
    }

    pub async fn get(
        state: &AppState,
        claims: &Claims,
        transaction_id: &str,
    ) -> Result<TransactionDto, ApiError> {
        let mut conn = state.db.get()?;
        let tx = TransactionRepository::find_by_public_id(&mut conn, transaction_id)?
            .ok_or_else(|| ApiError::NotFound(format!("Transaction {} not found", transaction_id)))?;

        claims.require_owner_or_admin(tx.user_id)?;
        Ok(TransactionDto::for_viewer(tx, claims.is_admin()))
    }

    pub async fn balance(state: &AppState, user_id: Uuid) -> Result<BalanceResponse, ApiError> {
        let mut conn = state.db.get()?;
        let user = UserRepository::find_by_id(&mut conn, user_id)?
            .ok_or_else(|| ApiError::NotFound(format!("User {} not found", user_id)))?;

        Ok(BalanceResponse {
            user_id,
            wallet_balance: user.wallet_balance,
            ledger_balance: TransactionRepository::ledger_balance(&mut conn, user_id)?,
            pending_withdrawals: TransactionRepository::pending_withdrawal_total(
                &mut conn, user_id,
            )?,
        })
    }
}

/// Hex of `<created_at micros>:<id>`.
pub fn encode_cursor(created_at: DateTime<Utc>, id: Uuid) -> String {
    hex::encode(format!("{}:{}", created_at.timestamp_micros(), id))
}

pub fn decode_cursor(cursor: &str) -> Result<(DateTime<Utc>, Uuid), ApiError> {
    let invalid = || ApiError::BadRequest("Invalid cursor".into());

    let raw = hex::decode(cursor).map_err(|_| invalid())?;
    let raw = String::from_utf8(raw).map_err(|_| invalid())?;
    let (micros, id) = raw.split_once(':').ok_or_else(invalid)?;

    let micros: i64 = micros.parse().map_err(|_| invalid())?;
    let created_at = DateTime::from_timestamp_micros(micros).ok_or_else(invalid)?;
    let id = Uuid::parse_str(id).map_err(|_| invalid())?;

    Ok((created_at, id))
}
