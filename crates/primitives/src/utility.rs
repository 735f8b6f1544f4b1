use crate::error::ApiError;
use crate::models::entities::enum_types::{TransactionPurpose, TransactionType};
use chrono::Utc;
use rand::distributions::Alphanumeric;
use rand::Rng;
use uuid::Uuid;

/// Upper bound for a single ledger movement, in minor units (10 lakh rupees).
pub const MAX_TRANSACTION_AMOUNT: i64 = 100_000_000;

const REFERENCE_SUFFIX_LEN: usize = 6;

pub fn validate_amount(amount: i64) -> Result<i64, ApiError> {
    if amount <= 0 {
        return Err(ApiError::InvalidAmount(format!(
            "amount must be positive, got {}",
            amount
        )));
    }

    if amount > MAX_TRANSACTION_AMOUNT {
        return Err(ApiError::InvalidAmount(format!(
            "amount {} exceeds the limit of {}",
            amount, MAX_TRANSACTION_AMOUNT
        )));
    }

    Ok(amount)
}

/// Human-facing reference such as `RCH20261014093015K7Q2ZD`.
pub fn generate_reference_id(kind: TransactionType, purpose: TransactionPurpose) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(REFERENCE_SUFFIX_LEN)
        .map(char::from)
        .collect::<String>()
        .to_uppercase();

    format!(
        "{}{}{}",
        kind.reference_prefix(purpose),
        Utc::now().format("%Y%m%d%H%M%S"),
        suffix
    )
}

pub fn generate_transaction_id() -> String {
    format!("txn_{}", Uuid::new_v4().simple())
}
