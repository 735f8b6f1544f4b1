use crate::models::entities::enum_types::TransactionStatus;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

// --- Recharge DTOs ---

#[derive(Debug, Serialize, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RechargeRequest {
    /// Minor units (paise).
    #[schema(example = 50000)]
    pub amount: i64,
    #[validate(length(min = 2, max = 32))]
    #[schema(example = "upi")]
    pub payment_method: String,
    /// Gateway payment id, when the client already completed checkout.
    #[validate(length(min = 4, max = 64))]
    #[schema(example = "pay_29QQoUBi66xm2f")]
    pub payment_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RechargeResponse {
    pub transaction_id: String,
    pub reference_id: String,
    pub status: TransactionStatus,
    pub new_balance: i64,
    /// Present while the recharge waits for gateway checkout.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway_order_id: Option<String>,
    /// True when this payment id had already been recorded.
    pub duplicate: bool,
}

// --- Withdrawal DTOs ---

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawRequest {
    #[schema(example = 150000)]
    pub amount: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawResponse {
    pub transaction_id: String,
    pub reference_id: String,
    pub status: TransactionStatus,
    pub available_balance: i64,
}

// --- Balance DTOs ---

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BalanceResponse {
    pub user_id: Uuid,
    pub wallet_balance: i64,
    /// Signed sum of completed transactions.
    pub ledger_balance: i64,
    pub pending_withdrawals: i64,
}
