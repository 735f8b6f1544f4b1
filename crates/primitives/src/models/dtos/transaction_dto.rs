use crate::models::entities::enum_types::{TransactionPurpose, TransactionStatus, TransactionType};
use crate::models::entities::transaction::Transaction;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransactionDto {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    pub purpose: TransactionPurpose,
    pub amount: i64,
    pub status: TransactionStatus,
    pub reference_id: String,
    pub transaction_id: String,
    pub payment_reference: Option<String>,
    pub payment_method: Option<String>,
    pub session_id: Option<Uuid>,
    pub order_id: Option<Uuid>,
    pub commission_rate: Option<i32>,
    pub platform_fee: Option<i64>,
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_updated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TransactionDto {
    /// Drops the administrator annotation for non-admin viewers.
    pub fn redacted(mut self) -> Self {
        self.admin_notes = None;
        self
    }

    pub fn for_viewer(tx: Transaction, is_admin: bool) -> Self {
        let dto = Self::from(tx);
        if is_admin {
            dto
        } else {
            dto.redacted()
        }
    }
}

impl From<Transaction> for TransactionDto {
    fn from(tx: Transaction) -> Self {
        Self {
            id: tx.id,
            user_id: tx.user_id,
            transaction_type: tx.transaction_type,
            purpose: tx.purpose,
            amount: tx.amount,
            status: tx.status,
            reference_id: tx.reference_id,
            transaction_id: tx.transaction_id,
            payment_reference: tx.payment_reference,
            payment_method: tx.payment_method,
            session_id: tx.session_id,
            order_id: tx.order_id,
            commission_rate: tx.commission_rate,
            platform_fee: tx.platform_fee,
            description: tx.description,
            admin_action: tx.admin_action,
            admin_notes: tx.admin_notes,
            admin_updated_at: tx.admin_updated_at,
            created_at: tx.created_at,
            updated_at: tx.updated_at,
        }
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct TransactionQuery {
    pub user_id: Option<Uuid>,
    #[serde(rename = "type")]
    pub transaction_type: Option<TransactionType>,
    pub status: Option<TransactionStatus>,
    pub purpose: Option<TransactionPurpose>,
    /// Opaque cursor returned as `nextCursor` by the previous page.
    pub cursor: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransactionPage {
    pub transactions: Vec<TransactionDto>,
    pub next_cursor: Option<String>,
}
