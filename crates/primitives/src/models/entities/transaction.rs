use crate::models::entities::enum_types::{TransactionPurpose, TransactionStatus, TransactionType};
use chrono::{DateTime, Utc};
use diesel::{Associations, Identifiable, Insertable, Queryable};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, Queryable, Identifiable, Associations, Serialize)]
#[diesel(table_name = crate::schema::transactions)]
#[diesel(belongs_to(crate::models::entities::user::User))]
pub struct Transaction {
    pub id: Uuid,
    pub user_id: Uuid,

    pub transaction_type: TransactionType,
    pub purpose: TransactionPurpose,
    pub amount: i64,

    pub payment_reference: Option<String>,
    pub reference_id: String,
    pub transaction_id: String,

    pub status: TransactionStatus,
    pub balance_applied: bool,

    pub payment_method: Option<String>,
    pub gateway_order_id: Option<String>,
    pub session_id: Option<Uuid>,
    pub order_id: Option<Uuid>,
    pub commission_rate: Option<i32>,
    pub platform_fee: Option<i64>,
    pub description: Option<String>,

    pub admin_action: Option<String>,
    pub admin_notes: Option<String>,
    pub admin_id: Option<Uuid>,
    pub admin_updated_at: Option<DateTime<Utc>>,

    pub metadata: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Last reconciliation pass that looked at this row and left it pending.
    pub reconciled_at: Option<DateTime<Utc>>,
}

impl Transaction {
    /// Effect of this transaction on the owner's wallet once completed.
    pub fn signed_amount(&self) -> i64 {
        self.transaction_type.signed(self.amount)
    }

    pub fn is_gateway_sourced(&self) -> bool {
        self.transaction_type == TransactionType::Credit
            && matches!(
                self.purpose,
                TransactionPurpose::Recharge | TransactionPurpose::ProductPurchase
            )
    }
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::transactions)]
pub struct NewTransaction<'a> {
    pub user_id: Uuid,
    pub transaction_type: TransactionType,
    pub purpose: TransactionPurpose,
    pub amount: i64,
    pub payment_reference: Option<&'a str>,
    pub reference_id: &'a str,
    pub transaction_id: &'a str,
    pub status: TransactionStatus,
    pub balance_applied: bool,
    pub payment_method: Option<&'a str>,
    pub gateway_order_id: Option<&'a str>,
    pub session_id: Option<Uuid>,
    pub order_id: Option<Uuid>,
    pub commission_rate: Option<i32>,
    pub platform_fee: Option<i64>,
    pub description: Option<&'a str>,
    pub metadata: Value,
}
