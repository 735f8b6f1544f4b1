use crate::schema::audit_logs;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumString};
use uuid::Uuid;

/// Stored as text in `audit_logs.event_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
pub enum AuditEvent {
    #[strum(serialize = "wallet.recharge_initiated")]
    RechargeInitiated,
    #[strum(serialize = "payment.confirmed")]
    PaymentConfirmed,
    #[strum(serialize = "payment.failed")]
    PaymentFailed,
    #[strum(serialize = "wallet.withdrawal_requested")]
    WithdrawalRequested,
    #[strum(serialize = "order.paid")]
    OrderPaid,
    #[strum(serialize = "session.settled")]
    SessionSettled,
    #[strum(serialize = "transaction.resolved")]
    TransactionResolved,
    #[strum(serialize = "reconciliation.run")]
    ReconciliationRun,
}

#[derive(Debug, Queryable, Selectable, Identifiable, Serialize, Deserialize)]
#[diesel(table_name = audit_logs)]
pub struct AuditLog {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub event_type: String,
    pub target_type: Option<String>,
    pub target_id: Option<String>,
    pub metadata: Value,
    pub ip_address: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable, Deserialize)]
#[diesel(table_name = audit_logs)]
pub struct NewAuditLog {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub event_type: String,
    pub target_type: Option<String>,
    pub target_id: Option<String>,
    pub metadata: Value,
    pub ip_address: Option<String>,
}

impl NewAuditLog {
    pub fn for_transaction(
        event: AuditEvent,
        actor: Option<Uuid>,
        transaction_id: &str,
        metadata: Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: actor,
            event_type: event.to_string(),
            target_type: Some("transaction".into()),
            target_id: Some(transaction_id.to_string()),
            metadata,
            ip_address: None,
        }
    }
}
