use crate::error::ApiError;
use diesel_derive_enum::DbEnum;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, DbEnum, Display, EnumString, ToSchema,
)]
#[ExistingTypePath = "crate::schema::sql_types::UserRole"]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum UserRole {
    Customer,
    Astrologer,
    Administrator,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, DbEnum, Display, EnumString, ToSchema,
)]
#[ExistingTypePath = "crate::schema::sql_types::TransactionType"]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TransactionType {
    Credit,
    Debit,
    Commission,
    Withdrawal,
}

impl TransactionType {
    /// Direction of the wallet effect: credits and commissions add, the rest subtract.
    pub fn sign(self) -> i64 {
        match self {
            TransactionType::Credit | TransactionType::Commission => 1,
            TransactionType::Debit | TransactionType::Withdrawal => -1,
        }
    }

    pub fn signed(self, amount: i64) -> i64 {
        self.sign() * amount
    }

    pub fn is_inflow(self) -> bool {
        self.sign() > 0
    }

    pub fn reference_prefix(self, purpose: TransactionPurpose) -> &'static str {
        match (self, purpose) {
            (TransactionType::Credit, TransactionPurpose::Recharge) => "RCH",
            (TransactionType::Credit, _) => "ERN",
            (TransactionType::Commission, _) => "COM",
            (TransactionType::Debit, _) => "PAY",
            (TransactionType::Withdrawal, _) => "WD",
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, DbEnum, Display, EnumString, ToSchema,
)]
#[ExistingTypePath = "crate::schema::sql_types::TransactionPurpose"]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TransactionPurpose {
    Recharge,
    SessionPayment,
    ProductPurchase,
    Payout,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, DbEnum, Display, EnumString, ToSchema,
)]
#[ExistingTypePath = "crate::schema::sql_types::TransactionStatus"]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
    Cancelled,
}

impl TransactionStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, TransactionStatus::Pending)
    }

    /// The only legal moves are `pending -> completed | failed | cancelled`.
    pub fn transition(self, target: TransactionStatus) -> Result<TransactionStatus, ApiError> {
        if self.is_terminal() {
            return Err(ApiError::AlreadyFinalized(format!(
                "Transaction is already {}",
                self
            )));
        }

        if !target.is_terminal() {
            return Err(ApiError::InvalidTransition(format!(
                "Cannot move a transaction from {} to {}",
                self, target
            )));
        }

        Ok(target)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, DbEnum, Display, EnumString, ToSchema,
)]
#[ExistingTypePath = "crate::schema::sql_types::SessionType"]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SessionType {
    Call,
    Chat,
    Video,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, DbEnum, Display, EnumString, ToSchema,
)]
#[ExistingTypePath = "crate::schema::sql_types::SessionStatus"]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SessionStatus {
    Ongoing,
    Completed,
    Cancelled,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, DbEnum, Display, EnumString, ToSchema,
)]
#[ExistingTypePath = "crate::schema::sql_types::OrderPaymentStatus"]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OrderPaymentStatus {
    AwaitingPayment,
    Paid,
    Failed,
    Cancelled,
}

impl OrderPaymentStatus {
    /// Derives an order's payment status from its transactions, oldest first.
    pub fn project(history: &[(TransactionType, TransactionStatus)]) -> OrderPaymentStatus {
        let paid = history.iter().any(|(kind, status)| {
            *kind == TransactionType::Debit && *status == TransactionStatus::Completed
        });
        if paid {
            return OrderPaymentStatus::Paid;
        }

        if history
            .iter()
            .any(|(_, status)| *status == TransactionStatus::Pending)
        {
            return OrderPaymentStatus::AwaitingPayment;
        }

        match history.last().map(|(_, status)| *status) {
            Some(TransactionStatus::Cancelled) => OrderPaymentStatus::Cancelled,
            Some(TransactionStatus::Failed) => OrderPaymentStatus::Failed,
            _ => OrderPaymentStatus::AwaitingPayment,
        }
    }
}
