use crate::models::dtos::transaction_dto::TransactionDto;
use chrono::{DateTime, Utc};
use diesel::sql_types::{BigInt, Uuid as SqlUuid};
use diesel::QueryableByName;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SettlementResponse {
    pub session_id: Uuid,
    pub customer_debit: TransactionDto,
    /// Absent when the astrologer's share rounds to zero.
    pub astrologer_commission: Option<TransactionDto>,
    pub platform_fee: i64,
    /// True when the session had been settled before this call.
    pub already_settled: bool,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CommissionReportQuery {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, QueryableByName)]
#[serde(rename_all = "camelCase")]
pub struct CommissionReportRow {
    #[diesel(sql_type = SqlUuid)]
    pub astrologer_id: Uuid,
    #[diesel(sql_type = BigInt)]
    pub sessions: i64,
    #[diesel(sql_type = BigInt)]
    pub gross_amount: i64,
    #[diesel(sql_type = BigInt)]
    pub astrologer_earnings: i64,
    #[diesel(sql_type = BigInt)]
    pub platform_fees: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CommissionReport {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub rows: Vec<CommissionReportRow>,
    pub total_earnings: i64,
    pub total_platform_fees: i64,
}
