use crate::app_state::AppState;
use crate::repositories::session_repository::SessionRepository;
use crate::repositories::transaction_repository::TransactionRepository;
use crate::repositories::user_repository::UserRepository;
use crate::services::audit_service::AuditService;
use crate::services::balance_service::{BalanceService, LedgerEntry};
use astroledger_primitives::error::ApiError;
use astroledger_primitives::models::app_state::commission_details::CommissionInfo;
use astroledger_primitives::models::dtos::commission_dto::{
    CommissionReport, CommissionReportRow, SettlementResponse,
};
use astroledger_primitives::models::dtos::transaction_dto::TransactionDto;
use astroledger_primitives::models::entities::audit_log::AuditEvent;
use astroledger_primitives::models::entities::enum_types::{
    SessionStatus, SessionType, TransactionPurpose, TransactionType,
};
use astroledger_primitives::models::transaction::Transaction;
use astroledger_primitives::models::user::User;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::sql_types::Timestamptz;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

/// Driven by the customer debit of each settlement, so a session whose
/// astrologer share rounds to zero still reports its platform fee.
const COMMISSION_REPORT_SQL: &str = r#"
    SELECT s.astrologer_id,
           COUNT(*)::BIGINT AS sessions,
           COALESCE(SUM(d.amount), 0)::BIGINT AS gross_amount,
           COALESCE(SUM(COALESCE(c.amount, 0)), 0)::BIGINT AS astrologer_earnings,
           COALESCE(SUM(d.amount - COALESCE(c.amount, 0)), 0)::BIGINT AS platform_fees
    FROM transactions d
    JOIN sessions s ON s.id = d.session_id
    LEFT JOIN transactions c
           ON c.session_id = d.session_id
          AND c.transaction_type = 'commission'
          AND c.status = 'completed'
    WHERE d.transaction_type = 'debit'
      AND d.purpose = 'session_payment'
      AND d.status = 'completed'
      AND d.created_at >= $1
      AND d.created_at < $2
    GROUP BY s.astrologer_id
    ORDER BY astrologer_earnings DESC, s.astrologer_id
"#;

/// Division of a session's price between astrologer and platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommissionSplit {
    pub total_amount: i64,
    pub rate: i32,
    pub astrologer_share: i64,
    pub platform_fee: i64,
}

impl CommissionSplit {
    /// `rate` is the astrologer's percentage; the share rounds half up.
    pub fn compute(total_amount: i64, rate: i32) -> Result<Self, ApiError> {
        if total_amount < 0 {
            return Err(ApiError::InvalidAmount(format!(
                "session amount must not be negative, got {}",
                total_amount
            )));
        }
        if !(0..=100).contains(&rate) {
            return Err(ApiError::BadRequest(format!(
                "commission rate must be between 0 and 100, got {}",
                rate
            )));
        }

        let share = (i128::from(total_amount) * i128::from(rate) + 50) / 100;
        let astrologer_share = i64::try_from(share)
            .map_err(|_| ApiError::InvalidAmount("commission overflow".into()))?;

        Ok(Self {
            total_amount,
            rate,
            astrologer_share,
            platform_fee: total_amount - astrologer_share,
        })
    }
}

pub struct CommissionService;

impl CommissionService {
    /// A negotiated per-astrologer rate wins over the platform default.
    pub fn rate_for(defaults: &CommissionInfo, astrologer: &User, session_type: SessionType) -> i32 {
        astrologer
            .commission_rate(session_type)
            .unwrap_or_else(|| defaults.rate_for(session_type))
    }

    pub async fn settle_session(
        state: &AppState,
        session_id: Uuid,
    ) -> Result<SettlementResponse, ApiError> {
        let mut conn = state.db.get()?;
        let defaults = state.config.commission_details.clone();

        let (debit, commission, platform_fee, already_settled) =
            conn.transaction::<_, ApiError, _>(|conn| {
                let session = SessionRepository::find_by_id_for_update(conn, session_id)?;
                if session.status != SessionStatus::Completed {
                    return Err(ApiError::BadRequest(format!(
                        "Session {} is {}, only completed sessions are settled",
                        session_id, session.status
                    )));
                }

                let legs = TransactionRepository::settlement_legs(conn, session_id)?;
                if let Some(settled) = Self::existing_settlement(legs) {
                    return Ok(settled);
                }

                let astrologer = UserRepository::find_by_id(conn, session.astrologer_id)?
                    .ok_or_else(|| {
                        ApiError::NotFound(format!("Astrologer {} not found", session.astrologer_id))
                    })?;
                let rate = Self::rate_for(&defaults, &astrologer, session.session_type);
                let split = CommissionSplit::compute(session.total_amount, rate)?;

                let debit = BalanceService::debit(
                    conn,
                    LedgerEntry::new(
                        session.customer_id,
                        TransactionType::Debit,
                        TransactionPurpose::SessionPayment,
                        session.total_amount,
                    )
                    .session(session.id)
                    .commission(split.rate, split.platform_fee)
                    .description("Consultation payment")
                    .metadata(json!({ "session_type": session.session_type })),
                )?;

                let commission = if split.astrologer_share > 0 {
                    let (commission, _) = BalanceService::credit(
                        conn,
                        LedgerEntry::new(
                            session.astrologer_id,
                            TransactionType::Commission,
                            TransactionPurpose::SessionPayment,
                            split.astrologer_share,
                        )
                        .session(session.id)
                        .commission(split.rate, split.platform_fee)
                        .description("Consultation earnings")
                        .metadata(json!({
                            "session_type": session.session_type,
                            "session_total": session.total_amount,
                        })),
                    )?;
                    Some(commission)
                } else {
                    None
                };

                Ok((debit, commission, split.platform_fee, false))
            })?;

        if already_settled {
            info!(session_id = %session_id, "Session already settled");
        } else {
            info!(
                session_id = %session_id,
                total = debit.amount,
                astrologer_share = commission.as_ref().map(|c| c.amount).unwrap_or(0),
                platform_fee,
                "Session settled"
            );

            let _ = AuditService::log_event(
                state,
                None,
                AuditEvent::SessionSettled,
                Some("session"),
                Some(&session_id.to_string()),
                json!({
                    "debit": debit.transaction_id,
                    "commission": commission.as_ref().map(|c| c.transaction_id.clone()),
                    "platform_fee": platform_fee,
                }),
            )
            .await;
        }

        Ok(SettlementResponse {
            session_id,
            customer_debit: TransactionDto::from(debit).redacted(),
            astrologer_commission: commission.map(|c| TransactionDto::from(c).redacted()),
            platform_fee,
            already_settled,
        })
    }

    fn existing_settlement(
        legs: Vec<Transaction>,
    ) -> Option<(Transaction, Option<Transaction>, i64, bool)> {
        let mut debit = None;
        let mut commission = None;
        for leg in legs {
            match leg.transaction_type {
                TransactionType::Debit => debit = Some(leg),
                TransactionType::Commission => commission = Some(leg),
                _ => {}
            }
        }

        let debit = debit?;
        let platform_fee = debit.amount - commission.as_ref().map_or(0, |c| c.amount);
        Some((debit, commission, platform_fee, true))
    }

    /// Per-astrologer totals over sessions settled in `[from, to)`.
    pub async fn report(
        state: &AppState,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<CommissionReport, ApiError> {
        if from >= to {
            return Err(ApiError::BadRequest("`from` must be before `to`".into()));
        }

        let mut conn = state.db.get()?;
        let rows = diesel::sql_query(COMMISSION_REPORT_SQL)
            .bind::<Timestamptz, _>(from)
            .bind::<Timestamptz, _>(to)
            .load::<CommissionReportRow>(&mut conn)?;

        let total_earnings = rows.iter().map(|r| r.astrologer_earnings).sum();
        let total_platform_fees = rows.iter().map(|r| r.platform_fees).sum();

        Ok(CommissionReport {
            from,
            to,
            rows,
            total_earnings,
            total_platform_fees,
        })
    }
}
