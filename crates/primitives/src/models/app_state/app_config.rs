use crate::models::app_state::commission_details::CommissionInfo;
use crate::models::app_state::gateway_details::GatewayInfo;
use crate::models::app_state::jwt_details::JWTInfo;
use crate::models::app_state::reconciliation_details::ReconciliationInfo;
use eyre::Report;
use std::env;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub jwt_details: JWTInfo,

    pub gateway_details: GatewayInfo,

    pub commission_details: CommissionInfo,

    pub reconciliation_details: ReconciliationInfo,

    pub currency: String,

    pub rate_limit_enabled: bool,

    pub run_migrations: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, Report> {
        Ok(Self {
            jwt_details: JWTInfo::new()?,

            gateway_details: GatewayInfo::new()?,

            commission_details: CommissionInfo::new()?,

            reconciliation_details: ReconciliationInfo::new()?,

            currency: env::var("LEDGER_CURRENCY").unwrap_or_else(|_| "INR".into()),

            rate_limit_enabled: env::var("RATE_LIMIT_ENABLED")
                .unwrap_or_else(|_| "true".into())
                .parse()?,

            run_migrations: env::var("RUN_MIGRATIONS")
                .unwrap_or_else(|_| "true".into())
                .parse()?,
        })
    }
}
