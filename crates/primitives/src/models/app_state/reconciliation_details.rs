use eyre::Report;
use std::env;

#[derive(Debug, Clone)]
pub struct ReconciliationInfo {
    pub interval_secs: u64,
    /// Pending transactions younger than this are left to the webhook.
    pub grace_minutes: i64,
    /// Unresolvable transactions older than this are failed.
    pub failure_hours: i64,
    /// Half-width of the window used to correlate gateway payments by time.
    pub correlation_minutes: i64,
    pub batch_size: i64,
    pub repair_balance_drift: bool,
}

impl Default for ReconciliationInfo {
    fn default() -> Self {
        Self {
            interval_secs: 900,
            grace_minutes: 60,
            failure_hours: 24,
            correlation_minutes: 120,
            batch_size: 200,
            repair_balance_drift: true,
        }
    }
}

impl ReconciliationInfo {
    pub fn new() -> Result<Self, Report> {
        Ok(Self {
            interval_secs: env::var("RECONCILE_INTERVAL_SECS")
                .unwrap_or_else(|_| "900".into())
                .parse()?,
            grace_minutes: env::var("RECONCILE_GRACE_MINUTES")
                .unwrap_or_else(|_| "60".into())
                .parse()?,
            failure_hours: env::var("RECONCILE_FAILURE_HOURS")
                .unwrap_or_else(|_| "24".into())
                .parse()?,
            correlation_minutes: env::var("RECONCILE_CORRELATION_MINUTES")
                .unwrap_or_else(|_| "120".into())
                .parse()?,
            batch_size: env::var("RECONCILE_BATCH_SIZE")
                .unwrap_or_else(|_| "200".into())
                .parse()?,
            repair_balance_drift: env::var("RECONCILE_REPAIR_DRIFT")
                .unwrap_or_else(|_| "true".into())
                .parse()?,
        })
    }
}
