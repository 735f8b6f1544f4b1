use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, ToSchema)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ReconciliationTrigger {
    Scheduled,
    OnDemand,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationReport {
    pub trigger: ReconciliationTrigger,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Another run held the lock; nothing was examined.
    pub skipped: bool,
    pub examined: u32,
    pub completed: u32,
    pub failed: u32,
    pub cancelled_duplicates: u32,
    pub deferred: u32,
    pub left_pending: u32,
    pub balances_applied: u32,
    pub orders_resynced: u32,
    pub drifted_users: u32,
    pub drift_repaired: u32,
}

impl ReconciliationReport {
    pub fn new(trigger: ReconciliationTrigger) -> Self {
        Self {
            trigger,
            started_at: Utc::now(),
            finished_at: None,
            skipped: false,
            examined: 0,
            completed: 0,
            failed: 0,
            cancelled_duplicates: 0,
            deferred: 0,
            left_pending: 0,
            balances_applied: 0,
            orders_resynced: 0,
            drifted_users: 0,
            drift_repaired: 0,
        }
    }

    pub fn skipped(trigger: ReconciliationTrigger) -> Self {
        let mut report = Self::new(trigger);
        report.skipped = true;
        report.finished_at = Some(report.started_at);
        report
    }

    /// Whether the run changed any ledger state.
    pub fn made_changes(&self) -> bool {
        self.completed
            + self.failed
            + self.cancelled_duplicates
            + self.balances_applied
            + self.orders_resynced
            + self.drift_repaired
            > 0
    }
}
