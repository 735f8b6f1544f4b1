use astroledger_core::services::reconciliation_service::ReconciliationService;
use astroledger_core::AppState;
use astroledger_primitives::models::dtos::reconciliation_dto::ReconciliationTrigger;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info};

pub fn spawn_background_tasks(state: Arc<AppState>) {
    let every = Duration::from_secs(state.config.reconciliation_details.interval_secs.max(1));

    tokio::spawn(async move {
        info!(interval_secs = every.as_secs(), "Starting reconciliation task");
        reconcile_periodically(state, every).await;
    });

    info!("Background tasks spawned");
}

async fn reconcile_periodically(state: Arc<AppState>, every: Duration) {
    let mut interval = interval(every);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // skip the immediate first tick
    interval.tick().await;

    loop {
        interval.tick().await;

        match ReconciliationService::run(&state, ReconciliationTrigger::Scheduled).await {
            Ok(report) if report.skipped => debug!("Reconciliation skipped, another run is active"),
            Ok(report) => info!(
                examined = report.examined,
                completed = report.completed,
                failed = report.failed,
                deferred = report.deferred,
                drifted_users = report.drifted_users,
                "Scheduled reconciliation finished"
            ),
            Err(e) => error!("Scheduled reconciliation failed: {}", e),
        }
    }
}
