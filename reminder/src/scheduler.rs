use std::{sync::Arc, time::Duration};

use chrono::{FixedOffset, Utc};
use sqlx::SqlitePool;
use tokio::{task::JoinHandle, time::MissedTickBehavior};

use crate::{notifier::Notifier, sweep::run_sweep};

/// Runs the reminder sweep every `interval`, the first time after `first_delay`.
/// Any interval up to a day keeps the one-reminder-per-day-count guarantee.
pub fn spawn_scheduler(
    pool: Arc<SqlitePool>,
    notifier: Arc<dyn Notifier>,
    first_delay: Duration,
    interval: Duration,
    display_offset: FixedOffset,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::time::sleep(first_delay).await;

        let mut ticker = tokio::time::interval(interval.max(Duration::from_secs(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let now = Utc::now().naive_utc();
            match run_sweep(&pool, notifier.as_ref(), now, &display_offset).await {
                Ok(report) if report.sent > 0 || report.failed > 0 => log::info!(
                    "Reminder sweep: {} checked, {} sent, {} failed",
                    report.checked,
                    report.sent,
                    report.failed
                ),
                Ok(report) => log::debug!("Reminder sweep: {} checked", report.checked),
                Err(error) => log::error!("Reminder sweep failed: {}", error),
            }
        }
    })
}
