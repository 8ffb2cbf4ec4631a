//! Long-lived daily tasks.
//!
//! Two loops: the rollover pass at local midnight and the reminder sweep at 08:00.
//! On startup the rollover loop first checks `system_state` and runs immediately if
//! today's pass has not happened (service downtime across midnight). A failed pass
//! is logged and the loop keeps going; the next day's run will pick up whatever was
//! missed, since the rollover is idempotent per already-advanced member.

use crate::{
    core::{reminder, rollover},
    errors::Result,
    external::Notifier,
};
use chrono::{Local, NaiveDate, TimeDelta};
use sea_orm::DatabaseConnection;
use std::{sync::Arc, time::Duration};
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Hour of local time at which the rollover pass runs.
const ROLLOVER_HOUR: u32 = 0;
/// Hour of local time at which the reminder sweep runs.
const REMINDER_HOUR: u32 = 8;

/// Time to sleep until the next occurrence of `hour:00` local time.
fn duration_until_next(hour: u32) -> Duration {
    let now = Local::now().naive_local();
    let today_at = now.date().and_hms_opt(hour, 0, 0).unwrap_or(now);

    let next = if today_at > now {
        today_at
    } else {
        today_at + TimeDelta::days(1)
    };

    (next - now).to_std().unwrap_or(Duration::from_secs(60))
}

fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

/// Runs one rollover pass for today, logging the summary.
pub async fn run_rollover_pass(db: &DatabaseConnection) -> Result<()> {
    let report = rollover::process_due_rollovers(db, local_today()).await?;
    if !report.processed.is_empty() || !report.failed.is_empty() {
        info!("{}", rollover::format_rollover_summary(&report));
    }
    Ok(())
}

/// Spawns the midnight rollover loop. Catches up a missed pass at startup.
pub fn spawn_rollover_task(db: DatabaseConnection) -> JoinHandle<()> {
    tokio::spawn(async move {
        match rollover::is_rollover_due(&db, local_today()).await {
            Ok(true) => {
                info!("rollover pass not yet run today, catching up");
                if let Err(e) = run_rollover_pass(&db).await {
                    error!(error = %e, "startup rollover pass failed");
                }
            }
            Ok(false) => {}
            Err(e) => error!(error = %e, "could not determine last rollover run"),
        }

        loop {
            tokio::time::sleep(duration_until_next(ROLLOVER_HOUR)).await;
            if let Err(e) = run_rollover_pass(&db).await {
                error!(error = %e, "rollover pass failed");
            }
        }
    })
}

/// Spawns the morning reminder loop.
pub fn spawn_reminder_task(db: DatabaseConnection, notifier: Arc<dyn Notifier>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(duration_until_next(REMINDER_HOUR)).await;
            match reminder::send_due_reminders(&db, notifier.as_ref(), local_today()).await {
                Ok(report) => {
                    if report.sent > 0 || !report.failed.is_empty() {
                        info!(
                            sent = report.sent,
                            failed = report.failed.len(),
                            "reminder sweep complete"
                        );
                    }
                }
                Err(e) => error!(error = %e, "reminder sweep failed"),
            }
        }
    })
}
