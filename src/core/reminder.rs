//! Expiry reminder sweep.
//!
//! Once a day the scheduler walks the ACTIVE members and notifies those whose due
//! date is exactly three days out or today. Delivery is entirely best-effort: a
//! notifier failure is logged and counted, never propagated, and nothing is
//! persisted about what was sent.

use crate::{core::dates::days_between, errors::Result, external::Notifier};
use chrono::NaiveDate;
use sea_orm::DatabaseConnection;
use tracing::warn;

/// Days before the due date at which a reminder goes out (plus one on the day itself).
const REMINDER_LEAD_DAYS: i64 = 3;

/// Result of one reminder sweep.
#[derive(Debug, Clone, Default)]
pub struct ReminderReport {
    /// Reminders handed to the notifier successfully
    pub sent: usize,
    /// Member ids whose reminder failed, with the error text
    pub failed: Vec<(i64, String)>,
}

/// Sweeps ACTIVE members and sends expiry reminders for due dates exactly
/// `REMINDER_LEAD_DAYS` away or due today.
pub async fn send_due_reminders(
    db: &DatabaseConnection,
    notifier: &dyn Notifier,
    today: NaiveDate,
) -> Result<ReminderReport> {
    let members = crate::core::member::get_active_members(db).await?;

    let mut report = ReminderReport::default();
    for member in members {
        let Some(due_date) = member.next_due_date else {
            continue;
        };

        let days_until_due = days_between(today, due_date);
        if days_until_due != REMINDER_LEAD_DAYS && days_until_due != 0 {
            continue;
        }

        match notifier.send_expiry_reminder(&member.email, due_date).await {
            Ok(()) => report.sent += 1,
            Err(e) => {
                warn!(member_id = member.id, error = %e, "expiry reminder failed");
                report.failed.push((member.id, e.to_string()));
            }
        }
    }

    Ok(report)
}
