//! Due-date rollover engine.
//!
//! The recurring reconciliation pass: for every ACTIVE member whose due date has
//! elapsed it either activates a pending plan switch or renews the current plan,
//! posting the fee to `pending_amount` and advancing `next_due_date`. Each member
//! is processed in its own transaction and a failure on one member never aborts
//! the others. The pass is naturally idempotent per period: once a member's due
//! date has moved into the future, re-running the pass skips them.
//!
//! The `system_state` table records when the last pass ran so a missed daily run
//! can be caught up at startup; correctness never depends on that record.

use crate::{
    core::dates::add_months,
    entities::{Member, Plan, SystemState, member, member::MemberStatus, system_state},
    errors::{Error, Result},
};
use chrono::{NaiveDate, Utc};
use sea_orm::{Set, TransactionTrait, prelude::*};
use tracing::{info, warn};

const LAST_ROLLOVER_RUN_KEY: &str = "last_rollover_run";

/// What the pass did to a single member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RolloverAction {
    /// The current plan was renewed for another period
    Renewed,
    /// A pending plan switch was activated
    Switched,
}

/// Outcome of processing one member whose due date had elapsed.
#[derive(Debug, Clone)]
pub struct MemberRolloverResult {
    /// The member that was processed
    pub member_id: i64,
    /// Member's name, for summaries
    pub member_name: String,
    /// Renewal or switch activation
    pub action: RolloverAction,
    /// Plan billed for the new period (the new plan when a switch activated)
    pub plan_name: String,
    /// Fee added to the member's pending amount
    pub fee_added: f64,
    /// Pending amount after the fee was posted
    pub new_pending: f64,
    /// Due date before the pass
    pub old_due_date: NaiveDate,
    /// Due date after the pass
    pub new_due_date: NaiveDate,
}

/// Result of a full rollover pass.
#[derive(Debug, Clone)]
pub struct RolloverReport {
    /// Per-member outcomes for members whose period had elapsed
    pub processed: Vec<MemberRolloverResult>,
    /// Members renewed on their current plan
    pub renewed_count: usize,
    /// Members whose pending switch activated
    pub switched_count: usize,
    /// Members whose due date is still in the future (or not yet set)
    pub skipped_count: usize,
    /// Members that failed, with the error text; the pass continued past them
    pub failed: Vec<(i64, String)>,
    /// Date the pass ran as
    pub run_date: NaiveDate,
}

/// Retrieves the date of the last rollover pass from the `system_state` table.
pub async fn get_last_rollover_date(db: &DatabaseConnection) -> Result<Option<NaiveDate>> {
    let state = SystemState::find()
        .filter(system_state::Column::Key.eq(LAST_ROLLOVER_RUN_KEY))
        .one(db)
        .await?;

    match state {
        Some(s) => NaiveDate::parse_from_str(&s.value, "%Y-%m-%d")
            .map(Some)
            .map_err(|e| Error::Config {
                message: format!("Failed to parse last rollover date: {e}"),
            }),
        None => Ok(None),
    }
}

/// Whether today's rollover pass has not happened yet.
pub async fn is_rollover_due(db: &DatabaseConnection, today: NaiveDate) -> Result<bool> {
    let last_run = get_last_rollover_date(db).await?;
    Ok(last_run.is_none_or(|d| d < today))
}

async fn set_last_rollover_date(db: &DatabaseConnection, date: NaiveDate) -> Result<()> {
    let date_str = date.format("%Y-%m-%d").to_string();
    let now = Utc::now().naive_utc();

    let existing = SystemState::find()
        .filter(system_state::Column::Key.eq(LAST_ROLLOVER_RUN_KEY))
        .one(db)
        .await?;

    if let Some(state) = existing {
        let mut active_model: system_state::ActiveModel = state.into();
        active_model.value = Set(date_str);
        active_model.updated_at = Set(now);
        active_model.update(db).await?;
    } else {
        let new_state = system_state::ActiveModel {
            key: Set(LAST_ROLLOVER_RUN_KEY.to_string()),
            value: Set(date_str),
            updated_at: Set(now),
            ..Default::default()
        };
        new_state.insert(db).await?;
    }

    Ok(())
}

/// Runs one rollover pass as of `today`.
///
/// For every ACTIVE member with a plan and a due date that is today or earlier,
/// exactly one of:
/// - **switch activation** when a switch is pending: the member adopts the new plan,
///   the new plan's fee is posted, and the due date becomes `today + new duration`;
/// - **renewal** otherwise: the current plan's fee is posted and the due date
///   advances from the *stored* due date, so missed runs do not drift the cycle.
///
/// One transaction per member; failures are recorded in the report and logged.
pub async fn process_due_rollovers(
    db: &DatabaseConnection,
    today: NaiveDate,
) -> Result<RolloverReport> {
    let members = crate::core::member::get_active_members(db).await?;

    let mut processed = Vec::new();
    let mut failed = Vec::new();
    let mut renewed_count = 0;
    let mut switched_count = 0;
    let mut skipped_count = 0;

    for m in members {
        let member_id = m.id;
        match rollover_single_member(db, member_id, today).await {
            Ok(Some(result)) => {
                match result.action {
                    RolloverAction::Renewed => renewed_count += 1,
                    RolloverAction::Switched => switched_count += 1,
                }
                processed.push(result);
            }
            Ok(None) => skipped_count += 1,
            Err(e) => {
                warn!(member_id, error = %e, "rollover failed for member, continuing");
                failed.push((member_id, e.to_string()));
            }
        }
    }

    set_last_rollover_date(db, today).await?;

    let report = RolloverReport {
        renewed_count,
        switched_count,
        skipped_count,
        processed,
        failed,
        run_date: today,
    };
    info!(
        renewed = report.renewed_count,
        switched = report.switched_count,
        skipped = report.skipped_count,
        failed = report.failed.len(),
        "rollover pass complete"
    );
    Ok(report)
}

/// Processes one member inside their own transaction. Returns `Ok(None)` when the
/// member was skipped (no plan state, or the due date is still in the future).
async fn rollover_single_member(
    db: &DatabaseConnection,
    member_id: i64,
    today: NaiveDate,
) -> Result<Option<MemberRolloverResult>> {
    let txn = db.begin().await?;

    // Re-fetch inside the transaction so the pass never works from a stale row.
    let member = Member::find_by_id(member_id)
        .one(&txn)
        .await?
        .ok_or(Error::MemberNotFound { id: member_id })?;

    if member.status != MemberStatus::Active {
        return Ok(None);
    }
    let Some(due_date) = member.next_due_date else {
        return Ok(None);
    };
    if due_date > today {
        return Ok(None);
    }

    let (action, billed_plan, new_due_date) =
        if member.plan_switch_pending && member.next_plan_id.is_some() {
            let next_plan_id = member.next_plan_id.unwrap_or_default();
            let new_plan = Plan::find_by_id(next_plan_id)
                .one(&txn)
                .await?
                .ok_or(Error::PlanNotFound { id: next_plan_id })?;
            // The switch starts a fresh cycle from today on the new plan's terms.
            let new_due = add_months(today, new_plan.duration_in_months);
            (RolloverAction::Switched, new_plan, new_due)
        } else {
            let current_plan = Plan::find_by_id(member.plan_id)
                .one(&txn)
                .await?
                .ok_or(Error::PlanNotFound { id: member.plan_id })?;
            // Advance from the stored due date, not today, so a late pass does not
            // shift every subsequent period.
            let new_due = add_months(due_date, current_plan.duration_in_months);
            (RolloverAction::Renewed, current_plan, new_due)
        };

    let new_pending = member.pending_amount + billed_plan.fee;
    let member_name = member.full_name.clone();

    let mut active_member: member::ActiveModel = member.into();
    if action == RolloverAction::Switched {
        active_member.plan_id = Set(billed_plan.id);
        active_member.next_plan_id = Set(None);
        active_member.plan_switch_pending = Set(false);
    }
    active_member.pending_amount = Set(new_pending);
    active_member.next_due_date = Set(Some(new_due_date));
    active_member.update(&txn).await?;

    txn.commit().await?;

    Ok(Some(MemberRolloverResult {
        member_id,
        member_name,
        action,
        plan_name: billed_plan.name,
        fee_added: billed_plan.fee,
        new_pending,
        old_due_date: due_date,
        new_due_date,
    }))
}

/// Formats a rollover report into a human-readable summary, for logs.
#[must_use]
pub fn format_rollover_summary(report: &RolloverReport) -> String {
    use std::fmt::Write;

    let mut summary = format!(
        "Rollover Pass - {} - {} due, {} skipped, {} failed\n",
        report.run_date.format("%Y-%m-%d"),
        report.processed.len(),
        report.skipped_count,
        report.failed.len()
    );

    for result in &report.processed {
        let action = match result.action {
            RolloverAction::Renewed => "Renewed",
            RolloverAction::Switched => "Switched",
        };
        // write! to a String is infallible
        let _ = writeln!(
            summary,
            "  {} - {} on '{}' | +{:.2} (pending {:.2}) | due {} -> {}",
            result.member_name,
            action,
            result.plan_name,
            result.fee_added,
            result.new_pending,
            result.old_due_date,
            result.new_due_date
        );
    }

    for (member_id, error) in &report.failed {
        let _ = writeln!(summary, "  member {member_id} FAILED: {error}");
    }

    summary
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_rollover_renews_elapsed_member() -> Result<()> {
        // Member joins 2024-01-01 on a monthly plan (fee 1000), pays in full:
        // due 2024-02-01 with nothing pending.
        let (db, plan) = setup_with_plan().await?;
        let member = register_member_with(&db, "asha@example.com", plan.id, 1000.0, 1000.0).await?;
        assert_eq!(member.next_due_date, Some(d(2024, 2, 1)));
        assert_eq!(member.pending_amount, 0.0);

        // Rollover on the due date posts the fee and advances one period.
        let report = process_due_rollovers(&db, d(2024, 2, 1)).await?;
        assert_eq!(report.renewed_count, 1);
        assert_eq!(report.switched_count, 0);

        let updated = crate::core::member::get_member_by_id(&db, member.id)
            .await?
            .unwrap();
        assert_eq!(updated.pending_amount, 1000.0);
        assert_eq!(updated.next_due_date, Some(d(2024, 3, 1)));

        Ok(())
    }

    #[tokio::test]
    async fn test_rollover_skips_future_due_dates() -> Result<()> {
        let (db, plan) = setup_with_plan().await?;
        let member = register_member_with(&db, "asha@example.com", plan.id, 1000.0, 1000.0).await?;

        let report = process_due_rollovers(&db, d(2024, 1, 15)).await?;
        assert!(report.processed.is_empty());
        assert_eq!(report.skipped_count, 1);

        let unchanged = crate::core::member::get_member_by_id(&db, member.id)
            .await?
            .unwrap();
        assert_eq!(unchanged.pending_amount, 0.0);
        assert_eq!(unchanged.next_due_date, Some(d(2024, 2, 1)));

        Ok(())
    }

    #[tokio::test]
    async fn test_rollover_does_not_double_post() -> Result<()> {
        let (db, plan) = setup_with_plan().await?;
        let member = register_member_with(&db, "asha@example.com", plan.id, 1000.0, 1000.0).await?;

        process_due_rollovers(&db, d(2024, 2, 1)).await?;
        // Second run the same day: the due date already moved to 2024-03-01
        let second = process_due_rollovers(&db, d(2024, 2, 1)).await?;
        assert!(second.processed.is_empty());
        assert_eq!(second.skipped_count, 1);

        let updated = crate::core::member::get_member_by_id(&db, member.id)
            .await?
            .unwrap();
        assert_eq!(updated.pending_amount, 1000.0);
        assert_eq!(updated.next_due_date, Some(d(2024, 3, 1)));

        Ok(())
    }

    #[tokio::test]
    async fn test_rollover_advances_from_stored_due_date_not_today() -> Result<()> {
        let (db, plan) = setup_with_plan().await?;
        let member = register_member_with(&db, "asha@example.com", plan.id, 1000.0, 1000.0).await?;

        // The pass runs five days late; the next cycle still lands on the 1st.
        process_due_rollovers(&db, d(2024, 2, 6)).await?;

        let updated = crate::core::member::get_member_by_id(&db, member.id)
            .await?
            .unwrap();
        assert_eq!(updated.next_due_date, Some(d(2024, 3, 1)));

        Ok(())
    }

    #[tokio::test]
    async fn test_rollover_switch_scenario() -> Result<()> {
        // Full scenario from the billing model: monthly member, renewal on Feb 1,
        // quarterly switch scheduled before Mar 1, activated on Mar 1.
        let (db, monthly) = setup_with_plan().await?; // Monthly: 1 month, 1000
        let quarterly =
            crate::core::plan::create_plan(&db, "Quarterly".to_string(), 3, 2500.0).await?;
        let member =
            register_member_with(&db, "asha@example.com", monthly.id, 1000.0, 1000.0).await?;

        // 2024-02-01: renewal
        process_due_rollovers(&db, d(2024, 2, 1)).await?;
        let after_renewal = crate::core::member::get_member_by_id(&db, member.id)
            .await?
            .unwrap();
        assert_eq!(after_renewal.pending_amount, 1000.0);
        assert_eq!(after_renewal.next_due_date, Some(d(2024, 3, 1)));

        // Switch scheduled before the next due date
        crate::core::switching::schedule_switch(&db, member.id, quarterly.id).await?;

        // 2024-03-01: switch activates
        let report = process_due_rollovers(&db, d(2024, 3, 1)).await?;
        assert_eq!(report.switched_count, 1);
        assert_eq!(report.processed[0].action, RolloverAction::Switched);
        assert_eq!(report.processed[0].plan_name, "Quarterly");

        let switched = crate::core::member::get_member_by_id(&db, member.id)
            .await?
            .unwrap();
        assert_eq!(switched.plan_id, quarterly.id);
        assert!(!switched.plan_switch_pending);
        assert!(switched.next_plan_id.is_none());
        // New plan's fee added on top of the outstanding 1000
        assert_eq!(switched.pending_amount, 3500.0);
        // Due date based on the new plan, from today
        assert_eq!(switched.next_due_date, Some(d(2024, 6, 1)));

        Ok(())
    }

    #[tokio::test]
    async fn test_rollover_skips_inactive_members() -> Result<()> {
        let (db, plan) = setup_with_plan().await?;
        let member = register_member_with(&db, "asha@example.com", plan.id, 1000.0, 1000.0).await?;

        let mut active: member::ActiveModel = member.clone().into();
        active.status = Set(MemberStatus::Inactive);
        active.update(&db).await?;

        let report = process_due_rollovers(&db, d(2024, 2, 1)).await?;
        assert!(report.processed.is_empty());

        let unchanged = crate::core::member::get_member_by_id(&db, member.id)
            .await?
            .unwrap();
        assert_eq!(unchanged.pending_amount, 0.0);

        Ok(())
    }

    #[tokio::test]
    async fn test_rollover_isolates_member_failures() -> Result<()> {
        // A member whose plan row has been removed underneath them fails; the
        // healthy member must still be processed.
        let (db, plan) = setup_with_plan().await?;
        let broken = register_member_with(&db, "broken@example.com", plan.id, 1000.0, 1000.0)
            .await?;
        let healthy = register_member_with(&db, "healthy@example.com", plan.id, 1000.0, 1000.0)
            .await?;

        // Point the broken member at a plan id that does not exist
        let mut active: member::ActiveModel = broken.clone().into();
        active.plan_id = Set(999);
        active.update(&db).await?;

        let report = process_due_rollovers(&db, d(2024, 2, 1)).await?;
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, broken.id);
        assert_eq!(report.renewed_count, 1);

        let updated = crate::core::member::get_member_by_id(&db, healthy.id)
            .await?
            .unwrap();
        assert_eq!(updated.pending_amount, 1000.0);

        // The broken member's state was rolled back, not half-written
        let untouched = crate::core::member::get_member_by_id(&db, broken.id)
            .await?
            .unwrap();
        assert_eq!(untouched.pending_amount, 0.0);
        assert_eq!(untouched.next_due_date, Some(d(2024, 2, 1)));

        Ok(())
    }

    #[tokio::test]
    async fn test_rollover_records_run_date() -> Result<()> {
        let db = setup_test_db().await?;

        assert!(is_rollover_due(&db, d(2024, 2, 1)).await?);
        process_due_rollovers(&db, d(2024, 2, 1)).await?;

        assert_eq!(get_last_rollover_date(&db).await?, Some(d(2024, 2, 1)));
        assert!(!is_rollover_due(&db, d(2024, 2, 1)).await?);
        assert!(is_rollover_due(&db, d(2024, 2, 2)).await?);

        Ok(())
    }

    #[tokio::test]
    async fn test_format_rollover_summary() -> Result<()> {
        let report = RolloverReport {
            processed: vec![MemberRolloverResult {
                member_id: 1,
                member_name: "Asha Rao".to_string(),
                action: RolloverAction::Renewed,
                plan_name: "Monthly".to_string(),
                fee_added: 1000.0,
                new_pending: 1000.0,
                old_due_date: d(2024, 2, 1),
                new_due_date: d(2024, 3, 1),
            }],
            renewed_count: 1,
            switched_count: 0,
            skipped_count: 2,
            failed: vec![(9, "plan not found".to_string())],
            run_date: d(2024, 2, 1),
        };

        let summary = format_rollover_summary(&report);
        assert!(summary.contains("2024-02-01"));
        assert!(summary.contains("Asha Rao"));
        assert!(summary.contains("Renewed"));
        assert!(summary.contains("Monthly"));
        assert!(summary.contains("member 9 FAILED"));

        Ok(())
    }
}
