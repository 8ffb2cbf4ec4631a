//! Membership switch scheduling - records a deferred plan change.
//!
//! Scheduling a switch only marks intent on the member; billing is untouched until
//! the rollover engine activates the switch at the next elapsed due date.

use crate::{
    entities::{Member, Plan, member},
    errors::{Error, Result},
};
use chrono::NaiveDate;
use sea_orm::{Set, prelude::*};

/// Result of scheduling a plan switch.
#[derive(Debug, Clone)]
pub struct ScheduledSwitch {
    /// The member with the switch now queued
    pub member: member::Model,
    /// Name of the plan that will take effect
    pub target_plan_name: String,
    /// The date the switch takes effect: the member's current due date,
    /// None when billing has not started
    pub effective_date: Option<NaiveDate>,
}

/// Schedules a deferred switch to `target_plan_id` for `member_id`.
///
/// Fails when the member or plan does not resolve, when the target is already the
/// member's current plan, or when a switch is already pending. On success only
/// `next_plan_id` and `plan_switch_pending` change; `pending_amount` and
/// `next_due_date` are left for the rollover engine.
pub async fn schedule_switch(
    db: &DatabaseConnection,
    member_id: i64,
    target_plan_id: i64,
) -> Result<ScheduledSwitch> {
    let member = Member::find_by_id(member_id)
        .one(db)
        .await?
        .ok_or(Error::MemberNotFound { id: member_id })?;

    let target_plan = Plan::find_by_id(target_plan_id)
        .one(db)
        .await?
        .ok_or(Error::PlanNotFound { id: target_plan_id })?;

    if member.plan_id == target_plan_id {
        return Err(Error::AlreadyOnPlan {
            member_id,
            plan_name: target_plan.name,
        });
    }

    if member.plan_switch_pending {
        return Err(Error::SwitchAlreadyPending { member_id });
    }

    let effective_date = member.next_due_date;

    let mut active_member: member::ActiveModel = member.into();
    active_member.next_plan_id = Set(Some(target_plan_id));
    active_member.plan_switch_pending = Set(true);
    let updated = active_member.update(db).await?;

    Ok(ScheduledSwitch {
        member: updated,
        target_plan_name: target_plan.name,
        effective_date,
    })
}
