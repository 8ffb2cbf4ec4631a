//! Plan business logic - administration of membership plans.
//!
//! Plans are reference data: a name, a billing period length in whole months, and a
//! fee per period. The one real invariant lives in deletion: a plan cannot be removed
//! while any member still references it as their current plan.

use crate::{
    config::plans::PlanConfig,
    entities::{Member, Plan, member, plan},
    errors::{Error, Result},
};
use sea_orm::{PaginatorTrait, QueryOrder, Set, prelude::*};

/// Retrieves all plans ordered alphabetically by name.
pub async fn get_all_plans(db: &DatabaseConnection) -> Result<Vec<plan::Model>> {
    Plan::find()
        .order_by_asc(plan::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Finds a plan by its unique ID, returning None if not found.
pub async fn get_plan_by_id(db: &DatabaseConnection, plan_id: i64) -> Result<Option<plan::Model>> {
    Plan::find_by_id(plan_id).one(db).await.map_err(Into::into)
}

/// Finds a plan by its unique name.
pub async fn get_plan_by_name(db: &DatabaseConnection, name: &str) -> Result<Option<plan::Model>> {
    Plan::find()
        .filter(plan::Column::Name.eq(name))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Creates a new plan, validating name, duration, and fee.
pub async fn create_plan(
    db: &DatabaseConnection,
    name: String,
    duration_in_months: i32,
    fee: f64,
) -> Result<plan::Model> {
    let name = name.trim().to_string();
    if name.is_empty() {
        return Err(Error::Validation {
            message: "Plan name cannot be empty".to_string(),
        });
    }

    if duration_in_months <= 0 {
        return Err(Error::Validation {
            message: format!("Plan duration must be positive, got {duration_in_months}"),
        });
    }

    if fee < 0.0 || !fee.is_finite() {
        return Err(Error::InvalidAmount { amount: fee });
    }

    if get_plan_by_name(db, &name).await?.is_some() {
        return Err(Error::DuplicatePlanName { name });
    }

    let new_plan = plan::ActiveModel {
        name: Set(name),
        duration_in_months: Set(duration_in_months),
        fee: Set(fee),
        ..Default::default()
    };

    new_plan.insert(db).await.map_err(Into::into)
}

/// Updates an existing plan's name, duration, and fee.
///
/// Does not touch members already billed under the old terms; the new fee and
/// duration apply from each member's next rollover onward.
pub async fn update_plan(
    db: &DatabaseConnection,
    plan_id: i64,
    name: String,
    duration_in_months: i32,
    fee: f64,
) -> Result<plan::Model> {
    let name = name.trim().to_string();
    if name.is_empty() {
        return Err(Error::Validation {
            message: "Plan name cannot be empty".to_string(),
        });
    }

    if duration_in_months <= 0 {
        return Err(Error::Validation {
            message: format!("Plan duration must be positive, got {duration_in_months}"),
        });
    }

    if fee < 0.0 || !fee.is_finite() {
        return Err(Error::InvalidAmount { amount: fee });
    }

    let existing = Plan::find_by_id(plan_id)
        .one(db)
        .await?
        .ok_or(Error::PlanNotFound { id: plan_id })?;

    // Renaming onto another plan's name is a conflict
    if let Some(other) = get_plan_by_name(db, &name).await?
        && other.id != plan_id
    {
        return Err(Error::DuplicatePlanName { name });
    }

    let mut active_model: plan::ActiveModel = existing.into();
    active_model.name = Set(name);
    active_model.duration_in_months = Set(duration_in_months);
    active_model.fee = Set(fee);
    active_model.update(db).await.map_err(Into::into)
}

/// Deletes a plan, failing with `PlanInUse` while any member references it as
/// their current plan.
pub async fn delete_plan(db: &DatabaseConnection, plan_id: i64) -> Result<()> {
    let existing = Plan::find_by_id(plan_id)
        .one(db)
        .await?
        .ok_or(Error::PlanNotFound { id: plan_id })?;

    let member_count = Member::find()
        .filter(member::Column::PlanId.eq(plan_id))
        .count(db)
        .await?;

    if member_count > 0 {
        return Err(Error::PlanInUse {
            name: existing.name,
            member_count,
        });
    }

    existing.delete(db).await?;
    Ok(())
}

/// Seeds plans from configuration, inserting only those whose names are missing.
/// Returns the number of plans inserted.
pub async fn seed_plans(db: &DatabaseConnection, configs: &[PlanConfig]) -> Result<usize> {
    let mut inserted = 0;
    for config in configs {
        if get_plan_by_name(db, &config.name).await?.is_none() {
            create_plan(
                db,
                config.name.clone(),
                config.duration_in_months,
                config.fee,
            )
            .await?;
            inserted += 1;
        }
    }
    Ok(inserted)
}
