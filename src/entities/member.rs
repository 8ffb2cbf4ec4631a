//! Member entity - a gym subscriber with a running billing state.
//!
//! The member row carries the live financial summary (`total_paid`, `pending_amount`,
//! `next_due_date`) alongside plan and lifecycle state. Only the payment recorder and
//! the rollover engine mutate the billing fields. Relations to plans are stored as
//! foreign-key ids and resolved through explicit lookups; there is no back-pointer
//! object graph.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Lifecycle state of a member. Only ACTIVE members are billed by the rollover engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum MemberStatus {
    /// Membership is live; dues accrue and reminders are sent
    #[sea_orm(string_value = "ACTIVE")]
    Active,
    /// Membership is paused; skipped by rollover and reminders
    #[sea_orm(string_value = "INACTIVE")]
    Inactive,
}

/// Member database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "members")]
pub struct Model {
    /// Unique identifier for the member
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Member's full name
    pub full_name: String,
    /// Contact email, unique across all members
    #[sea_orm(unique)]
    pub email: String,
    /// Contact phone number
    pub mobile_number: String,
    /// Date of birth
    pub date_of_birth: Date,
    /// Date the member joined; the first due date is derived from it
    pub join_date: Date,
    /// URL of the uploaded profile picture, if any
    pub profile_picture_url: Option<String>,
    /// Current plan (required)
    pub plan_id: i64,
    /// Plan scheduled to take effect at the next rollover.
    /// Non-null iff `plan_switch_pending` is true.
    pub next_plan_id: Option<i64>,
    /// Whether a deferred plan switch is queued
    pub plan_switch_pending: bool,
    /// Cumulative amount paid across all payments
    pub total_paid: f64,
    /// Balance currently owed; never negative
    pub pending_amount: f64,
    /// Date the next billing period's fee becomes owed
    pub next_due_date: Option<Date>,
    /// Lifecycle state
    pub status: MemberStatus,
}

/// Defines relationships between Member and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each member is on one current plan
    #[sea_orm(
        belongs_to = "super::plan::Entity",
        from = "Column::PlanId",
        to = "super::plan::Column::Id"
    )]
    Plan,
    /// One member has many payments
    #[sea_orm(has_many = "super::payment::Entity")]
    Payments,
}

impl Related<super::plan::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Plan.def()
    }
}

impl Related<super::payment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
