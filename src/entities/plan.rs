//! Plan entity - a named billing period and fee (e.g., "Monthly", "Quarterly").
//!
//! Plans are immutable reference data from the ledger's point of view: created and
//! edited administratively, never touched by the payment or rollover paths.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Plan database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "plans")]
pub struct Model {
    /// Unique identifier for the plan
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Unique plan name (e.g., "Monthly", "Quarterly", "Annual")
    #[sea_orm(unique)]
    pub name: String,
    /// Length of one billing period in whole months; always > 0
    pub duration_in_months: i32,
    /// Fee owed per billing period; never negative
    pub fee: f64,
}

/// Defines relationships between Plan and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One plan is referenced by many members
    #[sea_orm(has_many = "super::member::Entity")]
    Members,
}

impl Related<super::member::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Members.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
