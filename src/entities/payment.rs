//! Payment entity - an immutable, append-only ledger entry.
//!
//! Each payment snapshots the member's cumulative totals (`paid_amount`,
//! `pending_amount`) and the due date in effect *as of this payment*. Rows are never
//! amended; the only destructive operation is a hard delete, which deliberately does
//! not recompute the owning member's running totals.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Payment database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "payments")]
pub struct Model {
    /// Unique identifier for the payment
    #[sea_orm(primary_key)]
    pub id: i64,
    /// ID of the member this payment belongs to
    pub member_id: i64,
    /// Date the money was received
    pub payment_date: Date,
    /// Amount received; always > 0
    pub amount: f64,
    /// How the payment was made (e.g., "cash", "upi", "card")
    pub payment_method: Option<String>,
    /// Free-form notes
    pub remarks: Option<String>,
    /// Member's cumulative total paid, inclusive of this payment
    pub paid_amount: f64,
    /// Member's remaining balance after this payment
    pub pending_amount: f64,
    /// Due date in effect after this payment
    pub next_due_date: Date,
    /// URL of the externally stored receipt, if one was uploaded
    pub receipt_url: Option<String>,
}

/// Defines relationships between Payment and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each payment belongs to one member
    #[sea_orm(
        belongs_to = "super::member::Entity",
        from = "Column::MemberId",
        to = "super::member::Column::Id"
    )]
    Member,
}

impl Related<super::member::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Member.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
