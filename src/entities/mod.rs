//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod member;
pub mod payment;
pub mod plan;
pub mod system_state;

// Re-export specific types to avoid conflicts
pub use member::{Column as MemberColumn, Entity as Member, Model as MemberModel};
pub use payment::{Column as PaymentColumn, Entity as Payment, Model as PaymentModel};
pub use plan::{Column as PlanColumn, Entity as Plan, Model as PlanModel};
pub use system_state::{
    Column as SystemStateColumn, Entity as SystemState, Model as SystemStateModel,
};
