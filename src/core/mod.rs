//! Core business logic - framework-agnostic billing ledger operations.
//!
//! Everything in here works against a `DatabaseConnection` plus the collaborator
//! traits in [`crate::external`]; nothing knows about timers or transports.

/// Whole-month date arithmetic
pub mod dates;
/// Member registration, lookup, and deletion
pub mod member;
/// Payment recording, statements, and deletion
pub mod payment;
/// Plan administration and seeding
pub mod plan;
/// Expiry reminder sweep
pub mod reminder;
/// Revenue rollups
pub mod revenue;
/// The due-date rollover engine
pub mod rollover;
/// Deferred plan switch scheduling
pub mod switching;
