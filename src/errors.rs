//! Unified error types and result handling.
//!
//! Every fallible operation in the crate returns [`Result`]. Variants map onto the
//! service's error taxonomy: validation, not-found, conflict, and dependency failures.
//! Validation/not-found/conflict errors are produced before any write happens, so a
//! caller seeing one of them can assume stored state is unchanged.

use thiserror::Error;

/// Crate-wide error enum.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration problem (bad config file, missing setting).
    #[error("Configuration error: {message}")]
    Config {
        /// Human-readable description
        message: String,
    },

    /// Malformed or missing input, rejected before any mutation.
    #[error("Validation error: {message}")]
    Validation {
        /// Human-readable description
        message: String,
    },

    /// Payment or fee amount that is zero, negative, or not finite.
    #[error("Invalid amount: {amount}")]
    InvalidAmount {
        /// The offending amount
        amount: f64,
    },

    /// Member id did not resolve.
    #[error("Member not found: {id}")]
    MemberNotFound {
        /// The unresolved member id
        id: i64,
    },

    /// Plan id did not resolve.
    #[error("Plan not found: {id}")]
    PlanNotFound {
        /// The unresolved plan id
        id: i64,
    },

    /// Payment id did not resolve.
    #[error("Payment not found: {id}")]
    PaymentNotFound {
        /// The unresolved payment id
        id: i64,
    },

    /// A member with this email is already registered.
    #[error("Email already registered: {email}")]
    DuplicateEmail {
        /// The conflicting email address
        email: String,
    },

    /// A plan with this name already exists.
    #[error("Plan name already exists: {name}")]
    DuplicatePlanName {
        /// The conflicting plan name
        name: String,
    },

    /// A plan cannot be deleted while members reference it as their current plan.
    #[error("Plan '{name}' is still used by {member_count} member(s)")]
    PlanInUse {
        /// Name of the referenced plan
        name: String,
        /// Number of members currently on the plan
        member_count: u64,
    },

    /// The requested switch target is the member's current plan.
    #[error("Member {member_id} is already on plan '{plan_name}'")]
    AlreadyOnPlan {
        /// The member requesting the switch
        member_id: i64,
        /// Name of the plan they are already on
        plan_name: String,
    },

    /// A plan switch has already been scheduled for this member.
    #[error("A plan switch is already pending for member {member_id}")]
    SwitchAlreadyPending {
        /// The member with the pending switch
        member_id: i64,
    },

    /// Ledger store failure. Fatal to the operation; the surrounding transaction
    /// rolls back, so member state is unchanged.
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Failure in a non-essential collaborator (receipt store, notifier).
    #[error("External service error: {message}")]
    Dependency {
        /// Human-readable description
        message: String,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Environment variable error.
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),
}

/// Convenience `Result` type.
pub type Result<T> = std::result::Result<T, Error>;
