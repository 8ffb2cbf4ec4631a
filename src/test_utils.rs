//! Shared test utilities.
//!
//! Common helpers for setting up in-memory test databases and creating members,
//! plans, and payments with sensible defaults.

use crate::{
    core::{member::RegistrationRequest, plan},
    entities::{member, payment, plan as plan_entity},
    errors::Result,
    external::{MemoryStore, TextReceiptRenderer},
};
use chrono::NaiveDate;
use sea_orm::{ActiveModelTrait, ConnectionTrait, DatabaseConnection, Set};

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
///
/// Foreign-key enforcement is turned off so tests can stage inconsistent rows
/// (e.g. a member pointing at a deleted plan); relations are resolved through
/// explicit lookups, not database constraints.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    db.execute_unprepared("PRAGMA foreign_keys = OFF;").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Shorthand date constructor for test fixtures.
///
/// # Panics
/// Panics on an invalid calendar date.
#[must_use]
pub fn d(year: i32, month: u32, day: u32) -> NaiveDate {
    #[allow(clippy::unwrap_used)]
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

/// Sets up a database with a "Monthly" plan (1 month, fee 1000.0).
/// Returns (db, plan) for common test scenarios.
pub async fn setup_with_plan() -> Result<(DatabaseConnection, plan_entity::Model)> {
    let db = setup_test_db().await?;
    let plan = plan::create_plan(&db, "Monthly".to_string(), 1, 1000.0).await?;
    Ok((db, plan))
}

/// Builds a registration request with test defaults.
///
/// # Defaults
/// * `join_date` and `payment_date`: the supplied `join_date`
/// * `payment_method`: `"cash"`
/// * `status`: None (defaults to ACTIVE)
/// * no profile picture
#[must_use]
pub fn registration_request(
    email: &str,
    plan_id: i64,
    total_fee: f64,
    amount: f64,
    join_date: NaiveDate,
) -> RegistrationRequest {
    RegistrationRequest {
        full_name: "Test Member".to_string(),
        email: email.to_string(),
        mobile_number: "5550100".to_string(),
        date_of_birth: d(1990, 6, 15),
        join_date,
        plan_id,
        total_fee,
        amount,
        payment_date: join_date,
        payment_method: Some("cash".to_string()),
        remarks: None,
        status: None,
        profile_picture: None,
    }
}

/// Registers a member with custom fee/amount, joining 2024-01-01.
pub async fn register_member_with(
    db: &DatabaseConnection,
    email: &str,
    plan_id: i64,
    total_fee: f64,
    amount: f64,
) -> Result<member::Model> {
    let outcome = crate::core::member::register_member(
        db,
        &MemoryStore::new(),
        &TextReceiptRenderer,
        registration_request(email, plan_id, total_fee, amount, d(2024, 1, 1)),
    )
    .await?;
    Ok(outcome.member)
}

/// Registers a fully paid member (fee 1000.0, paid 1000.0), joining 2024-01-01.
pub async fn register_test_member(
    db: &DatabaseConnection,
    email: &str,
    plan_id: i64,
) -> Result<member::Model> {
    register_member_with(db, email, plan_id, 1000.0, 1000.0).await
}

/// Appends a bare payment row for revenue/statement tests, without touching the
/// member's running totals.
pub async fn append_test_payment(
    db: &DatabaseConnection,
    member_id: i64,
    amount: f64,
    payment_date: NaiveDate,
) -> Result<payment::Model> {
    let model = payment::ActiveModel {
        member_id: Set(member_id),
        payment_date: Set(payment_date),
        amount: Set(amount),
        payment_method: Set(Some("cash".to_string())),
        remarks: Set(None),
        paid_amount: Set(amount),
        pending_amount: Set(0.0),
        next_due_date: Set(payment_date),
        receipt_url: Set(None),
        ..Default::default()
    };
    model.insert(db).await.map_err(Into::into)
}
