//! Database configuration module.
//!
//! Handles `SQLite` database connection and table creation using `SeaORM`.
//! Table creation uses `Schema::create_table_from_entity` so the database schema is
//! generated from the entity definitions without manual SQL. Statements are built with
//! `if_not_exists` so the daemon can restart over an existing database file.

use crate::entities::{Member, Payment, Plan, SystemState};
use crate::errors::Result;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Schema};

/// Gets the database URL from environment variable or returns the default `SQLite` path.
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://data/gym_ledger.sqlite".to_string())
}

/// Establishes a connection to the `SQLite` database using the `DATABASE_URL`
/// environment variable, falling back to a default local file.
pub async fn create_connection() -> Result<DatabaseConnection> {
    Database::connect(get_database_url()).await.map_err(Into::into)
}

/// Creates all necessary database tables from the entity definitions.
///
/// Creates tables for members, plans, payments, and system state. Safe to call on
/// every startup; existing tables are left alone.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let mut member_table = schema.create_table_from_entity(Member);
    let mut plan_table = schema.create_table_from_entity(Plan);
    let mut payment_table = schema.create_table_from_entity(Payment);
    let mut system_state_table = schema.create_table_from_entity(SystemState);

    db.execute(builder.build(member_table.if_not_exists())).await?;
    db.execute(builder.build(plan_table.if_not_exists())).await?;
    db.execute(builder.build(payment_table.if_not_exists())).await?;
    db.execute(builder.build(system_state_table.if_not_exists()))
        .await?;

    Ok(())
}
