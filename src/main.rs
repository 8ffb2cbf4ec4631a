//! Daemon entry point: initializes logging, configuration, and the database,
//! seeds plans, and runs the daily rollover and reminder tasks.

use dotenvy::dotenv;
use gym_ledger::{
    config, core,
    errors::Result,
    external::TracingNotifier,
    scheduler,
};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars can also be set externally
    dotenv().ok();

    // 3. Initialize database
    let db = config::database::create_connection()
        .await
        .inspect(|_| info!("Database connection established."))
        .inspect_err(|e| error!("Failed to connect to database: {e}"))?;
    config::database::create_tables(&db).await?;

    // 4. Seed plans from config.toml when present
    match config::plans::load_default_config() {
        Ok(plan_config) => {
            let inserted = core::plan::seed_plans(&db, &plan_config.plans).await?;
            info!(inserted, "Plan seeding complete.");
        }
        Err(e) => info!("No seed plans loaded ({e}); continuing with existing plans."),
    }

    // 5. Run the daily tasks
    let notifier = Arc::new(TracingNotifier);

    let rollover_task = scheduler::spawn_rollover_task(db.clone());
    let reminder_task = scheduler::spawn_reminder_task(db, notifier);

    info!("gym-ledger daemon running.");
    let _ = tokio::join!(rollover_task, reminder_task);

    Ok(())
}
