/// Database configuration and connection management
pub mod database;

/// Seed plan configuration loading from config.toml
pub mod plans;
