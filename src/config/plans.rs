//! Seed plan configuration loading from config.toml
//!
//! Plans defined in config.toml are used to seed the database on first run or when
//! plans are missing. Seeding itself lives in [`crate::core::plan::seed_plans`].

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Deserialize)]
pub struct Config {
    /// List of plan configurations to seed
    pub plans: Vec<PlanConfig>,
}

/// Configuration for a single membership plan
#[derive(Debug, Deserialize, Clone)]
pub struct PlanConfig {
    /// Plan name (e.g., "Monthly", "Quarterly", "Annual")
    pub name: String,
    /// Billing period length in whole months
    pub duration_in_months: i32,
    /// Fee owed per billing period
    pub fee: f64,
}

/// Loads plan configuration from a TOML file.
///
/// # Errors
/// Returns an error if the file cannot be read, the TOML syntax is invalid,
/// or required fields are missing.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
        message: format!("Failed to read config file: {e}"),
    })?;

    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })
}

/// Loads plan configuration from the default location (./config.toml)
pub fn load_default_config() -> Result<Config> {
    load_config("config.toml")
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;

    #[test]
    fn test_parse_plan_config() {
        let toml_str = r#"
            [[plans]]
            name = "Monthly"
            duration_in_months = 1
            fee = 1000.0

            [[plans]]
            name = "Quarterly"
            duration_in_months = 3
            fee = 2500.0
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.plans.len(), 2);
        assert_eq!(config.plans[0].name, "Monthly");
        assert_eq!(config.plans[0].duration_in_months, 1);
        assert_eq!(config.plans[0].fee, 1000.0);

        assert_eq!(config.plans[1].name, "Quarterly");
        assert_eq!(config.plans[1].duration_in_months, 3);
        assert_eq!(config.plans[1].fee, 2500.0);
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = load_config("does-not-exist.toml");
        assert!(matches!(result, Err(Error::Config { .. })));
    }
}
