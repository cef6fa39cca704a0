//! Process-wide configuration parsed from environment variables.

use std::env;

/// Connection and default-book configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub mongodb_url: String,
    pub database_name: String,
}

impl Config {
    /// Load configuration from the environment, falling back to `.env` if present.
    pub fn from_env() -> Result<Self, String> {
        let _ = dotenvy::dotenv();

        let mongodb_url = env::var("MONGODB_URL").map_err(|_| "MONGODB_URL must be set".to_string())?;

        let database_name = env::var("LEDGER_DATABASE").unwrap_or_else(|_| "ledger".to_string());

        Ok(Config {
            mongodb_url,
            database_name,
        })
    }
}
