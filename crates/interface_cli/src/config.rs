//! CLI configuration

use serde::Deserialize;

/// CLI configuration, loaded from `BILLING_`-prefixed environment variables
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Database URL
    pub database_url: String,
    /// Log level filter, e.g. "info" or "interface_cli=debug"
    pub log_level: String,
    /// Maximum database connections
    pub max_connections: u32,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            database_url: "postgres://localhost/billing".to_string(),
            log_level: "info".to_string(),
            max_connections: 5,
        }
    }
}

impl CliConfig {
    /// Loads configuration from the environment, falling back to defaults
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::Environment::with_prefix("BILLING"))
            .build()?
            .try_deserialize()
    }
}
