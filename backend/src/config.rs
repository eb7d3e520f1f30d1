//! Configuration management for the Rice Inventory Management System
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (development.toml, production.toml)
//! 3. Environment variable overrides with RIMS_ prefix

use std::time::Duration;

use config::{ConfigError, Environment, File};
use serde::Deserialize;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// JWT verification for the permission guard
    pub jwt: JwtConfig,

    /// Bounds for bulk operations and list paging
    pub inventory: InventoryConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtConfig {
    /// Secret key used to verify bearer tokens
    pub secret: String,
}

#[derive(Debug, Deserialize, Clone, Copy)]
pub struct InventoryConfig {
    /// Maximum number of items accepted by one bulk request
    pub bulk_max_items: usize,

    /// Time budget for one bulk request, in seconds
    pub bulk_timeout_secs: u64,

    /// Upper bound for `per_page` on list endpoints
    pub max_page_size: u32,
}

impl InventoryConfig {
    pub fn bulk_timeout(&self) -> Duration {
        Duration::from_secs(self.bulk_timeout_secs)
    }
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            bulk_max_items: 500,
            bulk_timeout_secs: 10,
            max_page_size: 200,
        }
    }
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment = std::env::var("RIMS_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = Self::builder(&environment)?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (RIMS_ prefix)
            .add_source(
                Environment::with_prefix("RIMS")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    fn builder(
        environment: &str,
    ) -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        let inventory = InventoryConfig::default();
        config::Config::builder()
            .set_default("environment", environment)?
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("inventory.bulk_max_items", inventory.bulk_max_items as u64)?
            .set_default("inventory.bulk_timeout_secs", inventory.bulk_timeout_secs)?
            .set_default("inventory.max_page_size", u64::from(inventory.max_page_size))
    }
}
