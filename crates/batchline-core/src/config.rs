//! Configuration management

use serde::{Deserialize, Serialize};

use crate::batch::engine::ChunkConfig;

// ============================================================================
// Batch Configuration Constants
// ============================================================================

/// Default database URL for local development.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://batchline.db?mode=rwc";

/// Default maximum database connections in the pool.
pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 5;

/// Default step name for the customer pipeline.
pub const DEFAULT_STEP_NAME: &str = "process-customers";

/// Default number of items per chunk transaction.
pub const DEFAULT_CHUNK_SIZE: usize = 100;

/// Default number of item errors tolerated before a step aborts.
pub const DEFAULT_SKIP_LIMIT: i64 = 0;

/// Default number of transient chunk-commit retries.
pub const DEFAULT_RETRY_LIMIT: u32 = 0;

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub batch: BatchConfig,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// Chunk processing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    pub step_name: String,
    pub chunk_size: usize,
    pub skip_limit: i64,
    pub retry_limit: u32,
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Config {
            database: DatabaseConfig {
                url: std::env::var("DATABASE_URL")
                    .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string()),
                max_connections: std::env::var("DATABASE_MAX_CONNECTIONS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_DATABASE_MAX_CONNECTIONS),
            },
            batch: BatchConfig {
                step_name: std::env::var("BATCHLINE_STEP_NAME")
                    .unwrap_or_else(|_| DEFAULT_STEP_NAME.to_string()),
                chunk_size: std::env::var("BATCHLINE_CHUNK_SIZE")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_CHUNK_SIZE),
                skip_limit: std::env::var("BATCHLINE_SKIP_LIMIT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_SKIP_LIMIT),
                retry_limit: std::env::var("BATCHLINE_RETRY_LIMIT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_RETRY_LIMIT),
            },
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.database.url.is_empty() {
            anyhow::bail!("Database URL cannot be empty");
        }

        if self.database.max_connections == 0 {
            anyhow::bail!("Database max_connections must be greater than 0");
        }

        if self.batch.chunk_size == 0 {
            anyhow::bail!("Chunk size must be greater than 0");
        }

        if self.batch.step_name.trim().is_empty() {
            anyhow::bail!("Step name cannot be empty");
        }

        Ok(())
    }

    pub fn chunk_config(&self) -> ChunkConfig {
        ChunkConfig {
            step_name: self.batch.step_name.clone(),
            chunk_size: self.batch.chunk_size,
            skip_limit: self.batch.skip_limit,
            retry_limit: self.batch.retry_limit,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: DEFAULT_DATABASE_URL.to_string(),
                max_connections: DEFAULT_DATABASE_MAX_CONNECTIONS,
            },
            batch: BatchConfig {
                step_name: DEFAULT_STEP_NAME.to_string(),
                chunk_size: DEFAULT_CHUNK_SIZE,
                skip_limit: DEFAULT_SKIP_LIMIT,
                retry_limit: DEFAULT_RETRY_LIMIT,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_chunk_size_is_rejected() {
        let mut config = Config::default();
        config.batch.chunk_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_chunk_config_mirrors_batch_section() {
        let config = Config::default();
        let chunk = config.chunk_config();
        assert_eq!(chunk.step_name, DEFAULT_STEP_NAME);
        assert_eq!(chunk.chunk_size, DEFAULT_CHUNK_SIZE);
        assert_eq!(chunk.skip_limit, DEFAULT_SKIP_LIMIT);
        assert_eq!(chunk.retry_limit, DEFAULT_RETRY_LIMIT);
    }
}
