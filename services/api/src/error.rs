//! services/api/src/error.rs
//!
//! Startup failures of the `api` binary. Request-level errors never reach this type;
//! handlers turn them into HTTP responses.

use crate::config::ConfigError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// An environment variable held a value that could not be parsed.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Connecting the PostgreSQL pool failed.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    /// The embedded schema migrations could not be applied.
    #[error("Migration Error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Binding the listener or serving connections failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
