// SPDX-License-Identifier: Apache-2.0

//! Error types for SQLi Lab.
//!
//! Uses `thiserror` for deriving `std::error::Error` implementations.
//! Binary code should use `anyhow::Result` for top-level error handling.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during lab operations.
#[derive(Error, Debug)]
pub enum LabError {
    /// Every connection attempt failed.
    ///
    /// Fatal at start-up; mid-run it aborts only the current request.
    #[error("Failed to connect to the database after {attempts} attempts: {reason}")]
    ConnectionExhausted {
        /// Number of attempts made.
        attempts: usize,
        /// Failure reason reported by the last attempt.
        reason: String,
    },

    /// The driver reported a failure while executing a query.
    #[error("{0}")]
    QueryExecution(String),

    /// Any other failure while handling a request.
    #[error("{0}")]
    Unexpected(String),

    /// The escalation sink could not find the requested source file.
    #[error("File not found: {}", .0.display())]
    ResourceNotFound(PathBuf),

    /// Configuration file or environment error.
    #[error("Configuration error: {message}")]
    Config {
        /// Error message.
        message: String,
    },

    /// Filesystem error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<sqlx::Error> for LabError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => LabError::QueryExecution(db_err.to_string()),
            other => LabError::Unexpected(other.to_string()),
        }
    }
}

impl From<config::ConfigError> for LabError {
    fn from(err: config::ConfigError) -> Self {
        LabError::Config {
            message: err.to_string(),
        }
    }
}
