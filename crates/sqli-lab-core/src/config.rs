// SPDX-License-Identifier: Apache-2.0

//! Configuration management for SQLi Lab.
//!
//! Provides layered configuration from files and environment variables.
//!
//! # Configuration Sources (in priority order)
//!
//! 1. Environment variables (prefix: `SQLI_LAB_`)
//! 2. Config file: `sqli-lab.toml` in the working directory, or `--config`
//! 3. Built-in defaults
//!
//! # Examples
//!
//! ```bash
//! # Serve on another port via environment variable
//! SQLI_LAB_SERVER__PORT=8080 cargo run -- serve
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::disclosure::DisclosurePolicy;
use crate::error::LabError;

/// Default config file name, resolved against the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "sqli-lab.toml";

/// Application configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LabConfig {
    /// HTTP listener settings.
    pub server: ServerConfig,
    /// Storage settings.
    pub database: DatabaseConfig,
    /// Session cookie settings.
    pub session: SessionConfig,
    /// Code execution sink settings.
    pub escalation: EscalationConfig,
}

/// HTTP listener settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address.
    pub host: String,
    /// Bind port.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 1303,
        }
    }
}

/// Storage settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Path of the SQLite database file.
    pub path: PathBuf,
    /// Connection attempts before giving up (default: 10).
    pub connect_attempts: usize,
    /// Fixed delay between connection attempts in milliseconds (default: 1500).
    pub retry_delay_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("sqli_lab.db"),
            connect_attempts: 10,
            retry_delay_ms: 1500,
        }
    }
}

impl DatabaseConfig {
    /// Delay between connection attempts.
    #[must_use]
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

/// Session cookie settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Session lifetime in seconds (default: 300).
    pub ttl_seconds: u64,
    /// Cookie signing key. Generated at start-up when unset.
    pub secret_key: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: 300,
            secret_key: None,
        }
    }
}

/// Code execution sink settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct EscalationConfig {
    /// Program used to run resolved source files.
    pub interpreter: String,
    /// Extension appended to the requested name.
    pub extension: String,
    /// Disclosure policy of the escalation search endpoint.
    pub disclosure: DisclosurePolicy,
}

impl Default for EscalationConfig {
    fn default() -> Self {
        Self {
            interpreter: "sh".to_string(),
            extension: "sh".to_string(),
            disclosure: DisclosurePolicy::Verbose,
        }
    }
}

/// Load application configuration.
///
/// Loads from the given config file, or `sqli-lab.toml` in the working
/// directory when `path` is `None`, then applies environment variables.
/// Environment variables use the prefix `SQLI_LAB_` and double underscore
/// for nested keys (e.g., `SQLI_LAB_DATABASE__PATH`).
///
/// # Errors
///
/// Returns `LabError::Config` if an explicitly named file is missing, or if
/// any source is invalid.
pub fn load_config(path: Option<&Path>) -> Result<LabConfig, LabError> {
    let file = match path {
        Some(path) => File::from(path).required(true),
        None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
    };

    let config = Config::builder()
        .add_source(file)
        .add_source(
            Environment::with_prefix("SQLI_LAB")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let lab_config: LabConfig = config.try_deserialize()?;

    Ok(lab_config)
}
