// SPDX-License-Identifier: Apache-2.0

#![warn(missing_docs)]

//! # SQLi Lab Core
//!
//! Query-construction and disclosure pipeline for a deliberately vulnerable
//! SQL injection lab.
//!
//! This crate provides:
//! - Per-endpoint query templates that splice untrusted input verbatim
//! - Per-endpoint disclosure policies (silent, generic, verbose)
//! - Connection acquisition with bounded retry
//! - Signed, short-lived sessions with a role-gated secret
//! - An isolated file execution sink
//! - Schema seeding and parameterized reference variants for contrast
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sqli_lab_core::{Lab, LabSecrets, load_config};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = load_config(None)?;
//! let secrets = LabSecrets::generate(&config.session);
//! let lab = Lab::from_config(&config, &secrets);
//!
//! lab.seed(&secrets).await?;
//! let outcome = lab.union_search(Some("' UNION SELECT username, password FROM users --")).await?;
//! println!("{outcome:?}");
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`query`] - Endpoints and their splice templates
//! - [`disclosure`] - Failure rendering policies
//! - [`connection`] - Connection acquisition and release
//! - [`session`] - Signed session cookies
//! - [`escalation`] - File execution sink
//! - [`lab`] - The lab operations
//! - [`seed`] - Schema and sample data
//! - [`secure`] - Parameterized counterparts

// ============================================================================
// Error Handling
// ============================================================================

pub use error::LabError;

/// Convenience Result type for lab operations.
///
/// This is equivalent to `std::result::Result<T, LabError>`.
pub type Result<T> = std::result::Result<T, LabError>;

// ============================================================================
// Configuration
// ============================================================================

pub use config::{
    DEFAULT_CONFIG_FILE, DatabaseConfig, EscalationConfig, LabConfig, ServerConfig, SessionConfig,
    load_config,
};
pub use secrets::LabSecrets;

// ============================================================================
// Query Pipeline
// ============================================================================

pub use connection::{ConnectionManager, Connector, SqliteConnector};
pub use disclosure::{
    Disclosed, DisclosurePolicy, FOUND_LABEL, Failure, GENERIC_MESSAGE, NOT_FOUND_LABEL,
};
pub use lab::{ExistenceOutcome, Lab, LoginOutcome, SearchOutcome};
pub use models::{BlogRow, Role, UserRow};
pub use query::{Endpoint, QueryPolicy, Success};

// ============================================================================
// Sessions
// ============================================================================

pub use session::{GUEST, SESSION_COOKIE, Session, SessionAuthority, SessionState};

// ============================================================================
// Escalation
// ============================================================================

pub use escalation::{EscalationSink, Outcome};

// ============================================================================
// Modules
// ============================================================================

pub mod config;
pub mod connection;
pub mod disclosure;
pub mod error;
pub mod escalation;
pub mod lab;
pub mod models;
pub mod query;
pub mod retry;
pub mod secrets;
pub mod secure;
pub mod seed;
pub mod session;
