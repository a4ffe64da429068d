// SPDX-License-Identifier: Apache-2.0

//! Logging initialization for the SQLi Lab server.
//!
//! Uses `tracing` with `tracing-subscriber` for structured logging.
//! Log level can be controlled via the `RUST_LOG` environment variable.
//! Executed queries are logged at `info`, so the default level shows every
//! injected statement as it reaches the database.
//!
//! # Examples
//!
//! ```bash
//! # Default: info level for the lab crates
//! sqli-lab serve
//!
//! # Retry and session details
//! RUST_LOG=sqli_lab_core=debug sqli-lab serve
//!
//! # Include driver internals
//! RUST_LOG=sqli_lab_core=debug,sqlx=debug sqli-lab serve
//! ```

use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

/// Default filter when `RUST_LOG` is unset.
const DEFAULT_FILTER: &str = "sqli_lab=info,sqli_lab_core=info,sqli_lab_server=info";

/// Initialize the logging subsystem.
///
/// Logs go to stderr. `RUST_LOG` replaces the default filter entirely.
pub fn init_logging() {
    let fmt_layer = fmt::layer().with_target(false).with_writer(std::io::stderr);

    let filter_layer = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(DEFAULT_FILTER))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
}
