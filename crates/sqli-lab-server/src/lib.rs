// SPDX-License-Identifier: Apache-2.0

//! HTTP front end for the SQLi Lab.
//!
//! Maps each lab surface to a route, carries sessions in a signed cookie, and
//! renders minimal HTML views. All query and disclosure behavior lives in
//! `sqli-lab-core`; this crate only translates outcomes into responses.

mod error;
pub mod routes;
pub mod views;

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use sqli_lab_core::{EscalationSink, Lab};

pub use error::AppError;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    lab: Arc<Lab>,
    sink: Arc<EscalationSink>,
}

impl AppState {
    /// State over a lab and its execution sink.
    pub fn new(lab: Lab, sink: EscalationSink) -> Self {
        Self {
            lab: Arc::new(lab),
            sink: Arc::new(sink),
        }
    }
}

/// Build the lab router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(routes::home))
        .route("/sqli/basic", get(routes::login_form).post(routes::login))
        .route("/sqli/basic/profile", get(routes::profile))
        .route("/sqli/union", get(routes::union_search))
        .route("/sqli/error", get(routes::error_search))
        .route("/sqli/boolean", get(routes::boolean_lookup))
        .route("/sqli/time", get(routes::time_lookup))
        .route("/sqli/rce", get(routes::escalation_search))
        .route("/sqli/rce/exec", get(routes::execute))
        .with_state(state)
}

/// Run the lab over HTTP.
///
/// Binds the given host and port and serves until Ctrl+C.
pub async fn run_http(host: &str, port: u16, state: AppState) -> anyhow::Result<()> {
    use std::net::SocketAddr;
    use tokio::net::TcpListener;

    tracing::info!("Starting SQLi Lab HTTP server on {}:{}", host, port);

    // Handle both IPv4 and IPv6 addresses
    let addr: SocketAddr = if host.contains(':') {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    }
    .parse()?;
    let listener = TcpListener::bind(addr).await?;

    tracing::info!("HTTP server listening on http://{}", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to install Ctrl+C handler");
                std::future::pending::<()>().await;
            }
            tracing::info!("Received Ctrl+C, shutting down gracefully");
        })
        .await?;

    Ok(())
}
