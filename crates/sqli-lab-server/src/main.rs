// SPDX-License-Identifier: Apache-2.0

//! SQLi Lab - an intentionally vulnerable SQL injection teaching lab.
//!
//! Serves login bypass, UNION, error-based, boolean and time-based blind
//! surfaces, and a code execution hand-off over HTTP.

mod cli;
mod logging;

use anyhow::{Context, Result};
use clap::Parser;
use sqli_lab_core::{EscalationSink, Lab, LabSecrets, load_config};
use sqli_lab_server::{AppState, run_http};
use tracing::{debug, info, warn};

use crate::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging();

    let mut config =
        load_config(cli.config.as_deref()).context("Failed to load configuration")?;
    cli.apply(&mut config);
    debug!("Configuration loaded successfully");

    // Flags and the cookie key are generated once here and never change.
    let secrets = LabSecrets::generate(&config.session);
    let lab = Lab::from_config(&config, &secrets);

    match cli.command {
        Commands::Seed => {
            let summary = lab
                .seed(&secrets)
                .await
                .context("Failed to seed the database")?;
            info!(
                users = summary.users,
                blogs = summary.blogs,
                flags = summary.flags,
                path = %config.database.path.display(),
                "Database seeded"
            );
            Ok(())
        }
        Commands::Serve(args) => {
            if args.skip_seed {
                info!("Skipping database seed");
            } else {
                lab.seed(&secrets)
                    .await
                    .context("Failed to seed the database")?;
            }

            match lab.diagnostics().await {
                Ok(diagnostics) => info!(
                    sqlite_version = %diagnostics.sqlite_version,
                    databases = ?diagnostics.databases,
                    "Storage diagnostics"
                ),
                Err(e) => warn!(error = %e, "Storage diagnostics unavailable"),
            }

            let sink = EscalationSink::new(&config.escalation);
            run_http(
                &config.server.host,
                config.server.port,
                AppState::new(lab, sink),
            )
            .await
        }
    }
}
