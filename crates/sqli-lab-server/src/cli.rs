// SPDX-License-Identifier: Apache-2.0

//! Command-line interface definition for the SQLi Lab.
//!
//! Uses clap's derive API. Flags override the loaded configuration.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use sqli_lab_core::LabConfig;

/// SQLi Lab - an intentionally vulnerable SQL injection teaching lab.
///
/// Never expose this server to an untrusted network.
#[derive(Parser)]
#[command(name = "sqli-lab")]
#[command(version, about, long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Config file (default: sqli-lab.toml in the working directory)
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    /// SQLite database file
    #[arg(long, short = 'd', global = true)]
    pub database: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Seed the database and serve the lab over HTTP
    Serve(ServeArgs),

    /// Drop and recreate the schema and sample data, then exit
    Seed,
}

/// Arguments of `serve`.
#[derive(Args)]
pub struct ServeArgs {
    /// Bind address
    #[arg(long)]
    pub host: Option<String>,

    /// Bind port
    #[arg(long, short = 'p')]
    pub port: Option<u16>,

    /// Keep the existing database contents
    #[arg(long)]
    pub skip_seed: bool,
}

impl Cli {
    /// Apply command-line overrides on top of the loaded configuration.
    pub fn apply(&self, config: &mut LabConfig) {
        if let Some(database) = &self.database {
            config.database.path.clone_from(database);
        }

        if let Commands::Serve(args) = &self.command {
            if let Some(host) = &args.host {
                config.server.host.clone_from(host);
            }
            if let Some(port) = args.port {
                config.server.port = port;
            }
        }
    }
}
