//! # certreg CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use certreg_cli::catalog::{run_catalog, CatalogArgs};
use certreg_cli::cert::{run_cert, CertArgs};
use certreg_cli::StoreOptions;

/// Certificate registry operator CLI.
///
/// Issues, inspects, verifies and revokes certificates stored in a registry
/// data file, and checks course catalogs.
#[derive(Parser, Debug)]
#[command(name = "certreg", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Registry data file.
    #[arg(long, env = "CERTREG_DATA_FILE", global = true)]
    store: Option<PathBuf>,

    /// Course catalog consulted at issuance.
    #[arg(long, env = "CERTREG_COURSE_CATALOG", global = true)]
    catalog: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Issue, verify, revoke and list certificates.
    Cert(CertArgs),

    /// Check and print course catalogs.
    Catalog(CatalogArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing based on verbosity level.
    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match &cli.command {
        Commands::Cert(args) => cli
            .store
            .clone()
            .context("no registry data file: pass --store or set CERTREG_DATA_FILE")
            .and_then(|store| {
                let options = StoreOptions {
                    store,
                    catalog: cli.catalog.clone(),
                };
                run_cert(args, &options)
            }),
        Commands::Catalog(args) => run_catalog(args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}
