//! # Catalog Subcommand
//!
//! - `check`: Load a course catalog file and report problems.
//! - `list`: Print the entries of a course catalog file.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Subcommand};

use certreg_registry::{CourseCatalog, CourseKind};

use crate::{load_catalog, print_json};

/// Arguments for the `certreg catalog` subcommand.
#[derive(Args, Debug)]
pub struct CatalogArgs {
    #[command(subcommand)]
    pub command: CatalogCommand,
}

/// Catalog subcommands.
#[derive(Subcommand, Debug)]
pub enum CatalogCommand {
    /// Validate a catalog file.
    Check {
        /// YAML catalog path.
        path: PathBuf,
    },
    /// Print catalog entries.
    List {
        /// YAML catalog path.
        path: PathBuf,
        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },
}

/// Execute the catalog subcommand.
pub fn run_catalog(args: &CatalogArgs) -> Result<u8> {
    match &args.command {
        CatalogCommand::Check { path } => {
            let catalog = load_catalog(path)?;
            let internships = catalog
                .courses()
                .iter()
                .filter(|c| c.kind == CourseKind::Internship)
                .count();
            println!(
                "OK: {} has {} entries ({} internships)",
                path.display(),
                catalog.len(),
                internships
            );
            Ok(0)
        }
        CatalogCommand::List { path, json } => {
            let courses = load_catalog(path)?.courses();
            if *json {
                print_json(&courses)?;
            } else {
                for course in &courses {
                    let kind = match course.kind {
                        CourseKind::Course => "course",
                        CourseKind::Internship => "internship",
                    };
                    println!("  {:<24} {:<10} {}", course.id, kind, course.name);
                }
            }
            Ok(0)
        }
    }
}
