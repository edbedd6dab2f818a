//! # certreg-cli: Operator CLI for the Certificate Registry
//!
//! Works directly on a registry data file, the same file `certreg-api`
//! serves. Run it while the server is stopped; the two do not coordinate.
//!
//! ## Subcommands
//!
//! - `certreg cert`: issue, show, verify, revoke, delete, list, metadata, stats.
//! - `certreg catalog`: check and print a course catalog file.
//!
//! ```bash
//! certreg --store data/certificates.json cert issue --recipient "Alice Smith" --course "Rust 101"
//! certreg --store data/certificates.json cert verify CERT-3F2A9C1B7D4E8A60
//! certreg catalog check courses.yaml
//! ```

pub mod catalog;
pub mod cert;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

use certreg_registry::{JsonFileStore, Registry, StaticCatalog};

/// Where the registry lives.
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// JSON data file.
    pub store: PathBuf,
    /// Optional YAML course catalog applied at issuance.
    pub catalog: Option<PathBuf>,
}

/// Open the registry described by `options`.
pub fn open_registry(options: &StoreOptions) -> Result<Registry> {
    let store = JsonFileStore::open(&options.store)
        .with_context(|| format!("failed to open store {}", options.store.display()))?;
    let mut registry = Registry::new(Arc::new(store));
    if let Some(path) = &options.catalog {
        registry = registry.with_catalog(Arc::new(load_catalog(path)?));
    }
    Ok(registry)
}

pub(crate) fn load_catalog(path: &Path) -> Result<StaticCatalog> {
    StaticCatalog::load(path).context("failed to load course catalog")
}

/// Print a value as pretty JSON on stdout.
pub(crate) fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
