//! # certreg-registry: The Certificate Registry
//!
//! Owns the authoritative mapping from certificate id to certificate record.
//!
//! - **Registry** (`registry.rs`): issue, lookup, verify, revoke, delete,
//!   metadata edits, listing, statistics.
//! - **Store** (`store/`): the [`CertificateStore`] persistence seam, with an
//!   in-memory backend and an atomically rewritten JSON file backend.
//! - **Ids** (`id.rs`): [`IdGenerator`] and the OS-entropy default.
//! - **Catalog** (`catalog.rs`): optional course catalog consulted at issuance.
//!
//! ## Concurrency
//!
//! Every mutation runs under one registry-wide mutex, so "generate id →
//! check uniqueness → persist" cannot interleave with another issuance and
//! mutations of a single certificate are serialized. Reads go straight to
//! the store.
//!
//! The registry does not authenticate anyone. Callers make the authorization
//! decision and pass the acting identity in explicitly.

pub mod catalog;
pub mod error;
pub mod id;
pub mod registry;
pub mod store;

pub use catalog::{CatalogError, CourseCatalog, CourseEntry, CourseKind, OpenCatalog, StaticCatalog};
pub use error::{PersistenceError, RegistryError};
pub use id::{IdGenerator, RandomIdGenerator};
pub use registry::{
    IssueRequest, ListFilter, Registry, RegistryStats, Verification, VerificationStatus,
    DELETION_REASON, MAX_ID_ATTEMPTS,
};
pub use store::{CertificateStore, JsonFileStore, MemoryStore};
