//! # Persistence Abstraction
//!
//! The registry talks to storage only through [`CertificateStore`].
//!
//! | Backend | Durability | Use |
//! |---|---|---|
//! | [`MemoryStore`] | process lifetime | tests, ephemeral deployments |
//! | [`JsonFileStore`] | fsync'd atomic rewrite per `put` | single-node deployments |
//!
//! A successful `put` must be durable before it returns. A failed `put`
//! must leave the previously committed state visible.

mod file;
mod memory;

pub use file::JsonFileStore;
pub use memory::MemoryStore;

use certreg_core::CertificateId;
use certreg_state::Certificate;

use crate::error::PersistenceError;

/// Durable collection of certificate records keyed by id.
///
/// Implementations are internally synchronized; the registry may call them
/// from many threads at once.
pub trait CertificateStore: Send + Sync {
    /// Fetch a record by id.
    fn get(&self, id: &CertificateId) -> Result<Option<Certificate>, PersistenceError>;

    /// Insert or replace a record.
    fn put(&self, certificate: &Certificate) -> Result<(), PersistenceError>;

    /// Every record, in no particular order.
    fn list(&self) -> Result<Vec<Certificate>, PersistenceError>;

    /// Whether an id has ever been stored.
    fn contains(&self, id: &CertificateId) -> Result<bool, PersistenceError> {
        Ok(self.get(id)?.is_some())
    }

    /// Number of stored records.
    fn len(&self) -> Result<usize, PersistenceError> {
        Ok(self.list()?.len())
    }
}
