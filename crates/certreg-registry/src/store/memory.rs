//! In-memory store.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use certreg_core::CertificateId;
use certreg_state::Certificate;

use super::CertificateStore;
use crate::error::PersistenceError;

/// Thread-safe, cloneable in-memory certificate store.
///
/// `parking_lot::RwLock` is non-poisonable and never held across `.await`.
/// Clones share the same underlying map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    data: Arc<RwLock<HashMap<CertificateId, Certificate>>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl CertificateStore for MemoryStore {
    fn get(&self, id: &CertificateId) -> Result<Option<Certificate>, PersistenceError> {
        Ok(self.data.read().get(id).cloned())
    }

    fn put(&self, certificate: &Certificate) -> Result<(), PersistenceError> {
        self.data
            .write()
            .insert(certificate.id().clone(), certificate.clone());
        Ok(())
    }

    fn list(&self) -> Result<Vec<Certificate>, PersistenceError> {
        Ok(self.data.read().values().cloned().collect())
    }

    fn contains(&self, id: &CertificateId) -> Result<bool, PersistenceError> {
        Ok(self.data.read().contains_key(id))
    }

    fn len(&self) -> Result<usize, PersistenceError> {
        Ok(self.data.read().len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use certreg_core::{CourseName, Metadata, RecipientName, Timestamp};
    use certreg_state::IssuanceFacts;
    use chrono::NaiveDate;

    fn sample(seed: u8) -> Certificate {
        Certificate::issue(
            IssuanceFacts {
                id: CertificateId::from_entropy([seed; 10]),
                recipient_name: RecipientName::new("Bob").unwrap(),
                course_name: CourseName::new("Rust 101").unwrap(),
                issue_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
                issued_at: Timestamp::now(),
            },
            Metadata::new(),
        )
    }

    #[test]
    fn store_new_creates_empty_store() {
        let store = MemoryStore::new();
        assert_eq!(store.len().unwrap(), 0);
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn store_put_and_get() {
        let store = MemoryStore::new();
        let cert = sample(1);
        store.put(&cert).unwrap();
        assert_eq!(store.get(cert.id()).unwrap(), Some(cert.clone()));
        assert!(store.contains(cert.id()).unwrap());
    }

    #[test]
    fn store_put_replaces_existing() {
        let store = MemoryStore::new();
        let mut cert = sample(2);
        store.put(&cert).unwrap();
        cert.revoke(certreg_state::RevocationEvidence {
            reason: "test".into(),
            actor: None,
        });
        store.put(&cert).unwrap();
        assert_eq!(store.len().unwrap(), 1);
        assert!(!store.get(cert.id()).unwrap().unwrap().is_active());
    }

    #[test]
    fn store_clone_shares_underlying_data() {
        let store = MemoryStore::new();
        let clone = store.clone();
        let cert = sample(3);
        store.put(&cert).unwrap();
        assert!(clone.contains(cert.id()).unwrap());
    }
}
