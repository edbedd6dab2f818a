//! # Identifier Generation
//!
//! Candidates come from the operating system CSPRNG. Uniqueness is not
//! assumed: the registry checks every candidate against the store.

use rand::rngs::OsRng;
use rand::RngCore;

use certreg_core::{CertificateId, CERTIFICATE_ID_ENTROPY_BYTES};

/// Source of candidate certificate ids.
pub trait IdGenerator: Send + Sync {
    /// Produce a fresh candidate id.
    fn generate(&self) -> CertificateId;
}

/// Draws 80 bits from [`OsRng`] per id.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomIdGenerator;

impl IdGenerator for RandomIdGenerator {
    fn generate(&self) -> CertificateId {
        let mut entropy = [0u8; CERTIFICATE_ID_ENTROPY_BYTES];
        OsRng.fill_bytes(&mut entropy);
        CertificateId::from_entropy(entropy)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn random_ids_are_well_formed() {
        let id = RandomIdGenerator.generate();
        assert_eq!(CertificateId::parse(id.as_str()).unwrap(), id);
    }

    #[test]
    fn random_ids_do_not_repeat_in_practice() {
        let ids: HashSet<_> = (0..10_000).map(|_| RandomIdGenerator.generate()).collect();
        assert_eq!(ids.len(), 10_000);
    }
}
