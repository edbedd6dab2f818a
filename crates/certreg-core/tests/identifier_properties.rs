//! # Certificate Identifier Properties
//!
//! Property tests over the identifier encoding: every encoded id parses
//! back to itself, distinct entropy never yields the same id, and the
//! parser is insensitive to case and surrounding whitespace.

use certreg_core::{CertificateId, CERTIFICATE_ID_ENTROPY_BYTES, CERTIFICATE_ID_PREFIX};
use proptest::prelude::*;

fn entropy() -> impl Strategy<Value = [u8; CERTIFICATE_ID_ENTROPY_BYTES]> {
    proptest::array::uniform10(any::<u8>())
}

proptest! {
    #[test]
    fn encoded_id_parses_to_itself(bytes in entropy()) {
        let id = CertificateId::from_entropy(bytes);
        let parsed = CertificateId::parse(id.as_str()).unwrap();
        prop_assert_eq!(parsed, id);
    }

    #[test]
    fn encoded_id_has_fixed_shape(bytes in entropy()) {
        let id = CertificateId::from_entropy(bytes);
        prop_assert!(id.as_str().starts_with(CERTIFICATE_ID_PREFIX));
        prop_assert_eq!(id.as_str().len(), CERTIFICATE_ID_PREFIX.len() + 16);
    }

    #[test]
    fn distinct_entropy_gives_distinct_ids(a in entropy(), b in entropy()) {
        prop_assume!(a != b);
        prop_assert_ne!(CertificateId::from_entropy(a), CertificateId::from_entropy(b));
    }

    #[test]
    fn parse_ignores_case_and_padding(bytes in entropy(), pad in "[ \t]{0,3}") {
        let id = CertificateId::from_entropy(bytes);
        let mangled = format!("{pad}{}{pad}", id.as_str().to_ascii_lowercase());
        prop_assert_eq!(CertificateId::parse(&mangled).unwrap(), id);
    }

    #[test]
    fn parse_never_panics(raw in ".{0,40}") {
        let _ = CertificateId::parse(&raw);
    }
}
