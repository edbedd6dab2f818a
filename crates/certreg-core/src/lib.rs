//! # certreg-core: Foundational Types for the Certificate Registry
//!
//! Every other crate in the workspace depends on `certreg-core`; it depends
//! on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for domain primitives.** `CertificateId`,
//!    `RecipientName`, `CourseName` are validated at construction. No bare
//!    strings cross crate boundaries as identifiers or names.
//!
//! 2. **Unguessable identifiers.** A `CertificateId` carries 80 bits of
//!    entropy encoded in Crockford base32. The core only encodes and parses;
//!    drawing the entropy is the registry's job.
//!
//! 3. **UTC-only timestamps.** `Timestamp` is UTC with seconds precision.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `certreg-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod error;
pub mod identity;
pub mod metadata;
pub mod temporal;

pub use error::ValidationError;
pub use identity::{
    fold_name, same_name, CertificateId, CourseName, RecipientName, CERTIFICATE_ID_ENTROPY_BYTES,
    CERTIFICATE_ID_PREFIX, MAX_COURSE_NAME_CHARS, MAX_RECIPIENT_NAME_CHARS,
};
pub use metadata::{Metadata, MetadataUpdate};
pub use temporal::Timestamp;
