//! # certreg-state: Certificate Lifecycle
//!
//! The [`Certificate`] record and the rules governing how it may change
//! after issuance.
//!
//! ```text
//! Active ──▶ Revoked (terminal)
//! ```
//!
//! Identity and issuance facts (`id`, `recipient_name`, `course_name`,
//! `issue_date`, `issued_at`) have no setters. Only the status (with its
//! transition log) and the metadata map change, and only through the
//! methods on [`Certificate`].

pub mod certificate;

pub use certificate::{
    Certificate, CertificateStatus, IssuanceFacts, RevocationEvidence, RevocationOutcome,
    StatusTransitionRecord,
};
