//! # API Route Modules
//!
//! - `certificates`: issuance, lookup, revocation, deletion, metadata
//!   edits and listing. Behind bearer auth.
//! - `admin`: registry statistics. Behind bearer auth.
//! - `verify`: public verification by id or by recipient and course.
//! - `courses`: public course catalog.

pub mod admin;
pub mod certificates;
pub mod courses;
pub mod verify;

use certreg_core::CertificateId;

use crate::error::AppError;

/// Parse a path id. An id that cannot exist is reported as not found.
pub(crate) fn parse_certificate_id(raw: &str) -> Result<CertificateId, AppError> {
    CertificateId::parse(raw).map_err(|_| AppError::NotFound(format!("certificate {raw}")))
}
