//! # Domain Identity Newtypes
//!
//! Certificate identifiers and the validated names carried by a certificate.
//!
//! ## Identifier Format
//!
//! ```text
//! CERT-XXXXXXXXXXXXXXXX
//!      └──── 16 Crockford base32 symbols = 80 bits ────┘
//! ```
//!
//! The alphabet omits `I`, `L`, `O` and `U`. Parsing is case-insensitive
//! and maps the look-alikes `O → 0` and `I`/`L → 1`, so an id read aloud
//! or copied from a printed certificate still resolves.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Prefix shared by every certificate identifier.
pub const CERTIFICATE_ID_PREFIX: &str = "CERT-";

/// Number of entropy bytes encoded into one identifier.
pub const CERTIFICATE_ID_ENTROPY_BYTES: usize = 10;

/// Number of base32 symbols after the prefix.
const CERTIFICATE_ID_SYMBOLS: usize = 16;

/// Crockford base32 alphabet.
const ALPHABET: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

/// Maximum length of a recipient name, in characters.
pub const MAX_RECIPIENT_NAME_CHARS: usize = 100;

/// Maximum length of a course name, in characters.
pub const MAX_COURSE_NAME_CHARS: usize = 200;

// ── CertificateId ───────────────────────────────────────────────────

/// Unique, unguessable identifier of an issued certificate.
///
/// Always stored in canonical upper-case form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CertificateId(String);

impl CertificateId {
    /// Encode raw entropy into an identifier.
    pub fn from_entropy(entropy: [u8; CERTIFICATE_ID_ENTROPY_BYTES]) -> Self {
        let acc = entropy
            .iter()
            .fold(0u128, |acc, byte| (acc << 8) | u128::from(*byte));

        let mut id = String::with_capacity(CERTIFICATE_ID_PREFIX.len() + CERTIFICATE_ID_SYMBOLS);
        id.push_str(CERTIFICATE_ID_PREFIX);
        for group in (0..CERTIFICATE_ID_SYMBOLS).rev() {
            let index = ((acc >> (group * 5)) & 0x1f) as usize;
            id.push(ALPHABET[index] as char);
        }
        Self(id)
    }

    /// Parse an identifier supplied by a caller.
    ///
    /// Leading/trailing whitespace is ignored and the result is normalized
    /// to upper case.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let upper = raw.trim().to_ascii_uppercase();
        let body = upper
            .strip_prefix(CERTIFICATE_ID_PREFIX)
            .ok_or_else(|| ValidationError::InvalidCertificateId(raw.to_string()))?;

        if body.chars().count() != CERTIFICATE_ID_SYMBOLS {
            return Err(ValidationError::InvalidCertificateId(raw.to_string()));
        }

        let mut canonical =
            String::with_capacity(CERTIFICATE_ID_PREFIX.len() + CERTIFICATE_ID_SYMBOLS);
        canonical.push_str(CERTIFICATE_ID_PREFIX);
        for c in body.chars() {
            let mapped = match c {
                'O' => '0',
                'I' | 'L' => '1',
                other => other,
            };
            if !mapped.is_ascii() || !ALPHABET.contains(&(mapped as u8)) {
                return Err(ValidationError::InvalidCertificateId(raw.to_string()));
            }
            canonical.push(mapped);
        }
        Ok(Self(canonical))
    }

    /// The canonical string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CertificateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for CertificateId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CertificateId> for String {
    fn from(id: CertificateId) -> Self {
        id.0
    }
}

impl std::str::FromStr for CertificateId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

// ── Names ───────────────────────────────────────────────────────────

/// Comparison key for names: trimmed and Unicode-lowercased.
pub fn fold_name(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Whether two names are equal under [`fold_name`].
pub fn same_name(a: &str, b: &str) -> bool {
    fold_name(a) == fold_name(b)
}

fn validated_text(
    raw: impl Into<String>,
    field: &'static str,
    max: usize,
) -> Result<String, ValidationError> {
    let raw = raw.into();
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Empty { field });
    }
    let actual = trimmed.chars().count();
    if actual > max {
        return Err(ValidationError::TooLong { field, max, actual });
    }
    Ok(trimmed.to_string())
}

/// Name of the person a certificate is issued to.
///
/// Non-empty after trimming, at most [`MAX_RECIPIENT_NAME_CHARS`] characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RecipientName(String);

impl RecipientName {
    /// Create a validated recipient name.
    pub fn new(raw: impl Into<String>) -> Result<Self, ValidationError> {
        validated_text(raw, "recipient_name", MAX_RECIPIENT_NAME_CHARS).map(Self)
    }

    /// Return the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Case-insensitive comparison against a raw name string.
    pub fn matches(&self, other: &str) -> bool {
        same_name(&self.0, other)
    }
}

/// Name of the course or internship a certificate attests to.
///
/// Non-empty after trimming, at most [`MAX_COURSE_NAME_CHARS`] characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CourseName(String);

impl CourseName {
    /// Create a validated course name.
    pub fn new(raw: impl Into<String>) -> Result<Self, ValidationError> {
        validated_text(raw, "course_name", MAX_COURSE_NAME_CHARS).map(Self)
    }

    /// Return the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Case-insensitive comparison against a raw course string.
    pub fn matches(&self, other: &str) -> bool {
        same_name(&self.0, other)
    }
}

macro_rules! string_newtype_impls {
    ($ty:ident) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl TryFrom<String> for $ty {
            type Error = ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$ty> for String {
            fn from(value: $ty) -> Self {
                value.0
            }
        }
    };
}

string_newtype_impls!(RecipientName);
string_newtype_impls!(CourseName);
