//! # Certificate Metadata
//!
//! Free-form key/value annotations (grade, completion percentage, ...).
//! Keys are bounded strings, values arbitrary JSON. Ordered by key so the
//! persisted form is stable.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Maximum number of metadata entries on one certificate.
pub const MAX_METADATA_ENTRIES: usize = 64;

/// Maximum length of a metadata key, in characters.
pub const MAX_METADATA_KEY_CHARS: usize = 64;

/// Annotations attached to a certificate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata(BTreeMap<String, serde_json::Value>);

impl Metadata {
    /// An empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from raw entries, validating keys and size.
    pub fn from_entries(
        entries: impl IntoIterator<Item = (String, serde_json::Value)>,
    ) -> Result<Self, ValidationError> {
        let metadata = Self(entries.into_iter().collect());
        metadata.validate()?;
        Ok(metadata)
    }

    /// Check key and size limits.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.0.len() > MAX_METADATA_ENTRIES {
            return Err(ValidationError::TooManyMetadataEntries {
                max: MAX_METADATA_ENTRIES,
                actual: self.0.len(),
            });
        }
        for key in self.0.keys() {
            validate_key(key)?;
        }
        Ok(())
    }

    /// Look up a value.
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &serde_json::Value)> {
        self.0.iter()
    }

    /// Apply an update, returning the resulting map. `self` is untouched
    /// if the result would violate the limits.
    pub fn apply(&self, update: &MetadataUpdate) -> Result<Self, ValidationError> {
        let next = match update {
            MetadataUpdate::Replace(entries) => {
                Self(entries.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            }
            MetadataUpdate::Merge(patch) => {
                let mut merged = self.0.clone();
                for (key, value) in patch {
                    if value.is_null() {
                        merged.remove(key);
                    } else {
                        merged.insert(key.clone(), value.clone());
                    }
                }
                Self(merged)
            }
        };
        next.validate()?;
        Ok(next)
    }
}

fn validate_key(key: &str) -> Result<(), ValidationError> {
    if key.trim().is_empty() {
        return Err(ValidationError::InvalidMetadataKey {
            key: key.to_string(),
            reason: "key must not be empty".to_string(),
        });
    }
    if key.chars().count() > MAX_METADATA_KEY_CHARS {
        return Err(ValidationError::InvalidMetadataKey {
            key: key.to_string(),
            reason: format!("key must not exceed {MAX_METADATA_KEY_CHARS} characters"),
        });
    }
    Ok(())
}

/// How a metadata edit combines with the existing map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "entries", rename_all = "snake_case")]
pub enum MetadataUpdate {
    /// Overwrite listed keys; a `null` value removes the key.
    Merge(BTreeMap<String, serde_json::Value>),
    /// Replace the whole map.
    Replace(BTreeMap<String, serde_json::Value>),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Metadata {
        Metadata::from_entries([
            ("grade".to_string(), json!("A")),
            ("completion".to_string(), json!(100)),
        ])
        .unwrap()
    }

    #[test]
    fn merge_overwrites_and_adds() {
        let patch = BTreeMap::from([
            ("grade".to_string(), json!("A+")),
            ("mentor".to_string(), json!("Dr. Rao")),
        ]);
        let next = sample().apply(&MetadataUpdate::Merge(patch)).unwrap();
        assert_eq!(next.get("grade"), Some(&json!("A+")));
        assert_eq!(next.get("completion"), Some(&json!(100)));
        assert_eq!(next.get("mentor"), Some(&json!("Dr. Rao")));
    }

    #[test]
    fn merge_null_removes_key() {
        let patch = BTreeMap::from([("grade".to_string(), serde_json::Value::Null)]);
        let next = sample().apply(&MetadataUpdate::Merge(patch)).unwrap();
        assert!(next.get("grade").is_none());
        assert_eq!(next.len(), 1);
    }

    #[test]
    fn replace_discards_previous_entries() {
        let entries = BTreeMap::from([("cohort".to_string(), json!("2024-spring"))]);
        let next = sample().apply(&MetadataUpdate::Replace(entries)).unwrap();
        assert_eq!(next.len(), 1);
        assert!(next.get("grade").is_none());
    }

    #[test]
    fn empty_key_rejected() {
        let result = Metadata::from_entries([(" ".to_string(), json!(1))]);
        assert!(matches!(
            result,
            Err(ValidationError::InvalidMetadataKey { .. })
        ));
    }

    #[test]
    fn entry_limit_enforced_on_merge() {
        let patch: BTreeMap<_, _> = (0..=MAX_METADATA_ENTRIES)
            .map(|i| (format!("k{i}"), json!(i)))
            .collect();
        let result = Metadata::new().apply(&MetadataUpdate::Merge(patch));
        assert!(matches!(
            result,
            Err(ValidationError::TooManyMetadataEntries { .. })
        ));
    }

    #[test]
    fn update_wire_format() {
        let update: MetadataUpdate =
            serde_json::from_value(json!({"mode": "merge", "entries": {"grade": "B"}})).unwrap();
        assert_eq!(
            update,
            MetadataUpdate::Merge(BTreeMap::from([("grade".to_string(), json!("B"))]))
        );
    }
}
