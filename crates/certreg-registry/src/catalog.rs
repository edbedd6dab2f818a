//! # Course Catalog
//!
//! Issuance consults a [`CourseCatalog`] to decide whether a course name is
//! acceptable and how it should be spelled on the certificate.
//!
//! [`OpenCatalog`] accepts anything. [`StaticCatalog`] is loaded from YAML:
//!
//! ```yaml
//! courses:
//!   - id: python-mastery
//!     name: Python Programming Mastery
//!     category: Programming
//!   - id: ml-intern
//!     name: Machine Learning Intern
//!     kind: internship
//! ```
//!
//! Matching is case-insensitive on either `name` or `id`; the catalog's
//! `name` is what ends up on the certificate.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use certreg_core::{CourseName, ValidationError};

/// Failure loading a catalog file.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// The file could not be read.
    #[error("failed to read course catalog {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not a valid catalog document.
    #[error("failed to parse course catalog {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// Two entries share an id or a name.
    #[error("duplicate course catalog entry: {0}")]
    Duplicate(String),
}

/// Whether a catalog entry is a taught course or an internship.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CourseKind {
    #[default]
    Course,
    Internship,
}

/// One offering certificates can be issued for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseEntry {
    /// Short stable identifier.
    pub id: String,
    /// Display name printed on certificates.
    pub name: CourseName,
    #[serde(default)]
    pub kind: CourseKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// Source of truth for which courses certificates may name.
pub trait CourseCatalog: Send + Sync {
    /// Resolve a requested course to its canonical name.
    ///
    /// Returns [`ValidationError::UnknownCourse`] if the catalog does not
    /// offer it.
    fn resolve(&self, course: &CourseName) -> Result<CourseName, ValidationError>;

    /// Every known entry. Empty for catalogs that accept anything.
    fn courses(&self) -> Vec<CourseEntry>;

    /// Whether any non-empty course name is accepted.
    fn is_open(&self) -> bool {
        false
    }
}

/// Accepts any non-empty course name unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenCatalog;

impl CourseCatalog for OpenCatalog {
    fn resolve(&self, course: &CourseName) -> Result<CourseName, ValidationError> {
        Ok(course.clone())
    }

    fn courses(&self) -> Vec<CourseEntry> {
        Vec::new()
    }

    fn is_open(&self) -> bool {
        true
    }
}

#[derive(Deserialize)]
struct CatalogDocument {
    #[serde(default)]
    courses: Vec<CourseEntry>,
}

/// Fixed list of offerings.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    entries: Vec<CourseEntry>,
}

impl StaticCatalog {
    /// Build from entries, rejecting duplicate ids or names.
    pub fn new(entries: Vec<CourseEntry>) -> Result<Self, CatalogError> {
        let mut ids = HashSet::new();
        let mut names = HashSet::new();
        for entry in &entries {
            if !ids.insert(entry.id.to_lowercase()) {
                return Err(CatalogError::Duplicate(entry.id.clone()));
            }
            if !names.insert(entry.name.as_str().to_lowercase()) {
                return Err(CatalogError::Duplicate(entry.name.to_string()));
            }
        }
        Ok(Self { entries })
    }

    /// Parse a YAML catalog document. `origin` is only used in errors.
    pub fn from_yaml_str(yaml: &str, origin: &Path) -> Result<Self, CatalogError> {
        let document: CatalogDocument =
            serde_yaml::from_str(yaml).map_err(|source| CatalogError::Parse {
                path: origin.to_path_buf(),
                source,
            })?;
        Self::new(document.courses)
    }

    /// Load a YAML catalog from disk.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let catalog = Self::from_yaml_str(&content, path)?;
        tracing::info!(
            path = %path.display(),
            courses = catalog.entries.len(),
            "loaded course catalog"
        );
        Ok(catalog)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl CourseCatalog for StaticCatalog {
    fn resolve(&self, course: &CourseName) -> Result<CourseName, ValidationError> {
        self.entries
            .iter()
            .find(|entry| {
                entry.name.matches(course.as_str())
                    || entry.id.eq_ignore_ascii_case(course.as_str())
            })
            .map(|entry| entry.name.clone())
            .ok_or_else(|| ValidationError::UnknownCourse(course.to_string()))
    }

    fn courses(&self) -> Vec<CourseEntry> {
        self.entries.clone()
    }
}
