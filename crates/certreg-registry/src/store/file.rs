//! # JSON File Store
//!
//! Keeps every record in one JSON document:
//!
//! ```json
//! { "version": 1, "certificates": [ { "id": "CERT-…", … } ] }
//! ```
//!
//! The document is mirrored in memory for reads. Each `put` writes the
//! complete next document to a temp file in the same directory, fsyncs it,
//! renames it over the data file and fsyncs the directory. Only after the
//! rename succeeds does the in-memory mirror advance, so a failed write
//! leaves the last committed state visible both on disk and in memory.

use std::collections::BTreeMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

use certreg_core::CertificateId;
use certreg_state::Certificate;

use super::CertificateStore;
use crate::error::PersistenceError;

/// On-disk document version.
const FORMAT_VERSION: u32 = 1;

#[derive(Deserialize)]
struct StoredDocument {
    version: u32,
    #[serde(default)]
    certificates: Vec<Certificate>,
}

#[derive(Serialize)]
struct StoredDocumentRef<'a> {
    version: u32,
    certificates: Vec<&'a Certificate>,
}

/// Durable store backed by a single JSON file.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    dir: PathBuf,
    records: RwLock<BTreeMap<CertificateId, Certificate>>,
    writer: Mutex<()>,
}

impl JsonFileStore {
    /// Open the data file, creating an empty one if it does not exist.
    ///
    /// Fails with [`PersistenceError::Corrupt`] if the file exists but is
    /// not a valid registry document.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, PersistenceError> {
        let path = path.into();
        let dir = parent_dir(&path);
        fs::create_dir_all(&dir).map_err(|e| PersistenceError::io(&dir, e))?;

        let records = match fs::read(&path) {
            Ok(bytes) => decode(&path, &bytes)?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                let empty = BTreeMap::new();
                write_document(&path, &dir, &empty)?;
                tracing::info!(path = %path.display(), "created empty certificate data file");
                empty
            }
            Err(e) => return Err(PersistenceError::io(&path, e)),
        };

        tracing::debug!(
            path = %path.display(),
            certificates = records.len(),
            "loaded certificate data file"
        );

        Ok(Self {
            path,
            dir,
            records: RwLock::new(records),
            writer: Mutex::new(()),
        })
    }

    /// Path of the backing data file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CertificateStore for JsonFileStore {
    fn get(&self, id: &CertificateId) -> Result<Option<Certificate>, PersistenceError> {
        Ok(self.records.read().get(id).cloned())
    }

    fn put(&self, certificate: &Certificate) -> Result<(), PersistenceError> {
        let _writer = self.writer.lock();

        let mut next = self.records.read().clone();
        next.insert(certificate.id().clone(), certificate.clone());
        write_document(&self.path, &self.dir, &next)?;

        *self.records.write() = next;
        Ok(())
    }

    fn list(&self) -> Result<Vec<Certificate>, PersistenceError> {
        Ok(self.records.read().values().cloned().collect())
    }

    fn contains(&self, id: &CertificateId) -> Result<bool, PersistenceError> {
        Ok(self.records.read().contains_key(id))
    }

    fn len(&self) -> Result<usize, PersistenceError> {
        Ok(self.records.read().len())
    }
}

fn parent_dir(path: &Path) -> PathBuf {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

fn decode(
    path: &Path,
    bytes: &[u8],
) -> Result<BTreeMap<CertificateId, Certificate>, PersistenceError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(BTreeMap::new());
    }

    let document: StoredDocument =
        serde_json::from_slice(bytes).map_err(|e| PersistenceError::Corrupt {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    if document.version != FORMAT_VERSION {
        return Err(PersistenceError::Corrupt {
            path: path.to_path_buf(),
            reason: format!(
                "unsupported document version {} (expected {FORMAT_VERSION})",
                document.version
            ),
        });
    }

    let mut records = BTreeMap::new();
    for certificate in document.certificates {
        let id = certificate.id().clone();
        certificate
            .check_history()
            .map_err(|reason| PersistenceError::Corrupt {
                path: path.to_path_buf(),
                reason: format!("certificate {id}: {reason}"),
            })?;
        if records.insert(id.clone(), certificate).is_some() {
            return Err(PersistenceError::Corrupt {
                path: path.to_path_buf(),
                reason: format!("duplicate certificate id {id}"),
            });
        }
    }
    Ok(records)
}

/// Atomically replace `path` with the serialized document.
fn write_document(
    path: &Path,
    dir: &Path,
    records: &BTreeMap<CertificateId, Certificate>,
) -> Result<(), PersistenceError> {
    let document = StoredDocumentRef {
        version: FORMAT_VERSION,
        certificates: records.values().collect(),
    };
    let bytes = serde_json::to_vec_pretty(&document)?;

    let mut temp = tempfile::NamedTempFile::new_in(dir).map_err(|e| PersistenceError::io(dir, e))?;
    temp.as_file_mut()
        .write_all(&bytes)
        .map_err(|e| PersistenceError::io(temp.path(), e))?;
    temp.as_file()
        .sync_all()
        .map_err(|e| PersistenceError::io(temp.path(), e))?;
    temp.persist(path)
        .map_err(|e| PersistenceError::io(path, e.error))?;

    sync_dir(dir)
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> Result<(), PersistenceError> {
    fs::File::open(dir)
        .and_then(|d| d.sync_all())
        .map_err(|e| PersistenceError::io(dir, e))
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> Result<(), PersistenceError> {
    Ok(())
}
