//! # Registry Service
//!
//! [`Registry`] is the single authority over certificate records. It
//! validates issuance input, assigns collision-checked ids, answers
//! verification queries and applies the two permitted mutations
//! (revocation and metadata edits).

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use chrono::NaiveDate;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use certreg_core::{
    fold_name, CertificateId, CourseName, Metadata, MetadataUpdate, RecipientName, Timestamp,
};
use certreg_state::{
    Certificate, CertificateStatus, IssuanceFacts, RevocationEvidence, RevocationOutcome,
};

use crate::catalog::{CourseCatalog, OpenCatalog};
use crate::error::{PersistenceError, RegistryError};
use crate::id::{IdGenerator, RandomIdGenerator};
use crate::store::CertificateStore;

/// Candidates tried before issuance gives up with
/// [`PersistenceError::IdSpaceExhausted`].
pub const MAX_ID_ATTEMPTS: u32 = 5;

/// Revocation reason recorded when an administrator deletes a certificate.
pub const DELETION_REASON: &str = "deleted";

// ─── Requests & Results ──────────────────────────────────────────────

/// Input to [`Registry::issue`]. Names are validated by the registry.
#[derive(Debug, Clone, Default)]
pub struct IssueRequest {
    pub recipient_name: String,
    pub course_name: String,
    /// Defaults to the UTC date of issuance.
    pub issue_date: Option<NaiveDate>,
    pub metadata: Metadata,
}

/// Outcome of a verification query.
#[derive(Debug, Clone, PartialEq)]
pub enum Verification {
    /// Issued and still active.
    Valid(Certificate),
    /// Issued, then revoked or deleted.
    Revoked(Certificate),
    /// Never issued, or not a well-formed id.
    NotFound,
}

impl Verification {
    fn of(certificate: Certificate) -> Self {
        match certificate.status() {
            CertificateStatus::Active => Self::Valid(certificate),
            CertificateStatus::Revoked => Self::Revoked(certificate),
        }
    }

    pub fn status(&self) -> VerificationStatus {
        match self {
            Self::Valid(_) => VerificationStatus::Valid,
            Self::Revoked(_) => VerificationStatus::Revoked,
            Self::NotFound => VerificationStatus::NotFound,
        }
    }

    /// The matched record, if any.
    pub fn certificate(&self) -> Option<&Certificate> {
        match self {
            Self::Valid(c) | Self::Revoked(c) => Some(c),
            Self::NotFound => None,
        }
    }
}

/// Wire-level verification verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Valid,
    Revoked,
    NotFound,
}

impl VerificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Valid => "valid",
            Self::Revoked => "revoked",
            Self::NotFound => "not_found",
        }
    }
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Criteria for [`Registry::list`]. All fields are optional and combine
/// with AND.
#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    pub status: Option<CertificateStatus>,
    /// Case-insensitive exact course name.
    pub course: Option<String>,
    /// Case-insensitive substring of the recipient name.
    pub recipient: Option<String>,
    pub limit: Option<usize>,
}

impl ListFilter {
    fn accepts(&self, certificate: &Certificate) -> bool {
        if let Some(status) = self.status {
            if certificate.status() != status {
                return false;
            }
        }
        if let Some(course) = &self.course {
            if !certificate.course_name().matches(course) {
                return false;
            }
        }
        if let Some(recipient) = &self.recipient {
            let needle = fold_name(recipient);
            if !fold_name(certificate.recipient_name().as_str()).contains(&needle)
            {
                return false;
            }
        }
        true
    }
}

/// Aggregate counts over every certificate ever issued.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryStats {
    pub total: usize,
    pub active: usize,
    pub revoked: usize,
    /// Certificates per course name, active and revoked alike.
    pub by_course: BTreeMap<String, usize>,
}

// ─── Registry ────────────────────────────────────────────────────────

/// The certificate registry.
///
/// Cheap to share behind an `Arc`; all methods take `&self`. Methods block
/// on store I/O and must not be called directly from an async executor
/// thread when the store touches disk.
pub struct Registry {
    store: Arc<dyn CertificateStore>,
    ids: Arc<dyn IdGenerator>,
    catalog: Arc<dyn CourseCatalog>,
    mutations: Mutex<()>,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry").finish_non_exhaustive()
    }
}

impl Registry {
    /// Registry over `store` with random ids and an open catalog.
    pub fn new(store: Arc<dyn CertificateStore>) -> Self {
        Self {
            store,
            ids: Arc::new(RandomIdGenerator),
            catalog: Arc::new(OpenCatalog),
            mutations: Mutex::new(()),
        }
    }

    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    pub fn with_catalog(mut self, catalog: Arc<dyn CourseCatalog>) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn catalog(&self) -> &Arc<dyn CourseCatalog> {
        &self.catalog
    }

    /// Issue a new active certificate.
    ///
    /// Input is validated before any id is drawn. The record is durable
    /// when this returns `Ok`.
    pub fn issue(&self, request: IssueRequest) -> Result<Certificate, RegistryError> {
        let recipient_name = RecipientName::new(request.recipient_name)?;
        let course_name = self.catalog.resolve(&CourseName::new(request.course_name)?)?;
        request.metadata.validate()?;

        let _guard = self.mutations.lock();
        let id = self.fresh_id()?;
        let issued_at = Timestamp::now();
        let certificate = Certificate::issue(
            IssuanceFacts {
                id,
                recipient_name,
                course_name,
                issue_date: request.issue_date.unwrap_or_else(|| issued_at.date()),
                issued_at,
            },
            request.metadata,
        );
        self.store.put(&certificate)?;

        tracing::info!(
            certificate_id = %certificate.id(),
            course = %certificate.course_name(),
            "certificate issued"
        );
        Ok(certificate)
    }

    fn fresh_id(&self) -> Result<CertificateId, PersistenceError> {
        for attempt in 1..=MAX_ID_ATTEMPTS {
            let candidate = self.ids.generate();
            if !self.store.contains(&candidate)? {
                return Ok(candidate);
            }
            tracing::warn!(attempt, certificate_id = %candidate, "generated certificate id already in use");
        }
        Err(PersistenceError::IdSpaceExhausted {
            attempts: MAX_ID_ATTEMPTS,
        })
    }

    /// Fetch a certificate by id.
    pub fn lookup(&self, id: &CertificateId) -> Result<Certificate, RegistryError> {
        self.store
            .get(id)?
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))
    }

    /// Verify a caller-supplied id. Malformed input is reported as
    /// [`Verification::NotFound`], never as an error.
    pub fn verify(&self, raw_id: &str) -> Result<Verification, RegistryError> {
        let Ok(id) = CertificateId::parse(raw_id) else {
            return Ok(Verification::NotFound);
        };
        Ok(self
            .store
            .get(&id)?
            .map_or(Verification::NotFound, Verification::of))
    }

    /// Revoke a certificate. Revoking an already revoked certificate
    /// returns it unchanged.
    pub fn revoke(
        &self,
        id: &CertificateId,
        evidence: RevocationEvidence,
    ) -> Result<Certificate, RegistryError> {
        self.revoke_with_outcome(id, evidence)
            .map(|(certificate, _)| certificate)
    }

    /// [`Registry::revoke`], also reporting whether this call performed
    /// the transition.
    pub fn revoke_with_outcome(
        &self,
        id: &CertificateId,
        evidence: RevocationEvidence,
    ) -> Result<(Certificate, RevocationOutcome), RegistryError> {
        let _guard = self.mutations.lock();
        let mut certificate = self.lookup(id)?;
        let reason = evidence.reason.clone();
        let actor = evidence.actor.clone();

        let outcome = certificate.revoke(evidence);
        match outcome {
            RevocationOutcome::Revoked => {
                self.store.put(&certificate)?;
                tracing::info!(
                    certificate_id = %id,
                    reason = %reason,
                    actor = actor.as_deref().unwrap_or("-"),
                    "certificate revoked"
                );
            }
            RevocationOutcome::AlreadyRevoked => {
                tracing::debug!(certificate_id = %id, "certificate already revoked");
            }
        }
        Ok((certificate, outcome))
    }

    /// Administrative delete: a revocation with reason [`DELETION_REASON`].
    /// The record stays verifiable as revoked and its id is never reissued.
    pub fn delete(
        &self,
        id: &CertificateId,
        actor: Option<String>,
    ) -> Result<Certificate, RegistryError> {
        self.revoke(
            id,
            RevocationEvidence {
                reason: DELETION_REASON.to_string(),
                actor,
            },
        )
    }

    /// Edit a certificate's metadata. Status and issuance facts are never
    /// touched; revoked certificates may still be annotated.
    pub fn update_metadata(
        &self,
        id: &CertificateId,
        update: &MetadataUpdate,
    ) -> Result<Certificate, RegistryError> {
        let _guard = self.mutations.lock();
        let mut certificate = self.lookup(id)?;
        certificate.update_metadata(update)?;
        self.store.put(&certificate)?;
        tracing::info!(certificate_id = %id, entries = certificate.metadata().len(), "certificate metadata updated");
        Ok(certificate)
    }

    /// Certificates matching `filter`, newest first.
    pub fn list(&self, filter: &ListFilter) -> Result<Vec<Certificate>, RegistryError> {
        let mut matched: Vec<Certificate> = self
            .store
            .list()?
            .into_iter()
            .filter(|c| filter.accepts(c))
            .collect();
        matched.sort_by(|a, b| {
            b.issue_date()
                .cmp(&a.issue_date())
                .then_with(|| b.issued_at().cmp(&a.issued_at()))
                .then_with(|| a.id().cmp(b.id()))
        });
        if let Some(limit) = filter.limit {
            matched.truncate(limit);
        }
        Ok(matched)
    }

    /// Verify by recipient and course instead of id.
    ///
    /// Both must match exactly, ignoring case and surrounding whitespace.
    /// When several certificates match, an active one wins over a revoked
    /// one, then the most recently issued.
    pub fn find_by_recipient(
        &self,
        recipient_name: &str,
        course_name: &str,
    ) -> Result<Verification, RegistryError> {
        if recipient_name.trim().is_empty() || course_name.trim().is_empty() {
            return Ok(Verification::NotFound);
        }

        let best = self
            .store
            .list()?
            .into_iter()
            .filter(|c| {
                c.recipient_name().matches(recipient_name) && c.course_name().matches(course_name)
            })
            .max_by(|a, b| {
                a.is_active()
                    .cmp(&b.is_active())
                    .then_with(|| a.issued_at().cmp(&b.issued_at()))
                    .then_with(|| a.issue_date().cmp(&b.issue_date()))
                    .then_with(|| b.id().cmp(a.id()))
            });
        Ok(best.map_or(Verification::NotFound, Verification::of))
    }

    /// Totals by status and by course.
    ///
    /// Courses are grouped ignoring case, the same way [`ListFilter`]
    /// matches them. Each group is keyed by its earliest-issued spelling.
    pub fn statistics(&self) -> Result<RegistryStats, RegistryError> {
        let mut certificates = self.store.list()?;
        certificates.sort_by(|a, b| {
            a.issued_at()
                .cmp(&b.issued_at())
                .then_with(|| a.id().cmp(b.id()))
        });

        let mut stats = RegistryStats::default();
        let mut spellings: HashMap<String, String> = HashMap::new();
        for certificate in &certificates {
            stats.total += 1;
            match certificate.status() {
                CertificateStatus::Active => stats.active += 1,
                CertificateStatus::Revoked => stats.revoked += 1,
            }
            let course = certificate.course_name().as_str();
            let key = spellings
                .entry(fold_name(course))
                .or_insert_with(|| course.to_string());
            *stats.by_course.entry(key.clone()).or_default() += 1;
        }
        Ok(stats)
    }

    /// Number of certificates ever issued.
    pub fn count(&self) -> Result<usize, RegistryError> {
        Ok(self.store.len()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;

    fn registry() -> Registry {
        Registry::new(Arc::new(MemoryStore::new()))
    }

    fn request(name: &str, course: &str) -> IssueRequest {
        IssueRequest {
            recipient_name: name.to_string(),
            course_name: course.to_string(),
            ..Default::default()
        }
    }

    fn evidence(reason: &str) -> RevocationEvidence {
        RevocationEvidence {
            reason: reason.to_string(),
            actor: Some("admin".to_string()),
        }
    }

    #[test]
    fn issue_defaults_issue_date_to_today() {
        let cert = registry().issue(request("Alice", "Intro to ML")).unwrap();
        assert_eq!(cert.issue_date(), cert.issued_at().date());
        assert!(cert.is_active());
    }

    #[test]
    fn issue_trims_names() {
        let cert = registry()
            .issue(request("  Alice  ", " Intro to ML "))
            .unwrap();
        assert_eq!(cert.recipient_name().as_str(), "Alice");
        assert_eq!(cert.course_name().as_str(), "Intro to ML");
    }

    #[test]
    fn issue_rejects_empty_names() {
        let registry = registry();
        assert!(matches!(
            registry.issue(request("   ", "Intro to ML")),
            Err(RegistryError::Validation(_))
        ));
        assert!(matches!(
            registry.issue(request("Alice", "")),
            Err(RegistryError::Validation(_))
        ));
        assert_eq!(registry.count().unwrap(), 0);
    }

    #[test]
    fn verify_malformed_id_is_not_found() {
        let registry = registry();
        for raw in ["", "nonexistent-id-1234", "CERT-", "CERT-ZZZZ", "a1b2c3d4"] {
            assert_eq!(registry.verify(raw).unwrap(), Verification::NotFound);
        }
    }

    #[test]
    fn verify_accepts_lowercase_id() {
        let registry = registry();
        let cert = registry.issue(request("Alice", "Intro to ML")).unwrap();
        let lower = cert.id().as_str().to_lowercase();
        assert_eq!(
            registry.verify(&lower).unwrap().status(),
            VerificationStatus::Valid
        );
    }

    #[test]
    fn revoke_is_idempotent() {
        let registry = registry();
        let cert = registry.issue(request("Bob", "Rust 101")).unwrap();
        let first = registry.revoke(cert.id(), evidence("fraud")).unwrap();
        let (second, outcome) = registry
            .revoke_with_outcome(cert.id(), evidence("again"))
            .unwrap();
        assert_eq!(outcome, RevocationOutcome::AlreadyRevoked);
        assert_eq!(first, second);
        assert_eq!(second.transitions().len(), 1);
        assert_eq!(second.revocation().unwrap().reason, "fraud");
    }

    #[test]
    fn revoke_unknown_is_not_found() {
        let id = CertificateId::from_entropy([9; 10]);
        assert!(matches!(
            registry().revoke(&id, evidence("x")),
            Err(RegistryError::NotFound(_))
        ));
    }

    #[test]
    fn delete_keeps_record_verifiable_as_revoked() {
        let registry = registry();
        let cert = registry.issue(request("Carol", "Rust 101")).unwrap();
        registry.delete(cert.id(), Some("admin".into())).unwrap();

        let verdict = registry.verify(cert.id().as_str()).unwrap();
        assert_eq!(verdict.status(), VerificationStatus::Revoked);
        let revocation = verdict.certificate().unwrap().revocation().unwrap().clone();
        assert_eq!(revocation.reason, DELETION_REASON);
        assert_eq!(registry.count().unwrap(), 1);
    }

    #[test]
    fn update_metadata_preserves_identity_and_status() {
        let registry = registry();
        let cert = registry.issue(request("Dana", "Rust 101")).unwrap();
        registry.revoke(cert.id(), evidence("expired")).unwrap();

        let update = MetadataUpdate::Merge(BTreeMap::from([("grade".to_string(), json!("A"))]));
        let updated = registry.update_metadata(cert.id(), &update).unwrap();

        assert_eq!(updated.metadata().get("grade"), Some(&json!("A")));
        assert_eq!(updated.status(), CertificateStatus::Revoked);
        assert_eq!(updated.id(), cert.id());
        assert_eq!(updated.recipient_name(), cert.recipient_name());
        assert_eq!(updated.issue_date(), cert.issue_date());
        assert_eq!(updated.issued_at(), cert.issued_at());
    }

    #[test]
    fn list_orders_newest_first_and_filters() {
        let registry = registry();
        let date = |d| NaiveDate::from_ymd_opt(2024, 1, d).unwrap();
        for (name, course, day) in [
            ("Alice Smith", "Rust 101", 5),
            ("Bob Jones", "Intro to ML", 20),
            ("alice cooper", "rust 101", 12),
        ] {
            registry
                .issue(IssueRequest {
                    issue_date: Some(date(day)),
                    ..request(name, course)
                })
                .unwrap();
        }

        let all = registry.list(&ListFilter::default()).unwrap();
        let days: Vec<_> = all.iter().map(|c| c.issue_date()).collect();
        assert_eq!(days, vec![date(20), date(12), date(5)]);

        let rust = registry
            .list(&ListFilter {
                course: Some("RUST 101".into()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(rust.len(), 2);

        let alices = registry
            .list(&ListFilter {
                recipient: Some("ALICE".into()),
                limit: Some(1),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(alices.len(), 1);
        assert_eq!(alices[0].recipient_name().as_str(), "alice cooper");
    }

    #[test]
    fn find_by_recipient_prefers_active_match() {
        let registry = registry();
        let old = registry.issue(request("Eve", "Rust 101")).unwrap();
        let newer = registry.issue(request("Eve", "Rust 101")).unwrap();
        registry.revoke(newer.id(), evidence("reissued")).unwrap();

        let verdict = registry.find_by_recipient(" eve ", "RUST 101").unwrap();
        assert_eq!(verdict, Verification::Valid(old));

        assert_eq!(
            registry.find_by_recipient("Eve", "Go 101").unwrap(),
            Verification::NotFound
        );
        assert_eq!(
            registry.find_by_recipient("", "Rust 101").unwrap(),
            Verification::NotFound
        );
    }

    #[test]
    fn statistics_count_by_status_and_course() {
        let registry = registry();
        let a = registry.issue(request("A", "Rust 101")).unwrap();
        registry.issue(request("B", "Rust 101")).unwrap();
        registry.issue(request("C", "Intro to ML")).unwrap();
        registry.revoke(a.id(), evidence("x")).unwrap();

        let stats = registry.statistics().unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.active, 2);
        assert_eq!(stats.revoked, 1);
        assert_eq!(stats.by_course.get("Rust 101"), Some(&2));
        assert_eq!(stats.by_course.get("Intro to ML"), Some(&1));
    }

    #[test]
    fn statistics_group_courses_ignoring_case() {
        let registry = registry();
        registry.issue(request("Ada", "Rust 101")).unwrap();
        registry.issue(request("Grace", "rust 101")).unwrap();
        registry.issue(request("Linus", "RUST 101 ")).unwrap();

        let stats = registry.statistics().unwrap();
        assert_eq!(stats.by_course.len(), 1);
        let (spelling, count) = stats.by_course.iter().next().unwrap();
        assert_eq!(fold_name(spelling), "rust 101");
        assert_eq!(*count, 3);

        let listed = registry
            .list(&ListFilter {
                course: Some("RUST 101".into()),
                ..ListFilter::default()
            })
            .unwrap();
        assert_eq!(listed.len(), 3);
    }

    #[test]
    fn find_by_recipient_folds_unicode_case() {
        let registry = registry();
        let cert = registry.issue(request("Émile", "Rust 101")).unwrap();
        let verification = registry.find_by_recipient("émile", "rust 101").unwrap();
        assert_eq!(verification.certificate().map(|c| c.id()), Some(cert.id()));
    }
}
