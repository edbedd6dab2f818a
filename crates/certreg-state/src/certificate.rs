//! # Certificate Record and Status Lifecycle
//!
//! ## States
//!
//! ```text
//! Active ──revoke──▶ Revoked (terminal)
//!                      │
//!                      └──revoke──▶ Revoked (no-op)
//! ```
//!
//! There is no reactivation. A revocation appends exactly one
//! [`StatusTransitionRecord`]; revoking again leaves the record untouched.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use certreg_core::{
    CertificateId, CourseName, Metadata, MetadataUpdate, RecipientName, Timestamp,
    ValidationError,
};

// ─── Status ──────────────────────────────────────────────────────────

/// Status of an issued certificate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CertificateStatus {
    /// Valid and verifiable.
    Active,
    /// Permanently withdrawn (terminal).
    Revoked,
}

impl CertificateStatus {
    /// Return the string representation of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Revoked => "revoked",
        }
    }

    /// Whether this state is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Revoked)
    }
}

impl std::fmt::Display for CertificateStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CertificateStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "revoked" => Ok(Self::Revoked),
            other => Err(format!("unknown certificate status: {other}")),
        }
    }
}

// ─── Transition Evidence ─────────────────────────────────────────────

/// Why and by whom a certificate is being revoked.
#[derive(Debug, Clone)]
pub struct RevocationEvidence {
    /// Reason for the revocation.
    pub reason: String,
    /// Caller that initiated the revocation.
    pub actor: Option<String>,
}

/// Record of a status transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusTransitionRecord {
    pub from_state: CertificateStatus,
    pub to_state: CertificateStatus,
    pub timestamp: Timestamp,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
}

/// Result of a revocation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevocationOutcome {
    /// The certificate moved from active to revoked.
    Revoked,
    /// The certificate was already revoked; nothing changed.
    AlreadyRevoked,
}

// ─── Certificate ─────────────────────────────────────────────────────

/// Immutable facts fixed at issuance.
#[derive(Debug, Clone)]
pub struct IssuanceFacts {
    pub id: CertificateId,
    pub recipient_name: RecipientName,
    pub course_name: CourseName,
    pub issue_date: NaiveDate,
    pub issued_at: Timestamp,
}

/// An issued certificate.
///
/// Fields are private: the only mutations are [`Certificate::revoke`] and
/// [`Certificate::update_metadata`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Certificate {
    id: CertificateId,
    recipient_name: RecipientName,
    course_name: CourseName,
    issue_date: NaiveDate,
    issued_at: Timestamp,
    status: CertificateStatus,
    #[serde(default)]
    metadata: Metadata,
    #[serde(default)]
    transitions: Vec<StatusTransitionRecord>,
}

impl Certificate {
    /// Create a newly issued, active certificate.
    pub fn issue(facts: IssuanceFacts, metadata: Metadata) -> Self {
        Self {
            id: facts.id,
            recipient_name: facts.recipient_name,
            course_name: facts.course_name,
            issue_date: facts.issue_date,
            issued_at: facts.issued_at,
            status: CertificateStatus::Active,
            metadata,
            transitions: Vec::new(),
        }
    }

    pub fn id(&self) -> &CertificateId {
        &self.id
    }

    pub fn recipient_name(&self) -> &RecipientName {
        &self.recipient_name
    }

    pub fn course_name(&self) -> &CourseName {
        &self.course_name
    }

    pub fn issue_date(&self) -> NaiveDate {
        self.issue_date
    }

    pub fn issued_at(&self) -> Timestamp {
        self.issued_at
    }

    pub fn status(&self) -> CertificateStatus {
        self.status
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Ordered log of all status transitions.
    pub fn transitions(&self) -> &[StatusTransitionRecord] {
        &self.transitions
    }

    pub fn is_active(&self) -> bool {
        self.status == CertificateStatus::Active
    }

    /// The transition that revoked this certificate, if any.
    pub fn revocation(&self) -> Option<&StatusTransitionRecord> {
        self.transitions
            .iter()
            .find(|t| t.to_state == CertificateStatus::Revoked)
    }

    /// Revoke the certificate (ACTIVE → REVOKED). Idempotent.
    pub fn revoke(&mut self, evidence: RevocationEvidence) -> RevocationOutcome {
        if self.status.is_terminal() {
            return RevocationOutcome::AlreadyRevoked;
        }
        self.transitions.push(StatusTransitionRecord {
            from_state: self.status,
            to_state: CertificateStatus::Revoked,
            timestamp: Timestamp::now(),
            reason: evidence.reason,
            actor: evidence.actor,
        });
        self.status = CertificateStatus::Revoked;
        RevocationOutcome::Revoked
    }

    /// Check that replaying the transition log from `Active` ends in the
    /// recorded status. Records loaded from disk must pass this.
    pub fn check_history(&self) -> Result<(), String> {
        let mut state = CertificateStatus::Active;
        for (index, t) in self.transitions.iter().enumerate() {
            if t.from_state != state || state.is_terminal() || t.to_state == t.from_state {
                return Err(format!(
                    "transition {index} ({} -> {}) does not follow {state}",
                    t.from_state, t.to_state
                ));
            }
            state = t.to_state;
        }
        if state != self.status {
            return Err(format!(
                "status is {} but the transition log ends in {state}",
                self.status
            ));
        }
        Ok(())
    }

    /// Apply a metadata edit. Status and issuance facts are untouched.
    pub fn update_metadata(&mut self, update: &MetadataUpdate) -> Result<(), ValidationError> {
        self.metadata = self.metadata.apply(update)?;
        Ok(())
    }
}

// ─── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use certreg_core::CERTIFICATE_ID_ENTROPY_BYTES;
    use serde_json::json;

    fn evidence(reason: &str) -> RevocationEvidence {
        RevocationEvidence {
            reason: reason.to_string(),
            actor: Some("admin".to_string()),
        }
    }

    fn make_certificate() -> Certificate {
        Certificate::issue(
            IssuanceFacts {
                id: CertificateId::from_entropy([3; CERTIFICATE_ID_ENTROPY_BYTES]),
                recipient_name: RecipientName::new("Alice").unwrap(),
                course_name: CourseName::new("Intro to ML").unwrap(),
                issue_date: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
                issued_at: Timestamp::parse("2024-01-10T09:30:00Z").unwrap(),
            },
            Metadata::new(),
        )
    }

    #[test]
    fn test_new_certificate_is_active() {
        let cert = make_certificate();
        assert_eq!(cert.status(), CertificateStatus::Active);
        assert!(cert.is_active());
        assert!(cert.transitions().is_empty());
        assert!(cert.revocation().is_none());
    }

    #[test]
    fn test_revoke_active() {
        let mut cert = make_certificate();
        assert_eq!(cert.revoke(evidence("fraud")), RevocationOutcome::Revoked);
        assert_eq!(cert.status(), CertificateStatus::Revoked);
        assert_eq!(cert.transitions().len(), 1);
        let record = cert.revocation().unwrap();
        assert_eq!(record.from_state, CertificateStatus::Active);
        assert_eq!(record.reason, "fraud");
        assert_eq!(record.actor.as_deref(), Some("admin"));
    }

    #[test]
    fn test_revoke_twice_is_noop() {
        let mut cert = make_certificate();
        cert.revoke(evidence("first"));
        let snapshot = cert.clone();
        assert_eq!(
            cert.revoke(evidence("second")),
            RevocationOutcome::AlreadyRevoked
        );
        assert_eq!(cert, snapshot);
    }

    #[test]
    fn test_metadata_update_keeps_status_and_facts() {
        let mut cert = make_certificate();
        cert.revoke(evidence("withdrawn"));
        let before = cert.clone();

        let patch = BTreeMap::from([("grade".to_string(), json!("A"))]);
        cert.update_metadata(&MetadataUpdate::Merge(patch)).unwrap();

        assert_eq!(cert.metadata().get("grade"), Some(&json!("A")));
        assert_eq!(cert.status(), before.status());
        assert_eq!(cert.id(), before.id());
        assert_eq!(cert.recipient_name(), before.recipient_name());
        assert_eq!(cert.course_name(), before.course_name());
        assert_eq!(cert.issue_date(), before.issue_date());
        assert_eq!(cert.issued_at(), before.issued_at());
        assert_eq!(cert.transitions(), before.transitions());
    }

    #[test]
    fn test_invalid_metadata_update_leaves_record_unchanged() {
        let mut cert = make_certificate();
        let before = cert.clone();
        let patch = BTreeMap::from([(String::new(), json!(1))]);
        assert!(cert.update_metadata(&MetadataUpdate::Merge(patch)).is_err());
        assert_eq!(cert, before);
    }

    #[test]
    fn test_status_parse_and_display() {
        assert_eq!("ACTIVE".parse::<CertificateStatus>(), Ok(CertificateStatus::Active));
        assert_eq!(" revoked ".parse::<CertificateStatus>(), Ok(CertificateStatus::Revoked));
        assert!("expired".parse::<CertificateStatus>().is_err());
        assert_eq!(CertificateStatus::Revoked.to_string(), "revoked");
    }

    #[test]
    fn test_serde_round_trip_preserves_log() {
        let mut cert = make_certificate();
        cert.revoke(evidence("deleted"));
        let json = serde_json::to_value(&cert).unwrap();
        assert_eq!(json["status"], "revoked");
        assert_eq!(json["issue_date"], "2024-01-10");
        assert_eq!(json["issued_at"], "2024-01-10T09:30:00Z");
        let back: Certificate = serde_json::from_value(json).unwrap();
        assert_eq!(back, cert);
    }

    #[test]
    fn test_history_must_explain_status() {
        let mut cert = make_certificate();
        assert!(cert.check_history().is_ok());
        cert.revoke(evidence("plagiarism"));
        assert!(cert.check_history().is_ok());

        let mut json = serde_json::to_value(&cert).unwrap();
        json["transitions"] = serde_json::json!([]);
        let bare: Certificate = serde_json::from_value(json.clone()).unwrap();
        assert!(bare.check_history().is_err());

        json["status"] = serde_json::json!("active");
        json["transitions"] = serde_json::to_value(cert.transitions()).unwrap();
        let stale: Certificate = serde_json::from_value(json).unwrap();
        assert!(stale.check_history().is_err());
    }
}
