//! # Certificate Management API
//!
//! Issuance, lookup, revocation, deletion, metadata edits and listing.
//! Everything here requires a bearer token; issuance is open to students
//! when self-service issuance is enabled, the rest is admin-only.

use std::collections::BTreeMap;

use axum::body::Bytes;
use axum::extract::rejection::{BytesRejection, JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use certreg_core::{same_name, CertificateId, Metadata, MetadataUpdate};
use certreg_registry::{IssueRequest, ListFilter, DELETION_REASON};
use certreg_state::{
    Certificate, CertificateStatus, RevocationEvidence, RevocationOutcome, StatusTransitionRecord,
};

use super::parse_certificate_id;
use crate::auth::{require_role, CallerIdentity, Role};
use crate::error::AppError;
use crate::extractors::{extract_json, extract_optional_json, extract_query, Validate};
use crate::middleware::metrics;
use crate::state::AppState;

/// Longest accepted revocation reason, in characters.
const MAX_REASON_CHARS: usize = 500;

/// Reason recorded when a revoke request does not give one.
const DEFAULT_REVOCATION_REASON: &str = "revoked by administrator";

// -- DTOs ---------------------------------------------------------------------

/// Issue certificate request.
#[derive(Debug, Deserialize, ToSchema)]
pub struct IssueCertificateRequest {
    pub recipient_name: String,
    pub course_name: String,
    /// Defaults to today (UTC).
    #[serde(default)]
    pub issue_date: Option<NaiveDate>,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub metadata: Metadata,
}

/// Revoke certificate request.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct RevokeCertificateRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

impl Validate for RevokeCertificateRequest {
    fn validate(&self) -> Result<(), String> {
        if let Some(reason) = &self.reason {
            if reason.trim().is_empty() {
                return Err("reason must not be empty".into());
            }
            if reason.chars().count() > MAX_REASON_CHARS {
                return Err(format!("reason must not exceed {MAX_REASON_CHARS} characters"));
            }
        }
        Ok(())
    }
}

/// How metadata entries combine with the existing map.
#[derive(Debug, Clone, Copy, Default, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MetadataMode {
    /// Overwrite listed keys; `null` removes a key.
    #[default]
    Merge,
    /// Replace the whole map.
    Replace,
}

/// Update metadata request.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateMetadataRequest {
    #[serde(default)]
    pub mode: MetadataMode,
    #[schema(value_type = Object)]
    pub entries: BTreeMap<String, serde_json::Value>,
}

impl From<UpdateMetadataRequest> for MetadataUpdate {
    fn from(req: UpdateMetadataRequest) -> Self {
        match req.mode {
            MetadataMode::Merge => Self::Merge(req.entries),
            MetadataMode::Replace => Self::Replace(req.entries),
        }
    }
}

/// List query parameters.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListCertificatesQuery {
    /// `active` or `revoked`.
    pub status: Option<String>,
    /// Exact course name, case-insensitive.
    pub course: Option<String>,
    /// Substring of the recipient name, case-insensitive.
    pub recipient: Option<String>,
    pub limit: Option<usize>,
}

impl ListCertificatesQuery {
    fn into_filter(self) -> Result<ListFilter, AppError> {
        let status = self
            .status
            .as_deref()
            .map(str::parse::<CertificateStatus>)
            .transpose()
            .map_err(AppError::Validation)?;
        Ok(ListFilter {
            status,
            course: self.course.filter(|c| !c.trim().is_empty()),
            recipient: self.recipient.filter(|r| !r.trim().is_empty()),
            limit: self.limit,
        })
    }
}

/// One status transition.
#[derive(Debug, Serialize, ToSchema)]
pub struct TransitionResponse {
    pub from_state: String,
    pub to_state: String,
    pub timestamp: String,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
}

impl From<&StatusTransitionRecord> for TransitionResponse {
    fn from(t: &StatusTransitionRecord) -> Self {
        Self {
            from_state: t.from_state.to_string(),
            to_state: t.to_state.to_string(),
            timestamp: t.timestamp.to_iso8601(),
            reason: t.reason.clone(),
            actor: t.actor.clone(),
        }
    }
}

/// Full certificate record.
#[derive(Debug, Serialize, ToSchema)]
pub struct CertificateResponse {
    pub id: String,
    pub recipient_name: String,
    pub course_name: String,
    pub issue_date: NaiveDate,
    pub issued_at: String,
    pub status: String,
    #[schema(value_type = Object)]
    pub metadata: serde_json::Value,
    pub transitions: Vec<TransitionResponse>,
}

impl From<&Certificate> for CertificateResponse {
    fn from(cert: &Certificate) -> Self {
        Self {
            id: cert.id().to_string(),
            recipient_name: cert.recipient_name().to_string(),
            course_name: cert.course_name().to_string(),
            issue_date: cert.issue_date(),
            issued_at: cert.issued_at().to_iso8601(),
            status: cert.status().to_string(),
            metadata: serde_json::Value::Object(
                cert.metadata()
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect(),
            ),
            transitions: cert.transitions().iter().map(Into::into).collect(),
        }
    }
}

/// List response.
#[derive(Debug, Serialize, ToSchema)]
pub struct CertificateListResponse {
    pub count: usize,
    pub certificates: Vec<CertificateResponse>,
}

// -- Router -------------------------------------------------------------------

/// Build the certificates router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/v1/certificates",
            post(issue_certificate).get(list_certificates),
        )
        .route(
            "/v1/certificates/{id}",
            get(get_certificate).delete(delete_certificate),
        )
        .route("/v1/certificates/{id}/revoke", post(revoke_certificate))
        .route("/v1/certificates/{id}/metadata", patch(update_metadata))
}

// -- Handlers -----------------------------------------------------------------

/// POST /v1/certificates: Issue a certificate.
#[utoipa::path(
    post,
    path = "/v1/certificates",
    request_body = IssueCertificateRequest,
    responses(
        (status = 201, description = "Certificate issued", body = CertificateResponse),
        (status = 400, description = "Malformed body", body = crate::error::ErrorBody),
        (status = 403, description = "Caller may not issue this certificate", body = crate::error::ErrorBody),
        (status = 422, description = "Validation error", body = crate::error::ErrorBody),
    ),
    tag = "certificates"
)]
pub(crate) async fn issue_certificate(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<IssueCertificateRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CertificateResponse>), AppError> {
    require_role(&caller, state.config.issuer_role())?;
    let req = extract_json(body)?;

    if !may_issue_for(&caller, &req.recipient_name) {
        return Err(AppError::Forbidden(
            "students may only issue certificates in their own name".into(),
        ));
    }

    let request = IssueRequest {
        recipient_name: req.recipient_name,
        course_name: req.course_name,
        issue_date: req.issue_date,
        metadata: req.metadata,
    };
    let cert = state.run(move |registry| registry.issue(request)).await?;
    metrics::record_issued();

    Ok((StatusCode::CREATED, Json(CertificateResponse::from(&cert))))
}

/// GET /v1/certificates/{id}: Full certificate record.
#[utoipa::path(
    get,
    path = "/v1/certificates/{id}",
    params(("id" = String, Path, description = "Certificate id")),
    responses(
        (status = 200, description = "Certificate found", body = CertificateResponse),
        (status = 404, description = "Certificate not found", body = crate::error::ErrorBody),
    ),
    tag = "certificates"
)]
pub(crate) async fn get_certificate(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<String>,
) -> Result<Json<CertificateResponse>, AppError> {
    require_role(&caller, Role::Admin)?;
    let id = parse_certificate_id(&id)?;
    let cert = state.run(move |registry| registry.lookup(&id)).await?;
    Ok(Json(CertificateResponse::from(&cert)))
}

/// Students may only issue in their own name, compared the way
/// verify-by-name compares recipients.
fn may_issue_for(caller: &CallerIdentity, recipient_name: &str) -> bool {
    match caller.role {
        Role::Student => caller
            .subject
            .as_deref()
            .is_some_and(|subject| same_name(subject, recipient_name)),
        Role::Admin => true,
    }
}

/// POST /v1/certificates/{id}/revoke: Revoke a certificate. Idempotent.
#[utoipa::path(
    post,
    path = "/v1/certificates/{id}/revoke",
    params(("id" = String, Path, description = "Certificate id")),
    request_body = RevokeCertificateRequest,
    responses(
        (status = 200, description = "Certificate revoked", body = CertificateResponse),
        (status = 404, description = "Certificate not found", body = crate::error::ErrorBody),
        (status = 422, description = "Validation error", body = crate::error::ErrorBody),
    ),
    tag = "certificates"
)]
pub(crate) async fn revoke_certificate(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<String>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<CertificateResponse>, AppError> {
    require_role(&caller, Role::Admin)?;
    let id = parse_certificate_id(&id)?;
    let req: RevokeCertificateRequest = extract_optional_json(body)?;

    let reason = req
        .reason
        .map(|r| r.trim().to_string())
        .unwrap_or_else(|| DEFAULT_REVOCATION_REASON.to_string());
    let evidence = RevocationEvidence {
        reason,
        actor: Some(caller.actor()),
    };
    let cert = revoke(&state, id, evidence).await?;
    Ok(Json(CertificateResponse::from(&cert)))
}

/// DELETE /v1/certificates/{id}: Delete a certificate.
///
/// The record is kept and verifies as revoked with reason `deleted`.
#[utoipa::path(
    delete,
    path = "/v1/certificates/{id}",
    params(("id" = String, Path, description = "Certificate id")),
    responses(
        (status = 200, description = "Certificate deleted", body = CertificateResponse),
        (status = 404, description = "Certificate not found", body = crate::error::ErrorBody),
    ),
    tag = "certificates"
)]
pub(crate) async fn delete_certificate(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<String>,
) -> Result<Json<CertificateResponse>, AppError> {
    require_role(&caller, Role::Admin)?;
    let id = parse_certificate_id(&id)?;
    let evidence = RevocationEvidence {
        reason: DELETION_REASON.to_string(),
        actor: Some(caller.actor()),
    };
    let cert = revoke(&state, id, evidence).await?;
    Ok(Json(CertificateResponse::from(&cert)))
}

/// Revoke, counting the transition only if this call made it.
async fn revoke(
    state: &AppState,
    id: CertificateId,
    evidence: RevocationEvidence,
) -> Result<Certificate, AppError> {
    let reason = evidence.reason.clone();
    let (cert, outcome) = state
        .run(move |registry| registry.revoke_with_outcome(&id, evidence))
        .await?;
    if outcome == RevocationOutcome::Revoked {
        metrics::record_revoked(&reason);
    }
    Ok(cert)
}

/// PATCH /v1/certificates/{id}/metadata: Edit metadata.
#[utoipa::path(
    patch,
    path = "/v1/certificates/{id}/metadata",
    params(("id" = String, Path, description = "Certificate id")),
    request_body = UpdateMetadataRequest,
    responses(
        (status = 200, description = "Metadata updated", body = CertificateResponse),
        (status = 404, description = "Certificate not found", body = crate::error::ErrorBody),
        (status = 422, description = "Validation error", body = crate::error::ErrorBody),
    ),
    tag = "certificates"
)]
pub(crate) async fn update_metadata(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<String>,
    body: Result<Json<UpdateMetadataRequest>, JsonRejection>,
) -> Result<Json<CertificateResponse>, AppError> {
    require_role(&caller, Role::Admin)?;
    let id = parse_certificate_id(&id)?;
    let update = MetadataUpdate::from(extract_json(body)?);
    let cert = state
        .run(move |registry| registry.update_metadata(&id, &update))
        .await?;
    Ok(Json(CertificateResponse::from(&cert)))
}

/// GET /v1/certificates: List certificates, newest first.
#[utoipa::path(
    get,
    path = "/v1/certificates",
    params(ListCertificatesQuery),
    responses(
        (status = 200, description = "Matching certificates", body = CertificateListResponse),
        (status = 422, description = "Unknown status filter", body = crate::error::ErrorBody),
    ),
    tag = "certificates"
)]
pub(crate) async fn list_certificates(
    State(state): State<AppState>,
    caller: CallerIdentity,
    query: Result<Query<ListCertificatesQuery>, QueryRejection>,
) -> Result<Json<CertificateListResponse>, AppError> {
    require_role(&caller, Role::Admin)?;
    let filter = extract_query(query)?.into_filter()?;
    let certs = state.run(move |registry| registry.list(&filter)).await?;

    Ok(Json(CertificateListResponse {
        count: certs.len(),
        certificates: certs.iter().map(CertificateResponse::from).collect(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn revoke_request_validation() {
        assert!(RevokeCertificateRequest::default().validate().is_ok());
        assert!(RevokeCertificateRequest {
            reason: Some("  ".into())
        }
        .validate()
        .is_err());
        assert!(RevokeCertificateRequest {
            reason: Some("x".repeat(MAX_REASON_CHARS + 1))
        }
        .validate()
        .is_err());
    }

    #[test]
    fn students_issue_only_in_their_own_name() {
        let student = |subject: Option<&str>| CallerIdentity {
            role: Role::Student,
            subject: subject.map(str::to_string),
        };
        assert!(may_issue_for(&student(Some("émile")), "Émile"));
        assert!(may_issue_for(&student(Some("Quinn")), "  QUINN "));
        assert!(!may_issue_for(&student(Some("Quinn")), "Somebody Else"));
        assert!(!may_issue_for(&student(None), "Quinn"));

        let admin = CallerIdentity {
            role: Role::Admin,
            subject: None,
        };
        assert!(may_issue_for(&admin, "anyone"));
    }

    #[test]
    fn list_query_rejects_unknown_status() {
        let query = ListCertificatesQuery {
            status: Some("expired".into()),
            ..Default::default()
        };
        assert!(matches!(query.into_filter(), Err(AppError::Validation(_))));
    }

    #[test]
    fn list_query_drops_blank_filters() {
        let filter = ListCertificatesQuery {
            status: Some("revoked".into()),
            course: Some(" ".into()),
            ..Default::default()
        }
        .into_filter()
        .unwrap();
        assert_eq!(filter.status, Some(CertificateStatus::Revoked));
        assert!(filter.course.is_none());
    }
}
