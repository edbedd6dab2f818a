//! # Public Verification API
//!
//! Third parties check a certificate either by id or by recipient name and
//! course. No credentials are required. Every query answers 200 with one of
//! three verdicts; a verdict of `not_found` is not an HTTP error.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use certreg_registry::{Verification, VerificationStatus};

use crate::error::AppError;
use crate::extractors::extract_query;
use crate::middleware::metrics;
use crate::state::AppState;

/// Verification verdict.
#[derive(Debug, Serialize, ToSchema)]
pub struct VerificationResponse {
    /// `valid`, `revoked` or `not_found`.
    #[schema(value_type = String, example = "valid")]
    pub status: VerificationStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<VerificationDetails>,
}

/// Publicly visible facts of a matched certificate.
#[derive(Debug, Serialize, ToSchema)]
pub struct VerificationDetails {
    pub certificate_id: String,
    pub recipient_name: String,
    pub course_name: String,
    pub issue_date: NaiveDate,
    pub issued_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revoked_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revocation_reason: Option<String>,
}

impl From<Verification> for VerificationResponse {
    fn from(verification: Verification) -> Self {
        let status = verification.status();
        let message = match status {
            VerificationStatus::Valid => "Certificate verified successfully.",
            VerificationStatus::Revoked => "Certificate has been revoked.",
            VerificationStatus::NotFound => "Certificate not found. Please check your details.",
        };
        let details = verification.certificate().map(|cert| {
            let revocation = cert.revocation();
            VerificationDetails {
                certificate_id: cert.id().to_string(),
                recipient_name: cert.recipient_name().to_string(),
                course_name: cert.course_name().to_string(),
                issue_date: cert.issue_date(),
                issued_at: cert.issued_at().to_iso8601(),
                revoked_at: revocation.map(|r| r.timestamp.to_iso8601()),
                revocation_reason: revocation.map(|r| r.reason.clone()),
            }
        });
        Self {
            status,
            message: message.to_string(),
            details,
        }
    }
}

/// Verify-by-name query parameters.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct VerifyByNameQuery {
    pub recipient_name: Option<String>,
    pub course_name: Option<String>,
}

/// Build the verification router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/verify", get(verify_by_name))
        .route("/v1/verify/{id}", get(verify_certificate))
}

fn respond(verification: Verification) -> Json<VerificationResponse> {
    metrics::record_verification(verification.status());
    Json(verification.into())
}

/// GET /v1/verify/{id}: Verify a certificate by id.
#[utoipa::path(
    get,
    path = "/v1/verify/{id}",
    params(("id" = String, Path, description = "Certificate id, case-insensitive")),
    responses(
        (status = 200, description = "Verification verdict", body = VerificationResponse),
    ),
    tag = "verification"
)]
pub(crate) async fn verify_certificate(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<VerificationResponse>, AppError> {
    let verification = state.run(move |registry| registry.verify(&id)).await?;
    Ok(respond(verification))
}

/// GET /v1/verify: Verify by recipient name and course.
#[utoipa::path(
    get,
    path = "/v1/verify",
    params(VerifyByNameQuery),
    responses(
        (status = 200, description = "Verification verdict", body = VerificationResponse),
        (status = 422, description = "Name or course missing", body = crate::error::ErrorBody),
    ),
    tag = "verification"
)]
pub(crate) async fn verify_by_name(
    State(state): State<AppState>,
    query: Result<Query<VerifyByNameQuery>, QueryRejection>,
) -> Result<Json<VerificationResponse>, AppError> {
    let query = extract_query(query)?;
    let (Some(recipient), Some(course)) = (
        query.recipient_name.filter(|v| !v.trim().is_empty()),
        query.course_name.filter(|v| !v.trim().is_empty()),
    ) else {
        return Err(AppError::Validation(
            "both recipient_name and course_name are required".into(),
        ));
    };

    let verification = state
        .run(move |registry| registry.find_by_recipient(&recipient, &course))
        .await?;
    Ok(respond(verification))
}
