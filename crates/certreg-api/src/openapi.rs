//! # OpenAPI Specification Assembly
//!
//! Assembles all utoipa-documented routes into a single OpenAPI 3.1 document
//! served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

/// Assembled OpenAPI document for the whole API surface.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Certificate Registry API",
        version = "0.1.0",
        description = "Issue, verify, revoke and manage course completion certificates.",
        license(name = "AGPL-3.0-or-later")
    ),
    paths(
        // Certificates
        crate::routes::certificates::issue_certificate,
        crate::routes::certificates::list_certificates,
        crate::routes::certificates::get_certificate,
        crate::routes::certificates::revoke_certificate,
        crate::routes::certificates::delete_certificate,
        crate::routes::certificates::update_metadata,
        // Verification
        crate::routes::verify::verify_certificate,
        crate::routes::verify::verify_by_name,
        // Courses
        crate::routes::courses::list_courses,
        // Admin
        crate::routes::admin::statistics,
    ),
    components(schemas(
        // Error types
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
        // Certificate DTOs
        crate::routes::certificates::IssueCertificateRequest,
        crate::routes::certificates::RevokeCertificateRequest,
        crate::routes::certificates::UpdateMetadataRequest,
        crate::routes::certificates::MetadataMode,
        crate::routes::certificates::CertificateResponse,
        crate::routes::certificates::CertificateListResponse,
        crate::routes::certificates::TransitionResponse,
        // Verification DTOs
        crate::routes::verify::VerificationResponse,
        crate::routes::verify::VerificationDetails,
        // Course DTOs
        crate::routes::courses::CourseCatalogResponse,
        crate::routes::courses::CourseResponse,
        // Admin DTOs
        crate::routes::admin::StatisticsResponse,
        crate::auth::Role,
    )),
    tags(
        (name = "certificates", description = "Issuance and administration"),
        (name = "verification", description = "Public certificate verification"),
        (name = "courses", description = "Course catalog"),
        (name = "admin", description = "Registry statistics"),
    )
)]
pub struct ApiDoc;

/// Build the OpenAPI router.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

/// GET /openapi.json: Return the generated OpenAPI document.
async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
