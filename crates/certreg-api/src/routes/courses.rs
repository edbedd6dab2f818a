//! # Course Catalog API

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use utoipa::ToSchema;

use certreg_registry::{CourseEntry, CourseKind};

use crate::state::AppState;

/// One catalog entry.
#[derive(Debug, Serialize, ToSchema)]
pub struct CourseResponse {
    pub id: String,
    pub name: String,
    /// `course` or `internship`.
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl From<CourseEntry> for CourseResponse {
    fn from(entry: CourseEntry) -> Self {
        Self {
            id: entry.id,
            name: entry.name.to_string(),
            kind: match entry.kind {
                CourseKind::Course => "course",
                CourseKind::Internship => "internship",
            }
            .to_string(),
            category: entry.category,
        }
    }
}

/// Catalog listing.
#[derive(Debug, Serialize, ToSchema)]
pub struct CourseCatalogResponse {
    /// True when any course name is accepted at issuance.
    pub open: bool,
    pub courses: Vec<CourseResponse>,
}

/// Build the course catalog router.
pub fn router() -> Router<AppState> {
    Router::new().route("/v1/courses", get(list_courses))
}

/// GET /v1/courses: Courses and internships certificates can be issued for.
#[utoipa::path(
    get,
    path = "/v1/courses",
    responses(
        (status = 200, description = "Course catalog", body = CourseCatalogResponse),
    ),
    tag = "courses"
)]
pub(crate) async fn list_courses(State(state): State<AppState>) -> Json<CourseCatalogResponse> {
    let catalog = state.registry.catalog();
    Json(CourseCatalogResponse {
        open: catalog.is_open(),
        courses: catalog.courses().into_iter().map(Into::into).collect(),
    })
}
