//! # Administrative Reporting API
//!
//! Registry-wide statistics for administrators.

use std::collections::BTreeMap;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use utoipa::ToSchema;

use certreg_registry::RegistryStats;

use crate::auth::{require_role, CallerIdentity, Role};
use crate::error::AppError;
use crate::state::AppState;

/// Registry statistics.
#[derive(Debug, Serialize, ToSchema)]
pub struct StatisticsResponse {
    pub total: usize,
    pub active: usize,
    pub revoked: usize,
    /// Certificate count per course name.
    pub by_course: BTreeMap<String, usize>,
}

impl From<RegistryStats> for StatisticsResponse {
    fn from(stats: RegistryStats) -> Self {
        Self {
            total: stats.total,
            active: stats.active,
            revoked: stats.revoked,
            by_course: stats.by_course,
        }
    }
}

/// Build the admin router.
pub fn router() -> Router<AppState> {
    Router::new().route("/v1/admin/statistics", get(statistics))
}

/// GET /v1/admin/statistics: Certificate counts by status and course.
#[utoipa::path(
    get,
    path = "/v1/admin/statistics",
    responses(
        (status = 200, description = "Registry statistics", body = StatisticsResponse),
        (status = 403, description = "Admin role required", body = crate::error::ErrorBody),
    ),
    tag = "admin"
)]
pub(crate) async fn statistics(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> Result<Json<StatisticsResponse>, AppError> {
    require_role(&caller, Role::Admin)?;
    let stats = state.run(|registry| registry.statistics()).await?;
    Ok(Json(stats.into()))
}
