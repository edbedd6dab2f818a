//! # certreg-api: Axum API Service
//!
//! HTTP surface of the certificate registry, built on Axum/Tower/Tokio.
//!
//! ## Routes
//!
//! - `/v1/certificates/*`: issuance, lookup, revocation, deletion,
//!   metadata edits and listing (bearer auth)
//! - `/v1/admin/statistics`: registry statistics (bearer auth)
//! - `/v1/verify/*`: public verification by id or by recipient and course
//! - `/v1/courses`: public course catalog
//! - `/openapi.json`: generated OpenAPI document
//! - `/health/*`: liveness and readiness probes
//! - `/metrics`: Prometheus exposition, when a recorder is installed
//!
//! ## Middleware Stack (Tower)
//!
//! TraceLayer → MetricsLayer → RateLimitLayer → AuthLayer
//!
//! Auth wraps only the protected routers. Request bodies are capped at
//! [`MAX_BODY_BYTES`].
//!
//! ## Crate Policy
//!
//! - No business logic in route handlers; they delegate to `certreg-registry`.
//! - All errors map to structured HTTP responses via `AppError`.

pub mod auth;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::middleware::from_fn;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Extension, Router};

use crate::auth::AuthConfig;
use crate::middleware::rate_limit::RateLimiter;

pub use error::AppError;
pub use state::{AppConfig, AppState};

/// Largest accepted request body.
pub const MAX_BODY_BYTES: usize = 16 * 1024;

/// Assemble the full application router with all routes and middleware.
///
/// Health probes and `/metrics` are mounted outside the middleware stack so
/// scrapers and orchestrators are never rate limited.
pub fn app(state: AppState) -> Router {
    let auth_config = AuthConfig {
        token: state.config.auth_token.clone(),
    };
    let limiter = RateLimiter::new(state.config.rate_limit.clone());

    let protected = Router::new()
        .merge(routes::certificates::router())
        .merge(routes::admin::router())
        .layer(from_fn(auth::auth_middleware));

    let public = Router::new()
        .merge(routes::verify::router())
        .merge(routes::courses::router())
        .merge(openapi::router());

    let api = Router::new()
        .merge(protected)
        .merge(public)
        .layer(from_fn(middleware::rate_limit::rate_limit_middleware))
        .layer(from_fn(middleware::metrics::metrics_middleware))
        .layer(middleware::tracing_layer::layer())
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(Extension(auth_config))
        .layer(Extension(limiter))
        .with_state(state.clone());

    let operational = Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness))
        .route("/metrics", get(render_metrics))
        .with_state(state);

    Router::new().merge(operational).merge(api)
}

/// Liveness probe: always returns 200 if the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe: returns 200 once the store answers.
async fn readiness(State(state): State<AppState>) -> Response {
    match state.run(|registry| registry.count()).await {
        Ok(_) => "ready".into_response(),
        Err(err) => {
            tracing::warn!(error = %err, "readiness check failed");
            (StatusCode::SERVICE_UNAVAILABLE, "not ready").into_response()
        }
    }
}

/// Prometheus text exposition. 404 when no recorder is installed.
async fn render_metrics(State(state): State<AppState>) -> Response {
    match &state.metrics_handle {
        Some(handle) => handle.render().into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
