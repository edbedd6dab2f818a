//! # Authentication & Authorization Middleware
//!
//! Bearer token middleware with role-based access control (RBAC).
//!
//! ## Token Format
//!
//! ```text
//! Bearer {role}:{subject}:{secret}   role plus a caller name recorded as actor
//! Bearer {role}:{secret}             role only
//! Bearer {secret}                    treated as Admin
//! ```
//!
//! ## CallerIdentity
//!
//! Every authenticated request gets a [`CallerIdentity`] injected into the
//! request extensions. Handlers extract it via the `FromRequestParts` impl
//! and pass it on to the registry as the acting identity.

use axum::extract::{FromRequestParts, Request};
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum_extra::headers::authorization::Bearer;
use axum_extra::headers::Authorization;
use axum_extra::typed_header::TypedHeaderRejection;
use axum_extra::TypedHeader;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use utoipa::ToSchema;

use crate::error::AppError;

// ── Role ────────────────────────────────────────────────────────────────────

/// Roles ordered by privilege level: `Student < Admin`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// May request their own certificate when self-service issuance is on.
    Student,
    /// Full access to issuance, revocation, listing and statistics.
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Admin => "admin",
        }
    }
}

// ── CallerIdentity ──────────────────────────────────────────────────────────

/// Identity of the authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    pub role: Role,
    /// Caller name carried in the token, if any.
    pub subject: Option<String>,
}

impl CallerIdentity {
    /// Identity used when authentication is disabled.
    pub fn unauthenticated_admin() -> Self {
        Self {
            role: Role::Admin,
            subject: None,
        }
    }

    /// Check if the caller has at least the given minimum role.
    pub fn has_role(&self, minimum: Role) -> bool {
        self.role >= minimum
    }

    /// Name recorded against registry mutations.
    pub fn actor(&self) -> String {
        self.subject
            .clone()
            .unwrap_or_else(|| self.role.as_str().to_string())
    }
}

/// Extracts the identity that the auth middleware injected into extensions.
/// Returns 401 if no identity is present.
impl<S: Send + Sync> FromRequestParts<S> for CallerIdentity {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CallerIdentity>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("no caller identity in request context".into()))
    }
}

/// Check that the caller has at least the required role.
/// Returns 403 Forbidden if the caller's role is insufficient.
pub fn require_role(caller: &CallerIdentity, minimum: Role) -> Result<(), AppError> {
    if caller.has_role(minimum) {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "role '{}' required, caller has '{}'",
            minimum.as_str(),
            caller.role.as_str()
        )))
    }
}

// ── Auth Configuration ──────────────────────────────────────────────────────

/// Auth configuration injected into request extensions.
///
/// Custom `Debug` redacts the token value.
#[derive(Clone, Default)]
pub struct AuthConfig {
    pub token: Option<String>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

// ── Token Validation ────────────────────────────────────────────────────────

/// Constant-time comparison of bearer secrets.
///
/// When lengths differ, performs a dummy comparison so the mismatch path
/// takes the same shape as the match path.
fn constant_time_token_eq(provided: &str, expected: &str) -> bool {
    let provided = provided.as_bytes();
    let expected = expected.as_bytes();
    if provided.len() != expected.len() {
        let _ = expected.ct_eq(expected);
        return false;
    }
    provided.ct_eq(expected).into()
}

fn parse_role(raw: &str) -> Result<Role, String> {
    match raw {
        "admin" => Ok(Role::Admin),
        "student" => Ok(Role::Student),
        other => Err(format!("unknown role: {other}")),
    }
}

/// Parse a bearer token in one of the formats listed in the module docs.
pub fn parse_bearer_token(provided: &str, expected_secret: &str) -> Result<CallerIdentity, String> {
    let parts: Vec<&str> = provided.splitn(3, ':').collect();

    let (role, subject, secret) = match parts.as_slice() {
        [secret] => (None, None, *secret),
        [role, secret] => (Some(*role), None, *secret),
        [role, subject, secret] => (Some(*role), Some(*subject), *secret),
        _ => return Err("invalid token format".into()),
    };

    if !constant_time_token_eq(secret, expected_secret) {
        return Err("invalid bearer token".into());
    }

    let role = match role {
        Some(raw) => parse_role(raw)?,
        None => Role::Admin,
    };
    let subject = subject
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    Ok(CallerIdentity { role, subject })
}

// ── Middleware ───────────────────────────────────────────────────────────────

/// Validate the `Authorization: Bearer` header and inject [`CallerIdentity`].
///
/// When `AuthConfig.token` is `None`, every request runs as admin
/// (authentication disabled).
pub async fn auth_middleware(
    bearer: Result<TypedHeader<Authorization<Bearer>>, TypedHeaderRejection>,
    mut request: Request,
    next: Next,
) -> Response {
    let expected = request
        .extensions()
        .get::<AuthConfig>()
        .and_then(|config| config.token.clone());

    let Some(expected) = expected else {
        request
            .extensions_mut()
            .insert(CallerIdentity::unauthenticated_admin());
        return next.run(request).await;
    };

    match bearer {
        Ok(TypedHeader(Authorization(bearer))) => match parse_bearer_token(bearer.token(), &expected) {
            Ok(identity) => {
                request.extensions_mut().insert(identity);
                next.run(request).await
            }
            Err(msg) => {
                tracing::warn!(reason = %msg, "rejected bearer token");
                unauthorized_response(&msg)
            }
        },
        Err(rejection) if rejection.is_missing() => {
            tracing::warn!("rejected request without authorization header");
            unauthorized_response("missing authorization header")
        }
        Err(_) => {
            tracing::warn!("rejected authorization header with non-bearer scheme");
            unauthorized_response("authorization header must use Bearer scheme")
        }
    }
}

fn unauthorized_response(message: &str) -> Response {
    AppError::Unauthorized(message.to_string()).into_response()
}
