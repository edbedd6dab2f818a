//! # Application State
//!
//! Shared state for the Axum application, passed to all route handlers via
//! the `State` extractor: the registry, the resolved configuration and the
//! Prometheus handle when a recorder is installed.
//!
//! Registry calls block on store I/O, so handlers go through
//! [`AppState::run`], which moves the call onto Tokio's blocking pool.

use std::path::PathBuf;
use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;
use thiserror::Error;

use certreg_registry::{MemoryStore, Registry, RegistryError};

use crate::auth::Role;
use crate::error::AppError;
use crate::middleware::rate_limit::RateLimitConfig;

// -- Configuration ------------------------------------------------------------

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Invalid environment configuration.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var}={value:?} is invalid: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Application configuration.
#[derive(Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Static bearer secret. If `None`, authentication is disabled.
    pub auth_token: Option<String>,
    /// JSON data file. If `None`, certificates live in memory only.
    pub data_file: Option<PathBuf>,
    /// YAML course catalog. If `None`, any course name is accepted.
    pub course_catalog: Option<PathBuf>,
    /// Let students issue certificates for themselves.
    pub self_service_issuance: bool,
    pub rate_limit: RateLimitConfig,
    pub log_format: LogFormat,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field(
                "auth_token",
                &self.auth_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("data_file", &self.data_file)
            .field("course_catalog", &self.course_catalog)
            .field("self_service_issuance", &self.self_service_issuance)
            .field("rate_limit", &self.rate_limit)
            .field("log_format", &self.log_format)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            auth_token: None,
            data_file: None,
            course_catalog: None,
            self_service_issuance: false,
            rate_limit: RateLimitConfig::default(),
            log_format: LogFormat::Text,
        }
    }
}

impl AppConfig {
    /// Read configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Read configuration through an arbitrary variable lookup.
    ///
    /// Unset and empty variables fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let port = match get("PORT") {
            Some(raw) => parse_number("PORT", &raw)?,
            None => defaults.port,
        };
        let self_service_issuance = match get("CERTREG_SELF_SERVICE") {
            Some(raw) => parse_bool("CERTREG_SELF_SERVICE", &raw)?,
            None => defaults.self_service_issuance,
        };
        let max_requests = match get("RATE_LIMIT_MAX_REQUESTS") {
            Some(raw) => parse_number("RATE_LIMIT_MAX_REQUESTS", &raw)?,
            None => defaults.rate_limit.max_requests,
        };
        let window_secs = match get("RATE_LIMIT_WINDOW_SECS") {
            Some(raw) => parse_number("RATE_LIMIT_WINDOW_SECS", &raw)?,
            None => defaults.rate_limit.window_secs,
        };
        let log_format = match get("LOG_FORMAT").map(|v| v.trim().to_ascii_lowercase()) {
            None => LogFormat::Text,
            Some(v) if v == "text" => LogFormat::Text,
            Some(v) if v == "json" => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    var: "LOG_FORMAT",
                    value: other,
                    reason: "expected \"text\" or \"json\"".into(),
                })
            }
        };

        Ok(Self {
            port,
            auth_token: get("AUTH_TOKEN"),
            data_file: get("CERTREG_DATA_FILE").map(PathBuf::from),
            course_catalog: get("CERTREG_COURSE_CATALOG").map(PathBuf::from),
            self_service_issuance,
            rate_limit: RateLimitConfig {
                max_requests,
                window_secs,
            },
            log_format,
        })
    }

    /// Lowest role allowed to issue certificates.
    pub fn issuer_role(&self) -> Role {
        if self.self_service_issuance {
            Role::Student
        } else {
            Role::Admin
        }
    }
}

fn parse_number<T>(var: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        var,
        value: raw.to_string(),
        reason: e.to_string(),
    })
}

fn parse_bool(var: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            var,
            value: raw.to_string(),
            reason: "expected a boolean".into(),
        }),
    }
}

// -- Application State --------------------------------------------------------

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<Registry>,
    pub config: AppConfig,
    pub metrics_handle: Option<PrometheusHandle>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("metrics", &self.metrics_handle.is_some())
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// In-memory registry with default configuration.
    pub fn new() -> Self {
        Self::with_config(
            AppConfig::default(),
            Registry::new(Arc::new(MemoryStore::new())),
        )
    }

    pub fn with_config(config: AppConfig, registry: Registry) -> Self {
        Self {
            registry: Arc::new(registry),
            config,
            metrics_handle: None,
        }
    }

    /// Attach a Prometheus handle; enables the `/metrics` route.
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics_handle = Some(handle);
        self
    }

    /// Run a registry call on the blocking pool.
    pub async fn run<T, F>(&self, f: F) -> Result<T, AppError>
    where
        F: FnOnce(&Registry) -> Result<T, RegistryError> + Send + 'static,
        T: Send + 'static,
    {
        let registry = Arc::clone(&self.registry);
        tokio::task::spawn_blocking(move || f(&registry))
            .await
            .map_err(|e| AppError::Internal(format!("registry task failed: {e}")))?
            .map_err(AppError::from)
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|var| map.get(var).cloned())
    }

    #[test]
    fn empty_environment_yields_defaults() {
        assert_eq!(config_from(&[]).unwrap(), AppConfig::default());
    }

    #[test]
    fn reads_every_variable() {
        let config = config_from(&[
            ("PORT", "9090"),
            ("AUTH_TOKEN", "s3cret"),
            ("CERTREG_DATA_FILE", "/var/lib/certreg/certificates.json"),
            ("CERTREG_COURSE_CATALOG", "/etc/certreg/courses.yaml"),
            ("CERTREG_SELF_SERVICE", "yes"),
            ("RATE_LIMIT_MAX_REQUESTS", "5"),
            ("RATE_LIMIT_WINDOW_SECS", "10"),
            ("LOG_FORMAT", "JSON"),
        ])
        .unwrap();

        assert_eq!(config.port, 9090);
        assert_eq!(config.auth_token.as_deref(), Some("s3cret"));
        assert_eq!(
            config.data_file,
            Some(PathBuf::from("/var/lib/certreg/certificates.json"))
        );
        assert!(config.self_service_issuance);
        assert_eq!(config.issuer_role(), Role::Student);
        assert_eq!(config.rate_limit.max_requests, 5);
        assert_eq!(config.rate_limit.window_secs, 10);
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn rejects_malformed_values() {
        assert!(matches!(
            config_from(&[("PORT", "eighty")]),
            Err(ConfigError::Invalid { var: "PORT", .. })
        ));
        assert!(config_from(&[("CERTREG_SELF_SERVICE", "maybe")]).is_err());
        assert!(config_from(&[("LOG_FORMAT", "xml")]).is_err());
    }

    #[test]
    fn debug_redacts_token() {
        let config = AppConfig {
            auth_token: Some("super-secret".into()),
            ..AppConfig::default()
        };
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("[REDACTED]"));
    }

    #[tokio::test]
    async fn run_maps_registry_errors() {
        let state = AppState::new();
        let err = state
            .run(|registry| registry.lookup(&certreg_core::CertificateId::from_entropy([1; 10])))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
