//! # Prometheus Metrics
//!
//! Request metrics are emitted through the `metrics` facade; the binary
//! installs a `metrics-exporter-prometheus` recorder and serves the scrape
//! output at `/metrics`. Without a recorder every call here is a no-op.
//!
//! | Metric | Kind | Labels |
//! |---|---|---|
//! | `certreg_http_requests_total` | counter | method, path, status |
//! | `certreg_http_request_duration_seconds` | histogram | method, path |
//! | `certreg_certificates_issued_total` | counter | |
//! | `certreg_certificates_revoked_total` | counter | reason |
//! | `certreg_verifications_total` | counter | status |

use std::time::Instant;

use axum::extract::{MatchedPath, Request};
use axum::middleware::Next;
use axum::response::Response;

use certreg_registry::{VerificationStatus, DELETION_REASON};

/// Middleware that records request count and latency per route template.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let response = next.run(request).await;

    let status = response.status().as_u16().to_string();
    metrics::counter!(
        "certreg_http_requests_total",
        "method" => method.clone(),
        "path" => path.clone(),
        "status" => status
    )
    .increment(1);
    metrics::histogram!(
        "certreg_http_request_duration_seconds",
        "method" => method,
        "path" => path
    )
    .record(start.elapsed().as_secs_f64());

    response
}

pub fn record_issued() {
    metrics::counter!("certreg_certificates_issued_total").increment(1);
}

/// Deletions are counted separately from ordinary revocations.
pub fn record_revoked(reason: &str) {
    let reason = if reason == DELETION_REASON {
        "deleted"
    } else {
        "revoked"
    };
    metrics::counter!("certreg_certificates_revoked_total", "reason" => reason).increment(1);
}

pub fn record_verification(status: VerificationStatus) {
    metrics::counter!("certreg_verifications_total", "status" => status.as_str()).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics_exporter_prometheus::PrometheusBuilder;

    #[test]
    fn domain_counters_render() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            record_issued();
            record_revoked(DELETION_REASON);
            record_verification(VerificationStatus::Revoked);
            record_verification(VerificationStatus::Revoked);
        });

        let rendered = handle.render();
        assert!(rendered.contains("certreg_certificates_issued_total 1"));
        assert!(rendered.contains(r#"certreg_certificates_revoked_total{reason="deleted"} 1"#));
        assert!(rendered.contains(r#"certreg_verifications_total{status="revoked"} 2"#));
    }
}
