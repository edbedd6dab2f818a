//! # Middleware
//!
//! - `metrics`: per-request counters and latency histograms via `metrics`.
//! - `rate_limit`: fixed-window per-client request limits.
//! - `tracing_layer`: `tower_http` request spans.

pub mod metrics;
pub mod rate_limit;
pub mod tracing_layer;
