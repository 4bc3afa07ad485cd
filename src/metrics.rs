//! Prometheus metrics registry and instruments.
//!
//! This module is framework-agnostic and can be used from any layer.

use lazy_static::lazy_static;
use prometheus::{HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry};

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // OAuth Metrics
    pub static ref LOGINS_STARTED_TOTAL: IntCounter = IntCounter::new(
        "oauth_client_logins_started_total",
        "Total number of redirects to the GitHub authorize page"
    ).expect("metric can be created");
    pub static ref CALLBACKS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("oauth_client_callbacks_total", "Total number of OAuth callbacks handled"),
        &["outcome"]
    ).expect("metric can be created");

    // GitHub Metrics
    pub static ref GITHUB_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("oauth_client_github_requests_total", "Total number of requests sent to GitHub"),
        &["endpoint", "status"]
    ).expect("metric can be created");
    pub static ref GITHUB_REQUEST_DURATION_SECONDS: prometheus::HistogramVec = prometheus::HistogramVec::new(
        HistogramOpts::new(
            "oauth_client_github_request_duration_seconds",
            "GitHub request duration in seconds"
        ).buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        &["endpoint"]
    ).expect("metric can be created");

    // Session Metrics
    pub static ref SESSIONS_ACTIVE: IntGauge = IntGauge::new(
        "oauth_client_sessions_active",
        "Current number of server-side sessions"
    ).expect("metric can be created");

    // Error Metrics
    pub static ref ERRORS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("oauth_client_errors_total", "Total number of errors"),
        &["error_type"]
    ).expect("metric can be created");
}

/// Initialize metrics registry.
pub fn init_metrics() {
    REGISTRY
        .register(Box::new(LOGINS_STARTED_TOTAL.clone()))
        .expect("LOGINS_STARTED_TOTAL can be registered");
    REGISTRY
        .register(Box::new(CALLBACKS_TOTAL.clone()))
        .expect("CALLBACKS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(GITHUB_REQUESTS_TOTAL.clone()))
        .expect("GITHUB_REQUESTS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(GITHUB_REQUEST_DURATION_SECONDS.clone()))
        .expect("GITHUB_REQUEST_DURATION_SECONDS can be registered");
    REGISTRY
        .register(Box::new(SESSIONS_ACTIVE.clone()))
        .expect("SESSIONS_ACTIVE can be registered");
    REGISTRY
        .register(Box::new(ERRORS_TOTAL.clone()))
        .expect("ERRORS_TOTAL can be registered");

    tracing::info!("Metrics registry initialized");
}
