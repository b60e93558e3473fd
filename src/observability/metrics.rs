//! # Metrics
//!
//! Prometheus metrics for monitoring broker traffic and managed secrets.
//!
//! ## Metrics Exposed
//!
//! - `service_manager_bridge_broker_requests_total` - Broker requests by operation and outcome
//! - `service_manager_bridge_broker_request_duration_seconds` - Duration of broker requests
//! - `service_manager_bridge_token_refreshes_total` - OAuth2 token exchanges
//! - `service_manager_bridge_managed_secrets_created_total` - Managed secrets written
//! - `service_manager_bridge_managed_secrets_deleted_total` - Managed secrets removed
//! - `service_manager_bridge_secret_conflicts_total` - Secret creations rejected as conflicts

use anyhow::Result;
use prometheus::{Encoder, HistogramVec, IntCounter, IntCounterVec, Registry, TextEncoder};
use std::sync::LazyLock;

pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static BROKER_REQUESTS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "service_manager_bridge_broker_requests_total",
            "Total number of broker requests by operation and outcome",
        ),
        &["operation", "outcome"],
    )
    .expect("Failed to create BROKER_REQUESTS_TOTAL metric - this should never happen")
});

static BROKER_REQUEST_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        prometheus::HistogramOpts::new(
            "service_manager_bridge_broker_request_duration_seconds",
            "Duration of broker requests in seconds",
        )
        .buckets(vec![0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0]),
        &["operation"],
    )
    .expect("Failed to create BROKER_REQUEST_DURATION metric - this should never happen")
});

static TOKEN_REFRESHES_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "service_manager_bridge_token_refreshes_total",
        "Total number of OAuth2 client-credentials token exchanges",
    )
    .expect("Failed to create TOKEN_REFRESHES_TOTAL metric - this should never happen")
});

static MANAGED_SECRETS_CREATED_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "service_manager_bridge_managed_secrets_created_total",
        "Total number of binding secrets created in the cluster",
    )
    .expect("Failed to create MANAGED_SECRETS_CREATED_TOTAL metric - this should never happen")
});

static MANAGED_SECRETS_DELETED_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "service_manager_bridge_managed_secrets_deleted_total",
        "Total number of binding secrets deleted from the cluster",
    )
    .expect("Failed to create MANAGED_SECRETS_DELETED_TOTAL metric - this should never happen")
});

static SECRET_CONFLICTS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "service_manager_bridge_secret_conflicts_total",
        "Total number of secret creations rejected because the target was occupied",
    )
    .expect("Failed to create SECRET_CONFLICTS_TOTAL metric - this should never happen")
});

#[allow(
    clippy::missing_errors_doc,
    reason = "Error documentation is provided in doc comments"
)]
/// Register all metrics with the bridge registry
///
/// # Errors
/// Returns an error if a metric is already registered
pub fn register_metrics() -> Result<()> {
    REGISTRY.register(Box::new(BROKER_REQUESTS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(BROKER_REQUEST_DURATION.clone()))?;
    REGISTRY.register(Box::new(TOKEN_REFRESHES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(MANAGED_SECRETS_CREATED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(MANAGED_SECRETS_DELETED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(SECRET_CONFLICTS_TOTAL.clone()))?;

    Ok(())
}

/// Record a completed broker round-trip
///
/// `outcome` is one of `completed`, `accepted`, `error`.
pub fn record_broker_request(operation: &str, outcome: &str, duration: f64) {
    BROKER_REQUESTS_TOTAL
        .with_label_values(&[operation, outcome])
        .inc();
    BROKER_REQUEST_DURATION
        .with_label_values(&[operation])
        .observe(duration);
}

pub fn increment_token_refreshes() {
    TOKEN_REFRESHES_TOTAL.inc();
}

pub fn increment_managed_secrets_created() {
    MANAGED_SECRETS_CREATED_TOTAL.inc();
}

pub fn increment_managed_secrets_deleted(count: usize) {
    MANAGED_SECRETS_DELETED_TOTAL.inc_by(count as u64);
}

pub fn increment_secret_conflicts() {
    SECRET_CONFLICTS_TOTAL.inc();
}

/// Render the registry in the Prometheus text exposition format
///
/// # Errors
/// Returns an error if encoding fails
pub fn gather_text() -> Result<String> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}
