//! # Prometheus Metrics
//!
//! Exposes vault activity counters. Scraped by Prometheus at the `/metrics`
//! HTTP endpoint on the configured metrics port.
//!
//! All metrics are registered in a dedicated [`prometheus::Registry`] so they
//! do not collide with any default global registry consumers.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use std::sync::Arc;

/// Holds all Prometheus metric handles for the node.
///
/// Clone-friendly (prometheus handles are reference-counted internally) so it
/// can be shared across request handlers.
#[derive(Clone)]
pub struct NodeMetrics {
    /// Prometheus registry that owns all metrics below.
    registry: Registry,
    /// Successful deposits.
    pub deposits_total: IntCounter,
    /// Successful redemptions.
    pub redemptions_total: IntCounter,
    /// Rejected vault operations, labelled by operation and error kind.
    pub rejections_total: IntCounterVec,
    /// Records currently `Active`.
    pub active_records: IntGauge,
}

impl NodeMetrics {
    /// Creates and registers all metrics.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("shardvault".into()), None)?;

        let deposits_total = IntCounter::new("deposits_total", "Total number of successful deposits")?;
        registry.register(Box::new(deposits_total.clone()))?;

        let redemptions_total =
            IntCounter::new("redemptions_total", "Total number of successful redemptions")?;
        registry.register(Box::new(redemptions_total.clone()))?;

        let rejections_total = IntCounterVec::new(
            Opts::new("rejections_total", "Vault operations rejected, by operation and reason"),
            &["operation", "reason"],
        )?;
        registry.register(Box::new(rejections_total.clone()))?;

        let active_records = IntGauge::new("active_records", "Deposit records currently active")?;
        registry.register(Box::new(active_records.clone()))?;

        Ok(Self {
            registry,
            deposits_total,
            redemptions_total,
            rejections_total,
            active_records,
        })
    }

    /// Records a rejected operation.
    pub fn reject(&self, operation: &str, reason: &str) {
        self.rejections_total
            .with_label_values(&[operation, reason])
            .inc();
    }

    /// Encodes all registered metrics into the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

/// Shared metrics state passed to axum handlers.
pub type SharedMetrics = Arc<NodeMetrics>;

/// Axum handler that renders `/metrics` in Prometheus text format.
pub async fn metrics_handler(
    axum::extract::State(metrics): axum::extract::State<SharedMetrics>,
) -> impl IntoResponse {
    match metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding failed").into_response()
        }
    }
}
