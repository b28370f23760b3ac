//! # Prometheus Metrics
//!
//! Operational metrics for the ledger node, scraped at `/metrics` on the
//! metrics port. Everything lives in a dedicated registry with the `corgi`
//! prefix.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use corgi_protocol::config::ONE_TOKEN;
use corgi_protocol::units::Amount;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;

/// All metric handles for the node. Handles are internally reference
/// counted, so clones share the same series.
#[derive(Clone)]
pub struct NodeMetrics {
    registry: Registry,
    /// Operations applied, labelled by operation name.
    pub operations_applied_total: IntCounterVec,
    /// Operations rejected, labelled by operation name and error kind.
    pub operations_rejected_total: IntCounterVec,
    /// Events published to subscribers.
    pub events_published_total: IntCounter,
    /// Current total supply in whole tokens (truncated).
    pub total_supply_tokens: IntGauge,
    /// Accounts with a nonzero balance.
    pub holders: IntGauge,
    /// Time spent applying an operation, lock wait included.
    pub operation_latency_seconds: Histogram,
}

impl NodeMetrics {
    /// Creates and registers all metrics. Call once at startup.
    pub fn new() -> Self {
        let registry = Registry::new_custom(Some("corgi".into()), None)
            .expect("failed to create prometheus registry");

        let operations_applied_total = IntCounterVec::new(
            Opts::new(
                "operations_applied_total",
                "Ledger operations applied, by operation",
            ),
            &["op"],
        )
        .expect("metric creation");
        registry
            .register(Box::new(operations_applied_total.clone()))
            .expect("metric registration");

        let operations_rejected_total = IntCounterVec::new(
            Opts::new(
                "operations_rejected_total",
                "Ledger operations rejected, by operation and error kind",
            ),
            &["op", "kind"],
        )
        .expect("metric creation");
        registry
            .register(Box::new(operations_rejected_total.clone()))
            .expect("metric registration");

        let events_published_total = IntCounter::new(
            "events_published_total",
            "Transfer and Approval events published to subscribers",
        )
        .expect("metric creation");
        registry
            .register(Box::new(events_published_total.clone()))
            .expect("metric registration");

        let total_supply_tokens =
            IntGauge::new("total_supply_tokens", "Current total supply in whole tokens")
                .expect("metric creation");
        registry
            .register(Box::new(total_supply_tokens.clone()))
            .expect("metric registration");

        let holders = IntGauge::new("holders", "Accounts holding a nonzero balance")
            .expect("metric creation");
        registry
            .register(Box::new(holders.clone()))
            .expect("metric registration");

        let operation_latency_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "operation_latency_seconds",
                "Time to apply a ledger operation in seconds",
            )
            .buckets(vec![
                0.000_001, 0.000_005, 0.000_01, 0.000_05, 0.000_1, 0.000_5, 0.001, 0.005, 0.01,
            ]),
        )
        .expect("metric creation");
        registry
            .register(Box::new(operation_latency_seconds.clone()))
            .expect("metric registration");

        Self {
            registry,
            operations_applied_total,
            operations_rejected_total,
            events_published_total,
            total_supply_tokens,
            holders,
            operation_latency_seconds,
        }
    }

    /// Updates the supply and holder gauges from a ledger reading.
    pub fn observe_ledger(&self, total_supply: Amount, holders: usize) {
        let whole = i64::try_from(total_supply / ONE_TOKEN).unwrap_or(i64::MAX);
        self.total_supply_tokens.set(whole);
        self.holders.set(i64::try_from(holders).unwrap_or(i64::MAX));
    }

    /// Encodes all registered metrics in the Prometheus text format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer).expect("prometheus output is valid utf-8"))
    }
}

/// Shared metrics state passed to axum handlers.
pub type SharedMetrics = Arc<NodeMetrics>;

/// Renders `/metrics` in the Prometheus text format.
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
