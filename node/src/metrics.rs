//! # Prometheus Metrics
//!
//! Operational metrics for the dev node, scraped at `/metrics` on the
//! configured metrics port.
//!
//! All metrics are registered in a dedicated [`prometheus::Registry`] so they
//! do not collide with any default global registry consumers.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use mgov_contracts::{EventRecord, LedgerEvent};
use prometheus::core::Collector;
use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, IntGauge, Registry, TextEncoder};
use std::sync::Arc;

/// Holds all Prometheus metric handles for the node.
#[derive(Clone)]
pub struct NodeMetrics {
    registry: Registry,
    /// Transactions accepted by the ledger.
    pub transactions_submitted_total: IntCounter,
    /// Transactions rejected by the ledger.
    pub transactions_failed_total: IntCounter,
    /// `DelegateVotesChanged` events, one per checkpoint write.
    pub checkpoints_written_total: IntCounter,
    /// `DelegateChanged` events.
    pub delegations_changed_total: IntCounter,
    /// Latest sealed block number.
    pub latest_block: IntGauge,
    /// Time spent holding the ledger lock per transaction.
    pub transaction_latency_seconds: Histogram,
}

fn register<C: Collector + Clone + 'static>(registry: &Registry, metric: C) -> prometheus::Result<C> {
    registry.register(Box::new(metric.clone()))?;
    Ok(metric)
}

impl NodeMetrics {
    /// Creates and registers all metrics. Call once at startup.
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new_custom(Some("mgov".into()), None)?;

        let transactions_submitted_total = register(
            &registry,
            IntCounter::new(
                "transactions_submitted_total",
                "Total number of transactions accepted by the ledger",
            )?,
        )?;
        let transactions_failed_total = register(
            &registry,
            IntCounter::new(
                "transactions_failed_total",
                "Total number of transactions rejected by the ledger",
            )?,
        )?;
        let checkpoints_written_total = register(
            &registry,
            IntCounter::new(
                "checkpoints_written_total",
                "Total number of voting-power checkpoint writes",
            )?,
        )?;
        let delegations_changed_total = register(
            &registry,
            IntCounter::new(
                "delegations_changed_total",
                "Total number of delegation changes",
            )?,
        )?;
        let latest_block = register(
            &registry,
            IntGauge::new("latest_block", "Number of the latest sealed block")?,
        )?;
        let transaction_latency_seconds = register(
            &registry,
            Histogram::with_opts(
                HistogramOpts::new(
                    "transaction_latency_seconds",
                    "Ledger transaction processing latency in seconds",
                )
                .buckets(vec![0.00001, 0.00005, 0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05]),
            )?,
        )?;

        Ok(Self {
            registry,
            transactions_submitted_total,
            transactions_failed_total,
            checkpoints_written_total,
            delegations_changed_total,
            latest_block,
            transaction_latency_seconds,
        })
    }

    /// Counts the checkpoint and delegation events a transaction emitted.
    pub fn observe_events(&self, events: &[EventRecord]) {
        for record in events {
            match record.event {
                LedgerEvent::DelegateVotesChanged { .. } => self.checkpoints_written_total.inc(),
                LedgerEvent::DelegateChanged { .. } => self.delegations_changed_total.inc(),
                _ => {}
            }
        }
    }

    /// Encodes all registered metrics into the Prometheus text exposition format.
    pub fn encode(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
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

#[cfg(test)]
mod tests {
    use super::*;
    use mgov_protocol::Address;

    #[test]
    fn counts_checkpoint_and_delegation_events() {
        let metrics = NodeMetrics::new().unwrap();
        let a = Address::from_low_u64(1);
        let events = vec![
            EventRecord {
                sequence: 0,
                block: 2,
                event: LedgerEvent::DelegateChanged {
                    delegator: a,
                    from_delegate: Address::ZERO,
                    to_delegate: a,
                },
            },
            EventRecord {
                sequence: 1,
                block: 2,
                event: LedgerEvent::DelegateVotesChanged {
                    delegate: a,
                    previous_balance: 0,
                    new_balance: 5,
                },
            },
            EventRecord {
                sequence: 2,
                block: 2,
                event: LedgerEvent::Transfer {
                    from: Address::ZERO,
                    to: a,
                    value: 5,
                },
            },
        ];
        metrics.observe_events(&events);
        assert_eq!(metrics.checkpoints_written_total.get(), 1);
        assert_eq!(metrics.delegations_changed_total.get(), 1);
    }

    #[test]
    fn encodes_with_namespace() {
        let metrics = NodeMetrics::new().unwrap();
        metrics.latest_block.set(7);
        let body = metrics.encode().unwrap();
        assert!(body.contains("mgov_latest_block 7"));
        assert!(body.contains("mgov_transactions_submitted_total 0"));
    }
}
