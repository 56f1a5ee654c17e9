//! Metrics collection for observability
//!
//! This module provides Prometheus metrics for monitoring the pond.
//!
//! # Metrics
//!
//! - `minnow_deposits_total` - Accepted deposits
//! - `minnow_periods_closed_total` - Periods closed by the threshold
//! - `minnow_commitments_total` - Registered commitments
//! - `minnow_claims_total` - Paid claims
//! - `minnow_claims_rejected_total` - Claims rejected for any reason
//! - `minnow_claim_duration_seconds` - Histogram of claim latencies

use prometheus::{Histogram, HistogramOpts, IntCounter, Registry};
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Accepted deposits
    pub deposits_total: IntCounter,

    /// Closed periods
    pub periods_closed_total: IntCounter,

    /// Registered commitments
    pub commitments_total: IntCounter,

    /// Paid claims
    pub claims_total: IntCounter,

    /// Rejected claims
    pub claims_rejected_total: IntCounter,

    /// Claim duration histogram
    pub claim_duration: Histogram,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics")
            .field("deposits_total", &self.deposits_total.get())
            .field("claims_total", &self.claims_total.get())
            .finish_non_exhaustive()
    }
}

impl Metrics {
    /// Create new metrics collector with its own registry
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let deposits_total = IntCounter::new("minnow_deposits_total", "Accepted deposits")?;
        registry.register(Box::new(deposits_total.clone()))?;

        let periods_closed_total =
            IntCounter::new("minnow_periods_closed_total", "Periods closed by the threshold")?;
        registry.register(Box::new(periods_closed_total.clone()))?;

        let commitments_total =
            IntCounter::new("minnow_commitments_total", "Registered commitments")?;
        registry.register(Box::new(commitments_total.clone()))?;

        let claims_total = IntCounter::new("minnow_claims_total", "Paid claims")?;
        registry.register(Box::new(claims_total.clone()))?;

        let claims_rejected_total =
            IntCounter::new("minnow_claims_rejected_total", "Rejected claims")?;
        registry.register(Box::new(claims_rejected_total.clone()))?;

        let claim_duration = Histogram::with_opts(
            HistogramOpts::new("minnow_claim_duration_seconds", "Histogram of claim latencies")
                .buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.010, 0.050, 0.100, 0.500]),
        )?;
        registry.register(Box::new(claim_duration.clone()))?;

        Ok(Self {
            deposits_total,
            periods_closed_total,
            commitments_total,
            claims_total,
            claims_rejected_total,
            claim_duration,
            registry,
        })
    }

    /// Record an accepted deposit
    pub fn record_deposit(&self, closed_period: bool) {
        self.deposits_total.inc();
        if closed_period {
            self.periods_closed_total.inc();
        }
    }

    /// Record a registered commitment
    pub fn record_commitment(&self) {
        self.commitments_total.inc();
    }

    /// Record a claim outcome
    pub fn record_claim(&self, paid: bool, duration_seconds: f64) {
        if paid {
            self.claims_total.inc();
        } else {
            self.claims_rejected_total.inc();
        }
        self.claim_duration.observe(duration_seconds);
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new().unwrap();
        assert_eq!(metrics.deposits_total.get(), 0);
        assert_eq!(metrics.claims_total.get(), 0);

        // Independent registries do not collide
        let other = Metrics::new().unwrap();
        other.record_commitment();
        assert_eq!(metrics.commitments_total.get(), 0);
    }

    #[test]
    fn test_record_deposit() {
        let metrics = Metrics::new().unwrap();
        metrics.record_deposit(false);
        metrics.record_deposit(true);
        assert_eq!(metrics.deposits_total.get(), 2);
        assert_eq!(metrics.periods_closed_total.get(), 1);
    }

    #[test]
    fn test_record_claim() {
        let metrics = Metrics::new().unwrap();
        metrics.record_claim(true, 0.001);
        metrics.record_claim(false, 0.002);
        assert_eq!(metrics.claims_total.get(), 1);
        assert_eq!(metrics.claims_rejected_total.get(), 1);
        assert_eq!(metrics.claim_duration.get_sample_count(), 2);
        assert_eq!(metrics.registry().gather().len(), 6);
    }
}
