// Private module declaration
mod server;

use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry};

// Re-export for public API
pub use server::{health_handler, metrics_handler};

// ============================================================================
// Metrics Module - Prometheus metrics for observability
// ============================================================================
//
// Provides metrics for:
// - Checkout outcomes and latency
// - Units reserved by committed orders
// - Retry attempts and outcomes
//
// All metrics are registered with Prometheus and can be scraped via /metrics
// ============================================================================

/// Outcome label for a successful checkout
pub const OUTCOME_PLACED: &str = "placed";

/// Central metrics registry for the entire application
pub struct Metrics {
    registry: Registry,

    // Checkout Metrics
    pub checkouts_total: IntCounterVec,
    pub checkout_duration: Histogram,
    pub units_reserved_total: IntCounter,

    // Retry Metrics
    pub retry_attempts_total: IntCounterVec,
    pub retry_success: IntCounterVec,
    pub retry_failure: IntCounterVec,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        // Checkout Metrics
        let checkouts_total = IntCounterVec::new(
            Opts::new("checkouts_total", "Checkouts by outcome (placed or failure kind)"),
            &["outcome"],
        )?;
        registry.register(Box::new(checkouts_total.clone()))?;

        let checkout_duration = Histogram::with_opts(
            HistogramOpts::new("checkout_duration_seconds", "Checkout duration including retries")
                .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
        )?;
        registry.register(Box::new(checkout_duration.clone()))?;

        let units_reserved_total = IntCounter::new(
            "order_units_reserved_total",
            "Stock units reserved by committed orders",
        )?;
        registry.register(Box::new(units_reserved_total.clone()))?;

        // Retry Metrics
        let retry_attempts_total = IntCounterVec::new(
            Opts::new("retry_attempts_total", "Total retry attempts"),
            &["operation", "attempt"],
        )?;
        registry.register(Box::new(retry_attempts_total.clone()))?;

        let retry_success = IntCounterVec::new(
            Opts::new("retry_success_total", "Total successful retries"),
            &["operation"],
        )?;
        registry.register(Box::new(retry_success.clone()))?;

        let retry_failure = IntCounterVec::new(
            Opts::new("retry_failure_total", "Total failed retries after all attempts"),
            &["operation"],
        )?;
        registry.register(Box::new(retry_failure.clone()))?;

        Ok(Self {
            registry,
            checkouts_total,
            checkout_duration,
            units_reserved_total,
            retry_attempts_total,
            retry_success,
            retry_failure,
        })
    }

    /// Get the Prometheus registry for exposing metrics via HTTP
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Record one finished checkout. `outcome` is `OUTCOME_PLACED` or an error kind.
    pub fn record_checkout(&self, outcome: &str, duration_secs: f64, units_reserved: u64) {
        self.checkouts_total.with_label_values(&[outcome]).inc();
        self.checkout_duration.observe(duration_secs);
        if units_reserved > 0 {
            self.units_reserved_total.inc_by(units_reserved);
        }
    }

    /// Helper to record retry attempt
    pub fn record_retry_attempt(&self, operation: &str, attempt: u32) {
        self.retry_attempts_total.with_label_values(&[operation, &attempt.to_string()]).inc();
    }

    /// Helper to record retry outcome
    pub fn record_retry_outcome(&self, operation: &str, success: bool) {
        if success {
            self.retry_success.with_label_values(&[operation]).inc();
        } else {
            self.retry_failure.with_label_values(&[operation]).inc();
        }
    }
}
