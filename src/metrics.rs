//! Prometheus metrics for batching and staleness tracking

use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, Registry, TextEncoder};

pub struct Metrics {
    registry: Registry,
    pub batches_flushed: IntCounter,
    pub queries_sent: IntCounter,
    pub batch_failures: IntCounter,
    pub stale_results_dropped: IntCounter,
    pub batch_size: Histogram,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let batches_flushed = IntCounter::new(
            "signal_batches_flushed_total",
            "Number of coalesced batches sent to the signals endpoint",
        )?;
        let queries_sent = IntCounter::new(
            "signal_queries_sent_total",
            "Number of query descriptors sent across all batches",
        )?;
        let batch_failures = IntCounter::new(
            "signal_batch_failures_total",
            "Number of batches rejected by the transport",
        )?;
        let stale_results_dropped = IntCounter::new(
            "signal_stale_results_dropped_total",
            "Results discarded because a newer fetch superseded them",
        )?;
        let batch_size = Histogram::with_opts(
            HistogramOpts::new(
                "signal_batch_size_queries",
                "Query descriptors per flushed batch",
            )
            .buckets(vec![3.0, 6.0, 12.0, 24.0, 48.0, 96.0, 192.0]),
        )?;

        registry.register(Box::new(batches_flushed.clone()))?;
        registry.register(Box::new(queries_sent.clone()))?;
        registry.register(Box::new(batch_failures.clone()))?;
        registry.register(Box::new(stale_results_dropped.clone()))?;
        registry.register(Box::new(batch_size.clone()))?;

        Ok(Self {
            registry,
            batches_flushed,
            queries_sent,
            batch_failures,
            stale_results_dropped,
            batch_size,
        })
    }

    /// Render all metrics in the Prometheus text exposition format
    pub fn export(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
