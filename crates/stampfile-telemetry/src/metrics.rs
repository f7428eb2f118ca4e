//! Prometheus-backed metrics registry and snapshot helpers.
//!
//! # Design
//! - Encapsulates collector registration to keep the public API small.
//! - Exposes only the counters and gauges a writer instance updates.

use std::sync::Arc;

use anyhow::{Context, Result};
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use serde::Serialize;

/// Prometheus-backed metrics registry shared across services.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    writes_total: IntCounterVec,
    stream_opens_total: IntCounterVec,
    queue_depth: IntGauge,
    writer_faults_total: IntCounter,
}

/// Snapshot of selected gauges and counters for health reporting.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    /// Requests currently queued, including the one in flight.
    pub queue_depth: i64,
    /// Unexpected faults observed while servicing the queue.
    pub writer_faults_total: u64,
}

impl Metrics {
    /// Construct a new metrics registry with the standard collectors registered.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the Prometheus collectors cannot be
    /// registered.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let writes_total = IntCounterVec::new(
            Opts::new("writes_total", "Write requests completed by mode and outcome"),
            &["mode", "outcome"],
        )?;
        let stream_opens_total = IntCounterVec::new(
            Opts::new("stream_opens_total", "Output streams opened by reason"),
            &["reason"],
        )?;
        let queue_depth =
            IntGauge::with_opts(Opts::new("queue_depth", "Queued write requests"))?;
        let writer_faults_total = IntCounter::with_opts(Opts::new(
            "writer_faults_total",
            "Unexpected faults that reset the write queue",
        ))?;

        registry.register(Box::new(writes_total.clone()))?;
        registry.register(Box::new(stream_opens_total.clone()))?;
        registry.register(Box::new(queue_depth.clone()))?;
        registry.register(Box::new(writer_faults_total.clone()))?;

        Ok(Self {
            inner: Arc::new(MetricsInner {
                registry,
                writes_total,
                stream_opens_total,
                queue_depth,
                writer_faults_total,
            }),
        })
    }

    /// Increment the completed-write counter.
    pub fn inc_write(&self, mode: &str, outcome: &str) {
        self.inner
            .writes_total
            .with_label_values(&[mode, outcome])
            .inc();
    }

    /// Increment the stream-open counter.
    pub fn inc_stream_open(&self, reason: &str) {
        self.inner
            .stream_opens_total
            .with_label_values(&[reason])
            .inc();
    }

    /// Current count of streams opened for `reason`.
    #[must_use]
    pub fn stream_opens(&self, reason: &str) -> u64 {
        self.inner
            .stream_opens_total
            .with_label_values(&[reason])
            .get()
    }

    /// Set the queue depth gauge.
    pub fn set_queue_depth(&self, depth: usize) {
        self.inner
            .queue_depth
            .set(i64::try_from(depth).unwrap_or(i64::MAX));
    }

    /// Increment the writer fault counter.
    pub fn inc_writer_fault(&self) {
        self.inner.writer_faults_total.inc();
    }

    /// Render the metrics registry using the Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if the metrics cannot be encoded or if the encoded
    /// buffer is not valid UTF-8.
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .context("failed to encode Prometheus metrics")?;
        String::from_utf8(buffer).context("metrics output was not valid UTF-8")
    }

    /// Take a point-in-time snapshot of the most relevant gauges and counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            queue_depth: self.inner.queue_depth.get(),
            writer_faults_total: self.inner.writer_faults_total.get(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_snapshot_reflects_updates() -> Result<()> {
        let metrics = Metrics::new()?;
        metrics.inc_write("append", "written");
        metrics.inc_stream_open("stale");
        metrics.inc_stream_open("stale");
        metrics.set_queue_depth(3);
        metrics.inc_writer_fault();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.queue_depth, 3);
        assert_eq!(snapshot.writer_faults_total, 1);
        assert_eq!(metrics.stream_opens("stale"), 2);
        assert_eq!(metrics.stream_opens("fresh"), 0);

        let rendered = metrics.render()?;
        assert!(rendered.contains("writes_total"));
        assert!(rendered.contains("stream_opens_total"));
        Ok(())
    }
}
