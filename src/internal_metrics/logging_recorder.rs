//! A metrics recorder that logs captured metrics when flushed.

use metrics::{Counter, Gauge, Histogram, Key, KeyName, Metadata, Recorder, SharedString, Unit};
use metrics_util::registry::{AtomicStorage, Registry};
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// A metrics recorder that holds values in memory until `flush` writes them
/// to `tracing::info!`.
pub struct LoggingRecorder {
    registry: Arc<Registry<Key, AtomicStorage>>,
}

/// A handle that flushes the recorder after it has been installed globally.
#[derive(Clone)]
pub struct LoggingRecorderHandle {
    registry: Arc<Registry<Key, AtomicStorage>>,
}

/// The values reported by one flush.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MetricsSnapshot {
    pub counters: Vec<(String, u64)>,
    /// Name, sample count and sum of each histogram.
    pub histograms: Vec<(String, usize, f64)>,
}

impl LoggingRecorder {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Registry::new(AtomicStorage)),
        }
    }

    pub fn handle(&self) -> LoggingRecorderHandle {
        LoggingRecorderHandle {
            registry: self.registry.clone(),
        }
    }
}

impl Default for LoggingRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl LoggingRecorderHandle {
    /// Logs every non-zero counter and histogram, then resets them so the
    /// next flush reports only what happened since this one.
    pub fn flush(&self) -> MetricsSnapshot {
        let mut snapshot = MetricsSnapshot::default();

        for (key, counter) in self.registry.get_counter_handles() {
            let value = counter.swap(0, Ordering::Relaxed);
            if value > 0 {
                let name = render_key(&key);
                tracing::info!(metric = %name, value, "[Counter]");
                snapshot.counters.push((name, value));
            }
        }

        for (key, histogram) in self.registry.get_histogram_handles() {
            let mut count = 0;
            let mut sum = 0.0;
            histogram.clear_with(|values| {
                count += values.len();
                sum += values.iter().sum::<f64>();
            });
            if count > 0 {
                let name = render_key(&key);
                tracing::info!(metric = %name, count, sum, "[Histogram]");
                snapshot.histograms.push((name, count, sum));
            }
        }

        snapshot.counters.sort_by(|a, b| a.0.cmp(&b.0));
        snapshot.histograms.sort_by(|a, b| a.0.cmp(&b.0));
        snapshot
    }
}

/// Renders a key as `name{label=value,...}`.
fn render_key(key: &Key) -> String {
    let labels: Vec<String> = key
        .labels()
        .map(|label| format!("{}={}", label.key(), label.value()))
        .collect();
    if labels.is_empty() {
        key.name().to_string()
    } else {
        format!("{}{{{}}}", key.name(), labels.join(","))
    }
}

impl Recorder for LoggingRecorder {
    fn describe_counter(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {
        // Not implemented for this simple recorder
    }

    fn describe_gauge(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {
        // Not implemented for this simple recorder
    }

    fn describe_histogram(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {
        // Not implemented for this simple recorder
    }

    fn register_counter(&self, key: &Key, _metadata: &Metadata<'_>) -> Counter {
        self.registry.get_or_create_counter(key, |c| c.clone().into())
    }

    fn register_gauge(&self, key: &Key, _metadata: &Metadata<'_>) -> Gauge {
        self.registry.get_or_create_gauge(key, |g| g.clone().into())
    }

    fn register_histogram(&self, key: &Key, _metadata: &Metadata<'_>) -> Histogram {
        self.registry.get_or_create_histogram(key, |h| h.clone().into())
    }
}
