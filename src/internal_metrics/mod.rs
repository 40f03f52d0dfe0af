//! # Internal Metrics Module
//!
//! Counters and histograms describing what the forwarding function did.
//!
//! - **`ForwarderMetrics`**: cloneable handles the forwarder updates on every
//!   invocation. Without an installed recorder the handles are no-ops.
//!
//! - **`LoggingRecorder`**: (Defined in `logging_recorder.rs`) a recorder that
//!   keeps the values in memory and writes them to the log when flushed, so a
//!   Lambda function can report per-invocation metrics through its log stream.

use crate::notification::FailureKind;
use metrics::{Counter, Histogram, Unit};

pub mod logging_recorder;

pub const RECEIVED_TOTAL: &str = "alarm_notifications_received_total";
pub const FORWARDED_TOTAL: &str = "alarm_notifications_forwarded_total";
pub const FAILURES_TOTAL: &str = "alarm_notification_failures_total";
pub const SEND_DURATION_SECONDS: &str = "alarm_notification_send_duration_seconds";

/// The public API for the forwarder's metrics.
#[derive(Clone)]
pub struct ForwarderMetrics {
    pub received: Counter,
    pub forwarded: Counter,
    pub send_duration: Histogram,
}

impl std::fmt::Debug for ForwarderMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForwarderMetrics").finish_non_exhaustive()
    }
}

impl ForwarderMetrics {
    /// Registers metric descriptions with the global recorder and returns
    /// handles to the forwarder's metrics.
    pub fn new() -> Self {
        metrics::describe_counter!(RECEIVED_TOTAL, Unit::Count, "Total number of SNS events handed to the forwarder.");
        metrics::describe_counter!(FORWARDED_TOTAL, Unit::Count, "Total number of alarm notifications accepted by Slack.");
        metrics::describe_counter!(FAILURES_TOTAL, Unit::Count, "Total number of notifications that were not forwarded, labeled by failure kind.");
        metrics::describe_histogram!(SEND_DURATION_SECONDS, Unit::Seconds, "The time taken by the outbound Slack request.");

        Self {
            received: metrics::counter!(RECEIVED_TOTAL),
            forwarded: metrics::counter!(FORWARDED_TOTAL),
            send_duration: metrics::histogram!(SEND_DURATION_SECONDS),
        }
    }

    /// Increments the failure counter for the given kind.
    pub fn record_failure(&self, kind: FailureKind) {
        metrics::counter!(FAILURES_TOTAL, "kind" => kind.as_str()).increment(1);
    }
}

impl Default for ForwarderMetrics {
    fn default() -> Self {
        Self::new()
    }
}
