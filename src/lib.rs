/// dlqwatch - SQS queues with dead-letter monitoring
///
/// This library composes a queue, its dead-letter queue, a CloudWatch alarm on
/// the dead-letter queue depth and the notification providers subscribed to
/// the alarm topic, and renders the result as a CloudFormation template. It
/// also contains the forwarding function that relays alarm notifications from
/// SNS to Slack.
pub mod cli;
pub mod config;
pub mod core;
pub mod formatting;
pub mod internal_metrics;
pub mod monitored_queue;
pub mod notification;
pub mod provider;
pub mod resources;
pub mod template;

// Re-export core types for convenience
pub use core::*;
pub use monitored_queue::{AssemblyError, MonitoredQueue, MonitoredQueueConfig};
pub use provider::NotificationProvider;
