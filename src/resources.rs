//! Typed descriptions of the cloud resources a monitored queue is made of.
//!
//! These are plain values: building them has no side effects, and the
//! `template` module turns them into a CloudFormation document.

use crate::formatting::MessageFormat;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How one resource refers to another inside the template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ResourceRef {
    /// Created by this template, addressed by logical ID.
    Provisioned { logical_id: String },
    /// Created elsewhere, addressed by ARN and physical name.
    Imported { arn: String, name: String },
}

impl ResourceRef {
    pub fn provisioned(logical_id: impl Into<String>) -> Self {
        Self::Provisioned {
            logical_id: logical_id.into(),
        }
    }
}

/// Options shared by the primary queue and the dead-letter queue.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueOptions {
    /// Physical queue name. FIFO queue names end in `.fifo`.
    pub queue_name: String,
    pub fifo: bool,
    pub content_based_deduplication: bool,
    pub visibility_timeout_seconds: Option<u32>,
    pub message_retention_seconds: Option<u32>,
    pub delay_seconds: Option<u32>,
    pub receive_message_wait_time_seconds: Option<u32>,
    pub max_message_size_bytes: Option<u32>,
}

impl QueueOptions {
    pub fn named(queue_name: impl Into<String>) -> Self {
        Self {
            queue_name: queue_name.into(),
            ..Default::default()
        }
    }

    /// The queue name without its `.fifo` suffix.
    pub fn base_name(&self) -> &str {
        self.queue_name
            .strip_suffix(".fifo")
            .unwrap_or(&self.queue_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RedrivePolicy {
    pub dead_letter_target: ResourceRef,
    pub max_receive_count: u32,
}

/// An SQS queue created by the template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Queue {
    pub logical_id: String,
    pub options: QueueOptions,
    pub redrive_policy: Option<RedrivePolicy>,
}

/// The queue messages are moved to after `max_receive_count` failed receives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeadLetterQueue {
    pub queue: DeadLetterSource,
    pub max_receive_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum DeadLetterSource {
    Provisioned(Queue),
    Imported { queue_arn: String, queue_name: String },
}

impl DeadLetterQueue {
    pub fn provisioned_logical_id(&self) -> Option<String> {
        match &self.queue {
            DeadLetterSource::Provisioned(queue) => Some(queue.logical_id.clone()),
            DeadLetterSource::Imported { .. } => None,
        }
    }

    pub fn queue_name(&self) -> &str {
        match &self.queue {
            DeadLetterSource::Provisioned(queue) => &queue.options.queue_name,
            DeadLetterSource::Imported { queue_name, .. } => queue_name,
        }
    }

    pub fn reference(&self) -> ResourceRef {
        match &self.queue {
            DeadLetterSource::Provisioned(queue) => ResourceRef::provisioned(&queue.logical_id),
            DeadLetterSource::Imported {
                queue_arn,
                queue_name,
            } => ResourceRef::Imported {
                arn: queue_arn.clone(),
                name: queue_name.clone(),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Statistic {
    Average,
    #[default]
    Maximum,
    Minimum,
    Sum,
    SampleCount,
}

impl Statistic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Average => "Average",
            Self::Maximum => "Maximum",
            Self::Minimum => "Minimum",
            Self::Sum => "Sum",
            Self::SampleCount => "SampleCount",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ComparisonOperator {
    #[default]
    GreaterThanOrEqualToThreshold,
    GreaterThanThreshold,
    LessThanThreshold,
    LessThanOrEqualToThreshold,
}

impl ComparisonOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GreaterThanOrEqualToThreshold => "GreaterThanOrEqualToThreshold",
            Self::GreaterThanThreshold => "GreaterThanThreshold",
            Self::LessThanThreshold => "LessThanThreshold",
            Self::LessThanOrEqualToThreshold => "LessThanOrEqualToThreshold",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TreatMissingData {
    Breaching,
    NotBreaching,
    Ignore,
    Missing,
}

impl TreatMissingData {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Breaching => "breaching",
            Self::NotBreaching => "notBreaching",
            Self::Ignore => "ignore",
            Self::Missing => "missing",
        }
    }
}

/// A CloudWatch metric on a single SQS queue.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueueMetric {
    pub namespace: &'static str,
    pub metric_name: &'static str,
    pub queue: ResourceRef,
    pub statistic: Statistic,
    pub period_seconds: u32,
}

impl QueueMetric {
    /// `ApproximateNumberOfMessagesVisible` for the given queue.
    pub fn messages_visible(queue: ResourceRef, statistic: Statistic, period_seconds: u32) -> Self {
        Self {
            namespace: "AWS/SQS",
            metric_name: "ApproximateNumberOfMessagesVisible",
            queue,
            statistic,
            period_seconds,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alarm {
    pub logical_id: String,
    pub alarm_name: String,
    pub description: Option<String>,
    pub metric: QueueMetric,
    pub threshold: f64,
    pub evaluation_periods: u32,
    pub comparison_operator: ComparisonOperator,
    pub treat_missing_data: TreatMissingData,
    pub alarm_actions: Vec<ResourceRef>,
    pub ok_actions: Vec<ResourceRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TopicOptions {
    pub topic_name: Option<String>,
    pub display_name: Option<String>,
}

/// The SNS topic the alarm publishes to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Topic {
    Provisioned {
        logical_id: String,
        options: TopicOptions,
    },
    Imported {
        topic_arn: String,
    },
}

impl Topic {
    pub fn provisioned_logical_id(&self) -> Option<String> {
        match self {
            Self::Provisioned { logical_id, .. } => Some(logical_id.clone()),
            Self::Imported { .. } => None,
        }
    }

    pub fn reference(&self) -> ResourceRef {
        match self {
            Self::Provisioned { logical_id, .. } => ResourceRef::provisioned(logical_id),
            Self::Imported { topic_arn } => ResourceRef::Imported {
                arn: topic_arn.clone(),
                name: topic_arn.rsplit(':').next().unwrap_or(topic_arn).to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SubscriptionEndpoint {
    Email(String),
    Lambda { function_logical_id: String },
}

impl SubscriptionEndpoint {
    pub fn protocol(&self) -> &'static str {
        match self {
            Self::Email(_) => "email",
            Self::Lambda { .. } => "lambda",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Subscription {
    pub logical_id: String,
    pub topic: ResourceRef,
    pub endpoint: SubscriptionEndpoint,
}

impl Subscription {
    /// The permission letting the topic invoke a Lambda endpoint.
    pub fn permission_logical_id(&self) -> Option<String> {
        match self.endpoint {
            SubscriptionEndpoint::Lambda { .. } => Some(format!("{}Permission", self.logical_id)),
            SubscriptionEndpoint::Email(_) => None,
        }
    }

    /// Every template resource rendered for this subscription.
    pub fn logical_ids(&self) -> Vec<String> {
        let mut ids = vec![self.logical_id.clone()];
        ids.extend(self.permission_logical_id());
        ids
    }
}

/// Where the forwarding function's deployment bundle lives and how the
/// function is sized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForwarderArtifact {
    pub s3_bucket: Option<String>,
    pub s3_key: Option<String>,
    pub memory_size_mb: u32,
    pub timeout_seconds: u32,
    pub log_retention_days: u32,
}

impl Default for ForwarderArtifact {
    fn default() -> Self {
        Self {
            s3_bucket: None,
            s3_key: None,
            memory_size_mb: 128,
            timeout_seconds: 10,
            log_retention_days: 7,
        }
    }
}

/// A Lambda function that relays alarm notifications to one Slack channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ForwardingFunction {
    pub logical_id: String,
    pub provider_name: String,
    pub runtime: &'static str,
    pub architecture: &'static str,
    pub handler: &'static str,
    pub s3_bucket: String,
    pub s3_key: String,
    pub memory_size_mb: u32,
    pub timeout_seconds: u32,
    pub log_retention_days: u32,
    pub message_format: MessageFormat,
    pub environment: BTreeMap<String, String>,
}

impl ForwardingFunction {
    pub fn role_logical_id(&self) -> String {
        format!("{}ServiceRole", self.logical_id)
    }

    pub fn log_group_logical_id(&self) -> String {
        format!("{}LogGroup", self.logical_id)
    }

    /// Every template resource rendered for this function.
    pub fn logical_ids(&self) -> Vec<String> {
        vec![
            self.logical_id.clone(),
            self.role_logical_id(),
            self.log_group_logical_id(),
        ]
    }
}
