//! The monitored queue: a queue, its dead-letter queue, an alarm on the DLQ
//! depth and the topic that fans alarm transitions out to notification
//! providers.
//!
//! `MonitoredQueue::assemble` is a pure function of its configuration. The
//! same configuration always yields an equal bundle of resources.

use crate::provider::{AttachContext, NotificationProvider};
use crate::resources::{
    Alarm, ComparisonOperator, DeadLetterQueue, DeadLetterSource, ForwarderArtifact,
    ForwardingFunction, Queue, QueueMetric, QueueOptions, RedrivePolicy, ResourceRef, Statistic,
    Subscription, Topic, TopicOptions, TreatMissingData,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::LazyLock;
use thiserror::Error;
use tracing::{debug, info};

pub const DEFAULT_MAX_RECEIVE_COUNT: u32 = 3;
pub const DEFAULT_MESSAGE_THRESHOLD: f64 = 5.0;
pub const DEFAULT_EVALUATION_PERIODS: u32 = 1;
pub const DEFAULT_ALARM_PERIOD_SECONDS: u32 = 300;

const MAX_RECEIVE_COUNT_LIMIT: u32 = 1000;

static STANDARD_QUEUE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{1,80}$").expect("queue name pattern is valid"));
static FIFO_QUEUE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_-]{1,75}\.fifo$").expect("fifo queue name pattern is valid")
});

/// Configuration errors detected while composing the resources.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AssemblyError {
    #[error("invalid queue name '{name}': {reason}")]
    InvalidQueueName { name: String, reason: String },

    #[error("queue '{queue}' and its dead-letter queue '{dead_letter_queue}' must both be FIFO or both standard")]
    FifoMismatch {
        queue: String,
        dead_letter_queue: String,
    },

    #[error("invalid value for {field}: {reason}")]
    InvalidSetting { field: &'static str, reason: String },

    #[error("invalid email address '{0}'")]
    InvalidEmail(String),

    #[error("invalid notification provider '{provider}': {reason}")]
    InvalidProvider { provider: String, reason: String },

    #[error("provider '{0}' renders a logical ID already used by another resource")]
    DuplicateProviderName(String),

    #[error("slack provider '{provider}' needs forwarder.s3_bucket and forwarder.s3_key")]
    MissingForwarderArtifact { provider: String },
}

/// A dead-letter queue that already exists outside this template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExistingDeadLetterQueue {
    pub queue_arn: String,
    pub queue_name: String,
    /// Falls back to the top-level `max_receive_count` when unset.
    #[serde(default)]
    pub max_receive_count: Option<u32>,
}

/// A topic that already exists outside this template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExistingTopic {
    pub topic_arn: String,
}

/// Alarm settings other than threshold and evaluation periods. The metric and
/// the missing-data treatment are fixed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlarmOptions {
    /// Defaults to `<dlq name>-alarm`.
    pub alarm_name: Option<String>,
    pub description: Option<String>,
    pub period_seconds: u32,
    pub statistic: Statistic,
    pub comparison_operator: ComparisonOperator,
}

impl Default for AlarmOptions {
    fn default() -> Self {
        Self {
            alarm_name: None,
            description: None,
            period_seconds: DEFAULT_ALARM_PERIOD_SECONDS,
            statistic: Statistic::default(),
            comparison_operator: ComparisonOperator::default(),
        }
    }
}

/// Everything needed to compose a monitored queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoredQueueConfig {
    /// The primary queue.
    pub queue: QueueOptions,
    /// Receives before a message moves to the dead-letter queue.
    pub max_receive_count: u32,
    /// DLQ depth at which the alarm fires.
    pub message_threshold: f64,
    /// Periods over which the DLQ depth is compared to the threshold.
    pub evaluation_threshold: u32,
    /// Options for a provisioned DLQ. An empty name means `<queue>-dlq`.
    pub dlq: Option<QueueOptions>,
    /// Use this DLQ instead of provisioning one. Takes precedence over `dlq`.
    pub dead_letter_queue: Option<ExistingDeadLetterQueue>,
    pub alarm: AlarmOptions,
    /// Options for a provisioned topic.
    pub topic: TopicOptions,
    /// Publish to this topic instead of provisioning one. Takes precedence
    /// over `topic`.
    pub existing_topic: Option<ExistingTopic>,
    pub forwarder: ForwarderArtifact,
    /// Attached in order.
    pub providers: Vec<NotificationProvider>,
}

impl Default for MonitoredQueueConfig {
    fn default() -> Self {
        Self {
            queue: QueueOptions::default(),
            max_receive_count: DEFAULT_MAX_RECEIVE_COUNT,
            message_threshold: DEFAULT_MESSAGE_THRESHOLD,
            evaluation_threshold: DEFAULT_EVALUATION_PERIODS,
            dlq: None,
            dead_letter_queue: None,
            alarm: AlarmOptions::default(),
            topic: TopicOptions::default(),
            existing_topic: None,
            forwarder: ForwarderArtifact::default(),
            providers: Vec::new(),
        }
    }
}

impl MonitoredQueueConfig {
    pub fn new(queue: QueueOptions) -> Self {
        Self {
            queue,
            ..Default::default()
        }
    }

    pub fn with_provider(mut self, provider: NotificationProvider) -> Self {
        self.providers.push(provider);
        self
    }
}

/// The composed resources of one monitored queue.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitoredQueue {
    pub queue: Queue,
    pub dead_letter_queue: DeadLetterQueue,
    pub alarm: Alarm,
    pub topic: Topic,
    pub functions: Vec<ForwardingFunction>,
    pub subscriptions: Vec<Subscription>,
}

impl MonitoredQueue {
    /// Composes the queue, dead-letter queue, alarm and topic, then attaches
    /// every configured provider to the topic.
    pub fn assemble(config: &MonitoredQueueConfig) -> Result<Self, AssemblyError> {
        validate_settings(config)?;
        validate_queue_name(&config.queue)?;

        let dead_letter_queue = build_dead_letter_queue(config)?;
        let queue = Queue {
            logical_id: "Queue".to_string(),
            options: config.queue.clone(),
            redrive_policy: Some(RedrivePolicy {
                dead_letter_target: dead_letter_queue.reference(),
                max_receive_count: dead_letter_queue.max_receive_count,
            }),
        };

        let topic = build_topic(config, &dead_letter_queue);
        let topic_ref = topic.reference();
        let alarm = build_alarm(config, &dead_letter_queue, &topic_ref);

        let mut functions = Vec::new();
        let mut subscriptions = Vec::new();
        // Provider resources share one template namespace with the fixed ones.
        let mut logical_ids: HashSet<String> = [queue.logical_id.clone(), alarm.logical_id.clone()]
            .into_iter()
            .chain(dead_letter_queue.provisioned_logical_id())
            .chain(topic.provisioned_logical_id())
            .collect();
        for (ordinal, provider) in config.providers.iter().enumerate() {
            let ctx = AttachContext {
                topic: &topic_ref,
                ordinal,
                artifact: &config.forwarder,
            };
            let resources = provider.attach(&ctx)?;
            for id in resources.logical_ids() {
                if !logical_ids.insert(id) {
                    return Err(AssemblyError::DuplicateProviderName(provider.label().to_string()));
                }
            }
            debug!(
                provider = provider.kind(),
                functions = resources.functions.len(),
                subscriptions = resources.subscriptions.len(),
                "Attached notification provider"
            );
            functions.extend(resources.functions);
            subscriptions.extend(resources.subscriptions);
        }

        info!(
            queue = %queue.options.queue_name,
            dead_letter_queue = %dead_letter_queue.queue_name(),
            alarm = %alarm.alarm_name,
            providers = config.providers.len(),
            "Assembled monitored queue"
        );

        Ok(Self {
            queue,
            dead_letter_queue,
            alarm,
            topic,
            functions,
            subscriptions,
        })
    }
}

fn validate_settings(config: &MonitoredQueueConfig) -> Result<(), AssemblyError> {
    let max_receive = config
        .dead_letter_queue
        .as_ref()
        .and_then(|existing| existing.max_receive_count)
        .unwrap_or(config.max_receive_count);
    if !(1..=MAX_RECEIVE_COUNT_LIMIT).contains(&max_receive) {
        return Err(AssemblyError::InvalidSetting {
            field: "max_receive_count",
            reason: format!("must be between 1 and {}, got {}", MAX_RECEIVE_COUNT_LIMIT, max_receive),
        });
    }
    if !config.message_threshold.is_finite() || config.message_threshold < 0.0 {
        return Err(AssemblyError::InvalidSetting {
            field: "message_threshold",
            reason: format!("must be a non-negative number, got {}", config.message_threshold),
        });
    }
    if config.evaluation_threshold == 0 {
        return Err(AssemblyError::InvalidSetting {
            field: "evaluation_threshold",
            reason: "must be at least 1".to_string(),
        });
    }
    let period = config.alarm.period_seconds;
    if !(matches!(period, 10 | 30) || (period > 0 && period % 60 == 0)) {
        return Err(AssemblyError::InvalidSetting {
            field: "alarm.period_seconds",
            reason: format!("must be 10, 30 or a multiple of 60, got {}", period),
        });
    }
    Ok(())
}

fn validate_queue_name(options: &QueueOptions) -> Result<(), AssemblyError> {
    let (pattern, expected) = if options.fifo {
        (&*FIFO_QUEUE_NAME, "up to 75 letters, digits, '-' or '_' followed by '.fifo'")
    } else {
        (&*STANDARD_QUEUE_NAME, "1 to 80 letters, digits, '-' or '_'")
    };
    if pattern.is_match(&options.queue_name) {
        Ok(())
    } else {
        Err(AssemblyError::InvalidQueueName {
            name: options.queue_name.clone(),
            reason: format!("expected {}", expected),
        })
    }
}

fn build_dead_letter_queue(config: &MonitoredQueueConfig) -> Result<DeadLetterQueue, AssemblyError> {
    if let Some(existing) = &config.dead_letter_queue {
        if existing.queue_name.ends_with(".fifo") != config.queue.fifo {
            return Err(AssemblyError::FifoMismatch {
                queue: config.queue.queue_name.clone(),
                dead_letter_queue: existing.queue_name.clone(),
            });
        }
        debug!(queue_arn = %existing.queue_arn, "Using existing dead-letter queue");
        return Ok(DeadLetterQueue {
            queue: DeadLetterSource::Imported {
                queue_arn: existing.queue_arn.clone(),
                queue_name: existing.queue_name.clone(),
            },
            max_receive_count: existing.max_receive_count.unwrap_or(config.max_receive_count),
        });
    }

    let mut options = config.dlq.clone().unwrap_or_else(|| QueueOptions {
        fifo: config.queue.fifo,
        ..Default::default()
    });
    if options.queue_name.is_empty() {
        options.queue_name = default_dlq_name(&config.queue);
    }
    if options.fifo != config.queue.fifo {
        return Err(AssemblyError::FifoMismatch {
            queue: config.queue.queue_name.clone(),
            dead_letter_queue: options.queue_name,
        });
    }
    validate_queue_name(&options)?;

    Ok(DeadLetterQueue {
        queue: DeadLetterSource::Provisioned(Queue {
            logical_id: "DeadLetterQueue".to_string(),
            options,
            redrive_policy: None,
        }),
        max_receive_count: config.max_receive_count,
    })
}

fn default_dlq_name(queue: &QueueOptions) -> String {
    if queue.fifo {
        format!("{}-dlq.fifo", queue.base_name())
    } else {
        format!("{}-dlq", queue.queue_name)
    }
}

fn build_topic(config: &MonitoredQueueConfig, dlq: &DeadLetterQueue) -> Topic {
    if let Some(existing) = &config.existing_topic {
        debug!(topic_arn = %existing.topic_arn, "Using existing alarm topic");
        return Topic::Imported {
            topic_arn: existing.topic_arn.clone(),
        };
    }

    let mut options = config.topic.clone();
    if options.topic_name.is_none() {
        let dlq_name = dlq.queue_name();
        let base = dlq_name.strip_suffix(".fifo").unwrap_or(dlq_name);
        options.topic_name = Some(format!("{}-alarm-topic", base));
    }
    Topic::Provisioned {
        logical_id: "Topic".to_string(),
        options,
    }
}

fn build_alarm(config: &MonitoredQueueConfig, dlq: &DeadLetterQueue, topic: &ResourceRef) -> Alarm {
    let alarm_name = config
        .alarm
        .alarm_name
        .clone()
        .unwrap_or_else(|| format!("{}-alarm", dlq.queue_name()));

    Alarm {
        logical_id: "DlqAlarm".to_string(),
        alarm_name,
        description: config.alarm.description.clone(),
        metric: QueueMetric::messages_visible(
            dlq.reference(),
            config.alarm.statistic,
            config.alarm.period_seconds,
        ),
        threshold: config.message_threshold,
        evaluation_periods: config.evaluation_threshold,
        comparison_operator: config.alarm.comparison_operator,
        treat_missing_data: TreatMissingData::NotBreaching,
        alarm_actions: vec![topic.clone()],
        ok_actions: vec![topic.clone()],
    }
}
