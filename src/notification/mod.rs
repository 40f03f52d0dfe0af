//! Forwards CloudWatch alarm notifications delivered by SNS to Slack.
//!
//! Each invocation parses one SNS event, formats the alarm it carries and
//! posts exactly one message. Nothing is retried: every failure is logged,
//! counted, and reported back to the caller as a `ForwardOutcome`.
pub mod slack;

use crate::config::ForwarderSettings;
use crate::core::{AlarmMessage, AlarmState, SnsEvent};
use crate::formatting::MessageFormatter;
use crate::internal_metrics::ForwarderMetrics;
use serde::Serialize;
use slack::{SlackClient, SlackClientTrait};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{error, info, instrument, warn};

#[derive(Error, Debug)]
pub enum ForwardError {
    #[error("notification envelope contains no records")]
    EmptyEnvelope,

    #[error("failed to parse notification payload: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("HTTP request to Slack failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Slack responded with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Slack rejected the message: {0}")]
    Api(String),
}

impl ForwardError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::EmptyEnvelope | Self::Parse(_) => FailureKind::Parse,
            Self::Transport(_) | Self::Status { .. } | Self::Api(_) => FailureKind::Delivery,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The event could not be read; nothing was sent.
    Parse,
    /// The event was read but Slack did not accept the message.
    Delivery,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Parse => "parse",
            Self::Delivery => "delivery",
        }
    }
}

/// What happened to one delivered event. Returned to the runtime instead of
/// an error so a bad event never fails the invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ForwardOutcome {
    Delivered {
        alarm_name: String,
        new_state: AlarmState,
    },
    Failed {
        kind: FailureKind,
        error: String,
    },
}

impl ForwardOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered { .. })
    }
}

/// Extracts the alarm payload from the first record of an SNS event.
pub fn parse_alarm_message(event: &SnsEvent) -> Result<AlarmMessage, ForwardError> {
    let record = event.records.first().ok_or(ForwardError::EmptyEnvelope)?;
    if event.records.len() > 1 {
        warn!(
            records = event.records.len(),
            "SNS event carries more than one record, only the first is forwarded"
        );
    }
    Ok(serde_json::from_str(&record.sns.message)?)
}

/// Turns alarm state changes into Slack messages for one channel.
pub struct AlarmForwarder<S: SlackClientTrait> {
    slack_client: Arc<S>,
    channel: String,
    formatter: Box<dyn MessageFormatter>,
    metrics: ForwarderMetrics,
}

impl AlarmForwarder<SlackClient> {
    /// Builds a forwarder backed by the real Slack API.
    pub fn from_settings(settings: &ForwarderSettings) -> Result<Self, ForwardError> {
        let client = SlackClient::new(settings.slack_bot_token.clone(), settings.http_timeout())?
            .with_endpoint(settings.slack_api_url.clone());
        Ok(Self::new(
            Arc::new(client),
            settings.slack_channel.clone(),
            settings.message_format.formatter(),
        ))
    }
}

impl<S: SlackClientTrait> AlarmForwarder<S> {
    pub fn new(slack_client: Arc<S>, channel: String, formatter: Box<dyn MessageFormatter>) -> Self {
        Self {
            slack_client,
            channel,
            formatter,
            metrics: ForwarderMetrics::new(),
        }
    }

    /// Handles an event given as raw JSON text.
    pub async fn handle_raw(&self, payload: &str) -> ForwardOutcome {
        self.metrics.received.increment(1);
        match serde_json::from_str::<SnsEvent>(payload) {
            Ok(event) => self.forward(&event).await,
            Err(e) => self.fail(ForwardError::Parse(e)),
        }
    }

    /// Handles an event already decoded into JSON by the runtime.
    pub async fn handle_value(&self, payload: serde_json::Value) -> ForwardOutcome {
        self.metrics.received.increment(1);
        match serde_json::from_value::<SnsEvent>(payload) {
            Ok(event) => self.forward(&event).await,
            Err(e) => self.fail(ForwardError::Parse(e)),
        }
    }

    #[instrument(skip_all, fields(channel = %self.channel))]
    async fn forward(&self, event: &SnsEvent) -> ForwardOutcome {
        let alarm = match parse_alarm_message(event) {
            Ok(alarm) => alarm,
            Err(e) => return self.fail(e),
        };

        let message = self.formatter.format(&alarm, &self.channel);
        let start = Instant::now();
        let result = self.slack_client.post_message(&message).await;
        self.metrics
            .send_duration
            .record(start.elapsed().as_secs_f64());

        match result {
            Ok(()) => {
                self.metrics.forwarded.increment(1);
                info!(
                    alarm = %alarm.alarm_name,
                    old_state = %alarm.old_state_value,
                    new_state = %alarm.new_state_value,
                    "Forwarded alarm state change"
                );
                ForwardOutcome::Delivered {
                    alarm_name: alarm.alarm_name,
                    new_state: alarm.new_state_value,
                }
            }
            Err(e) => self.fail(e),
        }
    }

    fn fail(&self, error: ForwardError) -> ForwardOutcome {
        let kind = error.kind();
        self.metrics.record_failure(kind);
        error!(kind = kind.as_str(), error = %error, "Failed to forward alarm notification");
        ForwardOutcome::Failed {
            kind,
            error: error.to_string(),
        }
    }
}
