//! Core domain types for dlqwatch
//!
//! This module defines the alarm state-change payload published by CloudWatch,
//! the SNS envelope it arrives in, and the chat message derived from it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The three states a CloudWatch alarm can be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlarmState {
    Alarm,
    Ok,
    InsufficientData,
}

impl AlarmState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Alarm => "ALARM",
            Self::Ok => "OK",
            Self::InsufficientData => "INSUFFICIENT_DATA",
        }
    }
}

impl fmt::Display for AlarmState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An alarm state-change notification as published by CloudWatch to SNS.
///
/// Only the name, both states, the reason and the change time are needed to
/// build a chat message. The remaining fields are kept so the whole payload
/// can be logged and inspected, and default when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AlarmMessage {
    pub alarm_name: String,
    #[serde(default)]
    pub alarm_description: Option<String>,
    #[serde(rename = "AWSAccountId", default)]
    pub aws_account_id: String,
    #[serde(default)]
    pub alarm_configuration_updated_timestamp: Option<String>,
    pub new_state_value: AlarmState,
    pub new_state_reason: String,
    /// Kept verbatim; CloudWatch uses `2024-01-01T00:00:00.000+0000`.
    pub state_change_time: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub alarm_arn: String,
    pub old_state_value: AlarmState,
    #[serde(rename = "OKActions", default)]
    pub ok_actions: Vec<String>,
    #[serde(default)]
    pub alarm_actions: Vec<String>,
    #[serde(default)]
    pub insufficient_data_actions: Vec<String>,
    #[serde(default)]
    pub trigger: Option<Trigger>,
}

/// Metric metadata describing what the alarm evaluates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "PascalCase", default)]
pub struct Trigger {
    pub metric_name: String,
    pub namespace: String,
    pub statistic_type: String,
    pub statistic: String,
    pub unit: Option<String>,
    pub dimensions: Vec<Dimension>,
    pub period: u32,
    pub evaluation_periods: u32,
    pub comparison_operator: String,
    pub threshold: f64,
    pub treat_missing_data: String,
    pub evaluate_low_sample_count_percentile: String,
}

/// CloudWatch spells dimension keys in lower case inside the trigger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimension {
    pub name: String,
    pub value: String,
}

/// The event a Lambda function receives when subscribed to an SNS topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnsEvent {
    #[serde(rename = "Records")]
    pub records: Vec<SnsRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnsRecord {
    #[serde(rename = "EventSource", default)]
    pub event_source: Option<String>,
    #[serde(rename = "EventSubscriptionArn", default)]
    pub event_subscription_arn: Option<String>,
    #[serde(rename = "Sns")]
    pub sns: SnsMessage,
}

/// The SNS notification itself. `message` carries the alarm payload as a
/// JSON encoded string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SnsMessage {
    #[serde(default)]
    pub message_id: Option<String>,
    #[serde(default)]
    pub topic_arn: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    pub message: String,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// A chat message ready to be posted. Serializes directly into the body of a
/// Slack `chat.postMessage` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationMessage {
    pub channel: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
}

/// A legacy Slack attachment, used to render the alarm as a colored card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub color: String,
    pub title: String,
    pub text: String,
    pub fallback: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ts: Option<i64>,
}
