// src/formatting.rs

use crate::core::{AlarmMessage, AlarmState, Attachment, NotificationMessage};
use chrono::DateTime;
use serde::{Deserialize, Serialize};

const ALARM_COLOR: &str = "#ff0000";
const RESOLVED_COLOR: &str = "#36a64f";

/// A trait for turning an alarm state change into a chat message.
pub trait MessageFormatter: Send + Sync {
    fn format(&self, alarm: &AlarmMessage, channel: &str) -> NotificationMessage;
}

/// Which rendering the forwarding function uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MessageFormat {
    /// A single line of text.
    #[default]
    Text,
    /// A colored attachment with the state transition and reason.
    Card,
}

impl MessageFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Card => "card",
        }
    }

    pub fn formatter(&self) -> Box<dyn MessageFormatter> {
        match self {
            Self::Text => Box::new(PlainTextFormatter),
            Self::Card => Box::new(CardFormatter),
        }
    }
}

/// Renders `<AlarmName> state is now <NewStateValue> at <StateChangeTime>`.
pub struct PlainTextFormatter;

impl PlainTextFormatter {
    fn summary(alarm: &AlarmMessage) -> String {
        format!(
            "{} state is now {} at {}",
            alarm.alarm_name, alarm.new_state_value, alarm.state_change_time
        )
    }
}

impl MessageFormatter for PlainTextFormatter {
    fn format(&self, alarm: &AlarmMessage, channel: &str) -> NotificationMessage {
        NotificationMessage {
            channel: channel.to_string(),
            text: Self::summary(alarm),
            attachments: Vec::new(),
        }
    }
}

/// Renders the alarm as a card: a header naming the alarm, the transition
/// and reason as the body, red while in ALARM and green otherwise.
pub struct CardFormatter;

impl MessageFormatter for CardFormatter {
    fn format(&self, alarm: &AlarmMessage, channel: &str) -> NotificationMessage {
        let summary = PlainTextFormatter::summary(alarm);
        let attachment = Attachment {
            color: state_color(alarm.new_state_value).to_string(),
            title: format!("{} has been triggered!", alarm.alarm_name),
            text: format!(
                "State changed: {} → {}\n\nReason: {}",
                alarm.old_state_value, alarm.new_state_value, alarm.new_state_reason
            ),
            fallback: summary.clone(),
            ts: parse_state_change_time(&alarm.state_change_time),
        };

        NotificationMessage {
            channel: channel.to_string(),
            text: summary,
            attachments: vec![attachment],
        }
    }
}

fn state_color(state: AlarmState) -> &'static str {
    match state {
        AlarmState::Alarm => ALARM_COLOR,
        AlarmState::Ok | AlarmState::InsufficientData => RESOLVED_COLOR,
    }
}

/// Converts the alarm's change time to a unix timestamp for the card footer.
/// Accepts RFC 3339 and CloudWatch's `+0000` offset style.
fn parse_state_change_time(raw: &str) -> Option<i64> {
    DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f%z"))
        .map(|time| time.timestamp())
        .ok()
}
