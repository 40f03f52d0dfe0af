//! A client for posting messages through the Slack Web API.

use crate::core::NotificationMessage;
use crate::notification::ForwardError;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{error, info, instrument};

pub const SLACK_CHAT_POST_MESSAGE_ENDPOINT: &str = "https://slack.com/api/chat.postMessage";

/// A trait for clients that can deliver a single chat message.
#[async_trait]
pub trait SlackClientTrait: Send + Sync {
    /// Posts one message. Called exactly once per forwarded alarm.
    async fn post_message(&self, message: &NotificationMessage) -> Result<(), ForwardError>;
}

/// The part of a Slack Web API response we care about.
#[derive(Debug, Deserialize)]
struct SlackApiResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

/// A client for `chat.postMessage`, authenticated with a bot token.
pub struct SlackClient {
    http: reqwest::Client,
    endpoint: String,
    bot_token: String,
}

impl SlackClient {
    /// Creates a new `SlackClient`. Requests give up after `timeout`.
    pub fn new(bot_token: String, timeout: Duration) -> Result<Self, ForwardError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            endpoint: SLACK_CHAT_POST_MESSAGE_ENDPOINT.to_string(),
            bot_token,
        })
    }

    /// Points the client at a different `chat.postMessage` URL.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl SlackClientTrait for SlackClient {
    #[instrument(skip(self, message), fields(channel = %message.channel))]
    async fn post_message(&self, message: &NotificationMessage) -> Result<(), ForwardError> {
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.bot_token)
            .json(message)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "HTTP request to Slack failed");
                ForwardError::Transport(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %body, "Failed to send Slack notification");
            return Err(ForwardError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: SlackApiResponse = response.json().await?;
        if !body.ok {
            let reason = body.error.unwrap_or_else(|| "unknown_error".to_string());
            error!(error = %reason, "Slack rejected the message");
            return Err(ForwardError::Api(reason));
        }

        info!("Successfully posted alarm notification to Slack.");
        Ok(())
    }
}
