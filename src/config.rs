//! Configuration management for dlqwatch
//!
//! `Config` drives the `dlqwatch` provisioning tool. It is layered with
//! `figment`: built-in defaults, then a TOML file, then `DLQWATCH_` prefixed
//! environment variables, then command-line flags.
//!
//! `ForwarderSettings` is what the forwarding function reads from its Lambda
//! environment at start-up. The variable names are shared with the provider
//! that writes them into the function definition.

use crate::cli::Cli;
use crate::formatting::MessageFormat;
use crate::monitored_queue::MonitoredQueueConfig;
use crate::notification::slack::SLACK_CHAT_POST_MESSAGE_ENDPOINT;
use anyhow::{bail, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

pub const SLACK_BOT_TOKEN_ENV: &str = "SLACK_BOT_TOKEN";
pub const SLACK_CHANNEL_ENV: &str = "SLACK_CHANNEL";
pub const SLACK_API_URL_ENV: &str = "SLACK_API_URL";
pub const MESSAGE_FORMAT_ENV: &str = "MESSAGE_FORMAT";
pub const HTTP_TIMEOUT_MS_ENV: &str = "HTTP_TIMEOUT_MS";

/// The main configuration struct for the provisioning tool.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Config {
    /// The logging level for the application.
    pub log_level: String,
    /// Written into the template's `Description`.
    #[serde(default)]
    pub description: Option<String>,
    /// The monitored queue to compose.
    #[serde(flatten)]
    pub monitored_queue: MonitoredQueueConfig,
}

impl Config {
    /// Loads the configuration by layering defaults, the file named by
    /// `--config`, the environment and the command-line flags.
    pub fn load(cli: &Cli) -> Result<Self> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));
        if let Some(path) = &cli.config {
            if !path.exists() {
                bail!("configuration file not found: {}", path.display());
            }
            figment = figment.merge(Toml::file(path));
        }
        let config: Config = figment
            // e.g. DLQWATCH_QUEUE__QUEUE_NAME=orders
            .merge(Env::prefixed("DLQWATCH_").split("__"))
            .merge(cli.clone())
            .extract()?;
        Ok(config)
    }
}

// Provide a default implementation for tests and easy setup.
impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            description: None,
            monitored_queue: MonitoredQueueConfig::default(),
        }
    }
}

/// Settings the forwarding function reads from its environment.
#[derive(Deserialize, Serialize, Clone, PartialEq)]
pub struct ForwarderSettings {
    pub slack_bot_token: String,
    pub slack_channel: String,
    #[serde(default = "default_slack_api_url")]
    pub slack_api_url: String,
    #[serde(default)]
    pub message_format: MessageFormat,
    #[serde(default = "default_http_timeout_ms")]
    pub http_timeout_ms: u64,
}

fn default_slack_api_url() -> String {
    SLACK_CHAT_POST_MESSAGE_ENDPOINT.to_string()
}

fn default_http_timeout_ms() -> u64 {
    10_000
}

impl fmt::Debug for ForwarderSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForwarderSettings")
            .field("slack_bot_token", &"<redacted>")
            .field("slack_channel", &self.slack_channel)
            .field("slack_api_url", &self.slack_api_url)
            .field("message_format", &self.message_format)
            .field("http_timeout_ms", &self.http_timeout_ms)
            .finish()
    }
}

impl ForwarderSettings {
    /// The figment reading the forwarder's variables from the environment.
    pub fn figment() -> Figment {
        Figment::new().merge(Env::raw().only(&[
            SLACK_BOT_TOKEN_ENV,
            SLACK_CHANNEL_ENV,
            SLACK_API_URL_ENV,
            MESSAGE_FORMAT_ENV,
            HTTP_TIMEOUT_MS_ENV,
        ]))
    }

    /// Loads the settings from the process environment.
    pub fn load() -> Result<Self> {
        Self::from_figment(Self::figment())
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let settings: ForwarderSettings = figment.extract()?;
        if settings.slack_bot_token.trim().is_empty() {
            bail!("{} must not be empty", SLACK_BOT_TOKEN_ENV);
        }
        if settings.slack_channel.trim().is_empty() {
            bail!("{} must not be empty", SLACK_CHANNEL_ENV);
        }
        if settings.http_timeout_ms == 0 {
            bail!("{} must be greater than zero", HTTP_TIMEOUT_MS_ENV);
        }
        Ok(settings)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms)
    }
}
