//! Notification providers and how they attach to the alarm topic.
//!
//! A provider is selected by its `type` tag in configuration and attaching it
//! yields the subscriptions (and, for Slack, the forwarding function) that
//! deliver alarm notifications to its destination.

use crate::config::{MESSAGE_FORMAT_ENV, SLACK_BOT_TOKEN_ENV, SLACK_CHANNEL_ENV};
use crate::formatting::MessageFormat;
use crate::monitored_queue::AssemblyError;
use crate::resources::{
    ForwarderArtifact, ForwardingFunction, ResourceRef, Subscription, SubscriptionEndpoint,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

const FUNCTION_ID_PREFIX: &str = "SlackListenerLambda";
/// CloudFormation caps logical IDs at 255 characters.
const MAX_NAME_SUFFIX_LEN: usize = 255 - FUNCTION_ID_PREFIX.len();

/// A destination for alarm state-change notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NotificationProvider {
    /// Subscribes each address to the topic directly.
    Email(EmailProvider),
    /// Relays notifications to a Slack channel through a Lambda function.
    Slack(SlackProvider),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailProvider {
    pub emails: Vec<String>,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlackProvider {
    /// Distinguishes several Slack providers attached to the same alarm.
    pub name: String,
    pub slack_token: String,
    pub slack_channel: String,
    #[serde(default)]
    pub message_format: MessageFormat,
}

impl fmt::Debug for SlackProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlackProvider")
            .field("name", &self.name)
            .field("slack_token", &"<redacted>")
            .field("slack_channel", &self.slack_channel)
            .field("message_format", &self.message_format)
            .finish()
    }
}

/// Everything a provider needs to know about the topic it attaches to.
#[derive(Debug, Clone, Copy)]
pub struct AttachContext<'a> {
    pub topic: &'a ResourceRef,
    /// Position of the provider in the configured list.
    pub ordinal: usize,
    pub artifact: &'a ForwarderArtifact,
}

/// The resources created by attaching one provider.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProviderResources {
    pub functions: Vec<ForwardingFunction>,
    pub subscriptions: Vec<Subscription>,
}

impl ProviderResources {
    /// Every template resource these functions and subscriptions render to.
    pub fn logical_ids(&self) -> Vec<String> {
        self.functions
            .iter()
            .flat_map(ForwardingFunction::logical_ids)
            .chain(self.subscriptions.iter().flat_map(Subscription::logical_ids))
            .collect()
    }
}

impl NotificationProvider {
    pub fn email<I, S>(emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Email(EmailProvider {
            emails: emails.into_iter().map(Into::into).collect(),
        })
    }

    pub fn slack(
        name: impl Into<String>,
        slack_token: impl Into<String>,
        slack_channel: impl Into<String>,
    ) -> Self {
        Self::Slack(SlackProvider {
            name: name.into(),
            slack_token: slack_token.into(),
            slack_channel: slack_channel.into(),
            message_format: MessageFormat::default(),
        })
    }

    /// A short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Email(_) => "email",
            Self::Slack(_) => "slack",
        }
    }

    /// The Slack provider's name, or the kind for providers without one.
    pub fn label(&self) -> &str {
        match self {
            Self::Email(_) => self.kind(),
            Self::Slack(slack) => &slack.name,
        }
    }

    /// Subscribes this provider to the topic.
    ///
    /// Attaching the same provider twice produces duplicate subscriptions.
    pub fn attach(&self, ctx: &AttachContext<'_>) -> Result<ProviderResources, AssemblyError> {
        match self {
            Self::Email(provider) => provider.attach(ctx),
            Self::Slack(provider) => provider.attach(ctx),
        }
    }
}

impl EmailProvider {
    fn attach(&self, ctx: &AttachContext<'_>) -> Result<ProviderResources, AssemblyError> {
        let subscriptions = self
            .emails
            .iter()
            .enumerate()
            .map(|(index, email)| {
                validate_email(email)?;
                Ok(Subscription {
                    logical_id: format!("Provider{}EmailSubscription{}", ctx.ordinal, index),
                    topic: ctx.topic.clone(),
                    endpoint: SubscriptionEndpoint::Email(email.clone()),
                })
            })
            .collect::<Result<Vec<_>, AssemblyError>>()?;

        Ok(ProviderResources {
            functions: Vec::new(),
            subscriptions,
        })
    }
}

impl SlackProvider {
    /// The logical ID of this provider's forwarding function.
    pub fn function_logical_id(&self) -> Result<String, AssemblyError> {
        let suffix: String = self
            .name
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .collect();
        if suffix.is_empty() {
            return Err(AssemblyError::InvalidProvider {
                provider: self.name.clone(),
                reason: "name must contain at least one ASCII letter or digit".to_string(),
            });
        }
        if suffix.len() > MAX_NAME_SUFFIX_LEN {
            return Err(AssemblyError::InvalidProvider {
                provider: self.name.clone(),
                reason: format!(
                    "name must contain at most {} ASCII letters or digits, got {}",
                    MAX_NAME_SUFFIX_LEN,
                    suffix.len()
                ),
            });
        }
        Ok(format!("{}{}", FUNCTION_ID_PREFIX, suffix))
    }

    fn validate(&self) -> Result<(), AssemblyError> {
        let missing = if self.slack_token.trim().is_empty() {
            Some("slack_token")
        } else if self.slack_channel.trim().is_empty() {
            Some("slack_channel")
        } else {
            None
        };
        match missing {
            Some(field) => Err(AssemblyError::InvalidProvider {
                provider: self.name.clone(),
                reason: format!("{} must not be empty", field),
            }),
            None => Ok(()),
        }
    }

    fn attach(&self, ctx: &AttachContext<'_>) -> Result<ProviderResources, AssemblyError> {
        self.validate()?;
        let logical_id = self.function_logical_id()?;

        let (s3_bucket, s3_key) = match (&ctx.artifact.s3_bucket, &ctx.artifact.s3_key) {
            (Some(bucket), Some(key)) => (bucket.clone(), key.clone()),
            _ => {
                return Err(AssemblyError::MissingForwarderArtifact {
                    provider: self.name.clone(),
                })
            }
        };

        let mut environment = BTreeMap::new();
        environment.insert(SLACK_BOT_TOKEN_ENV.to_string(), self.slack_token.clone());
        environment.insert(SLACK_CHANNEL_ENV.to_string(), self.slack_channel.clone());
        environment.insert(
            MESSAGE_FORMAT_ENV.to_string(),
            self.message_format.as_str().to_string(),
        );

        let function = ForwardingFunction {
            logical_id: logical_id.clone(),
            provider_name: self.name.clone(),
            runtime: "provided.al2023",
            architecture: "arm64",
            handler: "bootstrap",
            s3_bucket,
            s3_key,
            memory_size_mb: ctx.artifact.memory_size_mb,
            timeout_seconds: ctx.artifact.timeout_seconds,
            log_retention_days: ctx.artifact.log_retention_days,
            message_format: self.message_format,
            environment,
        };

        let subscription = Subscription {
            logical_id: format!("{}Subscription", logical_id),
            topic: ctx.topic.clone(),
            endpoint: SubscriptionEndpoint::Lambda {
                function_logical_id: logical_id,
            },
        };

        Ok(ProviderResources {
            functions: vec![function],
            subscriptions: vec![subscription],
        })
    }
}

fn validate_email(email: &str) -> Result<(), AssemblyError> {
    match email.split_once('@') {
        Some((local, domain))
            if !local.is_empty() && domain.contains('.') && !email.contains(char::is_whitespace) =>
        {
            Ok(())
        }
        _ => Err(AssemblyError::InvalidEmail(email.to_string())),
    }
}
