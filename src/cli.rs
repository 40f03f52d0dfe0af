//! Command-Line Interface (CLI) argument parsing.
//!
//! This module defines the command-line arguments for the `dlqwatch` tool using
//! the `clap` crate. Flags that override configuration values are merged on top
//! of the `dlqwatch.toml` file and environment variables.

use crate::formatting::MessageFormat;
use clap::{Parser, Subcommand};
use figment::{
    value::{Dict, Map, Tag, Value},
    Error, Metadata, Profile, Provider,
};
use std::path::PathBuf;

/// Provisions SQS queues with a dead-letter queue, a depth alarm and alarm
/// notifications.
#[derive(Parser, Debug, Clone, Default)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// The logging level (e.g. "debug", "info").
    #[arg(long, value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Render the CloudFormation template for the configured queue.
    Synth {
        /// Write the template here instead of stdout.
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Name of the primary queue.
        #[arg(long, value_name = "NAME")]
        queue_name: Option<String>,

        /// Receives before a message is moved to the dead-letter queue.
        #[arg(long, value_name = "COUNT")]
        max_receive_count: Option<u32>,

        /// Dead-letter queue depth at which the alarm fires.
        #[arg(long, value_name = "MESSAGES")]
        message_threshold: Option<f64>,

        /// Periods the threshold must be breached before alarming.
        #[arg(long, value_name = "PERIODS")]
        evaluation_periods: Option<u32>,

        /// Emit the template on a single line.
        #[arg(long)]
        compact: bool,
    },
    /// Format a recorded SNS event the way the forwarder would.
    Preview {
        /// The SNS event JSON.
        #[arg(value_name = "EVENT_FILE")]
        event: PathBuf,

        #[arg(long, value_enum, default_value_t = MessageFormat::Text)]
        format: MessageFormat,

        #[arg(long, value_name = "CHANNEL", default_value = "#alerts")]
        channel: String,
    },
}

impl Provider for Cli {
    fn metadata(&self) -> Metadata {
        Metadata::named("Command-Line Arguments")
    }

    fn data(&self) -> Result<Map<Profile, Dict>, Error> {
        let mut dict = Dict::new();

        if let Some(level) = &self.log_level {
            dict.insert("log_level".into(), Value::from(level.clone()));
        }

        if let Some(Command::Synth {
            queue_name,
            max_receive_count,
            message_threshold,
            evaluation_periods,
            ..
        }) = &self.command
        {
            // Nested keys need a nested dict; a dotted key would stay flat.
            if let Some(name) = queue_name {
                let mut queue = Dict::new();
                queue.insert("queue_name".into(), Value::from(name.clone()));
                dict.insert("queue".into(), Value::Dict(Tag::Default, queue));
            }
            if let Some(count) = max_receive_count {
                dict.insert("max_receive_count".into(), Value::from(*count));
            }
            if let Some(threshold) = message_threshold {
                dict.insert("message_threshold".into(), Value::from(*threshold));
            }
            if let Some(periods) = evaluation_periods {
                dict.insert("evaluation_threshold".into(), Value::from(*periods));
            }
        }

        let mut map = Map::new();
        map.insert(Profile::Default, dict);
        Ok(map)
    }
}
