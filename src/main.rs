//! dlqwatch - SQS queues with dead-letter monitoring
//!
//! Renders the CloudFormation template for a monitored queue, or previews the
//! Slack message the forwarding function would post for a recorded event.

use anyhow::{Context, Result};
use clap::Parser;
use dlqwatch::{
    cli::{Cli, Command},
    config::Config,
    core::SnsEvent,
    monitored_queue::MonitoredQueue,
    notification::parse_alarm_message,
};
use std::fs;
use std::path::Path;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration by layering sources: defaults, file, environment, and CLI args.
    let config = Config::load(&cli).unwrap_or_else(|err| {
        init_tracing("info");
        error!("Failed to load configuration: {:#}", err);
        std::process::exit(1);
    });

    init_tracing(&config.log_level);

    match &cli.command {
        Some(Command::Preview {
            event,
            format,
            channel,
        }) => {
            let raw = fs::read_to_string(event)
                .with_context(|| format!("failed to read event file {}", event.display()))?;
            let event: SnsEvent = serde_json::from_str(&raw).context("invalid SNS event")?;
            let alarm = parse_alarm_message(&event)?;
            let message = format.formatter().format(&alarm, channel);
            println!("{}", serde_json::to_string_pretty(&message)?);
        }
        Some(Command::Synth {
            output, compact, ..
        }) => synth(&config, output.as_deref(), *compact)?,
        None => synth(&config, None, false)?,
    }

    Ok(())
}

fn synth(config: &Config, output: Option<&Path>, compact: bool) -> Result<()> {
    let queue = MonitoredQueue::assemble(&config.monitored_queue)?;
    info!(
        queue = %queue.queue.options.queue_name,
        dead_letter_queue = %queue.dead_letter_queue.queue_name(),
        alarm = %queue.alarm.alarm_name,
        functions = queue.functions.len(),
        subscriptions = queue.subscriptions.len(),
        "Assembled monitored queue"
    );

    let template = queue.to_template(config.description.as_deref());
    let rendered = if compact {
        serde_json::to_string(&template)?
    } else {
        serde_json::to_string_pretty(&template)?
    };

    match output {
        Some(path) => {
            fs::write(path, rendered + "\n")
                .with_context(|| format!("failed to write template to {}", path.display()))?;
            info!(path = %path.display(), "Template written");
        }
        None => println!("{}", rendered),
    }
    Ok(())
}

/// Logs go to stderr so a template on stdout can be piped. `RUST_LOG` wins
/// over the configured level.
fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
