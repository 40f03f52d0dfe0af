//! The forwarding function subscribed to the alarm topic.
//!
//! Reads its Slack settings from the environment once at cold start, then
//! forwards one alarm notification per invocation. Metrics are kept in memory
//! and written to the log after every invocation.

use dlqwatch::{
    config::ForwarderSettings,
    internal_metrics::logging_recorder::{LoggingRecorder, LoggingRecorderHandle},
    notification::{slack::SlackClient, AlarmForwarder, ForwardOutcome},
};
use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        // CloudWatch Logs adds its own timestamps and does not render colors.
        .with_ansi(false)
        .without_time()
        .init();

    // The recorder must be installed before the forwarder registers its metrics.
    let recorder = LoggingRecorder::new();
    let metrics_handle = recorder.handle();
    metrics::set_global_recorder(recorder)
        .map_err(|_| "failed to install logging recorder")?;

    let settings = ForwarderSettings::load()?;
    info!(
        channel = %settings.slack_channel,
        format = settings.message_format.as_str(),
        "Alarm forwarder starting up"
    );

    let forwarder = AlarmForwarder::from_settings(&settings)?;
    let forwarder = &forwarder;
    let metrics_handle = &metrics_handle;

    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| async move {
        handle_event(forwarder, metrics_handle, event).await
    }))
    .await
}

async fn handle_event(
    forwarder: &AlarmForwarder<SlackClient>,
    metrics_handle: &LoggingRecorderHandle,
    event: LambdaEvent<Value>,
) -> Result<ForwardOutcome, Error> {
    let (payload, context) = event.into_parts();
    info!(request_id = %context.request_id, "Received SNS event");

    let outcome = forwarder.handle_value(payload).await;
    metrics_handle.flush();
    Ok(outcome)
}
