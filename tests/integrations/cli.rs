#[path = "../helpers/mod.rs"]
mod helpers;

use anyhow::Result;
use assert_cmd::prelude::*;
use helpers::fixtures::alarm_event;
use predicates::prelude::*;
use serde_json::Value;
use std::io::Write;
use std::process::Command;
use tempfile::NamedTempFile;

fn dlqwatch_bin() -> Result<Command> {
    Ok(Command::cargo_bin("dlqwatch")?)
}

#[test]
fn test_synth_prints_template() -> Result<()> {
    let output = dlqwatch_bin()?
        .args(["synth", "--queue-name", "orders", "--compact"])
        .output()?;
    assert!(output.status.success());

    let template: Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(template["AWSTemplateFormatVersion"], "2010-09-09");
    assert_eq!(template["Resources"]["Queue"]["Properties"]["QueueName"], "orders");
    assert_eq!(
        template["Resources"]["DeadLetterQueue"]["Properties"]["QueueName"],
        "orders-dlq"
    );
    Ok(())
}

#[test]
fn test_synth_writes_template_file() -> Result<()> {
    let mut config = NamedTempFile::new()?;
    writeln!(
        config,
        r##"
        [queue]
        queue_name = "payments"

        [[providers]]
        type = "email"
        emails = ["oncall@example.com"]
        "##
    )?;
    let output = NamedTempFile::new()?;

    dlqwatch_bin()?
        .arg("--config")
        .arg(config.path())
        .arg("synth")
        .arg("--output")
        .arg(output.path())
        .assert()
        .success();

    let template: Value = serde_json::from_str(&std::fs::read_to_string(output.path())?)?;
    assert_eq!(
        template["Resources"]["DlqAlarm"]["Properties"]["AlarmName"],
        "payments-dlq-alarm"
    );
    assert_eq!(
        template["Resources"]["Provider0EmailSubscription0"]["Properties"]["Endpoint"],
        "oncall@example.com"
    );
    Ok(())
}

#[test]
fn test_synth_rejects_invalid_queue_name() -> Result<()> {
    dlqwatch_bin()?
        .args(["synth", "--queue-name", "orders queue"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid queue name 'orders queue'"));
    Ok(())
}

#[test]
fn test_synth_reports_missing_config_file() -> Result<()> {
    dlqwatch_bin()?
        .args(["--config", "/tmp/dlqwatch/does/not/exist.toml", "synth"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("configuration file not found"));
    Ok(())
}

#[test]
fn test_preview_formats_recorded_event() -> Result<()> {
    let mut event = NamedTempFile::new()?;
    write!(event, "{}", alarm_event("ALARM", "OK"))?;

    dlqwatch_bin()?
        .arg("preview")
        .arg(event.path())
        .args(["--format", "card", "--channel", "#payments"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"channel\": \"#payments\""))
        .stdout(predicate::str::contains("orders-dlq-alarm has been triggered!"))
        .stdout(predicate::str::contains("#ff0000"));
    Ok(())
}
