//! Integration tests for forwarding alarm notifications to a Slack API
//! stand-in.

#[path = "../helpers/mod.rs"]
mod helpers;

use dlqwatch::core::AlarmState;
use dlqwatch::formatting::MessageFormat;
use dlqwatch::notification::{FailureKind, ForwardOutcome};
use helpers::fixtures::{alarm_event, sns_event, ALARM_NAME, STATE_CHANGE_TIME};
use helpers::mock_slack::{
    forwarder_for, start_accepting_server, BOT_TOKEN, CHANNEL, POST_MESSAGE_PATH,
};
use serde_json::{json, Value};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_alarm_is_posted_exactly_once_as_text() {
    // Arrange
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(POST_MESSAGE_PATH))
        .and(header("authorization", format!("Bearer {}", BOT_TOKEN).as_str()))
        .and(body_json(json!({
            "channel": CHANNEL,
            "text": format!("{} state is now ALARM at {}", ALARM_NAME, STATE_CHANGE_TIME),
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .expect(1)
        .mount(&server)
        .await;

    // Act
    let outcome = forwarder_for(&server, MessageFormat::Text)
        .handle_value(alarm_event("ALARM", "OK"))
        .await;

    // Assert
    assert_eq!(
        outcome,
        ForwardOutcome::Delivered {
            alarm_name: ALARM_NAME.to_string(),
            new_state: AlarmState::Alarm,
        }
    );
    server.verify().await;
}

#[tokio::test]
async fn test_card_format_carries_transition_and_reason() {
    let server = start_accepting_server().await;

    let outcome = forwarder_for(&server, MessageFormat::Card)
        .handle_value(alarm_event("OK", "ALARM"))
        .await;
    assert!(outcome.is_delivered());

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    let attachment = &body["attachments"][0];
    assert_eq!(attachment["title"], format!("{} has been triggered!", ALARM_NAME));
    assert_eq!(attachment["color"], "#36a64f");
    assert!(attachment["text"]
        .as_str()
        .unwrap()
        .starts_with("State changed: ALARM → OK\n\nReason: Threshold Crossed"));
    assert_eq!(attachment["ts"], 1_704_067_200);
}

#[tokio::test]
async fn test_only_first_record_of_envelope_is_forwarded() {
    // Arrange
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(POST_MESSAGE_PATH))
        .and(body_json(json!({
            "channel": CHANNEL,
            "text": format!("{} state is now ALARM at {}", ALARM_NAME, STATE_CHANGE_TIME),
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .expect(1)
        .mount(&server)
        .await;

    let mut event = alarm_event("ALARM", "OK");
    let resolved = alarm_event("OK", "ALARM")["Records"][0].clone();
    event["Records"].as_array_mut().unwrap().push(resolved);
    assert_eq!(event["Records"].as_array().unwrap().len(), 2);

    // Act
    let outcome = forwarder_for(&server, MessageFormat::Text)
        .handle_value(event)
        .await;

    // Assert
    assert_eq!(
        outcome,
        ForwardOutcome::Delivered {
            alarm_name: ALARM_NAME.to_string(),
            new_state: AlarmState::Alarm,
        }
    );
    server.verify().await;
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_malformed_events_never_reach_slack() {
    let server = start_accepting_server().await;
    let forwarder = forwarder_for(&server, MessageFormat::Text);

    let outcomes = vec![
        forwarder.handle_value(sns_event("not an alarm")).await,
        forwarder
            .handle_value(sns_event(&json!({ "AlarmName": "half" }).to_string()))
            .await,
        forwarder.handle_value(json!({ "Records": [] })).await,
        forwarder.handle_raw("<html>").await,
    ];

    for outcome in outcomes {
        assert!(
            matches!(outcome, ForwardOutcome::Failed { kind: FailureKind::Parse, .. }),
            "unexpected outcome {:?}",
            outcome
        );
    }
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_rejected_message_is_reported_as_delivery_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "ok": false, "error": "not_in_channel" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let outcome = forwarder_for(&server, MessageFormat::Text)
        .handle_value(alarm_event("ALARM", "OK"))
        .await;

    assert_eq!(
        outcome,
        ForwardOutcome::Failed {
            kind: FailureKind::Delivery,
            error: "Slack rejected the message: not_in_channel".to_string(),
        }
    );
}
