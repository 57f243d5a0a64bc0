use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use iot_console::clock::FixedClock;
use iot_console::feedback::{CHANNEL_FAILURE_DETAILS, CHANNEL_FAILURE_MESSAGE};
use iot_console::simulation::{InstantSleeper, SimulationConfig};
use iot_console::{
    ChannelError, DeviceChannel, FieldSpec, MessageSchema, OutcomeKind, Orchestrator,
    ResponseSimulator, SimulationOutcome, Submission, SubmissionEvent, SubmissionPayload,
    SubmitState, ValueMap,
};
use serde_json::json;

fn sensor_schema() -> MessageSchema {
    MessageSchema::new(
        "sensor-config",
        "Sensor Configuration",
        "Configure sensor parameters",
        vec![
            FieldSpec::text("sensorId", "Sensor ID").required(),
            FieldSpec::number("threshold", "Threshold").with_default(25),
        ],
    )
}

fn instant_simulator(r: f64) -> ResponseSimulator {
    ResponseSimulator::new(SimulationConfig::default())
        .with_random(Arc::new(move || r))
        .with_sleeper(Arc::new(InstantSleeper::new()))
}

struct Unreachable;

impl DeviceChannel for Unreachable {
    async fn dispatch(
        &self,
        _payload: &SubmissionPayload,
    ) -> Result<SimulationOutcome, ChannelError> {
        Err(ChannelError::Unreachable)
    }
}

struct Silent;

impl DeviceChannel for Silent {
    async fn dispatch(
        &self,
        _payload: &SubmissionPayload,
    ) -> Result<SimulationOutcome, ChannelError> {
        std::future::pending().await
    }
}

/// Answers with the submitted sensor id after the number of milliseconds in
/// `threshold`.
struct Echo;

impl DeviceChannel for Echo {
    async fn dispatch(
        &self,
        payload: &SubmissionPayload,
    ) -> Result<SimulationOutcome, ChannelError> {
        let delay = payload
            .data
            .get("threshold")
            .and_then(serde_json::Value::as_u64)
            .unwrap_or_default();
        tokio::time::sleep(Duration::from_millis(delay)).await;
        let message = payload
            .data
            .get("sensorId")
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default();
        Ok(SimulationOutcome {
            kind: OutcomeKind::Success,
            message: message.into(),
            details: None,
        })
    }
}

#[tokio::test(flavor = "current_thread")]
async fn missing_required_value_is_rejected_without_ledger_entry() {
    let orchestrator = Orchestrator::new(instant_simulator(0.0), 10);
    let schema = sensor_schema();

    let submission = orchestrator.submit(&schema, &ValueMap::new()).await;

    assert_eq!(submission.state(), SubmitState::Invalid);
    let validation = submission.validation().expect("validation result");
    assert!(!validation.is_valid);
    assert_eq!(validation.missing_field_labels, vec!["Sensor ID"]);
    assert!(orchestrator.feedback().is_empty());
    assert_eq!(orchestrator.metrics().invalid, 1);
}

#[tokio::test(flavor = "current_thread")]
async fn valid_submission_records_selected_outcome_first() {
    let clock = Arc::new(FixedClock::new(1_700_000_000_000));
    let orchestrator = Orchestrator::new(instant_simulator(0.0), 10).with_clock(clock);
    let schema = sensor_schema();
    let values = [("sensorId", json!("TEMP_07"))].into_iter().collect::<ValueMap>();

    let submission = orchestrator.submit(&schema, &values).await;

    assert_eq!(submission.state(), SubmitState::SettledSuccess);
    let feedback = orchestrator.feedback();
    assert_eq!(feedback.len(), 1);
    let entry = &feedback[0];
    assert_eq!(entry.kind, OutcomeKind::Success);
    assert_eq!(entry.message, "Configuration applied successfully");
    assert_eq!(entry.schema_id.as_deref(), Some("sensor-config"));
    assert_eq!(entry.schema_name.as_deref(), Some("Sensor Configuration"));
    assert_eq!(entry.timestamp_ms, 1_700_000_000_000);
    assert_eq!(submission.entry(), Some(entry));
}

#[tokio::test(flavor = "current_thread")]
async fn device_error_and_info_outcomes_settle_accordingly() {
    let schema = sensor_schema();
    let values = [("sensorId", json!("TEMP_07"))].into_iter().collect::<ValueMap>();

    let orchestrator = Orchestrator::new(instant_simulator(0.65), 10);
    let submission = orchestrator.submit(&schema, &values).await;
    assert_eq!(submission.state(), SubmitState::SettledDeviceError);
    assert_eq!(
        submission.entry().map(|entry| entry.message.as_str()),
        Some("Failed to apply configuration")
    );

    let orchestrator = Orchestrator::new(instant_simulator(0.85), 10);
    let submission = orchestrator.submit(&schema, &values).await;
    assert_eq!(submission.state(), SubmitState::SettledSuccess);
    assert_eq!(submission.entry().map(|entry| entry.kind), Some(OutcomeKind::Info));
}

#[tokio::test(flavor = "current_thread")]
async fn channel_failure_becomes_synthetic_error_entry() {
    let orchestrator = Orchestrator::new(Unreachable, 10);
    let schema = sensor_schema();
    let values = [("sensorId", json!("TEMP_07"))].into_iter().collect::<ValueMap>();

    let submission = orchestrator.submit(&schema, &values).await;

    assert_eq!(submission.state(), SubmitState::SettledChannelFailure);
    let entry = submission.entry().expect("entry");
    assert_eq!(entry.kind, OutcomeKind::Error);
    assert_eq!(entry.message, CHANNEL_FAILURE_MESSAGE);
    assert_eq!(entry.details.as_deref(), Some(CHANNEL_FAILURE_DETAILS));
    assert_eq!(orchestrator.feedback().len(), 1);
    assert_eq!(orchestrator.metrics().channel_failure, 1);
}

#[tokio::test(flavor = "current_thread")]
async fn silent_channel_times_out_as_channel_failure() {
    let orchestrator =
        Orchestrator::new(Silent, 10).with_timeout(Some(Duration::from_millis(20)));
    let schema = sensor_schema();
    let values = [("sensorId", json!("TEMP_07"))].into_iter().collect::<ValueMap>();

    let submission = orchestrator.submit(&schema, &values).await;

    assert_eq!(submission.state(), SubmitState::SettledChannelFailure);
    assert_eq!(orchestrator.feedback()[0].message, CHANNEL_FAILURE_MESSAGE);
}

#[tokio::test(flavor = "current_thread")]
async fn overlapping_submissions_append_in_completion_order() {
    let orchestrator = Orchestrator::new(Echo, 10);
    let schema = sensor_schema();
    let slow = [("sensorId", json!("slow")), ("threshold", json!(40))]
        .into_iter()
        .collect::<ValueMap>();
    let fast = [("sensorId", json!("fast")), ("threshold", json!(1))]
        .into_iter()
        .collect::<ValueMap>();

    let (first, second) = tokio::join!(
        orchestrator.submit(&schema, &slow),
        orchestrator.submit(&schema, &fast)
    );

    assert!(first.state().is_terminal());
    assert!(second.state().is_terminal());
    let messages = orchestrator
        .feedback()
        .iter()
        .map(|entry| entry.message.to_string())
        .collect::<Vec<_>>();
    assert_eq!(messages, vec!["slow", "fast"]);
}

#[tokio::test(flavor = "current_thread")]
async fn lifecycle_events_are_broadcast_in_order() {
    let orchestrator = Orchestrator::new(instant_simulator(0.0), 10);
    let mut events = orchestrator.subscribe();
    let schema = sensor_schema();

    orchestrator.submit(&schema, &ValueMap::new()).await;
    let values = [("sensorId", json!("TEMP_07"))].into_iter().collect::<ValueMap>();
    orchestrator.submit(&schema, &values).await;

    assert_eq!(
        events.try_recv().expect("validation event"),
        SubmissionEvent::ValidationFailed {
            schema_id: "sensor-config".into(),
            missing_field_labels: vec!["Sensor ID".into()],
        }
    );
    assert_eq!(
        events.try_recv().expect("dispatch event"),
        SubmissionEvent::DispatchStarted {
            schema_id: "sensor-config".into(),
        }
    );
    match events.try_recv().expect("settled event") {
        SubmissionEvent::Settled { state, entry } => {
            assert_eq!(state, SubmitState::SettledSuccess);
            assert_eq!(entry.message, "Configuration applied successfully");
        }
        other => panic!("unexpected event {other:?}"),
    }
    assert!(events.try_recv().is_err());
}

#[test]
fn lifecycle_events_serialize_with_camel_case_fields() {
    let rejected = SubmissionEvent::ValidationFailed {
        schema_id: "power".into(),
        missing_field_labels: vec!["Power Mode".into()],
    };
    assert_eq!(
        serde_json::to_value(&rejected).expect("event json"),
        json!({
            "kind": "validation-failed",
            "schemaId": "power",
            "missingFieldLabels": ["Power Mode"],
        })
    );
    let started = SubmissionEvent::DispatchStarted {
        schema_id: "power".into(),
    };
    assert_eq!(
        serde_json::to_value(&started).expect("event json"),
        json!({"kind": "dispatch-started", "schemaId": "power"})
    );
}

#[tokio::test(flavor = "current_thread")]
async fn every_submission_reaches_a_terminal_state() {
    let draws = Arc::new(AtomicUsize::new(0));
    let simulator = ResponseSimulator::new(SimulationConfig {
        channel_failure_rate: 0.2,
        ..SimulationConfig::default()
    })
    .with_random(Arc::new({
        let draws = Arc::clone(&draws);
        move || {
            #[allow(clippy::cast_precision_loss)]
            let step = (draws.fetch_add(1, Ordering::SeqCst) % 17) as f64;
            step / 17.0
        }
    }))
    .with_sleeper(Arc::new(InstantSleeper::new()));
    let orchestrator = Orchestrator::new(simulator, 5);
    let schema = sensor_schema();
    let valid = [("sensorId", json!("TEMP_07"))].into_iter().collect::<ValueMap>();
    let invalid = [("threshold", json!("warm"))].into_iter().collect::<ValueMap>();

    let mut states = Vec::new();
    for round in 0..40 {
        let values = if round % 4 == 0 { &invalid } else { &valid };
        let submission = orchestrator.submit(&schema, values).await;
        assert!(submission.state().is_terminal());
        assert_eq!(submission.entry().is_some(), matches!(submission, Submission::Settled { .. }));
        states.push(submission.state());
    }

    let metrics = orchestrator.metrics();
    assert_eq!(metrics.submissions, 40);
    assert_eq!(metrics.settled(), 40);
    assert_eq!(metrics.invalid, 10);
    assert!(states.contains(&SubmitState::SettledChannelFailure));
    assert_eq!(orchestrator.feedback().len(), 5);
}
