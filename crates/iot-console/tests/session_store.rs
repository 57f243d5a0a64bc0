use std::sync::Arc;

use iot_console::simulation::{InstantSleeper, SimulationConfig};
use iot_console::store::{SessionSnapshot, SessionStore};
use iot_console::{
    ConsoleError, ConsoleSession, Orchestrator, ResponseSimulator, SchemaRegistry, SubmitState,
};
use serde_json::json;

fn unique_temp_dir(prefix: &str) -> std::path::PathBuf {
    let stamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("unix epoch")
        .as_nanos();
    std::env::temp_dir().join(format!(
        "iot-console-{prefix}-{}-{stamp}",
        std::process::id()
    ))
}

fn session(capacity: usize) -> ConsoleSession {
    let registry = Arc::new(SchemaRegistry::builtin().expect("catalog"));
    let simulator = ResponseSimulator::new(SimulationConfig::default())
        .with_random(Arc::new(|| 0.0))
        .with_sleeper(Arc::new(InstantSleeper::new()));
    ConsoleSession::new(registry, Orchestrator::new(simulator, capacity))
}

#[test]
fn selecting_a_schema_seeds_defaults_and_reset_restores_them() {
    let mut session = session(10);
    assert_eq!(
        session.set_field("mode", json!("Performance")),
        Err(ConsoleError::NoSchemaSelected)
    );

    session.select_schema("power").expect("select power");
    assert_eq!(session.values().get("mode"), Some(&json!("Balanced")));

    session
        .set_field_text("mode", "performance")
        .expect("set mode");
    session
        .set_field_text("sleepInterval", "15")
        .expect("set interval");
    assert_eq!(session.values().get("mode"), Some(&json!("Performance")));
    assert_eq!(session.values().get("sleepInterval"), Some(&json!(15)));
    assert!(matches!(
        session.set_field("voltage", json!(3)),
        Err(ConsoleError::UnknownField { .. })
    ));

    session.reset().expect("reset");
    assert_eq!(session.values().get("mode"), Some(&json!("Balanced")));
    assert!(matches!(
        session.select_schema("firmware"),
        Err(ConsoleError::UnknownSchema(_))
    ));
}

#[test]
fn store_round_trips_the_session_snapshot() {
    let root = unique_temp_dir("store-roundtrip");
    let store = SessionStore::new(root.join("nested").join("state.json"));
    assert_eq!(store.load().expect("missing file"), SessionSnapshot::default());

    let mut original = session(10);
    original.select_schema("communication").expect("select");
    original.set_field_text("port", "8883").expect("set port");
    store.save(&original.snapshot()).expect("save");

    let text = std::fs::read_to_string(store.path()).expect("read state");
    let stored: serde_json::Value = serde_json::from_str(&text).expect("json");
    assert_eq!(stored["selected-message-type"], json!("communication"));
    assert_eq!(stored["iot-config-data"]["port"], json!(8883));

    let mut restored = session(10);
    restored.restore(store.load().expect("load"));
    assert_eq!(
        restored.selected_schema().map(|schema| schema.id.as_str()),
        Some("communication")
    );
    assert_eq!(restored.values(), original.values());
    let _ = std::fs::remove_dir_all(root);
}

#[tokio::test(flavor = "current_thread")]
async fn restore_keeps_stale_values_and_ignores_unknown_schemas() {
    let mut session = session(10);
    session.restore(SessionSnapshot {
        selected_message_type: Some("sensor-config".into()),
        values: [
            ("sensorId", json!("TEMP_09")),
            ("threshold", json!(30)),
            ("unit", json!("Celsius")),
            ("legacyFlag", json!(true)),
        ]
        .into_iter()
        .collect(),
    });
    assert_eq!(session.values().get("legacyFlag"), Some(&json!(true)));

    let submission = session.submit().await.expect("submit");
    assert_eq!(submission.state(), SubmitState::SettledSuccess);

    session.restore(SessionSnapshot {
        selected_message_type: Some("retired-type".into()),
        values: [("x", json!(1))].into_iter().collect(),
    });
    assert_eq!(
        session.selected_schema().map(|schema| schema.id.as_str()),
        Some("sensor-config")
    );
    assert!(session.values().get("x").is_none());
}

#[tokio::test(flavor = "current_thread")]
async fn ledger_keeps_only_the_newest_entries() {
    let mut session = session(3);
    session.select_schema("power").expect("select");
    for _ in 0..5 {
        session.submit().await.expect("submit");
    }
    let feedback = session.feedback();
    assert_eq!(feedback.len(), 3);
    let ids = feedback
        .iter()
        .map(|entry| entry.id.rsplit('-').next().unwrap_or_default().to_string())
        .collect::<Vec<_>>();
    assert_eq!(ids, vec!["4", "3", "2"]);

    session.clear_feedback();
    assert!(session.feedback().is_empty());
    assert_eq!(session.metrics().success, 5);
}
