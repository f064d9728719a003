//! Integration tests for the MQTT bridge runner
//!
//! Drives `BridgeRunner` end to end over `MockMqtt` and `MockGatt`.

use std::sync::Arc;

use mqtt_bed::config::MqttConfig;
use mqtt_bed::hal::{MockClock, MockGatt, MockMqtt};
use mqtt_bed::services::BridgeRunner;
use mqtt_bed::{BedModel, ConnectionEngine, QoS, TimingConfig};
use serde_json::Value;

type Runner = BridgeRunner<MockGatt, MockClock, MockMqtt>;

fn bridge(model: BedModel, config: MqttConfig) -> (Runner, MockGatt) {
    let clock = MockClock::new();
    let gatt = MockGatt::new().with_clock(clock.clone());
    let engine = Arc::new(ConnectionEngine::new(
        model.descriptor(),
        "7C:EC:79:FF:6D:02".parse().unwrap(),
        gatt.clone(),
        clock,
        TimingConfig::default(),
    ));
    let mut runner = BridgeRunner::new(engine, MockMqtt::new(), config);
    runner.subscribe_command_topic().unwrap();
    (runner, gatt)
}

fn snapshot(runner: &Runner, topic: &str) -> Value {
    let payload = runner.client().last_payload(topic).expect("snapshot published");
    serde_json::from_str(payload).unwrap()
}

// ============================================================================
// Command topic
// ============================================================================

#[test]
fn first_command_connects_lazily() {
    let (mut runner, gatt) = bridge(BedModel::DewertOkin, MqttConfig::default());
    assert_eq!(gatt.connect_attempts(), 0);

    runner.client_mut().queue_message("bed", "Flat Preset");
    assert_eq!(runner.poll().unwrap(), 1);

    assert_eq!(gatt.connect_attempts(), 1);
    assert_eq!(gatt.successful_writes().len(), 1);
    assert!(runner.engine().is_connected());
}

#[test]
fn commands_are_written_in_receive_order() {
    let (mut runner, gatt) = bridge(BedModel::Jiecang, MqttConfig::default());
    let table = BedModel::Jiecang.descriptor().command_table();
    let names: Vec<_> = table.names().collect();

    for name in &names {
        runner.client_mut().queue_message("bed", *name);
    }
    assert_eq!(runner.poll().unwrap(), names.len());

    let written: Vec<_> = gatt.writes().into_iter().map(|w| w.payload).collect();
    let expected: Vec<_> = names
        .iter()
        .map(|name| table.lookup(name).unwrap().to_vec())
        .collect();
    assert_eq!(written, expected);
}

#[test]
fn custom_topic_is_honoured() {
    let config = MqttConfig::default().with_topic("guest/bed");
    let (mut runner, gatt) = bridge(BedModel::Linak, config);
    assert!(runner.client().is_subscribed("guest/bed"));

    runner.client_mut().queue_message("bed", "Light");
    runner.client_mut().queue_message("guest/bed", "Light");
    assert_eq!(runner.poll().unwrap(), 1);

    assert_eq!(gatt.write_count(), 1);
    assert_eq!(runner.client().last_payload("guest/bed/state/light"), Some("ON"));
    assert!(runner.client().published_to("bed/state/light").is_empty());
}

#[test]
fn snake_case_command_is_accepted() {
    let (mut runner, gatt) = bridge(BedModel::Serta, MqttConfig::default());
    runner.client_mut().queue_message("bed", "flat_preset\n");
    runner.poll().unwrap();

    assert_eq!(
        gatt.successful_writes()[0].payload,
        vec![0xE5, 0xFE, 0x16, 0x00, 0x00, 0x00, 0x08, 0xFE]
    );
}

// ============================================================================
// Failure handling
// ============================================================================

#[test]
fn dropped_command_publishes_nothing_and_bridge_keeps_going() {
    let (mut runner, gatt) = bridge(BedModel::Linak, MqttConfig::default());
    runner.client_mut().queue_message("bed", "Light");
    runner.poll().unwrap();
    runner.client_mut().published.clear();

    gatt.fail_next_writes(2);
    runner.client_mut().queue_message("bed", "Head Up");
    runner.client_mut().queue_message("bed", "Head Up");
    assert_eq!(runner.poll().unwrap(), 2);

    // First dropped after its retry, second delivered on the repaired link
    assert_eq!(runner.client().published_to("bed/state/head").len(), 1);
    let state = snapshot(&runner, "bed/state");
    assert_eq!(state["head"], 1);
    assert_eq!(state["light"], "ON");
}

#[test]
fn unreachable_bed_does_not_stall_other_topics() {
    let (mut runner, gatt) = bridge(BedModel::Serta, MqttConfig::default());
    runner.client_mut().queue_message("bed", "No Such Command");
    runner.client_mut().queue_message("elsewhere", "Flat Preset");
    assert_eq!(runner.poll().unwrap(), 1);
    assert_eq!(gatt.connect_attempts(), 0);
}

// ============================================================================
// State republishing
// ============================================================================

#[test]
fn snapshot_tracks_presses() {
    let (mut runner, _) = bridge(BedModel::Linak, MqttConfig::default());
    for _ in 0..30 {
        runner.client_mut().queue_message("bed", "Feet Up");
    }
    runner.client_mut().queue_message("bed", "Light");
    runner.poll().unwrap();

    let state = snapshot(&runner, "bed/state");
    assert_eq!(state["head"], 0);
    assert_eq!(state["foot"], 50);
    assert_eq!(state["light"], "ON");

    let foot = runner.client().published_to("bed/state/foot");
    assert_eq!(foot.len(), 30);
    assert!(foot.iter().all(|(_, _, qos, retain)| *qos == QoS::AtMostOnce && *retain));
}

#[test]
fn full_travel_stops_republishing() {
    let (mut runner, gatt) = bridge(BedModel::Linak, MqttConfig::default());
    for _ in 0..90 {
        runner.client_mut().queue_message("bed", "Head Up");
    }
    runner.poll().unwrap();

    // Every press is still sent to the bed
    assert_eq!(gatt.successful_writes().len(), 90);
    let head = runner.client().published_to("bed/state/head");
    assert_eq!(head.len(), 85);
    assert_eq!(runner.client().last_payload("bed/state/head"), Some("100"));
    assert_eq!(snapshot(&runner, "bed/state")["head"], 100);
}

#[test]
fn configured_qos_applies_to_state_topics() {
    let config = MqttConfig::default().with_qos(1);
    let (mut runner, _) = bridge(BedModel::Linak, config);
    runner.client_mut().queue_message("bed", "Both Up");
    runner.poll().unwrap();

    assert!(runner
        .client()
        .published
        .iter()
        .all(|(_, _, qos, _)| *qos == QoS::AtLeastOnce));
    assert_eq!(runner.client().subscriptions[0].1, QoS::AtLeastOnce);
}

#[test]
fn models_without_profile_never_publish_state() {
    for model in [
        BedModel::Serta,
        BedModel::Jiecang,
        BedModel::DewertOkin,
        BedModel::DewertOkinOld,
    ] {
        let (mut runner, gatt) = bridge(model, MqttConfig::default());
        for name in model.descriptor().command_table().names() {
            runner.client_mut().queue_message("bed", name);
        }
        runner.poll().unwrap();

        assert_eq!(gatt.successful_writes().len(), model.descriptor().commands.len());
        assert!(runner.client().published.is_empty(), "{model:?}");
        assert!(runner.engine().state().is_none());
    }
}
