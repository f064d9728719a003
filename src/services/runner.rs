//! Poll-based MQTT bridge runner.
//!
//! Works with any implementation of the `MqttClient` trait, which keeps the
//! topic handling testable with [`MockMqtt`](crate::hal::MockMqtt).
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use mqtt_bed::config::MqttConfig;
//! use mqtt_bed::hal::{MockClock, MockGatt, MockMqtt};
//! use mqtt_bed::services::BridgeRunner;
//! use mqtt_bed::{BedModel, ConnectionEngine, TimingConfig};
//!
//! let engine = Arc::new(ConnectionEngine::new(
//!     BedModel::Linak.descriptor(),
//!     "7C:EC:79:FF:6D:02".parse().unwrap(),
//!     MockGatt::new(),
//!     MockClock::new(),
//!     TimingConfig::default(),
//! ));
//!
//! let mut mqtt = MockMqtt::new();
//! mqtt.queue_message("bed", "Light");
//!
//! let mut runner = BridgeRunner::new(engine, mqtt, MqttConfig::default());
//! runner.subscribe_command_topic().unwrap();
//! assert_eq!(runner.poll().unwrap(), 1);
//! assert_eq!(runner.client().last_payload("bed/state/light"), Some("ON"));
//! ```

use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::MqttConfig;
use crate::engine::{CommandOutcome, ConnectionEngine};
use crate::messages::{decode_command, state_publications};
use crate::traits::{Clock, GattConnector, MqttClient, QoS};

// ============================================================================
// Bridge Runner
// ============================================================================

/// Drains inbound MQTT messages into the connection engine and republishes
/// the resulting state.
///
/// Commands run on the calling thread, one at a time, in receive order.
pub struct BridgeRunner<C, K, M>
where
    C: GattConnector,
    K: Clock,
    M: MqttClient,
{
    engine: Arc<ConnectionEngine<C, K>>,
    client: M,
    config: MqttConfig,
}

impl<C, K, M> BridgeRunner<C, K, M>
where
    C: GattConnector,
    K: Clock,
    M: MqttClient,
{
    /// Create a new runner.
    pub fn new(engine: Arc<ConnectionEngine<C, K>>, client: M, config: MqttConfig) -> Self {
        Self {
            engine,
            client,
            config,
        }
    }

    /// Get a reference to the MQTT client.
    pub fn client(&self) -> &M {
        &self.client
    }

    /// Get a mutable reference to the MQTT client.
    pub fn client_mut(&mut self) -> &mut M {
        &mut self.client
    }

    /// The engine commands are delivered to.
    pub fn engine(&self) -> &Arc<ConnectionEngine<C, K>> {
        &self.engine
    }

    /// Subscribe to the command topic.
    pub fn subscribe_command_topic(&mut self) -> Result<(), M::Error> {
        let qos = self.config.qos();
        self.client.subscribe(&self.config.topic, qos)
    }

    /// Announce presence on the check-in topic (at-least-once).
    pub fn announce_online(&mut self) -> Result<(), M::Error> {
        self.client.publish(
            &self.config.checkin_topic,
            self.config.online_payload.as_bytes(),
            QoS::AtLeastOnce,
            false,
        )
    }

    /// Publish the periodic check-in payload (at-least-once).
    pub fn check_in(&mut self) -> Result<(), M::Error> {
        self.client.publish(
            &self.config.checkin_topic,
            self.config.checkin_payload.as_bytes(),
            QoS::AtLeastOnce,
            false,
        )
    }

    /// Process every pending message.
    ///
    /// Returns how many commands were handed to the engine. Messages on
    /// other topics and undecodable payloads are skipped.
    pub fn poll(&mut self) -> Result<usize, M::Error> {
        let mut handled = 0;

        while let Some(msg) = self.client.try_recv() {
            if msg.topic != self.config.topic {
                debug!(topic = %msg.topic, "ignoring message on foreign topic");
                continue;
            }
            let Some(command) = decode_command(&msg.payload) else {
                warn!(topic = %msg.topic, "ignoring empty or non-UTF-8 payload");
                continue;
            };

            let outcome = self.engine.send_command(command);
            handled += 1;
            self.publish_outcome(&outcome)?;
        }

        Ok(handled)
    }

    fn publish_outcome(&mut self, outcome: &CommandOutcome) -> Result<(), M::Error> {
        let Some(delta) = outcome.delta() else {
            return Ok(());
        };

        let state = self.engine.state();
        let qos = self.config.qos();
        for publication in state_publications(&self.config, delta, state.as_ref()) {
            self.client.publish(
                &publication.topic,
                publication.payload.as_bytes(),
                qos,
                publication.retain,
            )?;
        }
        Ok(())
    }
}
