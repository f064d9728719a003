//! Async MQTT bridge built on `rumqttc`.
//!
//! **Subscribe Topics:**
//! - `bed` - Command name as plain text, e.g. `Flat Preset`
//!
//! **Publish Topics:**
//! - `checkIn/bed` - `online` on every broker (re)connect, then `OK` every
//!   check-in interval
//! - `bed/state/<field>` - Changed derived-state fields (retained)
//! - `bed/state` - Derived-state snapshot JSON
//!
//! # Task layout
//!
//! The rumqttc event loop runs on the calling task and only forwards
//! command names into a channel. A dispatcher task feeds them one by one to
//! the blocking engine through `spawn_blocking`, so a slow BLE reconnect
//! never stalls broker keep-alives and commands are delivered in receive
//! order. A third task publishes the periodic check-in.
//!
//! # Example
//!
//! ```ignore
//! let engine = Arc::new(ConnectionEngine::new(descriptor, address, PretendGatt::new(), SystemClock::new(), timing));
//! MqttBridge::new(engine, config.mqtt).run().await;
//! ```

use std::sync::Arc;
use std::time::Duration;

use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS as MqttQoS};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, error, info, warn};

use crate::config::MqttConfig;
use crate::engine::ConnectionEngine;
use crate::messages::{decode_command, state_publications};
use crate::traits::{Clock, GattConnector, QoS};

/// Commands waiting for the dispatcher before new ones are dropped.
const COMMAND_QUEUE: usize = 32;

/// Capacity of the rumqttc request channel.
const REQUEST_QUEUE: usize = 32;

// ============================================================================
// Configuration
// ============================================================================

/// Map a QoS onto the `rumqttc` type.
pub fn to_rumqttc_qos(qos: QoS) -> MqttQoS {
    match qos {
        QoS::AtMostOnce => MqttQoS::AtMostOnce,
        QoS::AtLeastOnce => MqttQoS::AtLeastOnce,
        QoS::ExactlyOnce => MqttQoS::ExactlyOnce,
    }
}

/// Build `rumqttc` connection options from the bridge config.
pub fn mqtt_options(config: &MqttConfig) -> MqttOptions {
    let mut options = MqttOptions::new(&config.client_id, &config.host, config.port);
    options.set_keep_alive(Duration::from_secs(config.keep_alive_secs.max(1)));
    if config.has_auth() {
        options.set_credentials(&config.username, &config.password);
    }
    options
}

/// Check-in schedule: the first tick completes immediately, then one per
/// check-in interval (at least a second).
pub fn checkin_interval(config: &MqttConfig) -> tokio::time::Interval {
    tokio::time::interval(Duration::from_secs(config.checkin_interval_secs.max(1)))
}

// ============================================================================
// MQTT Bridge
// ============================================================================

/// Bridges the command topic to a [`ConnectionEngine`].
pub struct MqttBridge<C, K>
where
    C: GattConnector + 'static,
    K: Clock + 'static,
{
    engine: Arc<ConnectionEngine<C, K>>,
    config: MqttConfig,
}

impl<C, K> MqttBridge<C, K>
where
    C: GattConnector + 'static,
    K: Clock + 'static,
{
    /// Create a bridge for `engine`.
    pub fn new(engine: Arc<ConnectionEngine<C, K>>, config: MqttConfig) -> Self {
        Self { engine, config }
    }

    /// Broker settings in use.
    pub fn config(&self) -> &MqttConfig {
        &self.config
    }

    /// Run the bridge.
    ///
    /// Never returns on its own; broker errors are logged and the connection
    /// is retried after the reconnect interval. Drop the future to stop.
    pub async fn run(self) {
        let (client, mut eventloop) = AsyncClient::new(mqtt_options(&self.config), REQUEST_QUEUE);
        let qos = to_rumqttc_qos(self.config.qos());

        info!(
            host = %self.config.host,
            port = self.config.port,
            topic = %self.config.topic,
            "starting MQTT bridge"
        );

        // Dispatcher: one blocking engine call at a time, in receive order
        let (tx, mut rx) = mpsc::channel::<String>(COMMAND_QUEUE);
        let engine = Arc::clone(&self.engine);
        let dispatch_client = client.clone();
        let dispatch_config = self.config.clone();
        let dispatcher = tokio::spawn(async move {
            while let Some(command) = rx.recv().await {
                let worker = Arc::clone(&engine);
                let result = tokio::task::spawn_blocking(move || {
                    let outcome = worker.send_command(&command);
                    (outcome, worker.state())
                })
                .await;

                let (outcome, state) = match result {
                    Ok(done) => done,
                    Err(e) => {
                        error!(error = %e, "command task failed");
                        continue;
                    }
                };
                let Some(delta) = outcome.delta() else {
                    continue;
                };

                for publication in state_publications(&dispatch_config, delta, state.as_ref()) {
                    if let Err(e) = dispatch_client
                        .publish(
                            publication.topic.as_str(),
                            qos,
                            publication.retain,
                            publication.payload.into_bytes(),
                        )
                        .await
                    {
                        warn!(topic = %publication.topic, error = %e, "state publish failed");
                    }
                }
            }
        });

        // Check-in heartbeat, first one right away
        let checkin_client = client.clone();
        let checkin_topic = self.config.checkin_topic.clone();
        let checkin_payload = self.config.checkin_payload.clone();
        let mut interval = checkin_interval(&self.config);
        let checkin = tokio::spawn(async move {
            loop {
                interval.tick().await;
                if let Err(e) = checkin_client
                    .publish(
                        checkin_topic.as_str(),
                        MqttQoS::AtLeastOnce,
                        false,
                        checkin_payload.as_bytes().to_vec(),
                    )
                    .await
                {
                    warn!(error = %e, "check-in publish failed");
                }
            }
        });

        let _tasks = AbortOnDrop([dispatcher, checkin]);
        let reconnect_every = Duration::from_secs(self.config.reconnect_interval_secs);

        // Main event loop
        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    info!(host = %self.config.host, "connected to broker");
                    if let Err(e) = client.try_subscribe(self.config.topic.as_str(), qos) {
                        error!(error = %e, "subscribe failed");
                    }
                    if let Err(e) = client.try_publish(
                        self.config.checkin_topic.as_str(),
                        MqttQoS::AtLeastOnce,
                        false,
                        self.config.online_payload.as_bytes().to_vec(),
                    ) {
                        warn!(error = %e, "online publish failed");
                    }
                }
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    self.forward(&publish.topic, &publish.payload, &tx);
                }
                Ok(_) => {}
                Err(e) => {
                    error!(
                        error = %e,
                        "MQTT connection error, retrying in {}s",
                        reconnect_every.as_secs()
                    );
                    tokio::time::sleep(reconnect_every).await;
                }
            }
        }
    }

    fn forward(&self, topic: &str, payload: &[u8], tx: &mpsc::Sender<String>) {
        if topic != self.config.topic {
            debug!(topic, "ignoring message on foreign topic");
            return;
        }
        let Some(command) = decode_command(payload) else {
            warn!(topic, "ignoring empty or non-UTF-8 payload");
            return;
        };

        debug!(command, "received");
        match tx.try_send(command.to_string()) {
            Ok(()) => {}
            Err(TrySendError::Full(command)) => {
                error!(command = %command, "command dropped: queue full")
            }
            Err(TrySendError::Closed(_)) => error!("command dispatcher stopped"),
        }
    }
}

/// Aborts the helper tasks when the bridge future is dropped.
struct AbortOnDrop<const N: usize>([tokio::task::JoinHandle<()>; N]);

impl<const N: usize> Drop for AbortOnDrop<N> {
    fn drop(&mut self) {
        for task in &self.0 {
            task.abort();
        }
    }
}
