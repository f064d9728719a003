//! Mock implementations for testing without hardware.
//!
//! This module provides test doubles for all hardware and network traits,
//! enabling development and testing on desktop without a bed or a broker.
//!
//! # Available Mocks
//!
//! | Mock | Trait | Purpose |
//! |------|-------|---------|
//! | [`MockClock`] | [`Clock`] | Simulated time; sleeping advances it |
//! | [`MockGatt`] | [`GattConnector`] | Scripted failures, records all I/O |
//! | [`MockLink`] | [`GattLink`] | Link produced by [`MockGatt`] |
//! | [`MockMqtt`] | [`MqttClient`] | Captures pub/sub operations |
//!
//! The GATT and clock mocks are handles over shared state: clone one into
//! the engine and keep the other for assertions.
//!
//! # Example
//!
//! ```rust
//! use mqtt_bed::hal::{MockClock, MockGatt};
//! use mqtt_bed::traits::Clock;
//! use mqtt_bed::{BedModel, ConnectionEngine, TimingConfig};
//!
//! let clock = MockClock::new();
//! let gatt = MockGatt::new().with_clock(clock.clone());
//! gatt.fail_next_connects(2);
//!
//! let engine = ConnectionEngine::new(
//!     BedModel::Serta.descriptor(),
//!     "7C:EC:79:FF:6D:02".parse().unwrap(),
//!     gatt.clone(),
//!     clock.clone(),
//!     TimingConfig::default(),
//! );
//! engine.connect().unwrap();
//!
//! // Two failures, each followed by the 1s retry delay
//! assert_eq!(gatt.connect_attempts(), 3);
//! assert_eq!(clock.now_ms(), 2000);
//! ```
//!
//! [`Clock`]: crate::traits::Clock
//! [`GattConnector`]: crate::traits::GattConnector
//! [`GattLink`]: crate::traits::GattLink
//! [`MqttClient`]: crate::traits::MqttClient

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::address::PeripheralAddress;
use crate::error::TransportError;
use crate::traits::{AttributeId, Clock, GattConnector, GattLink, MqttClient, MqttMessage, QoS};

// ============================================================================
// Clock Mock
// ============================================================================

/// Mock clock for testing.
///
/// Time only moves when told to, or when something sleeps on it: a
/// `sleep_ms(n)` returns immediately after advancing the clock by `n`.
/// Clones share the same time.
///
/// # Example
///
/// ```rust
/// use mqtt_bed::hal::MockClock;
/// use mqtt_bed::traits::Clock;
///
/// let clock = MockClock::new();
/// assert_eq!(clock.now_ms(), 0);
///
/// clock.set(1000);
/// assert_eq!(clock.now_ms(), 1000);
///
/// clock.sleep_ms(500);
/// assert_eq!(clock.now_ms(), 1500);
/// assert_eq!(clock.sleep_count(), 1);
/// ```
#[derive(Clone, Debug, Default)]
pub struct MockClock {
    current_ms: Arc<AtomicU64>,
    sleeps: Arc<AtomicU64>,
}

impl MockClock {
    /// Creates a new mock clock starting at 0ms.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the current time in milliseconds.
    pub fn set(&self, ms: u64) {
        self.current_ms.store(ms, Ordering::SeqCst);
    }

    /// Advances the clock by the given duration.
    pub fn advance(&self, ms: u64) {
        self.current_ms.fetch_add(ms, Ordering::SeqCst);
    }

    /// Number of `sleep_ms` calls so far.
    pub fn sleep_count(&self) -> u64 {
        self.sleeps.load(Ordering::SeqCst)
    }
}

impl Clock for MockClock {
    fn now_ms(&self) -> u64 {
        self.current_ms.load(Ordering::SeqCst)
    }

    fn sleep_ms(&self, ms: u64) {
        self.sleeps.fetch_add(1, Ordering::SeqCst);
        self.advance(ms);
        std::thread::yield_now();
    }
}

// ============================================================================
// GATT Mocks
// ============================================================================

/// One recorded write attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WriteRecord {
    /// Target characteristic.
    pub attribute: AttributeId,
    /// Bytes written.
    pub payload: Vec<u8>,
    /// Whether a write response was requested.
    pub with_response: bool,
    /// Which link carried the write (1 for the first connect, and so on).
    pub link_id: u32,
    /// Whether the mock reported success.
    pub ok: bool,
}

#[derive(Debug, Default)]
struct GattState {
    connect_attempts: u32,
    connect_failures: u32,
    connect_delay_ms: u64,
    write_failures: u32,
    read_failures: u32,
    write_hold_ms: u64,
    read_value: Vec<u8>,
    next_link_id: u32,
    links_dropped: u32,
    writes: Vec<WriteRecord>,
    reads: Vec<AttributeId>,
    in_flight: u32,
    max_in_flight: u32,
}

/// Scripted GATT connector for testing.
///
/// Every connect attempt, read and write is recorded. Failures are queued
/// with the `fail_next_*` methods and consumed in order. When a
/// [`MockClock`] is attached, each connect attempt advances it by the
/// configured connect delay, which is how tests simulate slow reconnects.
///
/// # Example
///
/// ```rust
/// use mqtt_bed::hal::MockGatt;
/// use mqtt_bed::traits::{AttributeId, GattConnector, GattLink};
///
/// let gatt = MockGatt::new();
/// gatt.fail_next_writes(1);
///
/// let addr = "7C:EC:79:FF:6D:02".parse().unwrap();
/// let mut link = gatt.connect(&addr).unwrap();
///
/// assert!(link.write(AttributeId::Handle(0x20), &[1], true).is_err());
/// assert!(link.write(AttributeId::Handle(0x20), &[1], true).is_ok());
/// assert_eq!(gatt.write_count(), 2);
/// assert_eq!(gatt.successful_writes().len(), 1);
/// ```
#[derive(Clone, Debug, Default)]
pub struct MockGatt {
    state: Arc<Mutex<GattState>>,
    clock: Option<MockClock>,
}

impl MockGatt {
    /// Creates a connector that always succeeds instantly.
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance `clock` by the connect delay on every connect attempt.
    pub fn with_clock(mut self, clock: MockClock) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Make the next `n` connect attempts fail.
    pub fn fail_next_connects(&self, n: u32) {
        self.state.lock().connect_failures = n;
    }

    /// Simulated duration of each connect attempt.
    pub fn set_connect_delay_ms(&self, ms: u64) {
        self.state.lock().connect_delay_ms = ms;
    }

    /// Make the next `n` writes fail, on whichever link they happen.
    pub fn fail_next_writes(&self, n: u32) {
        self.state.lock().write_failures = n;
    }

    /// Make the next `n` reads fail.
    pub fn fail_next_reads(&self, n: u32) {
        self.state.lock().read_failures = n;
    }

    /// Block every write for `ms` of real time, to widen race windows.
    pub fn set_write_hold_ms(&self, ms: u64) {
        self.state.lock().write_hold_ms = ms;
    }

    /// Value returned by successful reads.
    pub fn set_read_value(&self, value: &[u8]) {
        self.state.lock().read_value = value.to_vec();
    }

    /// Connect attempts so far, successful or not.
    pub fn connect_attempts(&self) -> u32 {
        self.state.lock().connect_attempts
    }

    /// Links opened so far.
    pub fn links_opened(&self) -> u32 {
        self.state.lock().next_link_id
    }

    /// Links dropped (closed) so far.
    pub fn links_dropped(&self) -> u32 {
        self.state.lock().links_dropped
    }

    /// Write attempts so far, successful or not.
    pub fn write_count(&self) -> usize {
        self.state.lock().writes.len()
    }

    /// Every write attempt, in order.
    pub fn writes(&self) -> Vec<WriteRecord> {
        self.state.lock().writes.clone()
    }

    /// Writes the mock reported as successful.
    pub fn successful_writes(&self) -> Vec<WriteRecord> {
        self.state
            .lock()
            .writes
            .iter()
            .filter(|w| w.ok)
            .cloned()
            .collect()
    }

    /// Attributes read so far, in order.
    pub fn reads(&self) -> Vec<AttributeId> {
        self.state.lock().reads.clone()
    }

    /// Highest number of writes that were in progress at the same time.
    pub fn max_in_flight(&self) -> u32 {
        self.state.lock().max_in_flight
    }
}

impl GattConnector for MockGatt {
    type Link = MockLink;

    fn connect(&self, _address: &PeripheralAddress) -> Result<MockLink, TransportError> {
        let mut state = self.state.lock();
        state.connect_attempts += 1;

        if let Some(clock) = &self.clock {
            clock.advance(state.connect_delay_ms);
        }

        if state.connect_failures > 0 {
            state.connect_failures -= 1;
            return Err(TransportError::Connect("scripted failure".into()));
        }

        state.next_link_id += 1;
        Ok(MockLink {
            state: Arc::clone(&self.state),
            id: state.next_link_id,
        })
    }
}

/// Link handed out by [`MockGatt`].
#[derive(Debug)]
pub struct MockLink {
    state: Arc<Mutex<GattState>>,
    id: u32,
}

impl MockLink {
    /// Sequence number of this link (1-based).
    pub fn id(&self) -> u32 {
        self.id
    }
}

impl GattLink for MockLink {
    fn write(
        &mut self,
        attribute: AttributeId,
        payload: &[u8],
        with_response: bool,
    ) -> Result<(), TransportError> {
        let hold_ms = {
            let mut state = self.state.lock();
            state.in_flight += 1;
            state.max_in_flight = state.max_in_flight.max(state.in_flight);
            state.write_hold_ms
        };

        if hold_ms > 0 {
            std::thread::sleep(Duration::from_millis(hold_ms));
        }

        let mut state = self.state.lock();
        state.in_flight -= 1;

        let ok = if state.write_failures > 0 {
            state.write_failures -= 1;
            false
        } else {
            true
        };

        state.writes.push(WriteRecord {
            attribute,
            payload: payload.to_vec(),
            with_response,
            link_id: self.id,
            ok,
        });

        if ok {
            Ok(())
        } else {
            Err(TransportError::Write("scripted failure".into()))
        }
    }

    fn read(&mut self, attribute: AttributeId) -> Result<Vec<u8>, TransportError> {
        let mut state = self.state.lock();
        state.reads.push(attribute);

        if state.read_failures > 0 {
            state.read_failures -= 1;
            return Err(TransportError::Read("scripted failure".into()));
        }
        Ok(state.read_value.clone())
    }
}

impl Drop for MockLink {
    fn drop(&mut self) {
        self.state.lock().links_dropped += 1;
    }
}

// ============================================================================
// Network Mocks
// ============================================================================

/// Mock MQTT client for testing.
///
/// Records all publish/subscribe operations and allows injecting
/// incoming messages for testing message handling.
///
/// # Example
///
/// ```rust
/// use mqtt_bed::hal::MockMqtt;
/// use mqtt_bed::traits::{MqttClient, QoS};
///
/// let mut mqtt = MockMqtt::new();
///
/// // Queue incoming message
/// mqtt.queue_message("bed", "Flat Preset");
/// assert_eq!(mqtt.try_recv().unwrap().payload_str(), Some("Flat Preset"));
///
/// // Check subscriptions
/// mqtt.subscribe("bed", QoS::AtMostOnce).unwrap();
/// assert!(mqtt.is_subscribed("bed"));
///
/// // Check published messages
/// mqtt.publish("bed/state/head", b"50", QoS::AtMostOnce, true).unwrap();
/// assert_eq!(mqtt.published_to("bed/state/head").len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct MockMqtt {
    /// Messages that have been published (topic, payload, qos, retain).
    pub published: Vec<(String, Vec<u8>, QoS, bool)>,
    /// Topics that have been subscribed to.
    pub subscriptions: Vec<(String, QoS)>,
    /// Queue of incoming messages to be returned by `try_recv()`.
    pub incoming: Vec<MqttMessage>,
    /// Whether the client is connected.
    pub connected: bool,
    /// When set, every publish fails.
    pub fail_publish: bool,
}

impl MockMqtt {
    /// Creates a new mock MQTT client in connected state.
    pub fn new() -> Self {
        Self {
            connected: true,
            ..Default::default()
        }
    }

    /// Queue an incoming message
    pub fn queue_message(&mut self, topic: impl Into<String>, payload: impl Into<Vec<u8>>) {
        self.incoming.push(MqttMessage::new(topic, payload));
    }

    /// Check if a topic was subscribed to
    pub fn is_subscribed(&self, topic: &str) -> bool {
        self.subscriptions.iter().any(|(t, _)| t == topic)
    }

    /// Get published messages for a topic
    pub fn published_to(&self, topic: &str) -> Vec<&(String, Vec<u8>, QoS, bool)> {
        self.published
            .iter()
            .filter(|(t, _, _, _)| t == topic)
            .collect()
    }

    /// Payload of the most recent publish to a topic, as UTF-8
    pub fn last_payload(&self, topic: &str) -> Option<&str> {
        self.published
            .iter()
            .rev()
            .find(|(t, _, _, _)| t == topic)
            .and_then(|(_, payload, _, _)| core::str::from_utf8(payload).ok())
    }
}

impl MqttClient for MockMqtt {
    type Error = ();

    fn publish(&mut self, topic: &str, payload: &[u8], qos: QoS, retain: bool) -> Result<(), ()> {
        if self.fail_publish {
            return Err(());
        }
        self.published
            .push((topic.into(), payload.to_vec(), qos, retain));
        Ok(())
    }

    fn subscribe(&mut self, topic: &str, qos: QoS) -> Result<(), ()> {
        self.subscriptions.push((topic.into(), qos));
        Ok(())
    }

    fn try_recv(&mut self) -> Option<MqttMessage> {
        if self.incoming.is_empty() {
            None
        } else {
            Some(self.incoming.remove(0))
        }
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::AddressType;

    fn addr() -> PeripheralAddress {
        PeripheralAddress::new([0x7C, 0xEC, 0x79, 0xFF, 0x6D, 0x02], AddressType::Public)
    }

    // =========================================================================
    // MockClock Tests
    // =========================================================================

    #[test]
    fn mock_clock_shared_between_clones() {
        let clock = MockClock::new();
        let other = clock.clone();
        other.advance(250);
        assert_eq!(clock.now_ms(), 250);
        clock.sleep_ms(750);
        assert_eq!(other.now_ms(), 1000);
        assert_eq!(other.sleep_count(), 1);
    }

    // =========================================================================
    // MockGatt Tests
    // =========================================================================

    #[test]
    fn mock_gatt_connect_failures_consumed_in_order() {
        let gatt = MockGatt::new();
        gatt.fail_next_connects(2);
        assert!(gatt.connect(&addr()).is_err());
        assert!(gatt.connect(&addr()).is_err());
        let link = gatt.connect(&addr()).unwrap();
        assert_eq!(link.id(), 1);
        assert_eq!(gatt.connect_attempts(), 3);
        assert_eq!(gatt.links_opened(), 1);
    }

    #[test]
    fn mock_gatt_connect_delay_advances_clock() {
        let clock = MockClock::new();
        let gatt = MockGatt::new().with_clock(clock.clone());
        gatt.set_connect_delay_ms(2000);
        let _link = gatt.connect(&addr()).unwrap();
        assert_eq!(clock.now_ms(), 2000);
    }

    #[test]
    fn mock_gatt_records_writes_per_link() {
        let gatt = MockGatt::new();
        let mut first = gatt.connect(&addr()).unwrap();
        let mut second = gatt.connect(&addr()).unwrap();

        first.write(AttributeId::Handle(0x13), &[1, 2], true).unwrap();
        second.write(AttributeId::Handle(0x13), &[3, 4], false).unwrap();

        let writes = gatt.writes();
        assert_eq!(writes[0].link_id, 1);
        assert_eq!(writes[1].link_id, 2);
        assert_eq!(writes[1].payload, vec![3, 4]);
        assert!(!writes[1].with_response);
        assert_eq!(gatt.max_in_flight(), 1);
    }

    #[test]
    fn mock_gatt_reads() {
        let gatt = MockGatt::new();
        gatt.set_read_value(&[0xAA]);
        gatt.fail_next_reads(1);
        let mut link = gatt.connect(&addr()).unwrap();
        assert!(link.read(AttributeId::Handle(0x1E)).is_err());
        assert_eq!(link.read(AttributeId::Handle(0x1E)).unwrap(), vec![0xAA]);
        assert_eq!(gatt.reads().len(), 2);
    }

    #[test]
    fn mock_gatt_counts_dropped_links() {
        let gatt = MockGatt::new();
        let link = gatt.connect(&addr()).unwrap();
        assert_eq!(gatt.links_dropped(), 0);
        drop(link);
        assert_eq!(gatt.links_dropped(), 1);
    }

    // =========================================================================
    // MockMqtt Tests
    // =========================================================================

    #[test]
    fn mock_mqtt_default_connected() {
        let mqtt = MockMqtt::new();
        assert!(mqtt.is_connected());
        assert!(mqtt.published.is_empty());
        assert!(mqtt.subscriptions.is_empty());
    }

    #[test]
    fn mock_mqtt_fifo_incoming() {
        let mut mqtt = MockMqtt::new();
        mqtt.queue_message("bed", "first");
        mqtt.queue_message("bed", "second");
        assert_eq!(mqtt.try_recv().unwrap().payload, b"first");
        assert_eq!(mqtt.try_recv().unwrap().payload, b"second");
        assert!(mqtt.try_recv().is_none());
    }

    #[test]
    fn mock_mqtt_publish_failure() {
        let mut mqtt = MockMqtt::new();
        mqtt.fail_publish = true;
        assert!(mqtt.publish("bed", b"x", QoS::AtMostOnce, false).is_err());
        assert!(mqtt.published.is_empty());
    }

    #[test]
    fn mock_mqtt_last_payload() {
        let mut mqtt = MockMqtt::new();
        mqtt.publish("checkIn/bed", b"online", QoS::AtLeastOnce, false).unwrap();
        mqtt.publish("checkIn/bed", b"OK", QoS::AtMostOnce, false).unwrap();
        assert_eq!(mqtt.last_payload("checkIn/bed"), Some("OK"));
        assert_eq!(mqtt.last_payload("bed/state"), None);
    }
}
