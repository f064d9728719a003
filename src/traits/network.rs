//! Network abstraction traits for MQTT.
//!
//! The bridge subscribes to one command topic and republishes what it learns
//! under the same prefix:
//!
//! ```text
//! bed              - Command name (e.g. "Flat Preset")
//! bed/state        - JSON snapshot of the derived state
//! bed/state/head   - Head position 0-100 (retained)
//! bed/state/foot   - Foot position 0-100 (retained)
//! bed/state/light  - ON/OFF (retained)
//! checkIn/bed      - "online" on connect, then "OK" every check-in interval
//! ```

// ============================================================================
// Quality of Service
// ============================================================================

/// MQTT delivery guarantee.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum QoS {
    /// Fire and forget.
    #[default]
    AtMostOnce,
    /// Acknowledged delivery, may duplicate.
    AtLeastOnce,
    /// Exactly once.
    ExactlyOnce,
}

impl QoS {
    /// Map a numeric level (0, 1, 2) to a QoS.
    ///
    /// ```
    /// use mqtt_bed::traits::QoS;
    ///
    /// assert_eq!(QoS::from_level(1), Some(QoS::AtLeastOnce));
    /// assert_eq!(QoS::from_level(3), None);
    /// ```
    pub const fn from_level(level: u8) -> Option<Self> {
        match level {
            0 => Some(QoS::AtMostOnce),
            1 => Some(QoS::AtLeastOnce),
            2 => Some(QoS::ExactlyOnce),
            _ => None,
        }
    }

    /// Numeric level.
    pub const fn level(&self) -> u8 {
        match self {
            QoS::AtMostOnce => 0,
            QoS::AtLeastOnce => 1,
            QoS::ExactlyOnce => 2,
        }
    }
}

// ============================================================================
// MQTT Client Trait (Sync-First Design)
// ============================================================================

/// MQTT client trait for pub/sub messaging.
///
/// The poll-based [`crate::services::BridgeRunner`] is written against this
/// trait so it can be driven by a blocking client or by
/// [`crate::hal::MockMqtt`] in tests.
///
/// # Implementation Notes
///
/// - `publish` and `subscribe` may block
/// - `try_recv` is non-blocking for polling patterns
/// - The client should handle reconnection internally
///
/// # Example
///
/// ```rust
/// use mqtt_bed::traits::{MqttClient, QoS};
///
/// fn check_in<M: MqttClient>(client: &mut M) -> Result<(), M::Error> {
///     client.publish("checkIn/bed", b"OK", QoS::AtMostOnce, false)
/// }
/// ```
pub trait MqttClient {
    /// Error type for MQTT operations.
    type Error;

    /// Publish a message to a topic.
    ///
    /// # Arguments
    /// - `topic`: MQTT topic path
    /// - `payload`: Message bytes
    /// - `qos`: Delivery guarantee
    /// - `retain`: If true, broker keeps message for new subscribers
    fn publish(
        &mut self,
        topic: &str,
        payload: &[u8],
        qos: QoS,
        retain: bool,
    ) -> Result<(), Self::Error>;

    /// Subscribe to a topic.
    fn subscribe(&mut self, topic: &str, qos: QoS) -> Result<(), Self::Error>;

    /// Try to receive the next message (non-blocking).
    ///
    /// Returns `None` if no message is available. This should never block.
    fn try_recv(&mut self) -> Option<MqttMessage>;

    /// Check if connected to broker.
    fn is_connected(&self) -> bool;
}

/// An MQTT message received from a subscription.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MqttMessage {
    /// Topic the message was published to.
    pub topic: String,
    /// Message payload as raw bytes.
    pub payload: Vec<u8>,
}

impl MqttMessage {
    /// Create a new MQTT message.
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }

    /// Returns the payload as a UTF-8 string, if valid.
    pub fn payload_str(&self) -> Option<&str> {
        core::str::from_utf8(&self.payload).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qos_levels() {
        for level in 0..=2 {
            assert_eq!(QoS::from_level(level).map(|q| q.level()), Some(level));
        }
        assert_eq!(QoS::from_level(7), None);
        assert_eq!(QoS::default(), QoS::AtMostOnce);
    }

    #[test]
    fn payload_str_rejects_invalid_utf8() {
        assert_eq!(MqttMessage::new("bed", "Flat Preset").payload_str(), Some("Flat Preset"));
        assert_eq!(MqttMessage::new("bed", vec![0xFFu8, 0xFE]).payload_str(), None);
    }
}
