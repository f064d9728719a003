//! MQTT payload decoding and state publications.
//!
//! Shared by the poll-based [`BridgeRunner`](crate::services::BridgeRunner)
//! and the async `MqttBridge`, so both speak exactly the same topic layout.
//!
//! # Example
//!
//! ```
//! use mqtt_bed::config::MqttConfig;
//! use mqtt_bed::messages::{decode_command, state_publications};
//! use mqtt_bed::{BedModel, DerivedStateTracker};
//!
//! assert_eq!(decode_command(b"  Head Up\n"), Some("Head Up"));
//!
//! let mut tracker = DerivedStateTracker::new(BedModel::Linak.descriptor().motion.unwrap());
//! let delta = tracker.apply("Light");
//! let state = tracker.state();
//!
//! let pubs = state_publications(&MqttConfig::default(), &delta, Some(&state));
//! assert_eq!(pubs[0].topic, "bed/state/light");
//! assert_eq!(pubs[0].payload, "ON");
//! assert_eq!(pubs[1].topic, "bed/state");
//! ```

use crate::config::MqttConfig;
use crate::tracker::{BedState, StateDelta};

// ============================================================================
// Inbound
// ============================================================================

/// Extract the command name from a message payload.
///
/// The payload is UTF-8 text, surrounding whitespace ignored. Returns `None`
/// for invalid UTF-8 or an empty name.
pub fn decode_command(payload: &[u8]) -> Option<&str> {
    let text = core::str::from_utf8(payload).ok()?.trim();
    (!text.is_empty()).then_some(text)
}

// ============================================================================
// Outbound
// ============================================================================

/// A message the bridge wants published.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Publication {
    /// Destination topic.
    pub topic: String,
    /// UTF-8 payload.
    pub payload: String,
    /// Whether the broker should retain it.
    pub retain: bool,
}

impl Publication {
    /// Create a publication.
    pub fn new(topic: impl Into<String>, payload: impl Into<String>, retain: bool) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
            retain,
        }
    }
}

/// Publications for a command's state delta.
///
/// One retained message per changed field on `<topic>/state/<field>`,
/// followed by the full snapshot on `<topic>/state` when `state` is known.
/// An empty delta publishes nothing.
pub fn state_publications(
    config: &MqttConfig,
    delta: &StateDelta,
    state: Option<&BedState>,
) -> Vec<Publication> {
    if delta.is_empty() {
        return Vec::new();
    }

    let mut out: Vec<Publication> = delta
        .iter()
        .map(|field| Publication::new(config.state_field_topic(field.name()), field.value(), true))
        .collect();

    if let Some(state) = state {
        out.push(Publication::new(config.state_topic(), state.to_json(), false));
    }

    out
}
