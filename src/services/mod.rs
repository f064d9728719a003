//! MQTT services.
//!
//! - `runner`: poll-based bridge over any [`MqttClient`](crate::traits::MqttClient)
//! - `mqtt` feature: `rumqttc`/`tokio` bridge used by the `mqtt-bed` binary
//!
//! Both decode the same payloads and publish the same topics through
//! [`crate::messages`].

pub mod runner;

#[cfg(feature = "mqtt")]
pub mod mqtt;

// Re-exports
pub use runner::*;

#[cfg(feature = "mqtt")]
pub use mqtt::*;
