//! Trait definitions for the BLE transport, time and MQTT.
//!
//! These abstractions let mqtt-bed:
//! - Drive any GATT stack (or none, in pretend mode)
//! - Test retry timing against simulated time
//! - Test the bridge loop without a broker
//!
//! # Submodules
//!
//! - `hardware`: GATT connector and link, clock
//! - `network`: MQTT client trait and message types

pub mod hardware;
pub mod network;

pub use hardware::*;
pub use network::*;
