//! # mqtt-bed
//!
//! Bridges MQTT to the BLE controller of a motorized bed base.
//!
//! ## Features
//!
//! - **Command codec**: per-model tables mapping command names to the exact
//!   bytes each controller expects
//! - **Connection engine**: one serialized BLE session with bounded
//!   reconnect/retry on write failure
//! - **Keepalive prober**: background no-op writes for controllers that drop
//!   idle links, skipped whenever a command is in flight
//! - **Derived state**: head/foot/light estimate for controllers without
//!   position telemetry
//! - **MQTT bridge**: command topic in, presence and state topics out
//!
//! ## Architecture
//!
//! The crate is structured to allow testing on desktop without hardware:
//!
//! - `traits` - GATT, clock and MQTT abstractions
//! - `models` / `codec` - model descriptors and command tables
//! - `engine` - connection state machine, keepalive prober, cancellation
//! - `tracker` - derived bed state
//! - `hal` - concrete implementations (mocks for testing, pretend backend)
//! - `services` - MQTT bridge (poll-based runner, `rumqttc` behind `mqtt`)
//!
//! ## Example
//!
//! ```rust
//! use mqtt_bed::{
//!     BedModel, CommandOutcome, ConnectionEngine, StateField, TimingConfig,
//!     hal::{MockClock, MockGatt},
//! };
//!
//! // Engine over a mock BLE stack
//! let gatt = MockGatt::new();
//! let engine = ConnectionEngine::new(
//!     BedModel::Linak.descriptor(),
//!     "7C:EC:79:FF:6D:02".parse().unwrap(),
//!     gatt.clone(),
//!     MockClock::new(),
//!     TimingConfig::default(),
//! );
//! engine.connect().unwrap();
//!
//! // Known command: written once, state delta returned
//! let outcome = engine.send_command("Light");
//! assert_eq!(outcome.delta().unwrap().fields(), &[StateField::Light(true)]);
//!
//! // Unknown command: no I/O
//! assert_eq!(engine.send_command("Massage"), CommandOutcome::Ignored);
//! assert_eq!(gatt.write_count(), 1);
//! ```

#![warn(missing_docs)]

/// Peripheral hardware addresses.
pub mod address;
/// Command name to payload lookup.
pub mod codec;
/// Shared configuration with TOML and environment overrides.
pub mod config;
/// Connection engine, keepalive prober and cancellation.
pub mod engine;
/// Error types.
pub mod error;
/// Hardware abstraction layer with mock implementations for testing.
pub mod hal;
/// Payload decoding and state publications for MQTT.
pub mod messages;
/// Supported bed models.
pub mod models;
/// MQTT services.
pub mod services;
/// Derived bed state.
pub mod tracker;
/// Core traits for hardware and network abstraction.
pub mod traits;

// Re-exports for convenience
pub use address::{AddressType, PeripheralAddress};
pub use codec::CommandTable;
pub use engine::{
    spawn_keepalive, CancelToken, CommandOutcome, ConnectionEngine, DropReason, ProbeOutcome,
    ProberHandle,
};
pub use error::{AddressError, ConfigError, EngineError, TransportError};
pub use models::{BedModel, ModelDescriptor};
pub use tracker::{BedState, DerivedStateTracker, StateDelta, StateField};
pub use traits::{
    // Hardware
    AttributeId,
    Clock,
    GattConnector,
    GattLink,
    // Network
    MqttClient,
    MqttMessage,
    QoS,
};

// Config re-exports
pub use config::{BedConfig, Config, MqttConfig, TimingConfig};
