//! Error types for the bridge.
//!
//! The connection engine absorbs every transport failure locally, so these
//! types mostly travel between the hardware traits and the engine, or out of
//! the configuration layer at startup.

/// Failure reported by a GATT backend.
///
/// The engine does not discriminate between variants: any error from a
/// connect is "connect failed" and any error from a write is "write failed".
/// The variants exist for logging.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// Could not establish a connection to the peripheral.
    #[error("connect failed: {0}")]
    Connect(String),

    /// A characteristic write was rejected or timed out.
    #[error("write failed: {0}")]
    Write(String),

    /// A characteristic read was rejected or timed out.
    #[error("read failed: {0}")]
    Read(String),

    /// No live connection handle exists.
    #[error("not connected")]
    NotConnected,
}

/// Errors surfaced by the connection engine.
///
/// The engine has no fatal error. The only way out of its unbounded
/// reconnect loop is host shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// The engine's cancellation token fired while reconnecting.
    #[error("connection engine cancelled")]
    Cancelled,
}

/// Errors from parsing a textual hardware address.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    /// The address did not contain exactly six octets.
    #[error("expected 6 octets, found {0}")]
    OctetCount(usize),

    /// An octet was not a two-digit hex number.
    #[error("invalid octet {0:?}")]
    InvalidOctet(String),
}

/// Errors from loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file is not valid TOML for [`Config`](crate::Config).
    #[error("failed to parse config: {0}")]
    Parse(String),

    /// The configured bed model is not supported.
    #[error("unknown bed model {0:?}")]
    UnknownModel(String),

    /// The configured bed address is malformed.
    #[error("invalid bed address: {0}")]
    Address(#[from] AddressError),
}
