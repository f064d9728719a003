//! Peripheral hardware addresses.
//!
//! A BLE peripheral is identified by a 6-byte address plus an addressing
//! mode. Beds differ here: the Serta and Jiecang controllers advertise a
//! public address, the DewertOkin HE150 and Linak controllers a random one.
//!
//! # Example
//!
//! ```rust
//! use mqtt_bed::{AddressType, PeripheralAddress};
//!
//! let addr = PeripheralAddress::parse("7c:ec:79:ff:6d:02", AddressType::Random).unwrap();
//! assert_eq!(addr.to_string(), "7C:EC:79:FF:6D:02");
//! assert_eq!(addr.address_type(), AddressType::Random);
//! ```

use core::fmt;
use core::str::FromStr;

use crate::error::AddressError;

/// BLE addressing mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum AddressType {
    /// IEEE-assigned public address.
    #[default]
    Public,
    /// Random (static or private) address.
    Random,
}

impl AddressType {
    /// Returns the mode as a lowercase string.
    ///
    /// ```
    /// use mqtt_bed::AddressType;
    ///
    /// assert_eq!(AddressType::Public.as_str(), "public");
    /// assert_eq!(AddressType::Random.as_str(), "random");
    /// ```
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            AddressType::Public => "public",
            AddressType::Random => "random",
        }
    }

    /// Parse an addressing mode from text (trimmed, case-insensitive).
    pub fn from_text(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "public" => Some(AddressType::Public),
            "random" => Some(AddressType::Random),
            _ => None,
        }
    }
}

/// Hardware address of the controlled peripheral.
///
/// Immutable once built; the engine holds one for its whole lifetime.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PeripheralAddress {
    octets: [u8; 6],
    kind: AddressType,
}

impl PeripheralAddress {
    /// Build an address from raw octets (most significant first).
    pub const fn new(octets: [u8; 6], kind: AddressType) -> Self {
        Self { octets, kind }
    }

    /// Parse `AA:BB:CC:DD:EE:FF` (or dash separated) with the given mode.
    pub fn parse(s: &str, kind: AddressType) -> Result<Self, AddressError> {
        let parts: Vec<&str> = s.trim().split([':', '-']).collect();
        if parts.len() != 6 {
            return Err(AddressError::OctetCount(parts.len()));
        }

        let mut octets = [0u8; 6];
        for (slot, part) in octets.iter_mut().zip(&parts) {
            if part.len() != 2 || !part.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(AddressError::InvalidOctet((*part).to_string()));
            }
            *slot = u8::from_str_radix(part, 16)
                .map_err(|_| AddressError::InvalidOctet((*part).to_string()))?;
        }

        Ok(Self { octets, kind })
    }

    /// Raw address octets.
    #[inline]
    pub const fn octets(&self) -> [u8; 6] {
        self.octets
    }

    /// Addressing mode used when connecting.
    #[inline]
    pub const fn address_type(&self) -> AddressType {
        self.kind
    }

    /// Same address with a different addressing mode.
    pub const fn with_address_type(mut self, kind: AddressType) -> Self {
        self.kind = kind;
        self
    }
}

impl fmt::Display for PeripheralAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.octets;
        write!(f, "{a:02X}:{b:02X}:{c:02X}:{d:02X}:{e:02X}:{g:02X}")
    }
}

/// Parses with [`AddressType::Public`]; use [`PeripheralAddress::parse`]
/// to choose the mode.
impl FromStr for PeripheralAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s, AddressType::Public)
    }
}
