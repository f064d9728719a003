//! Hardware abstraction traits for the BLE link and time.
//!
//! The engine never talks to a Bluetooth stack directly. It opens
//! connections through a [`GattConnector`], writes and reads through the
//! resulting [`GattLink`], and measures/sleeps through a [`Clock`]. This is
//! what lets the retry policy be tested against simulated time.
//!
//! # Key Traits
//!
//! | Trait | Purpose |
//! |-------|---------|
//! | [`GattConnector`] | Opens a session to a peripheral address |
//! | [`GattLink`] | Characteristic read/write on an open session |
//! | [`Clock`] | Monotonic time and blocking sleep |
//!
//! # Implementation
//!
//! For tests use the mocks in [`crate::hal::mock`]. [`crate::hal::PretendGatt`]
//! logs writes without any radio, and [`crate::hal::SystemClock`] wraps
//! `std::time`.
//!
//! # Example
//!
//! ```rust
//! use mqtt_bed::hal::MockGatt;
//! use mqtt_bed::traits::{AttributeId, GattConnector, GattLink};
//! use mqtt_bed::{AddressType, PeripheralAddress};
//!
//! let gatt = MockGatt::new();
//! let addr = PeripheralAddress::new([0x7C, 0xEC, 0x79, 0xFF, 0x6D, 0x02], AddressType::Public);
//!
//! let mut link = gatt.connect(&addr).unwrap();
//! link.write(AttributeId::Handle(0x0020), &[0xE5, 0xFE], true).unwrap();
//! assert_eq!(gatt.write_count(), 1);
//! ```

use core::fmt;

use crate::address::PeripheralAddress;
use crate::error::TransportError;

/// Identifies a GATT characteristic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AttributeId {
    /// Raw ATT handle.
    Handle(u16),
    /// 128-bit characteristic UUID in canonical text form.
    Uuid(&'static str),
}

impl fmt::Display for AttributeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeId::Handle(h) => write!(f, "0x{h:04x}"),
            AttributeId::Uuid(u) => f.write_str(u),
        }
    }
}

/// An open session to one peripheral.
///
/// Dropping the link closes the session. A link that returned an error may
/// still be usable; the engine decides when to replace it.
pub trait GattLink: Send {
    /// Write a characteristic value.
    ///
    /// `with_response` selects an ATT Write Request (acknowledged) over a
    /// Write Command.
    fn write(
        &mut self,
        attribute: AttributeId,
        payload: &[u8],
        with_response: bool,
    ) -> Result<(), TransportError>;

    /// Read a characteristic value.
    fn read(&mut self, attribute: AttributeId) -> Result<Vec<u8>, TransportError>;
}

/// Opens sessions to peripherals.
///
/// Implementations should block until the link is usable or the attempt has
/// failed. The engine supplies its own retry loop, so a single call should
/// make a single attempt.
pub trait GattConnector: Send + Sync {
    /// Session type produced by this connector.
    type Link: GattLink;

    /// Attempt one connection to `address` using its addressing mode.
    fn connect(&self, address: &PeripheralAddress) -> Result<Self::Link, TransportError>;
}

/// Monotonic time source with blocking sleep.
///
/// # Example
///
/// ```rust
/// use mqtt_bed::traits::Clock;
/// use mqtt_bed::hal::MockClock;
///
/// let clock = MockClock::new();
/// assert_eq!(clock.now_ms(), 0);
///
/// clock.sleep_ms(1500);
/// assert_eq!(clock.now_ms(), 1500);
/// ```
pub trait Clock: Send + Sync {
    /// Milliseconds since an arbitrary epoch. Must never go backwards.
    fn now_ms(&self) -> u64;

    /// Block the calling thread for `ms` milliseconds.
    fn sleep_ms(&self, ms: u64);
}

impl<C: Clock + ?Sized> Clock for std::sync::Arc<C> {
    fn now_ms(&self) -> u64 {
        (**self).now_ms()
    }

    fn sleep_ms(&self, ms: u64) {
        (**self).sleep_ms(ms)
    }
}
