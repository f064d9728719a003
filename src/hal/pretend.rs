//! GATT backend that talks to no hardware.
//!
//! Connects always succeed and every write is logged with its hex payload.
//! Useful for wiring up MQTT automations before the bridge is installed
//! next to the bed, and as the default backend of the `mqtt-bed` binary.

use tracing::info;

use crate::address::PeripheralAddress;
use crate::error::TransportError;
use crate::traits::{AttributeId, GattConnector, GattLink};

/// Connector producing [`PretendLink`]s.
#[derive(Clone, Copy, Debug, Default)]
pub struct PretendGatt;

impl PretendGatt {
    /// Create the pretend backend.
    pub fn new() -> Self {
        Self
    }
}

impl GattConnector for PretendGatt {
    type Link = PretendLink;

    fn connect(&self, address: &PeripheralAddress) -> Result<PretendLink, TransportError> {
        info!(
            %address,
            address_type = address.address_type().as_str(),
            "pretend connect"
        );
        Ok(PretendLink { address: *address })
    }
}

/// Link that logs instead of transmitting.
#[derive(Debug)]
pub struct PretendLink {
    address: PeripheralAddress,
}

impl GattLink for PretendLink {
    fn write(
        &mut self,
        attribute: AttributeId,
        payload: &[u8],
        with_response: bool,
    ) -> Result<(), TransportError> {
        info!(
            address = %self.address,
            %attribute,
            payload = %hex::encode(payload),
            with_response,
            "pretend write"
        );
        Ok(())
    }

    fn read(&mut self, attribute: AttributeId) -> Result<Vec<u8>, TransportError> {
        info!(address = %self.address, %attribute, "pretend read");
        Ok(Vec::new())
    }
}
