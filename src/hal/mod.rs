//! Hardware Abstraction Layer implementations.
//!
//! This module contains concrete implementations of the traits
//! defined in [`crate::traits`].
//!
//! # Available Implementations
//!
//! - `mock`: Test implementations with simulated time and scripted failures
//! - `pretend`: GATT backend that logs writes instead of transmitting
//! - `system`: Wall-clock [`Clock`](crate::traits::Clock)

pub mod mock;
pub mod pretend;
pub mod system;

pub use mock::*;
pub use pretend::*;
pub use system::*;
