//! Connection management and command delivery.
//!
//! [`ConnectionEngine`] owns the single BLE session to a bed controller. It
//! resolves command names through the model's [`CommandTable`], serializes
//! every write (commands and keepalives) behind one lock, repairs the link
//! when a write fails, and feeds successful commands to the
//! [`DerivedStateTracker`] when the model has one.
//!
//! # Write path
//!
//! ```text
//! send_command(name)
//!   ├─ unknown name ───────────────────────────► Ignored   (no I/O)
//!   └─ lock ─ write ─ ok ──────────────────────► Sent(delta)
//!                  └─ err ─ connect() (timed)
//!                           ├─ took >= budget ─► Dropped(ReconnectSlow)
//!                           └─ write again ─ ok ► Sent(delta)
//!                                          └ err ► Dropped(RetryFailed)
//! ```
//!
//! The retry always goes to the link produced by the reconnect. A link is
//! only ever replaced inside `connect`, never discarded on a write error, so
//! the keepalive prober can retry on the same session before giving up on
//! it.
//!
//! # Example
//!
//! ```rust
//! use mqtt_bed::hal::{MockClock, MockGatt};
//! use mqtt_bed::{BedModel, CommandOutcome, ConnectionEngine, PeripheralAddress, TimingConfig};
//!
//! let clock = MockClock::new();
//! let gatt = MockGatt::new().with_clock(clock.clone());
//! let address: PeripheralAddress = "7C:EC:79:FF:6D:02".parse().unwrap();
//!
//! let engine = ConnectionEngine::new(
//!     BedModel::Serta.descriptor(),
//!     address,
//!     gatt.clone(),
//!     clock,
//!     TimingConfig::default(),
//! );
//! engine.connect().unwrap();
//!
//! assert!(engine.send_command("Flat Preset").is_sent());
//! assert_eq!(engine.send_command("Warp Drive"), CommandOutcome::Ignored);
//! assert_eq!(gatt.write_count(), 1);
//! ```

mod cancel;
mod prober;

pub use cancel::CancelToken;
pub use prober::{spawn_keepalive, ProberHandle};

use core::fmt;

use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::address::PeripheralAddress;
use crate::codec::CommandTable;
use crate::config::TimingConfig;
use crate::error::{EngineError, TransportError};
use crate::models::ModelDescriptor;
use crate::tracker::{BedState, DerivedStateTracker, StateDelta};
use crate::traits::{Clock, GattConnector, GattLink};

// ============================================================================
// Outcomes
// ============================================================================

/// Why a known command was not delivered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DropReason {
    /// The reconnect after the first failure took at least the reconnect
    /// budget, so the command was considered stale.
    ReconnectSlow {
        /// How long the reconnect took.
        elapsed_ms: u64,
    },
    /// The single retry on the fresh link failed as well.
    RetryFailed,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DropReason::ReconnectSlow { elapsed_ms } => {
                write!(f, "reconnect took {elapsed_ms}ms")
            }
            DropReason::RetryFailed => f.write_str("retry after reconnect failed"),
        }
    }
}

/// Result of [`ConnectionEngine::send_command`].
#[derive(Clone, Debug, PartialEq)]
pub enum CommandOutcome {
    /// Payload written; carries the derived-state fields that changed
    /// (always empty for models without a motion profile).
    Sent(StateDelta),
    /// Name not in the model's command table. Nothing was written.
    Ignored,
    /// Known command that could not be delivered.
    Dropped(DropReason),
    /// The engine was cancelled while reconnecting.
    Cancelled,
}

impl CommandOutcome {
    /// Returns true if the payload reached the controller.
    pub fn is_sent(&self) -> bool {
        matches!(self, CommandOutcome::Sent(_))
    }

    /// State delta, if the command was sent.
    pub fn delta(&self) -> Option<&StateDelta> {
        match self {
            CommandOutcome::Sent(delta) => Some(delta),
            _ => None,
        }
    }

    /// State delta, empty unless the command was sent.
    pub fn into_delta(self) -> StateDelta {
        match self {
            CommandOutcome::Sent(delta) => delta,
            _ => StateDelta::empty(),
        }
    }
}

/// Result of one keepalive tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The model has no keepalive command.
    Disabled,
    /// A write was in progress; nothing was sent.
    Skipped,
    /// Keepalive written on the first try.
    Alive,
    /// First keepalive failed, the delayed second one went through.
    Recovered,
    /// Both keepalives failed and the link was re-established.
    Reconnected,
    /// Shutdown was requested during the tick.
    Cancelled,
}

// ============================================================================
// Engine
// ============================================================================

/// Link plus bookkeeping, guarded by the write lock.
struct Session<L> {
    link: Option<L>,
    connects: u64,
}

/// Owns the connection to one bed controller.
///
/// The engine is `Sync`: share it behind an `Arc` between the command path
/// and the keepalive prober. All writes go through one lock; commands wait
/// for it, keepalive ticks skip when it is taken.
pub struct ConnectionEngine<C: GattConnector, K: Clock> {
    descriptor: &'static ModelDescriptor,
    table: CommandTable,
    address: PeripheralAddress,
    connector: C,
    clock: K,
    timing: TimingConfig,
    session: Mutex<Session<C::Link>>,
    tracker: Mutex<Option<DerivedStateTracker>>,
    cancel: CancelToken,
}

impl<C: GattConnector, K: Clock> ConnectionEngine<C, K> {
    /// Create an engine for `descriptor`. Does not connect.
    ///
    /// The address is forced to the model's addressing mode.
    pub fn new(
        descriptor: &'static ModelDescriptor,
        address: PeripheralAddress,
        connector: C,
        clock: K,
        timing: TimingConfig,
    ) -> Self {
        Self {
            descriptor,
            table: descriptor.command_table(),
            address: address.with_address_type(descriptor.address_type),
            connector,
            clock,
            timing,
            session: Mutex::new(Session {
                link: None,
                connects: 0,
            }),
            tracker: Mutex::new(descriptor.motion.map(DerivedStateTracker::new)),
            cancel: CancelToken::new(),
        }
    }

    /// Use an externally owned cancellation token.
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Model this engine drives.
    pub fn descriptor(&self) -> &'static ModelDescriptor {
        self.descriptor
    }

    /// Peripheral address, with the model's addressing mode.
    pub fn address(&self) -> &PeripheralAddress {
        &self.address
    }

    /// Timing in use.
    pub fn timing(&self) -> &TimingConfig {
        &self.timing
    }

    /// Command table of the model.
    pub fn commands(&self) -> &CommandTable {
        &self.table
    }

    /// Shared cancellation token.
    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Request shutdown. A running connect loop returns at its next check.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Returns true if a link is currently held. Waits for the write lock.
    pub fn is_connected(&self) -> bool {
        self.session.lock().link.is_some()
    }

    /// Number of successful connects so far. Waits for the write lock.
    pub fn connect_count(&self) -> u64 {
        self.session.lock().connects
    }

    /// Current derived state, or `None` if the model reports no state.
    pub fn state(&self) -> Option<BedState> {
        self.tracker.lock().as_ref().map(DerivedStateTracker::state)
    }

    /// Establish the link, retrying until it succeeds.
    ///
    /// Each attempt connects and then performs the model's enable-control
    /// reads; a failure anywhere counts as a failed attempt and is followed
    /// by the connect retry delay. Returns [`EngineError::Cancelled`] only
    /// when the cancellation token fires.
    ///
    /// Holds the write lock for the whole loop, so concurrent callers
    /// connect one at a time.
    pub fn connect(&self) -> Result<(), EngineError> {
        let mut session = self.session.lock();
        self.connect_locked(&mut session)
    }

    fn connect_locked(&self, session: &mut Session<C::Link>) -> Result<(), EngineError> {
        session.link = None;

        let mut attempt: u32 = 0;
        loop {
            if self.cancel.is_cancelled() {
                return Err(EngineError::Cancelled);
            }
            attempt += 1;

            match self.open_link() {
                Ok(link) => {
                    session.link = Some(link);
                    session.connects += 1;
                    info!(
                        address = %self.address,
                        model = self.descriptor.model.as_str(),
                        attempt,
                        "connected"
                    );
                    return Ok(());
                }
                Err(err) => {
                    error!(
                        address = %self.address,
                        attempt,
                        error = %err,
                        "connect failed, retrying in {}ms",
                        self.timing.connect_retry_ms
                    );
                }
            }

            if !self.cancel.sleep(&self.clock, self.timing.connect_retry_ms) {
                return Err(EngineError::Cancelled);
            }
        }
    }

    fn open_link(&self) -> Result<C::Link, TransportError> {
        let mut link = self.connector.connect(&self.address)?;
        for attribute in self.descriptor.enable_control {
            let value = link.read(*attribute)?;
            debug!(%attribute, value = %hex::encode(&value), "enable-control read");
        }
        Ok(link)
    }

    fn write_locked(
        &self,
        session: &mut Session<C::Link>,
        payload: &[u8],
    ) -> Result<(), TransportError> {
        let link = session.link.as_mut().ok_or(TransportError::NotConnected)?;
        link.write(
            self.descriptor.write_attribute,
            payload,
            self.descriptor.write_with_response,
        )
    }

    /// Deliver a command by name.
    ///
    /// Unknown names return [`CommandOutcome::Ignored`] without touching the
    /// link. A known name is written once; if that fails the link is
    /// re-established and, when the reconnect beat the reconnect budget,
    /// the payload is written exactly once more.
    pub fn send_command(&self, name: &str) -> CommandOutcome {
        let Some(payload) = self.table.lookup(name) else {
            warn!(
                command = name,
                model = self.descriptor.model.as_str(),
                "unknown command, ignoring"
            );
            return CommandOutcome::Ignored;
        };

        let mut session = self.session.lock();

        if let Err(err) = self.write_locked(&mut session, payload) {
            warn!(command = name, error = %err, "write failed, reconnecting");

            let started = self.clock.now_ms();
            if self.connect_locked(&mut session).is_err() {
                warn!(command = name, "cancelled while reconnecting");
                return CommandOutcome::Cancelled;
            }
            let elapsed_ms = self.clock.now_ms().saturating_sub(started);

            if elapsed_ms >= self.timing.reconnect_budget_ms {
                let reason = DropReason::ReconnectSlow { elapsed_ms };
                error!(command = name, elapsed_ms, "command dropped: {reason}");
                return CommandOutcome::Dropped(reason);
            }

            if let Err(err) = self.write_locked(&mut session, payload) {
                let reason = DropReason::RetryFailed;
                error!(command = name, error = %err, "command dropped: {reason}");
                return CommandOutcome::Dropped(reason);
            }
        }

        debug!(command = name, payload = %hex::encode(payload), "sent");

        // Applied before releasing the write lock so deltas follow write order.
        let delta = self
            .tracker
            .lock()
            .as_mut()
            .map(|tracker| tracker.apply(name))
            .unwrap_or_default();

        CommandOutcome::Sent(delta)
    }

    fn keepalive_payload(&self) -> Option<&'static [u8]> {
        self.descriptor
            .keepalive
            .and_then(|name| self.table.lookup(name))
    }

    /// Run one keepalive probe.
    ///
    /// Skips without I/O when a write holds the lock. Otherwise writes the
    /// model's no-op; on failure waits the keepalive retry delay (with the
    /// lock released), tries once more, and reconnects if that fails too.
    pub fn keepalive_tick(&self) -> ProbeOutcome {
        let Some(payload) = self.keepalive_payload() else {
            return ProbeOutcome::Disabled;
        };

        let Some(mut session) = self.session.try_lock() else {
            debug!("write in progress, keepalive skipped");
            return ProbeOutcome::Skipped;
        };

        match self.write_locked(&mut session, payload) {
            Ok(()) => {
                debug!("keepalive ok");
                return ProbeOutcome::Alive;
            }
            Err(err) => warn!(error = %err, "keepalive failed"),
        }
        drop(session);

        if !self.cancel.sleep(&self.clock, self.timing.keepalive_retry_ms) {
            return ProbeOutcome::Cancelled;
        }

        let Some(mut session) = self.session.try_lock() else {
            debug!("write in progress, keepalive retry skipped");
            return ProbeOutcome::Skipped;
        };

        match self.write_locked(&mut session, payload) {
            Ok(()) => {
                info!("keepalive recovered");
                ProbeOutcome::Recovered
            }
            Err(err) => {
                error!(error = %err, "keepalive retry failed, reconnecting");
                match self.connect_locked(&mut session) {
                    Ok(()) => ProbeOutcome::Reconnected,
                    Err(EngineError::Cancelled) => ProbeOutcome::Cancelled,
                }
            }
        }
    }
}

impl<C: GattConnector, K: Clock> fmt::Debug for ConnectionEngine<C, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionEngine")
            .field("model", &self.descriptor.model)
            .field("address", &self.address)
            .field("timing", &self.timing)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}
