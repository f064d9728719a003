//! Background keepalive thread.
//!
//! Some controllers drop an idle connection after a few seconds. For models
//! with a no-op command, a dedicated thread calls
//! [`ConnectionEngine::keepalive_tick`] once per keepalive interval for as
//! long as the engine's cancellation token is clear. A tick that finds a
//! write in progress is skipped, not replayed.

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{debug, info};

use super::{CancelToken, ConnectionEngine, ProbeOutcome};
use crate::traits::{Clock, GattConnector};

/// Handle to a running keepalive thread.
#[derive(Debug)]
pub struct ProberHandle {
    cancel: CancelToken,
    thread: JoinHandle<()>,
}

impl ProberHandle {
    /// Signal the thread (and the engine it probes) to stop.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Returns true once the thread has exited.
    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Wait for the thread to exit.
    pub fn join(self) -> thread::Result<()> {
        self.thread.join()
    }
}

/// Start the keepalive thread for `engine`.
///
/// Returns `Ok(None)` when the model has no keepalive command. The thread
/// exits when the engine's cancellation token fires.
pub fn spawn_keepalive<C, K>(
    engine: Arc<ConnectionEngine<C, K>>,
) -> io::Result<Option<ProberHandle>>
where
    C: GattConnector + 'static,
    K: Clock + 'static,
{
    if engine.keepalive_payload().is_none() {
        debug!(
            model = engine.descriptor.model.as_str(),
            "model has no keepalive command, prober not started"
        );
        return Ok(None);
    }

    let cancel = engine.cancel.clone();
    let interval_ms = engine.timing.keepalive_interval_ms;

    let thread = thread::Builder::new()
        .name("bed-keepalive".into())
        .spawn(move || {
            info!(interval_ms, "keepalive prober started");
            while !engine.cancel.is_cancelled() {
                if engine.keepalive_tick() == ProbeOutcome::Cancelled {
                    break;
                }
                if !engine.cancel.sleep(&engine.clock, interval_ms) {
                    break;
                }
            }
            info!("keepalive prober stopped");
        })?;

    Ok(Some(ProberHandle { cancel, thread }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TimingConfig;
    use crate::hal::{MockClock, MockGatt, SystemClock};
    use crate::models::BedModel;

    fn dewertokin<K: Clock>(clock: K, gatt: &MockGatt, timing: TimingConfig) -> ConnectionEngine<MockGatt, K> {
        let address = "7C:EC:79:FF:6D:02".parse().unwrap();
        ConnectionEngine::new(
            BedModel::DewertOkin.descriptor(),
            address,
            gatt.clone(),
            clock,
            timing,
        )
    }

    #[test]
    fn held_lock_skips_tick_without_io() {
        let clock = MockClock::new();
        let gatt = MockGatt::new().with_clock(clock.clone());
        let engine = dewertokin(clock, &gatt, TimingConfig::default());
        engine.connect().unwrap();

        let guard = engine.session.lock();
        assert_eq!(engine.keepalive_tick(), ProbeOutcome::Skipped);
        drop(guard);

        assert_eq!(gatt.write_count(), 0);
        assert_eq!(gatt.connect_attempts(), 1);
    }

    #[test]
    fn serta_has_no_prober() {
        let gatt = MockGatt::new();
        let address = "7C:EC:79:FF:6D:02".parse().unwrap();
        let engine = Arc::new(ConnectionEngine::new(
            BedModel::Serta.descriptor(),
            address,
            gatt,
            MockClock::new(),
            TimingConfig::default(),
        ));
        assert!(spawn_keepalive(engine).unwrap().is_none());
    }

    #[test]
    fn thread_probes_until_stopped() {
        let gatt = MockGatt::new();
        let timing = TimingConfig::default().with_keepalive_interval_ms(5);
        let engine = Arc::new(dewertokin(SystemClock::new(), &gatt, timing));
        engine.connect().unwrap();

        let handle = spawn_keepalive(Arc::clone(&engine)).unwrap().unwrap();
        while gatt.write_count() < 3 {
            thread::yield_now();
        }
        handle.stop();
        handle.join().unwrap();

        assert!(engine.cancel_token().is_cancelled());
        assert!(gatt.writes().iter().all(|w| w.payload == vec![0x04, 0x02, 0x00, 0x00, 0x00, 0x00]));
    }
}
