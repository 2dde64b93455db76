//! Periodic drain of the deferred queue.
//!
//! A background timer thread checks the drain-scheduled flag every tick and,
//! when set, posts a drain tick to the logic thread. The tick itself checks
//! engine safety on the logic thread, so an unsafe engine turns the tick into
//! a no-op and the flag stays set for the next one.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, warn};

use super::DISPATCH_TARGET;
use super::dispatcher::Dispatcher;

/// Clears the in-flight marker when the posted tick finishes or is dropped.
struct InFlight(Arc<AtomicBool>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Timer thread driving [`Dispatcher::drain_tick`].
pub struct DrainTask {
    stop: Sender<()>,
    join: Option<JoinHandle<()>>,
}

impl DrainTask {
    /// Starts ticking every `interval`.
    ///
    /// # Errors
    ///
    /// Returns the spawn error if the timer thread cannot be created.
    pub fn start(dispatcher: Dispatcher, interval: Duration) -> io::Result<Self> {
        let (stop, stop_rx) = mpsc::channel::<()>();
        let join = thread::Builder::new()
            .name("bridged-drain".to_owned())
            .spawn(move || {
                let in_flight = Arc::new(AtomicBool::new(false));
                loop {
                    match stop_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => tick(&dispatcher, &in_flight),
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                debug!(target: DISPATCH_TARGET, "drain task stopped");
            })?;
        debug!(
            target: DISPATCH_TARGET,
            interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX),
            "drain task started"
        );
        Ok(Self {
            stop,
            join: Some(join),
        })
    }

    /// Stops the timer and waits for it to exit. Ticks already posted to the
    /// logic thread still run.
    pub fn stop(mut self) {
        self.stop_and_join();
    }

    fn stop_and_join(&mut self) {
        let Some(join) = self.join.take() else {
            return;
        };
        if self.stop.send(()).is_err() {
            debug!(target: DISPATCH_TARGET, "drain task already exited");
        }
        if join.join().is_err() {
            warn!(target: DISPATCH_TARGET, "drain task panicked");
        }
    }
}

impl Drop for DrainTask {
    fn drop(&mut self) {
        self.stop_and_join();
    }
}

fn tick(dispatcher: &Dispatcher, in_flight: &Arc<AtomicBool>) {
    if !dispatcher.is_drain_scheduled() {
        return;
    }
    if in_flight.swap(true, Ordering::AcqRel) {
        return;
    }
    let guard = InFlight(Arc::clone(in_flight));
    let target = dispatcher.clone();
    let posted = dispatcher.logic_thread().post(move || {
        let _guard = guard;
        target.drain_tick();
    });
    if let Err(error) = posted {
        // The rejected job, and with it the guard, has already been dropped.
        debug!(target: DISPATCH_TARGET, %error, "drain tick not posted");
    }
}
