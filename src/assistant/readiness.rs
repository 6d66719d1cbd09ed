//! Readiness gate between the UI and the listener thread
//!
//! The frontend announces itself once; the listener blocks until then.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

use serde::Serialize;

/// How long each wait slice lasts before re-checking the gate
const WAIT_SLICE: Duration = Duration::from_secs(1);

/// Log a waiting notice every this many slices
const LOG_EVERY_SLICES: u32 = 5;

/// Outcome of waiting on the gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// The frontend signalled readiness
    Ready,
    /// The configured timeout elapsed first
    TimedOut,
    /// The gate was closed during shutdown
    Closed,
}

/// Snapshot of the listener flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ListenerState {
    pub is_ready: bool,
    pub is_listening: bool,
}

#[derive(Debug, Default)]
struct GateState {
    ready: bool,
    closed: bool,
}

/// One-shot gate plus the shared listening flag
#[derive(Debug, Default)]
pub struct ReadinessGate {
    state: Mutex<GateState>,
    cond: Condvar,
    listening: AtomicBool,
}

impl ReadinessGate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the frontend as ready and wake all waiters
    ///
    /// Returns `true` only for the call that opened the gate; later calls are
    /// no-ops.
    pub fn signal_ready(&self) -> bool {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.ready {
            return false;
        }
        state.ready = true;
        drop(state);

        self.cond.notify_all();
        tracing::info!("frontend ready");
        true
    }

    /// Whether the frontend has signalled
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).ready
    }

    /// Release every waiter with [`Readiness::Closed`]
    pub fn close(&self) {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).closed = true;
        self.cond.notify_all();
    }

    /// Whether [`Self::close`] was called
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).closed
    }

    /// Block until ready or closed
    #[must_use]
    pub fn await_ready(&self) -> Readiness {
        self.await_ready_timeout(None)
    }

    /// Block until ready, closed, or `timeout` elapses
    ///
    /// Waits in one-second slices and logs periodically while nothing
    /// happens. Readiness wins over closing when both are set.
    #[must_use]
    pub fn await_ready_timeout(&self, timeout: Option<Duration>) -> Readiness {
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut slices = 0u32;
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        loop {
            if state.ready {
                return Readiness::Ready;
            }
            if state.closed {
                return Readiness::Closed;
            }

            let slice = match deadline {
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        tracing::warn!("frontend did not become ready in time");
                        return Readiness::TimedOut;
                    }
                    remaining.min(WAIT_SLICE)
                }
                None => WAIT_SLICE,
            };

            let (guard, result) = self
                .cond
                .wait_timeout(state, slice)
                .unwrap_or_else(PoisonError::into_inner);
            state = guard;

            if result.timed_out() {
                slices += 1;
                if slices % LOG_EVERY_SLICES == 0 {
                    tracing::info!(waited_secs = slices, "waiting for frontend");
                }
            }
        }
    }

    /// Set while the listener is blocked reading the microphone
    pub fn set_listening(&self, listening: bool) {
        self.listening.store(listening, Ordering::Release);
    }

    /// Whether the listener is currently reading audio
    #[must_use]
    pub fn is_listening(&self) -> bool {
        self.listening.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn state(&self) -> ListenerState {
        ListenerState {
            is_ready: self.is_ready(),
            is_listening: self.is_listening(),
        }
    }
}
