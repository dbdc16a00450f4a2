//! Ring notification shared between the line reader and the ring timer

use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

#[derive(Debug, Default)]
struct RingState {
    pending: bool,
    last: Option<Instant>,
}

/// Set when the line rings, cleared by whoever counts the ring
#[derive(Debug, Default)]
pub struct RingSignal {
    state: Mutex<RingState>,
    rang: Condvar,
}

impl RingSignal {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a ring and wake any waiter
    pub fn set(&self) {
        let mut state = self.state.lock();
        state.pending = true;
        state.last = Some(Instant::now());
        self.rang.notify_all();
    }

    /// Forget a pending ring
    pub fn clear(&self) {
        self.state.lock().pending = false;
    }

    /// Whether a ring is pending
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.state.lock().pending
    }

    /// Time of the most recent ring
    #[must_use]
    pub fn last_ring(&self) -> Option<Instant> {
        self.state.lock().last
    }

    /// Block until a ring is pending or `timeout` elapses
    ///
    /// Returns true if a ring is pending. The flag is left set.
    pub fn wait(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        while !state.pending {
            if self.rang.wait_until(&mut state, deadline).timed_out() {
                break;
            }
        }
        state.pending
    }
}
