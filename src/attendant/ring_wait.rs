//! Letting the phone ring before answering
//!
//! In North America the standard ring cadence is "2-4": two seconds of
//! ringing, four of silence. A gap much longer than one cadence means the
//! caller hung up or someone picked up.

use std::time::{Duration, Instant};

use crate::modem::RingSignal;
use crate::queue::CallerQueue;

/// Default ring cadence
pub const RING_CADENCE: Duration = Duration::from_secs(6);

/// Default interval between queue checks
pub const RING_POLL: Duration = Duration::from_secs(1);

/// Counts rings until it is time to answer
#[derive(Debug, Clone, Copy)]
pub struct RingWait {
    cadence: Duration,
    poll: Duration,
}

impl Default for RingWait {
    fn default() -> Self {
        Self::new(RING_CADENCE, RING_POLL)
    }
}

impl RingWait {
    #[must_use]
    pub const fn new(cadence: Duration, poll: Duration) -> Self {
        Self { cadence, poll }
    }

    /// Longest gap between rings before ringing counts as stopped
    #[must_use]
    pub fn ring_gap_limit(&self) -> Duration {
        self.cadence + self.cadence / 2
    }

    /// Wait until the line has rung `rings` times
    ///
    /// The ring that delivered caller ID counts as the first. Returns false
    /// if another caller shows up in `queue` or the ringing stops first.
    pub fn wait(&self, ring: &RingSignal, queue: &CallerQueue, rings: u32) -> bool {
        let limit = self.ring_gap_limit();
        let mut count = 1;
        let mut last_ring = Instant::now();

        while count < rings {
            if !queue.is_empty() {
                tracing::info!("another call has come in; skipping this one");
                return false;
            }

            if ring.wait(self.poll) {
                ring.clear();
                count += 1;
                last_ring = Instant::now();
                tracing::debug!(count, "ring");
            } else if last_ring.elapsed() > limit {
                tracing::info!(count, "ringing stopped; caller hung up or callee answered");
                return false;
            }
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::modem::CallerRecord;
    use crate::queue::caller_queue;

    fn quick() -> RingWait {
        RingWait::new(Duration::from_millis(60), Duration::from_millis(10))
    }

    #[test]
    fn test_single_ring_answers_immediately() {
        let (_tx, rx) = caller_queue();
        let ring = RingSignal::new();
        assert!(quick().wait(&ring, &rx, 0));
        assert!(quick().wait(&ring, &rx, 1));
    }

    #[test]
    fn test_counts_rings_until_target() {
        let (_tx, rx) = caller_queue();
        let ring = Arc::new(RingSignal::new());
        let ringer = Arc::clone(&ring);
        let handle = std::thread::spawn(move || {
            for _ in 0..2 {
                std::thread::sleep(Duration::from_millis(30));
                ringer.set();
            }
        });

        assert!(quick().wait(&ring, &rx, 3));
        handle.join().unwrap();
    }

    #[test]
    fn test_gives_up_when_ringing_stops() {
        let (_tx, rx) = caller_queue();
        let ring = RingSignal::new();
        let started = Instant::now();

        assert!(!quick().wait(&ring, &rx, 4));
        assert!(started.elapsed() >= quick().ring_gap_limit());
    }

    #[test]
    fn test_queued_caller_wins() {
        let (tx, rx) = caller_queue();
        tx.push(CallerRecord {
            number: "5551234567".to_string(),
            name: "Next".to_string(),
            date: "0801".to_string(),
            time: "1802".to_string(),
        });
        let ring = RingSignal::new();
        ring.set();

        assert!(!quick().wait(&ring, &rx, 3));
        // The pending ring was never consumed
        assert!(ring.is_set());
    }

    #[test]
    fn test_gap_limit_is_one_and_a_half_cadences() {
        assert_eq!(RingWait::default().ring_gap_limit(), Duration::from_secs(9));
    }
}
