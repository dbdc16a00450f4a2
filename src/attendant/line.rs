//! The telephone line as the attendant sees it

use std::path::Path;
use std::time::Duration;

use crate::modem::{Modem, OffHook, PlayOutcome, RingSignal, ScanOutcome};

/// Something that rings and can be answered
pub trait Line: Send + Sync {
    /// An answered call; dropping it hangs up
    type Session<'a>: LineSession
    where
        Self: 'a;

    /// Go off-hook, or `None` if the line could not be seized
    fn pick_up(&self) -> Option<Self::Session<'_>>;

    /// Rings seen on this line
    fn ring_signal(&self) -> &RingSignal;
}

/// Audio operations on an answered call
pub trait LineSession: Sized {
    fn play(&mut self, path: &Path) -> PlayOutcome;

    /// Record the caller; true if a message was kept
    fn record(&mut self, path: &Path, detect_silence: bool) -> bool;

    fn wait_for_keypress(&mut self, timeout: Duration) -> ScanOutcome;

    /// Put the line back on-hook; false if the hardware complained
    fn hang_up(self) -> bool;
}

impl Line for Modem {
    type Session<'a> = OffHook<'a>;

    fn pick_up(&self) -> Option<OffHook<'_>> {
        Self::pick_up(self)
    }

    fn ring_signal(&self) -> &RingSignal {
        Self::ring_signal(self)
    }
}

impl LineSession for OffHook<'_> {
    fn play(&mut self, path: &Path) -> PlayOutcome {
        Self::play(self, path)
    }

    fn record(&mut self, path: &Path, detect_silence: bool) -> bool {
        Self::record(self, path, detect_silence)
    }

    fn wait_for_keypress(&mut self, timeout: Duration) -> ScanOutcome {
        Self::wait_for_keypress(self, timeout)
    }

    fn hang_up(self) -> bool {
        Self::hang_up(self)
    }
}
