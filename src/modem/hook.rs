//! Off-hook ownership of the line
//!
//! [`Modem::pick_up`] returns an [`OffHook`] guard that holds the modem lock
//! for as long as the line is off-hook. Hanging up (explicitly or by
//! dropping the guard) always puts the line back on-hook and releases the
//! lock, whether or not the modem acknowledged.

use parking_lot::ReentrantMutexGuard;
use serialport::ClearBuffer;

use super::commands::{ENTER_VOICE_MODE, GO_ON_HOOK, TAD_OFF_HOOK};
use super::{LinkCell, Modem, channel};

impl Modem {
    /// Take the line off-hook for a call
    ///
    /// Blocks until no other party holds the modem. Returns `None` if any
    /// setup command fails; the lock is released in that case.
    pub fn pick_up(&self) -> Option<OffHook<'_>> {
        tracing::debug!("going off hook");
        let guard = self.lock_exclusive();

        let steps = [
            (ENTER_VOICE_MODE, "failed to put modem into voice mode"),
            (
                self.session.commands.disable_silence_detection,
                "failed to disable silence detection",
            ),
            (TAD_OFF_HOOK, "unable to go off hook"),
        ];
        for (command, failure) in steps {
            if !self.send(command) {
                tracing::error!(command, "{failure}");
                return None;
            }
        }

        Some(OffHook {
            modem: self,
            guard: Some(guard),
        })
    }
}

/// The line is off-hook and this guard owns the modem
///
/// Audio operations live on the guard so they can only run mid-call.
pub struct OffHook<'a> {
    pub(super) modem: &'a Modem,
    guard: Option<ReentrantMutexGuard<'a, LinkCell>>,
}

impl OffHook<'_> {
    /// Put the line back on-hook and release the modem
    ///
    /// Returns false if the modem did not acknowledge; the lock is released
    /// either way.
    pub fn hang_up(mut self) -> bool {
        self.release()
    }

    fn release(&mut self) -> bool {
        let Some(guard) = self.guard.take() else {
            return true;
        };

        tracing::debug!("going on hook");
        let on_hook = self.modem.with_link(|link| {
            if let Err(e) = link.clear(ClearBuffer::All) {
                tracing::debug!(error = %e, "failed to clear buffers before hang up");
            }
            channel::send(link, GO_ON_HOOK)
        });
        if !on_hook {
            tracing::error!("error hanging up");
        }

        drop(guard);
        on_hook
    }
}

impl Drop for OffHook<'_> {
    fn drop(&mut self) {
        if self.guard.is_some() {
            tracing::warn!("line left off hook; hanging up");
            self.release();
        }
    }
}

impl std::fmt::Debug for OffHook<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OffHook")
            .field("port", &self.modem.session.port)
            .field("off_hook", &self.guard.is_some())
            .finish()
    }
}
