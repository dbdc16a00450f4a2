//! Status indicators
//!
//! Hardware drivers (LEDs, MQTT, seven-segment displays) live outside this
//! crate; [`LogIndicator`] reports state changes through tracing instead.

use std::sync::Arc;

/// A visual status indicator
pub trait StatusIndicator: Send + Sync {
    fn turn_on(&self);

    fn turn_off(&self);

    /// Blink `times` times, then return to the previous state
    fn blink(&self, times: u32);

    /// Pulse continuously until turned off
    fn pulse(&self);

    /// Release the indicator
    fn close(&self);
}

/// Indicator that only logs
#[derive(Debug, Clone)]
pub struct LogIndicator {
    name: &'static str,
}

impl LogIndicator {
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self { name }
    }
}

impl StatusIndicator for LogIndicator {
    fn turn_on(&self) {
        tracing::debug!(indicator = self.name, "on");
    }

    fn turn_off(&self) {
        tracing::debug!(indicator = self.name, "off");
    }

    fn blink(&self, times: u32) {
        tracing::debug!(indicator = self.name, times, "blink");
    }

    fn pulse(&self) {
        tracing::debug!(indicator = self.name, "pulse");
    }

    fn close(&self) {
        tracing::debug!(indicator = self.name, "closed");
    }
}

/// The indicators the attendant drives
#[derive(Clone)]
pub struct Indicators {
    /// Blinks on every ring
    pub ring: Arc<dyn StatusIndicator>,
    /// Blinks when a permitted caller is detected
    pub approved: Arc<dyn StatusIndicator>,
    /// Blinks when a blocked caller is detected
    pub blocked: Arc<dyn StatusIndicator>,
    /// On while recording, pulsing while messages are unplayed
    pub message: Arc<dyn StatusIndicator>,
}

impl Indicators {
    /// Logging indicators for every slot
    #[must_use]
    pub fn logging() -> Self {
        Self {
            ring: Arc::new(LogIndicator::new("ring")),
            approved: Arc::new(LogIndicator::new("approved")),
            blocked: Arc::new(LogIndicator::new("blocked")),
            message: Arc::new(LogIndicator::new("message")),
        }
    }

    /// Close every indicator
    pub fn close(&self) {
        self.ring.close();
        self.approved.close();
        self.blocked.close();
        self.message.close();
    }
}

impl Default for Indicators {
    fn default() -> Self {
        Self::logging()
    }
}

impl std::fmt::Debug for Indicators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Indicators").finish_non_exhaustive()
    }
}
