//! Call screening
//!
//! Decides whether a caller is permitted, screened or blocked, and holds
//! the one-shot "permit the next call" override.

mod next_call;
mod patterns;

pub use next_call::FileNextCallFlag;
pub use patterns::{CallerIdPatterns, PatternScreener, ScreeningMode};

use crate::Result;
use crate::modem::CallerRecord;

/// How a caller was classified
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallClass {
    Permitted,
    Screened,
    Blocked,
}

impl CallClass {
    /// Action label used in the call log
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Permitted => "Permitted",
            Self::Screened => "Screened",
            Self::Blocked => "Blocked",
        }
    }
}

impl std::fmt::Display for CallClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Result of classifying a caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub class: CallClass,
    pub reason: String,
}

impl Classification {
    #[must_use]
    pub fn new(class: CallClass, reason: impl Into<String>) -> Self {
        Self {
            class,
            reason: reason.into(),
        }
    }
}

/// What to do with a call once its class is known
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Take the line off-hook
    Answer,
    /// Play the class greeting after answering
    Greeting,
    /// Record a message after the greeting
    RecordMessage,
    /// Offer the voice mail menu after the greeting
    VoiceMail,
    /// Let the call ring out
    Ignore,
}

impl std::str::FromStr for Action {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "answer" => Ok(Self::Answer),
            "greeting" => Ok(Self::Greeting),
            "record_message" => Ok(Self::RecordMessage),
            "voice_mail" => Ok(Self::VoiceMail),
            "ignore" => Ok(Self::Ignore),
            other => Err(crate::Error::Config(format!("unknown action: {other}"))),
        }
    }
}

/// Decides the class of each caller
pub trait Classifier: Send + Sync {
    /// Classify a caller; every caller gets a class
    fn classify(&self, caller: &CallerRecord) -> Classification;

    /// Permit a caller from now on
    ///
    /// # Errors
    ///
    /// Returns error if the permit list cannot be updated
    fn permit(&self, caller: &CallerRecord, reason: &str) -> Result<()>;
}

/// One-shot override that permits the next call
pub trait NextCallFlag: Send + Sync {
    fn is_set(&self) -> bool;

    /// Flip the flag, returning its new state
    ///
    /// # Errors
    ///
    /// Returns error if the flag cannot be changed
    fn toggle(&self) -> Result<bool>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_from_str() {
        assert_eq!("Voice_Mail".parse::<Action>().unwrap(), Action::VoiceMail);
        assert_eq!(" answer ".parse::<Action>().unwrap(), Action::Answer);
        assert!("hangup".parse::<Action>().is_err());
    }

    #[test]
    fn test_class_labels() {
        assert_eq!(CallClass::Permitted.to_string(), "Permitted");
        assert_eq!(CallClass::Blocked.label(), "Blocked");
    }
}
