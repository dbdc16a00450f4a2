//! Call log and message store
//!
//! The attendant only needs identifiers back from these collaborators.
//! [`Journal`] keeps everything in memory for the lifetime of the process;
//! durable backends implement the same traits.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use parking_lot::Mutex;

use crate::Result;
use crate::modem::CallerRecord;

/// Records every screened call
pub trait CallLogger: Send + Sync {
    /// Log a call and return its identifier
    ///
    /// # Errors
    ///
    /// Returns error if the call cannot be recorded
    fn log(&self, caller: &CallerRecord, action: &str, reason: &str) -> Result<u64>;
}

/// Stores recorded voice messages
pub trait MessageStore: Send + Sync {
    /// Register a recording for a call and return the message identifier
    ///
    /// # Errors
    ///
    /// Returns error if the message cannot be stored
    fn save(&self, call_id: u64, caller: &CallerRecord, path: &Path) -> Result<u64>;

    /// Number of messages nobody has listened to yet
    ///
    /// # Errors
    ///
    /// Returns error if the store cannot be queried
    fn unplayed_count(&self) -> Result<usize>;
}

/// A logged call
#[derive(Debug, Clone)]
pub struct CallEntry {
    pub id: u64,
    pub caller: CallerRecord,
    pub action: String,
    pub reason: String,
    pub logged_at: DateTime<Local>,
}

/// A stored voice message
#[derive(Debug, Clone)]
pub struct MessageEntry {
    pub id: u64,
    pub call_id: u64,
    pub caller: CallerRecord,
    pub path: PathBuf,
    pub played: bool,
}

/// In-memory call log and message store
#[derive(Debug, Default)]
pub struct Journal {
    calls: Mutex<Vec<CallEntry>>,
    messages: Mutex<Vec<MessageEntry>>,
}

impl Journal {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the call log, oldest first
    #[must_use]
    pub fn calls(&self) -> Vec<CallEntry> {
        self.calls.lock().clone()
    }

    /// Snapshot of stored messages, oldest first
    #[must_use]
    pub fn messages(&self) -> Vec<MessageEntry> {
        self.messages.lock().clone()
    }

    /// Mark a message as played; returns false for an unknown id
    pub fn mark_played(&self, message_id: u64) -> bool {
        let mut messages = self.messages.lock();
        match messages.iter_mut().find(|m| m.id == message_id) {
            Some(message) => {
                message.played = true;
                true
            }
            None => false,
        }
    }
}

impl CallLogger for Journal {
    fn log(&self, caller: &CallerRecord, action: &str, reason: &str) -> Result<u64> {
        let mut calls = self.calls.lock();
        let id = calls.last().map_or(1, |c| c.id + 1);
        calls.push(CallEntry {
            id,
            caller: caller.clone(),
            action: action.to_string(),
            reason: reason.to_string(),
            logged_at: Local::now(),
        });

        tracing::info!(call_id = id, number = %caller.number, action, reason, "call logged");
        Ok(id)
    }
}

impl MessageStore for Journal {
    fn save(&self, call_id: u64, caller: &CallerRecord, path: &Path) -> Result<u64> {
        let mut messages = self.messages.lock();
        let id = messages.last().map_or(1, |m| m.id + 1);
        messages.push(MessageEntry {
            id,
            call_id,
            caller: caller.clone(),
            path: path.to_path_buf(),
            played: false,
        });

        tracing::info!(message_id = id, call_id, path = %path.display(), "message stored");
        Ok(id)
    }

    fn unplayed_count(&self) -> Result<usize> {
        Ok(self.messages.lock().iter().filter(|m| !m.played).count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caller() -> CallerRecord {
        CallerRecord {
            number: "8055554567".to_string(),
            name: "Test1".to_string(),
            date: "0801".to_string(),
            time: "1801".to_string(),
        }
    }

    #[test]
    fn test_call_ids_increase() {
        let journal = Journal::new();
        assert_eq!(journal.log(&caller(), "Permitted", "whitelist").unwrap(), 1);
        assert_eq!(journal.log(&caller(), "Blocked", "blacklist").unwrap(), 2);

        let calls = journal.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].action, "Blocked");
    }

    #[test]
    fn test_unplayed_count_tracks_played_flag() {
        let journal = Journal::new();
        let first = journal.save(1, &caller(), Path::new("/tmp/a.wav")).unwrap();
        journal.save(2, &caller(), Path::new("/tmp/b.wav")).unwrap();
        assert_eq!(journal.unplayed_count().unwrap(), 2);

        assert!(journal.mark_played(first));
        assert!(!journal.mark_played(99));
        assert_eq!(journal.unplayed_count().unwrap(), 1);
    }
}
