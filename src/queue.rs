//! Caller queue between the line reader and the attendant

use tokio::sync::mpsc;

use crate::modem::CallerRecord;

/// One queue slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueEntry {
    Caller(CallerRecord),
    /// Tells the attendant to stop
    Shutdown,
}

/// Producer half, cloned into the line reader and the shutdown path
#[derive(Debug, Clone)]
pub struct CallerSender {
    tx: mpsc::UnboundedSender<QueueEntry>,
}

/// Consumer half, owned by the attendant
#[derive(Debug)]
pub struct CallerQueue {
    rx: mpsc::UnboundedReceiver<QueueEntry>,
}

/// Create an unbounded caller queue
#[must_use]
pub fn caller_queue() -> (CallerSender, CallerQueue) {
    let (tx, rx) = mpsc::unbounded_channel();
    (CallerSender { tx }, CallerQueue { rx })
}

impl CallerSender {
    /// Enqueue a caller
    pub fn push(&self, record: CallerRecord) {
        if self.tx.send(QueueEntry::Caller(record)).is_err() {
            tracing::warn!("attendant is gone; dropping caller");
        }
    }

    /// Enqueue the shutdown sentinel
    pub fn shutdown(&self) {
        // A closed queue means the attendant already stopped
        let _ = self.tx.send(QueueEntry::Shutdown);
    }
}

impl CallerQueue {
    /// Block until the next entry arrives
    ///
    /// Must not be called from async context. A queue whose senders are
    /// all gone reads as [`QueueEntry::Shutdown`].
    pub fn next_blocking(&mut self) -> QueueEntry {
        self.rx.blocking_recv().unwrap_or(QueueEntry::Shutdown)
    }

    /// Whether no entry is waiting
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caller(number: &str) -> CallerRecord {
        CallerRecord {
            number: number.to_string(),
            name: "Test".to_string(),
            date: "0801".to_string(),
            time: "1801".to_string(),
        }
    }

    #[test]
    fn test_entries_come_out_in_order() {
        let (tx, mut rx) = caller_queue();
        assert!(rx.is_empty());

        tx.push(caller("1"));
        tx.push(caller("2"));
        tx.shutdown();
        assert!(!rx.is_empty());

        assert_eq!(rx.next_blocking(), QueueEntry::Caller(caller("1")));
        assert_eq!(rx.next_blocking(), QueueEntry::Caller(caller("2")));
        assert_eq!(rx.next_blocking(), QueueEntry::Shutdown);
        assert!(rx.is_empty());
    }

    #[test]
    fn test_dropped_senders_read_as_shutdown() {
        let (tx, mut rx) = caller_queue();
        drop(tx);
        assert_eq!(rx.next_blocking(), QueueEntry::Shutdown);
    }
}
