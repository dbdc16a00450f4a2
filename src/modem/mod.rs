//! Voice modem driver
//!
//! A [`Modem`] owns the serial link behind one reentrant lock. Two threads
//! use it:
//!
//! - the line reader ([`Modem::run_reader`]) decodes caller ID and rings
//!   between calls, holding the lock only for one short read at a time
//! - the attendant takes the line off-hook with [`Modem::pick_up`], holding
//!   the lock for the whole call until [`OffHook::hang_up`]
//!
//! Exclusive users announce themselves before locking so the reader drops
//! out of its blocking read and stays out of the way until they are done.

pub mod audio;
pub mod caller_id;
pub mod channel;
pub mod commands;
pub mod dle;
pub mod hook;
pub mod link;
pub mod ring;

use std::cell::RefCell;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::{ReentrantMutex, ReentrantMutexGuard};

pub use audio::{PlayOutcome, ScanOutcome, StopReason};
pub use caller_id::{CallerIdDecoder, CallerRecord};
pub use channel::Response;
pub use commands::{CommandTable, Vendor};
pub use hook::OffHook;
pub use link::{SerialLink, SerialPortLink};
pub use ring::RingSignal;

use crate::indicator::StatusIndicator;
use crate::queue::CallerSender;
use crate::{Error, Result};

/// Per-read timeout while waiting for caller ID; short so partial caller
/// ID is flushed promptly after the line goes quiet
const CALLER_ID_READ_TIMEOUT: Duration = Duration::from_millis(500);

/// Pause while an exclusive user is waiting for the lock
const READER_YIELD: Duration = Duration::from_millis(10);

/// Back-off after a failed read so a dead port does not spin
const READER_ERROR_BACKOFF: Duration = Duration::from_secs(1);

pub(crate) type LinkCell = RefCell<Box<dyn SerialLink>>;

/// Tunables for modem operations
#[derive(Debug, Clone)]
pub struct ModemSettings {
    /// Serial bit rate
    pub baud_rate: u32,
    /// Extra AT string sent during initialization
    pub init_string: Option<String>,
    /// Hard ceiling on a recorded message
    pub record_limit: Duration,
    /// Pause between going off-hook and starting playback
    pub playback_delay: Duration,
}

impl Default for ModemSettings {
    fn default() -> Self {
        Self {
            baud_rate: link::DEFAULT_BAUD_RATE,
            init_string: None,
            record_limit: Duration::from_secs(120),
            playback_delay: Duration::from_secs(1),
        }
    }
}

/// Identity of the detected modem
///
/// Fixed at detection time; a different modem means a new session.
#[derive(Debug, Clone)]
pub struct ModemSession {
    pub vendor: Vendor,
    pub commands: CommandTable,
    pub port: String,
}

/// Lets exclusive users and shutdown cut the reader's blocking read short
#[derive(Debug, Default)]
struct ReadInterrupt {
    waiting: AtomicUsize,
    stopped: AtomicBool,
}

impl ReadInterrupt {
    fn should_yield(&self) -> bool {
        self.waiting.load(Ordering::SeqCst) > 0 || self.is_stopped()
    }

    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

/// A detected and initialized voice modem
pub struct Modem {
    link: ReentrantMutex<LinkCell>,
    session: ModemSession,
    settings: ModemSettings,
    ring: RingSignal,
    interrupt: ReadInterrupt,
}

impl Modem {
    /// Find, detect and initialize a modem on one of `devices`
    ///
    /// An empty device list probes every serial port the OS knows about.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoModem`] if no port answers like a voice modem
    pub fn open(devices: &[String], settings: ModemSettings) -> Result<Self> {
        let ports = link::candidate_ports(devices);

        for port in &ports {
            let serial = match SerialPortLink::open(port, settings.baud_rate) {
                Ok(serial) => serial,
                Err(e) => {
                    tracing::warn!(port, error = %e, "failed to open serial port");
                    continue;
                }
            };

            match Self::detect(Box::new(serial), settings.clone()) {
                Ok(modem) => return Ok(modem),
                Err(e) => tracing::debug!(port, error = %e, "no compatible modem"),
            }
        }

        Err(Error::NoModem(ports.join(", ")))
    }

    /// Detect the modem on `link` and prepare it for use
    ///
    /// # Errors
    ///
    /// Returns error if the link does not answer like a voice modem
    pub fn detect(mut link: Box<dyn SerialLink>, settings: ModemSettings) -> Result<Self> {
        let port = link.name();
        let vendor = channel::detect(&mut *link)
            .ok_or_else(|| Error::Modem(format!("no compatible modem on {port}")))?;

        channel::initialize(&mut *link, &vendor.commands(), settings.init_string.as_deref());
        tracing::info!(port, %vendor, "modem initialized");

        Ok(Self::with_vendor(link, vendor, settings))
    }

    /// Wrap a link whose modem is already known and initialized
    #[must_use]
    pub fn with_vendor(link: Box<dyn SerialLink>, vendor: Vendor, settings: ModemSettings) -> Self {
        let session = ModemSession {
            vendor,
            commands: vendor.commands(),
            port: link.name(),
        };
        Self {
            link: ReentrantMutex::new(RefCell::new(link)),
            session,
            settings,
            ring: RingSignal::new(),
            interrupt: ReadInterrupt::default(),
        }
    }

    #[must_use]
    pub const fn session(&self) -> &ModemSession {
        &self.session
    }

    #[must_use]
    pub const fn settings(&self) -> &ModemSettings {
        &self.settings
    }

    /// Ring notifications produced by the line reader
    #[must_use]
    pub const fn ring_signal(&self) -> &RingSignal {
        &self.ring
    }

    /// Whether the modem is still in service
    #[must_use]
    pub fn is_open(&self) -> bool {
        !self.interrupt.is_stopped()
    }

    /// Send a command and wait for `OK`
    pub fn send(&self, command: &str) -> bool {
        self.with_link(|link| channel::send(link, command))
    }

    /// Send a command and wait for `expected`, returning the response text
    pub fn send_and_read(&self, command: &str, expected: Option<&str>, timeout: Duration) -> Response {
        self.with_link(|link| channel::send_and_read(link, command, expected, timeout))
    }

    /// Wait for a result code without sending anything
    pub fn read_response(&self, expected: &str, timeout: Duration) -> Response {
        self.with_link(|link| channel::read_response(link, expected, timeout))
    }

    /// Stop the line reader and retire the modem
    pub fn stop(&self) {
        self.interrupt.stopped.store(true, Ordering::SeqCst);
    }

    /// Decode caller ID until [`Modem::stop`] is called
    ///
    /// Completed records go to `queue`; every ring sets the ring signal and
    /// blinks `ring_indicator`.
    pub fn run_reader(&self, queue: &CallerSender, ring_indicator: &dyn StatusIndicator) {
        tracing::info!(port = %self.session.port, "line reader started");
        let mut decoder = CallerIdDecoder::new();

        while !self.interrupt.is_stopped() {
            if self.interrupt.should_yield() {
                std::thread::sleep(READER_YIELD);
                continue;
            }

            let read = {
                let guard = self.link.lock();
                let mut link = guard.borrow_mut();
                link::read_line(&mut **link, CALLER_ID_READ_TIMEOUT, &|| {
                    self.interrupt.should_yield()
                })
            };

            let line = match read {
                Ok(line) => line,
                Err(e) => {
                    tracing::error!(error = %e, "line reader failed to read");
                    std::thread::sleep(READER_ERROR_BACKOFF);
                    continue;
                }
            };

            // A cut-short read is not a quiet line
            if line.is_empty() && self.interrupt.should_yield() {
                continue;
            }

            let line = String::from_utf8_lossy(&line);
            let line = line.trim();
            if !line.is_empty() {
                tracing::debug!(line, "modem data");
            }

            let decoded = decoder.feed(line);
            if decoded.ring {
                self.ring.set();
                ring_indicator.blink(1);
            }
            if let Some(record) = decoded.record {
                // The ring that carried this caller ID is already counted
                self.ring.clear();
                tracing::info!(number = %record.number, "queueing call for processing");
                queue.push(record);
            }
        }

        tracing::info!("line reader exiting");
    }

    /// Lock the link for an exclusive user, interrupting the reader first
    pub(crate) fn lock_exclusive(&self) -> ReentrantMutexGuard<'_, LinkCell> {
        self.interrupt.waiting.fetch_add(1, Ordering::SeqCst);
        let guard = self.link.lock();
        self.interrupt.waiting.fetch_sub(1, Ordering::SeqCst);
        guard
    }

    /// Run `f` with the link under the modem lock
    pub(crate) fn with_link<R>(&self, f: impl FnOnce(&mut dyn SerialLink) -> R) -> R {
        let guard = self.lock_exclusive();
        let mut link = guard.borrow_mut();
        f(&mut **link)
    }
}

impl std::fmt::Debug for Modem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Modem")
            .field("session", &self.session)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
