//! Call Attendant - screens calls on an analog phone line
//!
//! A voice modem on a serial port delivers caller ID. Each caller is
//! classified against permit and block lists, logged, and then either left
//! to ring or answered with a greeting, a voice mail menu or a message
//! recording.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                     Daemon                            │
//! │   Config  │  Signals  │  Indicators                   │
//! └──────┬───────────────────────────────┬───────────────┘
//!        │                               │
//! ┌──────▼──────────┐   CallerQueue   ┌──▼───────────────┐
//! │  Line reader    ├────────────────►│    Attendant      │
//! │  (caller ID,    │                 │  screening, ring  │
//! │   rings)        │                 │  wait, voice mail │
//! └──────┬──────────┘                 └──┬───────────────┘
//!        │                               │
//! ┌──────▼───────────────────────────────▼───────────────┐
//! │                 Modem (serial link)                   │
//! │   AT commands  │  DLE events  │  8-bit PCM audio      │
//! └──────────────────────────────────────────────────────┘
//! ```

pub mod attendant;
pub mod config;
pub mod daemon;
pub mod error;
pub mod indicator;
pub mod journal;
pub mod modem;
pub mod queue;
pub mod screening;

pub use attendant::{Attendant, Collaborators, Line, LineSession};
pub use config::Config;
pub use daemon::Daemon;
pub use error::{Error, Result};
pub use modem::{CallerRecord, Modem};
