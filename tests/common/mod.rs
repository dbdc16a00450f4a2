//! Shared test utilities

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serialport::ClearBuffer;

use call_attendant::attendant::{Line, LineSession};
use call_attendant::indicator::{Indicators, StatusIndicator};
use call_attendant::modem::audio::save_frames;
use call_attendant::modem::{
    CallerRecord, Modem, ModemSettings, PlayOutcome, RingSignal, ScanOutcome, SerialLink, Vendor,
};

/// Result code sent for any command without a scripted reply
const DEFAULT_REPLY: &[u8] = b"OK\r\n";

#[derive(Default)]
struct Script {
    inbox: VecDeque<u8>,
    once: HashMap<String, VecDeque<Vec<u8>>>,
    sticky: HashMap<String, Vec<u8>>,
    commands: Vec<String>,
    audio: Vec<u8>,
}

/// A [`SerialLink`] that answers commands from a script
///
/// Writes ending in `<CR>` are commands; anything else is audio. Each
/// command gets its next one-shot reply, else its sticky reply, else `OK`.
/// Clones share the same script so a test can keep a handle after moving
/// the link into a [`Modem`].
#[derive(Clone)]
pub struct ScriptedLink {
    script: Arc<Mutex<Script>>,
}

impl ScriptedLink {
    /// A USR modem that accepts every command
    #[must_use]
    pub fn new() -> Self {
        let link = Self {
            script: Arc::new(Mutex::new(Script::default())),
        };
        link.reply_always("ATI0", b"5601\r\nOK\r\n");
        link.reply_always("AT+VTX", b"CONNECT\r\n");
        link.reply_always("AT+VRX", b"CONNECT\r\n");
        link.reply_always("\u{10}!", b"\x10\x03\r\nOK\r\n");
        link
    }

    /// Reply to the next `command` with `reply`
    pub fn reply_once(&self, command: &str, reply: &[u8]) {
        self.script
            .lock()
            .once
            .entry(command.to_string())
            .or_default()
            .push_back(reply.to_vec());
    }

    /// Reply to every `command` with `reply`
    pub fn reply_always(&self, command: &str, reply: &[u8]) {
        self.script.lock().sticky.insert(command.to_string(), reply.to_vec());
    }

    /// Make bytes arrive unprompted
    pub fn feed(&self, bytes: &[u8]) {
        self.script.lock().inbox.extend(bytes);
    }

    /// Commands written so far, without the `<CR>`
    #[must_use]
    pub fn commands(&self) -> Vec<String> {
        self.script.lock().commands.clone()
    }

    /// How many times `command` was sent
    #[must_use]
    pub fn count(&self, command: &str) -> usize {
        self.script.lock().commands.iter().filter(|c| *c == command).count()
    }

    /// Audio bytes written so far
    #[must_use]
    pub fn audio(&self) -> Vec<u8> {
        self.script.lock().audio.clone()
    }
}

impl Default for ScriptedLink {
    fn default() -> Self {
        Self::new()
    }
}

impl SerialLink for ScriptedLink {
    fn read(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<usize> {
        {
            let mut script = self.script.lock();
            if !script.inbox.is_empty() {
                let n = buf.len().min(script.inbox.len());
                for (slot, byte) in buf.iter_mut().zip(script.inbox.drain(..n)) {
                    *slot = byte;
                }
                return Ok(n);
            }
        }
        std::thread::sleep(timeout.min(Duration::from_millis(1)));
        Ok(0)
    }

    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        let mut guard = self.script.lock();
        let script = &mut *guard;
        let Some((b'\r', command)) = bytes.split_last() else {
            script.audio.extend_from_slice(bytes);
            return Ok(());
        };

        let command = String::from_utf8_lossy(command).into_owned();
        let reply = script
            .once
            .get_mut(&command)
            .and_then(VecDeque::pop_front)
            .or_else(|| script.sticky.get(&command).cloned())
            .unwrap_or_else(|| DEFAULT_REPLY.to_vec());
        script.inbox.extend(reply);
        script.commands.push(command);
        Ok(())
    }

    fn bytes_available(&mut self) -> io::Result<usize> {
        Ok(self.script.lock().inbox.len())
    }

    fn clear(&mut self, buffer: ClearBuffer) -> io::Result<()> {
        if matches!(buffer, ClearBuffer::Input | ClearBuffer::All) {
            self.script.lock().inbox.clear();
        }
        Ok(())
    }

    fn name(&self) -> String {
        "scripted".to_string()
    }
}

/// Settings with no playback pause
#[must_use]
pub fn quick_settings() -> ModemSettings {
    ModemSettings {
        playback_delay: Duration::ZERO,
        ..ModemSettings::default()
    }
}

/// A USR modem on a scripted link, skipping detection
#[must_use]
pub fn scripted_modem(link: &ScriptedLink) -> Modem {
    Modem::with_vendor(Box::new(link.clone()), Vendor::UsRobotics, quick_settings())
}

/// Write `len` frames of `byte` as a prompt file
pub fn write_prompt(path: &Path, byte: u8, len: usize) {
    save_frames(path, &vec![byte; len]).expect("failed to write prompt");
}

#[must_use]
pub fn caller(number: &str, name: &str) -> CallerRecord {
    CallerRecord {
        number: number.to_string(),
        name: name.to_string(),
        date: "0801".to_string(),
        time: "1801".to_string(),
    }
}

/// What happened on a [`FakeLine`], in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineEvent {
    PickUp,
    Play(String),
    Record,
    Keypress,
    HangUp,
}

/// A [`Line`] that plays back scripted caller behaviour
#[derive(Default)]
pub struct FakeLine {
    ring: RingSignal,
    events: Mutex<Vec<LineEvent>>,
    keypresses: Mutex<VecDeque<ScanOutcome>>,
    play_outcome: Mutex<Option<PlayOutcome>>,
    leaves_message: Mutex<bool>,
}

impl FakeLine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue what the caller does at the next keypress prompts
    pub fn press(&self, outcomes: impl IntoIterator<Item = ScanOutcome>) {
        self.keypresses.lock().extend(outcomes);
    }

    /// Every play returns `outcome`
    pub fn play_returns(&self, outcome: PlayOutcome) {
        *self.play_outcome.lock() = Some(outcome);
    }

    /// The caller speaks when recorded
    pub fn leaves_message(&self) {
        *self.leaves_message.lock() = true;
    }

    #[must_use]
    pub fn events(&self) -> Vec<LineEvent> {
        self.events.lock().clone()
    }

    #[must_use]
    pub fn count(&self, event: &LineEvent) -> usize {
        self.events.lock().iter().filter(|e| *e == event).count()
    }

    fn push(&self, event: LineEvent) {
        self.events.lock().push(event);
    }
}

impl Line for FakeLine {
    type Session<'a> = FakeSession<'a>;

    fn pick_up(&self) -> Option<FakeSession<'_>> {
        self.push(LineEvent::PickUp);
        Some(FakeSession { line: self })
    }

    fn ring_signal(&self) -> &RingSignal {
        &self.ring
    }
}

/// An answered call on a [`FakeLine`]
pub struct FakeSession<'a> {
    line: &'a FakeLine,
}

impl LineSession for FakeSession<'_> {
    fn play(&mut self, path: &Path) -> PlayOutcome {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.line.push(LineEvent::Play(name));
        let outcome = *self.line.play_outcome.lock();
        outcome.unwrap_or(PlayOutcome::Finished)
    }

    fn record(&mut self, path: &Path, _detect_silence: bool) -> bool {
        self.line.push(LineEvent::Record);
        let speaks = *self.line.leaves_message.lock();
        if speaks {
            write_prompt(path, 0x40, 800);
            true
        } else {
            false
        }
    }

    fn wait_for_keypress(&mut self, _timeout: Duration) -> ScanOutcome {
        self.line.push(LineEvent::Keypress);
        self.line
            .keypresses
            .lock()
            .pop_front()
            .unwrap_or(ScanOutcome::TimedOut)
    }

    fn hang_up(self) -> bool {
        self.line.push(LineEvent::HangUp);
        true
    }
}

/// Indicator that remembers what it was told
#[derive(Debug, Default)]
pub struct RecordingIndicator {
    calls: Mutex<Vec<String>>,
}

impl RecordingIndicator {
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

impl StatusIndicator for RecordingIndicator {
    fn turn_on(&self) {
        self.calls.lock().push("on".to_string());
    }

    fn turn_off(&self) {
        self.calls.lock().push("off".to_string());
    }

    fn blink(&self, count: u32) {
        self.calls.lock().push(format!("blink {count}"));
    }

    fn pulse(&self) {
        self.calls.lock().push("pulse".to_string());
    }

    fn close(&self) {
        self.calls.lock().push("close".to_string());
    }
}

/// Indicators whose message light can be inspected
#[must_use]
pub fn recording_indicators() -> (Indicators, Arc<RecordingIndicator>) {
    let message = Arc::new(RecordingIndicator::default());
    let indicators = Indicators {
        message: Arc::clone(&message) as Arc<dyn StatusIndicator>,
        ..Indicators::logging()
    };
    (indicators, message)
}

/// Scratch data folder with every prompt file in place
#[must_use]
pub fn data_dir_with_prompts() -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let notifications = dir.path().join("notifications");
    std::fs::create_dir_all(&notifications).expect("failed to create notifications");
    std::fs::create_dir_all(dir.path().join("messages")).expect("failed to create messages");
    for name in [
        "blocked_greeting.wav",
        "screener_greeting.wav",
        "general_greeting.wav",
        "goodbye.wav",
        "invalid_response.wav",
        "please_leave_message.wav",
        "thankyou_callback.wav",
    ] {
        write_prompt(&notifications.join(name), 0x40, 80);
    }
    let path = dir.path().to_path_buf();
    (dir, path)
}
