//! Voice playback, recording and DTMF capture
//!
//! All audio is 8-bit unsigned PCM, mono, 8 kHz, which is what both
//! supported chipsets stream once `set_compression` has been sent. Files on
//! disk are WAV containers holding exactly that format.

use std::path::Path;
use std::time::{Duration, Instant};

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use serialport::ClearBuffer;

use super::channel::RESPONSE_TIMEOUT;
use super::commands::{
    CONNECT, END_VOICE_RX, END_VOICE_TX, ENTER_VOICE_MODE, ENTER_VOICE_RECEIVE_STATE,
    ENTER_VOICE_TRANSMIT_STATE, OK, SEND_BEEP, TAD_OFF_HOOK,
};
use super::dle::{self, DleEvent};
use super::hook::OffHook;
use super::link::read_chunk;
use crate::Result;

/// Frames written per playback chunk
const PLAY_CHUNK: usize = 1024;

/// Bytes read per recording chunk
const RECORD_CHUNK: usize = 1024;

/// Longest wait for one recording chunk
const RECORD_CHUNK_TIMEOUT: Duration = Duration::from_secs(3);

/// Consecutive silent chunks that end a recording (5 s)
const SILENT_CHUNK_LIMIT: usize = 40;

/// Samples in this range count as silence
const SILENCE_BAND: std::ops::RangeInclusive<u8> = 126..=129;

/// Longest wait to drain notifications already buffered during playback
const PLAYBACK_POLL: Duration = Duration::from_millis(50);

/// Poll interval while waiting for a keypress
const KEYPRESS_POLL: Duration = Duration::from_millis(100);

const SAMPLE_RATE: u32 = 8000;

/// Result of [`OffHook::play`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayOutcome {
    /// Every frame was sent
    Finished,
    /// Stopped early because a local extension went off-hook
    LocalOffHook,
    /// Stopped early because the caller pressed a key
    Digit(char),
    /// Setup, file or link failure
    Failed,
}

impl PlayOutcome {
    /// Whether playback ran (to completion or a legitimate interruption)
    #[must_use]
    pub const fn is_success(self) -> bool {
        !matches!(self, Self::Failed)
    }
}

/// Why a keypress scan ended without a digit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    LocalOffHook,
    Ring,
    Busy,
    Silence,
    EndOfData,
    /// The modem refused a setup command
    SetupFailed,
    /// Reading from the modem failed
    LinkError,
}

/// Result of [`OffHook::wait_for_keypress`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOutcome {
    Stopped(StopReason),
    TimedOut,
    DigitReceived(char),
}

impl OffHook<'_> {
    /// Play a WAV file down the line
    ///
    /// Stops early on a local off-hook or a keypress. The end-of-transmit
    /// escape is sent whenever transmit state was entered.
    pub fn play(&mut self, path: &Path) -> PlayOutcome {
        tracing::info!(path = %path.display(), "playing audio");
        let modem = self.modem;

        for command in [
            ENTER_VOICE_MODE,
            modem.session.commands.set_compression,
            TAD_OFF_HOOK,
        ] {
            if !modem.send(command) {
                tracing::error!(command, "playback setup failed");
                return PlayOutcome::Failed;
            }
        }

        let frames = match load_frames(path) {
            Ok(frames) => frames,
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "unable to read audio file");
                return PlayOutcome::Failed;
            }
        };

        // Let the line settle before the first frame
        std::thread::sleep(modem.settings.playback_delay);

        if frames.is_empty() {
            tracing::debug!(path = %path.display(), "audio file is empty; nothing to play");
            return PlayOutcome::Finished;
        }

        if !modem
            .send_and_read(ENTER_VOICE_TRANSMIT_STATE, Some(CONNECT), RESPONSE_TIMEOUT)
            .success
        {
            tracing::error!("unable to enter voice transmit state");
            return PlayOutcome::Failed;
        }

        let mut outcome = PlayOutcome::Finished;
        for chunk in frames.chunks(PLAY_CHUNK) {
            if let Err(e) = modem.with_link(|link| link.write_all(chunk)) {
                tracing::error!(error = %e, "failed to write audio");
                outcome = PlayOutcome::Failed;
                break;
            }
            if let Some(interrupt) = self.poll_playback_events() {
                outcome = interrupt;
                break;
            }
        }

        if !modem.send(END_VOICE_TX) {
            tracing::error!("failed to signal end of voice transmit");
        }
        outcome
    }

    /// Record the caller into a WAV file at `path`
    ///
    /// A beep prompts the caller first. Recording ends on a terminal
    /// notification (hang-up, busy, dial tone, end of data, a keypress), on the time
    /// limit, or after 5 s of silence when `detect_silence` is set. Returns
    /// true if the file was kept; a recording made mostly of trailing
    /// silence is deleted.
    pub fn record(&mut self, path: &Path, detect_silence: bool) -> bool {
        tracing::info!(path = %path.display(), "recording audio");
        let modem = self.modem;
        let table = modem.session.commands;

        for command in [
            ENTER_VOICE_MODE,
            table.set_compression,
            table.disable_silence_detection,
            TAD_OFF_HOOK,
            SEND_BEEP,
        ] {
            if !modem.send(command) {
                tracing::error!(command, "recording setup failed");
                return false;
            }
        }

        if !modem
            .send_and_read(ENTER_VOICE_RECEIVE_STATE, Some(CONNECT), RESPONSE_TIMEOUT)
            .success
        {
            tracing::error!("unable to enter voice receive state");
            return false;
        }

        let captured = self.capture(path, detect_silence);
        self.end_receive();

        match captured {
            Ok(kept) => kept,
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "recording failed");
                if let Err(e) = std::fs::remove_file(path) {
                    tracing::debug!(error = %e, "no partial recording to remove");
                }
                false
            }
        }
    }

    /// Wait up to `timeout` for the caller to press a key
    pub fn wait_for_keypress(&mut self, timeout: Duration) -> ScanOutcome {
        tracing::debug!(?timeout, "waiting for keypress");
        let modem = self.modem;

        for command in [
            ENTER_VOICE_MODE,
            modem.session.commands.silence_detection_10s,
            TAD_OFF_HOOK,
        ] {
            if !modem.send(command) {
                tracing::error!(command, "keypress setup failed");
                return ScanOutcome::Stopped(StopReason::SetupFailed);
            }
        }

        let deadline = Instant::now() + timeout;
        let mut data = Vec::new();
        let mut byte = [0u8; 1];

        loop {
            let now = Instant::now();
            if now >= deadline {
                break;
            }

            let read = modem.with_link(|link| link.read(&mut byte, (deadline - now).min(KEYPRESS_POLL)));
            match read {
                Ok(0) => continue,
                Ok(_) => data.push(byte[0]),
                Err(e) => {
                    tracing::error!(error = %e, "failed reading keypress");
                    return ScanOutcome::Stopped(StopReason::LinkError);
                }
            }

            for event in dle::events(&data) {
                let outcome = match event {
                    DleEvent::LocalOffHook => ScanOutcome::Stopped(StopReason::LocalOffHook),
                    DleEvent::Ring => ScanOutcome::Stopped(StopReason::Ring),
                    DleEvent::Busy => ScanOutcome::Stopped(StopReason::Busy),
                    DleEvent::Silence => ScanOutcome::Stopped(StopReason::Silence),
                    DleEvent::EndOfData => ScanOutcome::Stopped(StopReason::EndOfData),
                    DleEvent::Digits(_) => match event.first_digit() {
                        Some(digit) => ScanOutcome::DigitReceived(digit),
                        None => continue,
                    },
                    DleEvent::DialTone | DleEvent::Quiet | DleEvent::Underrun | DleEvent::DigitsPending => {
                        continue;
                    }
                };
                tracing::info!(?outcome, "keypress scan ended");
                return outcome;
            }
        }

        ScanOutcome::TimedOut
    }

    /// Check for notifications that interrupt playback
    fn poll_playback_events(&mut self) -> Option<PlayOutcome> {
        let incoming = self.modem.with_link(|link| match link.bytes_available() {
            // A single byte may be half of a DLE pair
            Ok(n) if n > 1 => read_chunk(link, n, PLAYBACK_POLL).ok(),
            _ => None,
        })?;

        for event in dle::events(&incoming) {
            match event {
                DleEvent::LocalOffHook => {
                    tracing::info!("local extension off hook; stopping playback");
                    return Some(PlayOutcome::LocalOffHook);
                }
                DleEvent::Digits(_) => {
                    if let Some(digit) = event.first_digit() {
                        tracing::info!(%digit, "keypress during playback");
                        return Some(PlayOutcome::Digit(digit));
                    }
                }
                DleEvent::Underrun => {}
                other => tracing::debug!(?other, "notification during playback"),
            }
        }
        None
    }

    /// Stream voice data into `path` until a stop condition
    fn capture(&mut self, path: &Path, detect_silence: bool) -> Result<bool> {
        let modem = self.modem;
        let mut writer = WavWriter::create(path, wav_spec())?;
        let started = Instant::now();
        let mut recorded = 0usize;
        let mut silent_run = 0usize;

        loop {
            let chunk = modem.with_link(|link| read_chunk(link, RECORD_CHUNK, RECORD_CHUNK_TIMEOUT))?;

            if let Some(event) = dle::events(&chunk).find(is_terminal) {
                tracing::info!(?event, "recording stopped by line event");
                break;
            }

            for &byte in &chunk {
                writer.write_sample(to_sample(byte))?;
            }
            recorded += 1;

            if detect_silence {
                if chunk.iter().all(|b| SILENCE_BAND.contains(b)) {
                    silent_run += 1;
                } else {
                    silent_run = 0;
                }
                if silent_run > SILENT_CHUNK_LIMIT {
                    tracing::info!("silence limit reached");
                    break;
                }
            }

            if started.elapsed() > modem.settings.record_limit {
                tracing::info!(limit = ?modem.settings.record_limit, "recording time limit reached");
                break;
            }
        }

        writer.finalize()?;

        let audible = recorded - silent_run;
        if audible > silent_run {
            tracing::info!(chunks = recorded, "recording saved");
            Ok(true)
        } else {
            tracing::info!(audible, silent = silent_run, "recording is mostly silence; discarding");
            std::fs::remove_file(path)?;
            Ok(false)
        }
    }

    /// Leave voice receive state and return to command mode
    fn end_receive(&mut self) {
        let modem = self.modem;
        if let Err(e) = modem.with_link(|link| link.clear(ClearBuffer::Input)) {
            tracing::debug!(error = %e, "failed to clear input after recording");
        }
        if !modem
            .send_and_read(END_VOICE_RX, Some(END_VOICE_TX), RESPONSE_TIMEOUT)
            .success
        {
            tracing::error!("failed to signal end of voice receive");
        }
        if !modem.read_response(OK, RESPONSE_TIMEOUT).success {
            tracing::error!("modem did not return to command mode");
        }
    }
}

/// Events that end a recording
///
/// A keypress aborts the recording; its tones are never written.
fn is_terminal(event: &DleEvent) -> bool {
    matches!(
        event,
        DleEvent::LocalOffHook
            | DleEvent::Busy
            | DleEvent::DialTone
            | DleEvent::EndOfData
            | DleEvent::Digits(_)
            | DleEvent::DigitsPending
    )
}

fn wav_spec() -> WavSpec {
    WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 8,
        sample_format: SampleFormat::Int,
    }
}

/// Unsigned PCM byte to the signed sample `hound` stores
const fn to_sample(byte: u8) -> i8 {
    i8::from_ne_bytes([byte ^ 0x80])
}

/// Signed sample back to the unsigned PCM byte the modem expects
const fn to_byte(sample: i8) -> u8 {
    sample.to_ne_bytes()[0] ^ 0x80
}

/// Read an 8-bit mono WAV file as raw modem frames
fn load_frames(path: &Path) -> Result<Vec<u8>> {
    let reader = WavReader::open(path)?;
    let spec = reader.spec();
    if spec.bits_per_sample != 8 || spec.channels != 1 {
        return Err(crate::Error::Audio(format!(
            "{} must be 8-bit mono, found {}-bit with {} channels",
            path.display(),
            spec.bits_per_sample,
            spec.channels
        )));
    }

    reader
        .into_samples::<i8>()
        .map(|sample| sample.map(to_byte).map_err(crate::Error::from))
        .collect()
}

/// Write raw modem frames as a WAV file
///
/// # Errors
///
/// Returns error if the file cannot be written
pub fn save_frames(path: &Path, frames: &[u8]) -> Result<()> {
    let mut writer = WavWriter::create(path, wav_spec())?;
    for &byte in frames {
        writer.write_sample(to_sample(byte))?;
    }
    writer.finalize()?;
    Ok(())
}
