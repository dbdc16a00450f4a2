//! Voice mail menu and message recording

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use super::line::LineSession;
use crate::Result;
use crate::config::VoiceMailConfig;
use crate::indicator::StatusIndicator;
use crate::journal::MessageStore;
use crate::modem::{CallerRecord, ScanOutcome};
use crate::screening::Classifier;

/// Blinks shown while the caller is in the menu
const MENU_BLINKS: u32 = 10;

/// Voice mail flows for one answered call
pub struct VoiceMail<'a> {
    pub config: &'a VoiceMailConfig,
    pub messages: &'a dyn MessageStore,
    pub classifier: &'a dyn Classifier,
    pub indicator: &'a dyn StatusIndicator,
}

impl VoiceMail<'_> {
    /// Offer the caller the voice mail menu
    ///
    /// `1` leaves a message, `0` asks for a callback (and permits the
    /// caller from now on). Anything else replays the invalid-response
    /// prompt, up to the configured number of tries. Silence, a hang-up or
    /// a timeout ends the menu. The goodbye prompt always plays last.
    ///
    /// # Errors
    ///
    /// Returns error if the message store or classifier fails
    pub fn menu<S: LineSession>(&self, session: &mut S, call_id: u64, caller: &CallerRecord) -> Result<()> {
        self.indicator.blink(MENU_BLINKS);

        let mut tries = 0;
        let mut recorded = false;
        while tries < self.config.menu_tries {
            match session.wait_for_keypress(self.config.keypress_wait) {
                ScanOutcome::DigitReceived('1') => {
                    self.record_message(session, call_id, caller, Some(self.config.leave_message_file.as_path()))?;
                    recorded = true;
                    break;
                }
                ScanOutcome::DigitReceived('0') => {
                    session.play(&self.config.callback_file);
                    self.classifier.permit(caller, "Caller pressed 0")?;
                    break;
                }
                ScanOutcome::DigitReceived(digit) => {
                    tracing::debug!(%digit, "invalid menu choice");
                    session.play(&self.config.invalid_response_file);
                    tries += 1;
                }
                outcome => {
                    tracing::debug!(?outcome, "voice mail menu ended without a choice");
                    break;
                }
            }
        }

        session.play(&self.config.goodbye_file);
        if !recorded {
            self.refresh_indicator()?;
        }
        Ok(())
    }

    /// Record a message from the caller
    ///
    /// Plays `prompt` first when given. Returns the message id if a message
    /// was kept.
    ///
    /// # Errors
    ///
    /// Returns error if the message store fails
    pub fn record_message<S: LineSession>(
        &self,
        session: &mut S,
        call_id: u64,
        caller: &CallerRecord,
        prompt: Option<&Path>,
    ) -> Result<Option<u64>> {
        let path = self.message_path(call_id, caller, Local::now());

        if let Some(prompt) = prompt {
            session.play(prompt);
        }

        self.indicator.turn_on();
        let saved = if session.record(&path, true) {
            let message_id = self.messages.save(call_id, caller, &path)?;
            tracing::info!(message_id, path = %path.display(), "message recorded");
            Some(message_id)
        } else {
            tracing::info!(call_id, "no message left");
            None
        };

        self.refresh_indicator()?;
        Ok(saved)
    }

    /// Show whether unplayed messages are waiting
    ///
    /// # Errors
    ///
    /// Returns error if the message store cannot be queried
    pub fn refresh_indicator(&self) -> Result<()> {
        let unplayed = self.messages.unplayed_count()?;
        tracing::debug!(unplayed, "refreshing message indicator");
        if unplayed > 0 {
            self.indicator.pulse();
        } else {
            self.indicator.turn_off();
        }
        Ok(())
    }

    /// `<call>_<number>_<name>_<MMDDYY_HHMM>.wav` in the message folder
    #[must_use]
    pub fn message_path(&self, call_id: u64, caller: &CallerRecord, now: DateTime<Local>) -> PathBuf {
        let file_name = format!(
            "{call_id}_{}_{}_{}.wav",
            file_safe(&caller.number),
            file_safe(&caller.name),
            now.format("%m%d%y_%H%M")
        );
        self.config.message_folder.join(file_name)
    }
}

/// Keep a caller ID field from adding separators or directories
fn file_safe(field: &str) -> String {
    field
        .chars()
        .map(|c| match c {
            '_' | '/' | '\\' => '-',
            c => c,
        })
        .collect()
}
