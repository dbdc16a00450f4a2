//! The call attendant
//!
//! Takes callers off the queue one at a time, screens them, lets the phone
//! ring as configured, then answers and runs the configured actions.

mod line;
pub mod ring_wait;
pub mod voice_mail;

use std::path::PathBuf;
use std::sync::Arc;

pub use line::{Line, LineSession};
pub use ring_wait::RingWait;
pub use voice_mail::VoiceMail;

use crate::Result;
use crate::config::{AnswerPolicies, AnswerPolicy, Config, VoiceMailConfig};
use crate::indicator::Indicators;
use crate::journal::{CallLogger, MessageStore};
use crate::modem::{CallerRecord, PlayOutcome};
use crate::queue::{CallerQueue, QueueEntry};
use crate::screening::{Action, CallClass, Classification, Classifier, NextCallFlag};

/// Blinks shown when a permitted or blocked caller is detected
const DETECTED_BLINKS: u32 = 10;

/// Reason logged when the next-call override admits a caller
pub const NEXT_CALLER_REASON: &str = "Next Caller Flag";

/// How one call will be handled
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub class: CallClass,
    pub reason: String,
    pub actions: Vec<Action>,
    pub greeting_file: PathBuf,
    pub rings_before_answer: u32,
}

impl Decision {
    #[must_use]
    pub fn new(classification: Classification, policy: &AnswerPolicy) -> Self {
        Self {
            class: classification.class,
            reason: classification.reason,
            actions: policy.actions.clone(),
            greeting_file: policy.greeting_file.clone(),
            rings_before_answer: policy.rings_before_answer,
        }
    }

    #[must_use]
    pub fn has(&self, action: Action) -> bool {
        self.actions.contains(&action)
    }
}

/// External services the attendant reports to
#[derive(Clone)]
pub struct Collaborators {
    pub classifier: Arc<dyn Classifier>,
    pub logger: Arc<dyn CallLogger>,
    pub messages: Arc<dyn MessageStore>,
    pub next_call: Arc<dyn NextCallFlag>,
    pub indicators: Indicators,
}

/// Answers calls arriving on a [`Line`]
pub struct Attendant<L: Line> {
    line: Arc<L>,
    queue: CallerQueue,
    services: Collaborators,
    policies: AnswerPolicies,
    voice_mail: VoiceMailConfig,
    ring_wait: RingWait,
}

impl<L: Line> Attendant<L> {
    #[must_use]
    pub fn new(line: Arc<L>, queue: CallerQueue, services: Collaborators, config: &Config) -> Self {
        Self {
            line,
            queue,
            services,
            policies: config.answer.clone(),
            voice_mail: config.voice_mail.clone(),
            ring_wait: RingWait::new(config.ring_cadence, ring_wait::RING_POLL),
        }
    }

    /// Replace the ring timer
    #[must_use]
    pub fn with_ring_wait(mut self, ring_wait: RingWait) -> Self {
        self.ring_wait = ring_wait;
        self
    }

    /// Handle callers until the shutdown sentinel arrives
    ///
    /// Blocks the calling thread.
    ///
    /// # Errors
    ///
    /// Returns the first collaborator error; the loop stops there
    pub fn run(mut self) -> Result<()> {
        tracing::info!("waiting for call");
        self.services.indicators.approved.blink(2);

        loop {
            match self.queue.next_blocking() {
                QueueEntry::Shutdown => break,
                QueueEntry::Caller(caller) => {
                    self.handle_call(&caller)?;
                    tracing::info!("waiting for next call");
                }
            }
        }

        tracing::info!("attendant stopped");
        Ok(())
    }

    /// Screen, log and (maybe) answer one call
    ///
    /// # Errors
    ///
    /// Returns error if a collaborator fails
    pub fn handle_call(&self, caller: &CallerRecord) -> Result<()> {
        tracing::info!(number = %caller.number, name = %caller.name, "incoming call");

        let decision = self.decide(caller)?;
        let call_id = self
            .services
            .logger
            .log(caller, decision.class.label(), &decision.reason)?;
        tracing::info!(
            call_id,
            number = %caller.number,
            class = %decision.class,
            reason = %decision.reason,
            "call screened"
        );

        let ok_to_answer = self.ring_wait.wait(
            self.line.ring_signal(),
            &self.queue,
            decision.rings_before_answer,
        );

        if ok_to_answer && decision.has(Action::Answer) {
            self.answer(&decision, call_id, caller)
        } else {
            tracing::info!(call_id, "ignoring call");
            Ok(())
        }
    }

    fn decide(&self, caller: &CallerRecord) -> Result<Decision> {
        let next_call = &self.services.next_call;
        let classification = if next_call.is_set() {
            next_call.toggle()?;
            Classification::new(CallClass::Permitted, NEXT_CALLER_REASON)
        } else {
            self.services.classifier.classify(caller)
        };

        match classification.class {
            CallClass::Permitted => self.services.indicators.approved.blink(DETECTED_BLINKS),
            CallClass::Blocked => self.services.indicators.blocked.blink(DETECTED_BLINKS),
            CallClass::Screened => {}
        }

        let policy = self.policies.for_class(classification.class);
        Ok(Decision::new(classification, policy))
    }

    /// Go off-hook, run the actions and hang up on every path
    fn answer(&self, decision: &Decision, call_id: u64, caller: &CallerRecord) -> Result<()> {
        let Some(mut session) = self.line.pick_up() else {
            tracing::error!(call_id, "unable to answer call");
            return Ok(());
        };

        let result = self.run_actions(&mut session, decision, call_id, caller);
        if !session.hang_up() {
            tracing::warn!(call_id, "line did not acknowledge hang up");
        }
        result
    }

    fn run_actions(
        &self,
        session: &mut L::Session<'_>,
        decision: &Decision,
        call_id: u64,
        caller: &CallerRecord,
    ) -> Result<()> {
        if decision.has(Action::Greeting) {
            tracing::info!(call_id, "playing greeting");
            match session.play(&decision.greeting_file) {
                PlayOutcome::Failed | PlayOutcome::LocalOffHook => return Ok(()),
                PlayOutcome::Finished | PlayOutcome::Digit(_) => {}
            }
        }

        let voice_mail = VoiceMail {
            config: &self.voice_mail,
            messages: self.services.messages.as_ref(),
            classifier: self.services.classifier.as_ref(),
            indicator: self.services.indicators.message.as_ref(),
        };

        if decision.has(Action::RecordMessage) {
            tracing::info!(call_id, "recording message");
            voice_mail.record_message(session, call_id, caller, None)?;
        } else if decision.has(Action::VoiceMail) {
            tracing::info!(call_id, "starting voice mail");
            voice_mail.menu(session, call_id, caller)?;
        }
        Ok(())
    }
}

impl<L: Line> std::fmt::Debug for Attendant<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Attendant")
            .field("policies", &self.policies)
            .field("ring_wait", &self.ring_wait)
            .finish_non_exhaustive()
    }
}
