//! Configuration management for the call attendant

pub mod file;

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::modem::ModemSettings;
use crate::screening::{Action, CallClass, ScreeningMode};
use crate::{Error, Result};

use self::file::{AttendantConfigFile, PolicyFileConfig};

/// Empty pattern lists written when no patterns file exists
const DEFAULT_PATTERNS: &str = "blocknames: {}\nblocknumbers: {}\npermitnames: {}\npermitnumbers: {}\n";

/// Call attendant configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Log modem traffic at debug level
    pub debug: bool,

    /// Root for relative file settings
    pub data_dir: PathBuf,

    /// Standard interval between rings
    pub ring_cadence: Duration,

    /// Folder holding greeting and prompt recordings
    pub notifications_folder: PathBuf,

    /// Modem hardware configuration
    pub modem: ModemConfig,

    /// Screening configuration
    pub screening: ScreeningConfig,

    /// How each class of call is answered
    pub answer: AnswerPolicies,

    /// Voice mail configuration
    pub voice_mail: VoiceMailConfig,
}

/// Modem hardware configuration
#[derive(Debug, Clone)]
pub struct ModemConfig {
    /// Devices to probe; empty probes every serial port
    pub devices: Vec<String>,

    /// Extra AT command sent during initialization
    pub init_string: Option<String>,

    pub baud_rate: u32,

    /// Longest message recording
    pub record_time: Duration,

    /// Pause between going off-hook and playback
    pub playback_delay: Duration,
}

impl ModemConfig {
    /// Settings handed to the modem driver
    #[must_use]
    pub fn settings(&self) -> ModemSettings {
        ModemSettings {
            baud_rate: self.baud_rate,
            init_string: self.init_string.clone(),
            record_limit: self.record_time,
            playback_delay: self.playback_delay,
        }
    }
}

/// Screening configuration
#[derive(Debug, Clone)]
pub struct ScreeningConfig {
    pub mode: ScreeningMode,

    /// YAML file of caller ID patterns
    pub patterns_file: PathBuf,

    /// File whose presence permits the next call
    pub permit_next_call_flag: PathBuf,

    pub permitted_numbers: Vec<String>,

    pub blocked_numbers: Vec<String>,
}

/// How one class of call is handled
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerPolicy {
    pub actions: Vec<Action>,
    pub greeting_file: PathBuf,
    /// Rings to wait before answering; the first ring counts
    pub rings_before_answer: u32,
}

impl AnswerPolicy {
    #[must_use]
    pub fn has(&self, action: Action) -> bool {
        self.actions.contains(&action)
    }
}

/// Answer policies for every call class
#[derive(Debug, Clone)]
pub struct AnswerPolicies {
    pub blocked: AnswerPolicy,
    pub screened: AnswerPolicy,
    pub permitted: AnswerPolicy,
}

impl AnswerPolicies {
    #[must_use]
    pub const fn for_class(&self, class: CallClass) -> &AnswerPolicy {
        match class {
            CallClass::Blocked => &self.blocked,
            CallClass::Screened => &self.screened,
            CallClass::Permitted => &self.permitted,
        }
    }
}

/// Voice mail configuration
#[derive(Debug, Clone)]
pub struct VoiceMailConfig {
    pub goodbye_file: PathBuf,
    pub invalid_response_file: PathBuf,
    pub leave_message_file: PathBuf,
    pub callback_file: PathBuf,

    /// Where recorded messages are written
    pub message_folder: PathBuf,

    /// Wait for each menu keypress
    pub keypress_wait: Duration,

    /// Invalid keypresses allowed before giving up
    pub menu_tries: u32,
}

/// Default data directory: `~/.callattendant`
#[must_use]
pub fn default_data_dir() -> PathBuf {
    directories::BaseDirs::new().map_or_else(
        || PathBuf::from(".callattendant"),
        |d| d.home_dir().join(".callattendant"),
    )
}

impl Config {
    /// Load configuration from an optional TOML file
    ///
    /// `data_dir` overrides the data directory named in the file.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or holds invalid values
    pub fn load(config_file: Option<&Path>, data_dir: Option<PathBuf>) -> Result<Self> {
        let fc = file::load_config_file(config_file)?;
        Self::from_file(fc, data_dir)
    }

    /// Build configuration from a parsed file over the defaults
    ///
    /// Relative file settings resolve against the data directory; prompt
    /// files resolve against the notifications folder.
    ///
    /// # Errors
    ///
    /// Returns error on an unknown screening mode or action
    pub fn from_file(fc: AttendantConfigFile, data_dir: Option<PathBuf>) -> Result<Self> {
        let data_dir = data_dir
            .or_else(|| fc.data_dir.map(PathBuf::from))
            .unwrap_or_else(default_data_dir);
        let notifications_folder =
            resolve(&data_dir, fc.notifications_folder.as_deref().unwrap_or("notifications"));
        let prompt = |name: Option<String>, default: &str| {
            resolve(&notifications_folder, name.as_deref().unwrap_or(default))
        };

        let modem = ModemConfig {
            devices: fc.modem.devices.unwrap_or_default(),
            init_string: fc.modem.init_string.filter(|s| !s.trim().is_empty()),
            baud_rate: fc.modem.baud_rate.unwrap_or(crate::modem::link::DEFAULT_BAUD_RATE),
            record_time: Duration::from_secs(fc.modem.record_time_secs.unwrap_or(120)),
            playback_delay: Duration::from_millis(fc.modem.playback_delay_ms.unwrap_or(1000)),
        };

        let mode = match fc.screening.mode {
            Some(names) => ScreeningMode::from_names(names.as_slice())?,
            None => ScreeningMode::default(),
        };
        let screening = ScreeningConfig {
            mode,
            patterns_file: resolve(
                &data_dir,
                fc.screening.patterns_file.as_deref().unwrap_or("cid_patterns.yaml"),
            ),
            permit_next_call_flag: resolve(
                &data_dir,
                fc.screening
                    .permit_next_call_flag
                    .as_deref()
                    .unwrap_or("permitnextcall.flag"),
            ),
            permitted_numbers: fc.screening.permitted_numbers.unwrap_or_default(),
            blocked_numbers: fc.screening.blocked_numbers.unwrap_or_default(),
        };

        let policy = |fp: PolicyFileConfig, actions: &[Action], greeting: &str| -> Result<AnswerPolicy> {
            let actions = match fp.actions {
                Some(names) => names
                    .iter()
                    .map(|name| name.parse())
                    .collect::<Result<Vec<Action>>>()?,
                None => actions.to_vec(),
            };
            Ok(AnswerPolicy {
                actions,
                greeting_file: prompt(fp.greeting_file, greeting),
                rings_before_answer: fp.rings_before_answer.unwrap_or(0),
            })
        };
        let answer = AnswerPolicies {
            blocked: policy(
                fc.blocked,
                &[Action::Answer, Action::Greeting, Action::VoiceMail],
                "blocked_greeting.wav",
            )?,
            screened: policy(
                fc.screened,
                &[Action::Answer, Action::Greeting, Action::RecordMessage],
                "screener_greeting.wav",
            )?,
            permitted: policy(fc.permitted, &[Action::Ignore], "general_greeting.wav")?,
        };

        let vm = fc.voice_mail;
        let voice_mail = VoiceMailConfig {
            goodbye_file: prompt(vm.goodbye_file, "goodbye.wav"),
            invalid_response_file: prompt(vm.invalid_response_file, "invalid_response.wav"),
            leave_message_file: prompt(vm.leave_message_file, "please_leave_message.wav"),
            callback_file: prompt(vm.callback_file, "thankyou_callback.wav"),
            message_folder: resolve(&data_dir, vm.message_folder.as_deref().unwrap_or("messages")),
            keypress_wait: Duration::from_secs(vm.keypress_wait_secs.unwrap_or(8)),
            menu_tries: vm.menu_tries.unwrap_or(3),
        };

        Ok(Self {
            debug: fc.debug.unwrap_or(false),
            data_dir,
            ring_cadence: Duration::from_secs(fc.ring_cadence_secs.unwrap_or(6)),
            notifications_folder,
            modem,
            screening,
            answer,
            voice_mail,
        })
    }

    /// Check the settings
    ///
    /// Reports every problem at once. Prompt files only need to exist when
    /// an enabled action plays them.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] listing every problem found
    pub fn validate(&self) -> Result<()> {
        let mut problems = Vec::new();

        if self.ring_cadence.is_zero() {
            problems.push("ring_cadence_secs must be positive".to_string());
        }
        if self.modem.baud_rate == 0 {
            problems.push("modem.baud_rate must be positive".to_string());
        }
        if self.modem.record_time.is_zero() {
            problems.push("modem.record_time_secs must be positive".to_string());
        }
        if self.voice_mail.keypress_wait.is_zero() {
            problems.push("voice_mail.keypress_wait_secs must be positive".to_string());
        }
        if self.voice_mail.menu_tries == 0 {
            problems.push("voice_mail.menu_tries must be at least 1".to_string());
        }

        let mut needs_voice_mail = false;
        let mut needs_message_folder = false;
        for (key, policy) in [
            ("blocked", &self.answer.blocked),
            ("screened", &self.answer.screened),
            ("permitted", &self.answer.permitted),
        ] {
            problems.extend(policy_problems(key, policy));

            if !policy.has(Action::Answer) {
                continue;
            }
            if policy.has(Action::Greeting) {
                require_file(&mut problems, &format!("{key}.greeting_file"), &policy.greeting_file);
            }
            needs_voice_mail |= policy.has(Action::VoiceMail);
            needs_message_folder |= policy.has(Action::VoiceMail) || policy.has(Action::RecordMessage);
        }

        if needs_voice_mail {
            let vm = &self.voice_mail;
            require_file(&mut problems, "voice_mail.goodbye_file", &vm.goodbye_file);
            require_file(&mut problems, "voice_mail.invalid_response_file", &vm.invalid_response_file);
            require_file(&mut problems, "voice_mail.leave_message_file", &vm.leave_message_file);
            require_file(&mut problems, "voice_mail.callback_file", &vm.callback_file);
        }
        if needs_message_folder && !self.voice_mail.message_folder.is_dir() {
            problems.push(format!(
                "voice_mail.message_folder not found: {}",
                self.voice_mail.message_folder.display()
            ));
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(Error::Config(problems.join("; ")))
        }
    }

    /// Create the data, notifications and message folders, and an empty
    /// patterns file when none exists
    ///
    /// # Errors
    ///
    /// Returns error if a folder or file cannot be created
    pub fn create_folders(&self) -> Result<()> {
        for dir in [&self.data_dir, &self.notifications_folder, &self.voice_mail.message_folder] {
            std::fs::create_dir_all(dir)?;
        }
        if !self.screening.patterns_file.exists() {
            tracing::info!(path = %self.screening.patterns_file.display(), "creating empty caller id patterns file");
            std::fs::write(&self.screening.patterns_file, DEFAULT_PATTERNS)?;
        }
        Ok(())
    }
}

fn resolve(base: &Path, value: &str) -> PathBuf {
    let path = PathBuf::from(value);
    if path.is_absolute() { path } else { base.join(path) }
}

fn require_file(problems: &mut Vec<String>, key: &str, path: &Path) {
    if !path.is_file() {
        problems.push(format!("{key} not found: {}", path.display()));
    }
}

fn policy_problems(key: &str, policy: &AnswerPolicy) -> Vec<String> {
    let mut problems = Vec::new();
    let answer = policy.has(Action::Answer);
    let ignore = policy.has(Action::Ignore);

    if !answer && !ignore {
        problems.push(format!("{key}.actions must include either 'answer' or 'ignore'"));
    }
    if answer && ignore {
        problems.push(format!("{key}.actions cannot include both 'answer' and 'ignore'"));
    }
    if policy.has(Action::RecordMessage) && policy.has(Action::VoiceMail) {
        problems.push(format!(
            "{key}.actions cannot include both 'record_message' and 'voice_mail'"
        ));
    }
    if ignore
        && [Action::Greeting, Action::RecordMessage, Action::VoiceMail]
            .iter()
            .any(|a| policy.has(*a))
    {
        tracing::warn!(key, "actions besides 'ignore' will not be used");
    }
    problems
}
