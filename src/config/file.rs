//! TOML configuration file loading
//!
//! Supports `~/.config/callattendant/config.toml` as a persistent config
//! source. All fields are optional; the file is a partial overlay on top
//! of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::{Error, Result};

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AttendantConfigFile {
    /// Verbose modem tracing
    pub debug: Option<bool>,

    /// Root for relative file settings
    pub data_dir: Option<String>,

    /// Standard ring cadence in seconds
    pub ring_cadence_secs: Option<u64>,

    /// Folder holding greeting and prompt recordings
    pub notifications_folder: Option<String>,

    #[serde(default)]
    pub modem: ModemFileConfig,

    #[serde(default)]
    pub screening: ScreeningFileConfig,

    #[serde(default)]
    pub blocked: PolicyFileConfig,

    #[serde(default)]
    pub screened: PolicyFileConfig,

    #[serde(default)]
    pub permitted: PolicyFileConfig,

    #[serde(default)]
    pub voice_mail: VoiceMailFileConfig,
}

/// Modem hardware configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModemFileConfig {
    /// Serial devices to probe (empty = every port)
    pub devices: Option<Vec<String>>,

    /// Extra AT command sent during initialization
    pub init_string: Option<String>,

    pub baud_rate: Option<u32>,

    /// Longest message recording in seconds
    pub record_time_secs: Option<u64>,

    /// Pause before playback in milliseconds
    pub playback_delay_ms: Option<u64>,
}

/// Screening configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScreeningFileConfig {
    /// Lists to consult: "whitelist", "blacklist"
    pub mode: Option<Vec<String>>,

    /// YAML file of caller ID patterns
    pub patterns_file: Option<String>,

    /// File whose presence permits the next call
    pub permit_next_call_flag: Option<String>,

    pub permitted_numbers: Option<Vec<String>>,

    pub blocked_numbers: Option<Vec<String>>,
}

/// Answer policy for one call class
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyFileConfig {
    /// e.g. ["answer", "greeting", "voice_mail"]
    pub actions: Option<Vec<String>>,

    pub greeting_file: Option<String>,

    pub rings_before_answer: Option<u32>,
}

/// Voice mail configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VoiceMailFileConfig {
    pub goodbye_file: Option<String>,
    pub invalid_response_file: Option<String>,
    pub leave_message_file: Option<String>,
    pub callback_file: Option<String>,
    pub message_folder: Option<String>,

    /// Seconds to wait for each menu keypress
    pub keypress_wait_secs: Option<u64>,

    /// Invalid keypresses allowed before giving up
    pub menu_tries: Option<u32>,
}

/// Load the TOML config file
///
/// An explicit `path` must exist. Without one the standard path is used,
/// and a missing file there yields `AttendantConfigFile::default()`.
///
/// # Errors
///
/// Returns error if the file cannot be read or parsed
pub fn load_config_file(path: Option<&Path>) -> Result<AttendantConfigFile> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => match config_file_path() {
            Some(path) if path.exists() => path,
            _ => return Ok(AttendantConfigFile::default()),
        },
    };

    let content = std::fs::read_to_string(&path)
        .map_err(|e| Error::Config(format!("failed to read {}: {e}", path.display())))?;
    let config = parse(&content)?;
    tracing::info!(path = %path.display(), "loaded config file");
    Ok(config)
}

/// Parse config file text
///
/// # Errors
///
/// Returns error if the text is not a valid config file
pub fn parse(content: &str) -> Result<AttendantConfigFile> {
    Ok(toml::from_str(content)?)
}

/// Return the config file path: `~/.config/callattendant/config.toml`
#[must_use]
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("callattendant").join("config.toml"))
}
