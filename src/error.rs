//! Error types for the call attendant

use thiserror::Error;

/// Result type alias for call attendant operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the call attendant
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// No compatible modem was found on any candidate port
    #[error("no compatible modem found (tried: {0})")]
    NoModem(String),

    /// Modem protocol error
    #[error("modem error: {0}")]
    Modem(String),

    /// Audio file error
    #[error("audio error: {0}")]
    Audio(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serial port error
    #[error("serial error: {0}")]
    Serial(#[from] serialport::Error),

    /// WAV encoding/decoding error
    #[error("wav error: {0}")]
    Wav(#[from] hound::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),

    /// YAML parsing error
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Invalid caller-id pattern
    #[error("pattern error: {0}")]
    Pattern(#[from] regex::Error),
}
