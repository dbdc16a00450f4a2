//! Command/response protocol over a [`SerialLink`]
//!
//! These functions assume the caller already holds the modem lock; the
//! [`Modem`](super::Modem) wrappers take care of that.

use std::time::{Duration, Instant};

use serialport::ClearBuffer;

use super::commands::{self, CommandTable, Vendor};
use super::link::{SerialLink, read_line};

/// Default time to wait for a command's result code
pub const RESPONSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Outcome of a command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Response {
    /// Whether the expected result code arrived
    pub success: bool,
    /// Everything read up to and including the result code
    pub text: String,
}

/// Send `command` terminated by `<CR>` and wait for `expected`
///
/// With `expected == None` the command is fire-and-forget and succeeds as
/// soon as it has been written.
pub fn send_and_read(
    link: &mut dyn SerialLink,
    command: &str,
    expected: Option<&str>,
    timeout: Duration,
) -> Response {
    tracing::trace!(command = %printable(command), ?expected, "sending command");

    let mut framed = Vec::with_capacity(command.len() + 1);
    framed.extend_from_slice(command.as_bytes());
    framed.push(b'\r');

    if let Err(e) = link.write_all(&framed) {
        tracing::error!(command = %printable(command), error = %e, "failed to write command");
        return Response::default();
    }

    match expected {
        None => Response {
            success: true,
            text: String::new(),
        },
        Some(expected) => read_response(link, expected, timeout),
    }
}

/// Send a command expecting `OK`, returning only the success flag
pub fn send(link: &mut dyn SerialLink, command: &str) -> bool {
    send_and_read(link, command, Some(commands::OK), RESPONSE_TIMEOUT).success
}

/// Read lines until `expected` or `ERROR` shows up, or `timeout` elapses
pub fn read_response(link: &mut dyn SerialLink, expected: &str, timeout: Duration) -> Response {
    let deadline = Instant::now() + timeout;
    let mut text = String::new();

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            tracing::debug!(expected = %printable(expected), "response timed out");
            return Response {
                success: false,
                text,
            };
        }

        let line = match read_line(link, remaining, &|| false) {
            Ok(line) => line,
            Err(e) => {
                tracing::error!(error = %e, "failed to read response");
                return Response {
                    success: false,
                    text,
                };
            }
        };
        if line.is_empty() {
            continue;
        }

        let line = String::from_utf8_lossy(&line);
        tracing::trace!(line = %printable(&line), "modem response");
        text.push_str(&line);

        if text.contains(expected) {
            return Response {
                success: true,
                text,
            };
        }
        if text.contains(commands::ERROR) {
            tracing::debug!(expected = %printable(expected), "modem returned ERROR");
            return Response {
                success: false,
                text,
            };
        }
    }
}

/// Probe the link for a voice modem and identify its chipset
///
/// Returns `None` if nothing on the link answers like a voice modem.
pub fn detect(link: &mut dyn SerialLink) -> Option<Vendor> {
    tracing::info!(port = %link.name(), "looking for modem");

    if let Err(e) = link.clear(ClearBuffer::Input) {
        tracing::debug!(error = %e, "failed to clear input before detection");
    }
    if !send(link, commands::AT) {
        return None;
    }

    let identity = send_and_read(
        link,
        commands::GET_PRODUCT_CODE,
        Some(commands::OK),
        RESPONSE_TIMEOUT,
    );
    if !identity.success {
        return None;
    }

    let firmware = send_and_read(
        link,
        commands::GET_FIRMWARE_ID,
        Some(commands::OK),
        RESPONSE_TIMEOUT,
    );
    tracing::debug!(firmware = %firmware.text.trim(), "modem firmware");

    match Vendor::from_product_code(&identity.text) {
        Some(Vendor::Conexant) => {
            let patch = send_and_read(
                link,
                commands::GET_PATCH_LEVEL_CONEXANT,
                Some(commands::OK),
                RESPONSE_TIMEOUT,
            );
            tracing::debug!(patch = %patch.text.trim(), "conexant patch level");
            tracing::info!("Conexant modem detected");
            Some(Vendor::Conexant)
        }
        Some(vendor) => {
            tracing::info!("US Robotics modem detected");
            Some(vendor)
        }
        None => {
            tracing::warn!(product = %identity.text.trim(), "unknown modem detected");
            // Usable with the default table as long as it speaks voice
            if send(link, commands::ENTER_VOICE_MODE) {
                Some(Vendor::Unknown)
            } else {
                tracing::error!("modem does not support voice mode");
                None
            }
        }
    }
}

/// Configure a freshly detected modem for call attendant duty
///
/// Individual failures are logged and skipped so a partially configured
/// modem is still usable.
pub fn initialize(link: &mut dyn SerialLink, table: &CommandTable, init_string: Option<&str>) {
    tracing::debug!("initializing modem settings");

    if !send(link, commands::RESET) {
        tracing::error!("unable to reset modem to factory defaults");
    }
    if let Some(init) = init_string.filter(|s| !s.trim().is_empty())
        && !send(link, init)
    {
        tracing::error!(init, "optional modem init string failed");
    }
    if !send(link, commands::ENABLE_VERBOSE_CODES) {
        tracing::error!("unable to enable verbose result codes");
    }
    if !send(link, commands::DISABLE_ECHO) {
        tracing::error!("failed to disable local echo");
    }
    if !send(link, table.enable_caller_id) {
        tracing::error!("failed to enable formatted caller id");
    }
    if !send(link, commands::SAVE_PROFILE) {
        tracing::error!("failed to store modem profile");
    }

    let settings = send_and_read(link, commands::GET_SETTINGS, Some(commands::OK), RESPONSE_TIMEOUT);
    tracing::debug!(settings = %settings.text, "modem settings");
}

/// Render control characters the way modem manuals write them
pub(crate) fn printable(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{10}' => "<DLE>".to_string(),
            '\u{3}' => "<ETX>".to_string(),
            '\r' => "<CR>".to_string(),
            '\n' => "<LF>".to_string(),
            c => c.to_string(),
        })
        .collect()
}
