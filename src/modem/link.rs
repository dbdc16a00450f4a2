//! Byte transport between the host and the modem

use std::io::{self, ErrorKind, Read, Write};
use std::time::{Duration, Instant};

use serialport::{ClearBuffer, DataBits, FlowControl, Parity, SerialPort, StopBits};

/// Serial bit rate used for all supported modems
pub const DEFAULT_BAUD_RATE: u32 = 57600;

/// Default read timeout applied when a port is opened
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

/// Granularity of blocking reads so interrupts are noticed promptly
const READ_SLICE: Duration = Duration::from_millis(50);

/// Raw byte link to a modem
///
/// Implemented by [`SerialPortLink`] for real hardware and by scripted
/// doubles in tests. Reads never block longer than the given timeout and
/// report a timeout as `Ok(0)`.
pub trait SerialLink: Send {
    /// Read up to `buf.len()` bytes, waiting at most `timeout`
    ///
    /// # Errors
    ///
    /// Returns error on a link failure other than a timeout
    fn read(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<usize>;

    /// Write every byte and flush
    ///
    /// # Errors
    ///
    /// Returns error if the write fails
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Number of bytes waiting in the input buffer
    ///
    /// # Errors
    ///
    /// Returns error if the link cannot be queried
    fn bytes_available(&mut self) -> io::Result<usize>;

    /// Discard pending input and/or output
    ///
    /// # Errors
    ///
    /// Returns error if the buffers cannot be cleared
    fn clear(&mut self, buffer: ClearBuffer) -> io::Result<()>;

    /// Port name for logging
    fn name(&self) -> String;
}

/// [`SerialLink`] over a `serialport` device
pub struct SerialPortLink {
    port: Box<dyn SerialPort>,
}

impl SerialPortLink {
    /// Open `path` with 8N1 framing and no flow control
    ///
    /// # Errors
    ///
    /// Returns error if the port cannot be opened
    pub fn open(path: &str, baud_rate: u32) -> crate::Result<Self> {
        let port = serialport::new(path, baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(DEFAULT_TIMEOUT)
            .open()?;

        tracing::debug!(path, baud_rate, "serial port opened");
        Ok(Self { port })
    }
}

impl SerialLink for SerialPortLink {
    fn read(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<usize> {
        self.port.set_timeout(timeout)?;
        match self.port.read(buf) {
            Ok(n) => Ok(n),
            Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => Ok(0),
            Err(e) => Err(e),
        }
    }

    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        Write::write_all(&mut self.port, bytes)?;
        self.port.flush()
    }

    fn bytes_available(&mut self) -> io::Result<usize> {
        let count = self.port.bytes_to_read()?;
        Ok(count as usize)
    }

    fn clear(&mut self, buffer: ClearBuffer) -> io::Result<()> {
        Ok(self.port.clear(buffer)?)
    }

    fn name(&self) -> String {
        self.port.name().unwrap_or_else(|| "<unnamed>".to_string())
    }
}

/// Ports to probe for a modem
///
/// An explicit device list wins; otherwise every serial port the OS
/// enumerates is a candidate.
#[must_use]
pub fn candidate_ports(configured: &[String]) -> Vec<String> {
    if !configured.is_empty() {
        return configured
            .iter()
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty())
            .collect();
    }

    match serialport::available_ports() {
        Ok(ports) => ports.into_iter().map(|p| p.port_name).collect(),
        Err(e) => {
            tracing::warn!(error = %e, "failed to enumerate serial ports");
            Vec::new()
        }
    }
}

/// Read one line terminated by `\n`, giving up after `timeout`
///
/// Returns whatever was read (possibly empty or unterminated) when the
/// timeout elapses or `interrupted` reports true.
pub(crate) fn read_line(
    link: &mut dyn SerialLink,
    timeout: Duration,
    interrupted: &dyn Fn() -> bool,
) -> io::Result<Vec<u8>> {
    let deadline = Instant::now() + timeout;
    let mut line = Vec::new();
    let mut byte = [0u8; 1];

    loop {
        if interrupted() {
            break;
        }
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        let slice = (deadline - now).min(READ_SLICE);
        if link.read(&mut byte, slice)? == 1 {
            line.push(byte[0]);
            if byte[0] == b'\n' {
                break;
            }
        }
    }

    Ok(line)
}

/// Fill up to `len` bytes, giving up after `timeout`
pub(crate) fn read_chunk(
    link: &mut dyn SerialLink,
    len: usize,
    timeout: Duration,
) -> io::Result<Vec<u8>> {
    let deadline = Instant::now() + timeout;
    let mut chunk = vec![0u8; len];
    let mut filled = 0;

    while filled < len {
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        filled += link.read(&mut chunk[filled..], (deadline - now).min(READ_SLICE))?;
    }

    chunk.truncate(filled);
    Ok(chunk)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_ports_prefers_configured_list() {
        let configured = vec![" /dev/ttyACM0".to_string(), String::new(), "/dev/ttyUSB1".to_string()];
        assert_eq!(candidate_ports(&configured), vec!["/dev/ttyACM0", "/dev/ttyUSB1"]);
    }
}
