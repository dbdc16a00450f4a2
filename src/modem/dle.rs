//! `<DLE>` shielded codes in the voice data stream
//!
//! In voice mode the modem interleaves notifications with audio samples.
//! A notification is the DLE byte followed by one code byte; a DLE followed
//! by anything outside the known set is just audio.

/// Data link escape
pub const DLE: u8 = 0x10;
/// End of text
pub const ETX: u8 = 0x03;

/// Opens a DTMF digit run: `<DLE>/`
const DTMF_START: u8 = b'/';
/// Closes a DTMF digit run: `<DLE>~`
const DTMF_END: u8 = b'~';

/// Notification decoded from the stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DleEvent {
    /// A local extension went off-hook (`H`, `P` or `p`)
    LocalOffHook,
    /// Ring while in voice mode (`R`)
    Ring,
    /// Busy tone (`b`)
    Busy,
    /// Dial tone (`d`)
    DialTone,
    /// Silence detected by the modem (`s`)
    Silence,
    /// Quiet detected, Conexant only (`q`)
    Quiet,
    /// Transmit buffer underrun (`u`)
    Underrun,
    /// End of voice data (`<ETX>`)
    EndOfData,
    /// Complete `/…~` run; holds the digits
    Digits(String),
    /// `<DLE>/` seen but the closing `~` has not arrived yet
    DigitsPending,
}

impl DleEvent {
    fn from_code(code: u8) -> Option<Self> {
        match code {
            b'H' | b'P' | b'p' => Some(Self::LocalOffHook),
            b'R' => Some(Self::Ring),
            b'b' => Some(Self::Busy),
            b'd' => Some(Self::DialTone),
            b's' => Some(Self::Silence),
            b'q' => Some(Self::Quiet),
            b'u' => Some(Self::Underrun),
            ETX => Some(Self::EndOfData),
            _ => None,
        }
    }

    /// First digit of a completed run
    #[must_use]
    pub fn first_digit(&self) -> Option<char> {
        match self {
            Self::Digits(digits) => digits.chars().next(),
            _ => None,
        }
    }
}

/// Iterate over the notifications embedded in `data`, in stream order
#[must_use]
pub fn events(data: &[u8]) -> Events<'_> {
    Events { data, pos: 0 }
}

/// First notification in `data`, if any
#[must_use]
pub fn first_event(data: &[u8]) -> Option<DleEvent> {
    events(data).next()
}

/// Iterator returned by [`events`]
pub struct Events<'a> {
    data: &'a [u8],
    pos: usize,
}

impl Iterator for Events<'_> {
    type Item = DleEvent;

    fn next(&mut self) -> Option<Self::Item> {
        while self.pos + 1 < self.data.len() {
            let idx = self.pos;
            if self.data[idx] != DLE {
                self.pos += 1;
                continue;
            }

            let code = self.data[idx + 1];
            self.pos = idx + 2;

            if code == DTMF_START {
                match self.digit_run() {
                    Some(event) => return Some(event),
                    None => continue,
                }
            }
            // <DLE><DLE> is a shielded sample byte; anything unknown is audio
            if let Some(event) = DleEvent::from_code(code) {
                return Some(event);
            }
        }
        None
    }
}

impl Events<'_> {
    /// Parse the run after `<DLE>/`; `None` for an empty `/~`
    fn digit_run(&mut self) -> Option<DleEvent> {
        let rest = &self.data[self.pos..];
        let Some(end) = rest.iter().position(|&b| b == DTMF_END) else {
            self.pos = self.data.len();
            return Some(DleEvent::DigitsPending);
        };

        let digits: String = rest[..end]
            .iter()
            .filter(|&&b| b != DLE)
            .map(|&b| char::from(b))
            .collect();
        self.pos += end + 1;

        (!digits.is_empty()).then_some(DleEvent::Digits(digits))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_audio_has_no_events() {
        let audio = [0x7f, 0x80, 0x81, 0x10, 0x10, 0x80, 0x10, b'Z', 0x7f];
        assert_eq!(first_event(&audio), None);
    }

    #[test]
    fn test_recognises_codes_in_order() {
        let data = [0x80, DLE, b'u', 0x80, DLE, b'H', DLE, ETX];
        let found: Vec<_> = events(&data).collect();
        assert_eq!(
            found,
            vec![DleEvent::Underrun, DleEvent::LocalOffHook, DleEvent::EndOfData]
        );
    }

    #[test]
    fn test_conexant_off_hook_variants() {
        assert_eq!(first_event(&[DLE, b'P']), Some(DleEvent::LocalOffHook));
        assert_eq!(first_event(&[DLE, b'p']), Some(DleEvent::LocalOffHook));
    }

    #[test]
    fn test_digit_run_strips_inner_escapes() {
        let data = [0x80, DLE, b'/', DLE, b'5', DLE, b'2', DLE, b'~', 0x80];
        let event = first_event(&data).unwrap();
        assert_eq!(event, DleEvent::Digits("52".to_string()));
        assert_eq!(event.first_digit(), Some('5'));
    }

    #[test]
    fn test_unterminated_digit_run_is_pending() {
        let data = [DLE, b'/', DLE, b'1'];
        assert_eq!(first_event(&data), Some(DleEvent::DigitsPending));
    }

    #[test]
    fn test_trailing_dle_is_ignored() {
        assert_eq!(first_event(&[0x80, 0x80, DLE]), None);
    }
}
