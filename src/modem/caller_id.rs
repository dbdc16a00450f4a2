//! Caller ID decoding
//!
//! Telcos deliver caller ID as unsolicited text lines between the first and
//! second ring:
//!
//! ```text
//! RING
//! DATE=0801
//! TIME=1801
//! NMBR=8055554567
//! NAME=Test1
//! RING
//! ```
//!
//! Not every telco sends every field, so a record is completed with
//! defaults once a number is known and the line goes quiet or rings again.

use chrono::{DateTime, Local};

/// Marker the modem prints for each ring
pub const RING: &str = "RING";

/// Name used when the telco does not supply one
pub const UNKNOWN_NAME: &str = "Unknown";

/// Caller ID for one incoming call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerRecord {
    pub number: String,
    pub name: String,
    /// `MMDD`
    pub date: String,
    /// `HHMM`
    pub time: String,
}

/// What a single line meant to the decoder
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Decoded {
    /// The line was a ring
    pub ring: bool,
    /// The line completed a caller record
    pub record: Option<CallerRecord>,
}

/// Accumulates caller ID fields into [`CallerRecord`]s
#[derive(Debug, Default)]
pub struct CallerIdDecoder {
    number: Option<String>,
    name: Option<String>,
    date: Option<String>,
    time: Option<String>,
}

enum Line<'a> {
    Empty,
    Ring,
    Field(&'a str, &'a str),
    Other,
}

fn classify(line: &str) -> Line<'_> {
    let line = line.trim();
    if line.is_empty() {
        return Line::Empty;
    }
    if let Some((key, value)) = line.split_once('=') {
        let key = key.trim();
        if matches!(key, "DATE" | "TIME" | "NAME" | "NMBR") {
            return Line::Field(key, value.trim());
        }
    }
    if line.contains(RING) {
        Line::Ring
    } else {
        Line::Other
    }
}

impl CallerIdDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one line (empty for a read timeout), stamping defaults with the
    /// local clock
    pub fn feed(&mut self, line: &str) -> Decoded {
        self.feed_at(line, Local::now())
    }

    /// Feed one line, using `now` for synthesized date and time
    pub fn feed_at(&mut self, line: &str, now: DateTime<Local>) -> Decoded {
        let line = classify(line);

        if matches!(line, Line::Empty | Line::Ring) {
            if self.number.is_some() {
                self.date.get_or_insert_with(|| now.format("%m%d").to_string());
                self.time.get_or_insert_with(|| now.format("%H%M").to_string());
                self.name.get_or_insert_with(|| UNKNOWN_NAME.to_string());
            } else {
                // Noise between calls
                self.reset();
            }
        }

        let mut decoded = Decoded::default();
        match line {
            Line::Ring => decoded.ring = true,
            Line::Field(key, value) => {
                let value = value.to_string();
                match key {
                    "DATE" => self.date = Some(value),
                    "TIME" => self.time = Some(value),
                    "NAME" => self.name = Some(value),
                    _ => self.number = Some(value),
                }
            }
            Line::Empty | Line::Other => {}
        }

        decoded.record = self.take_complete();
        decoded
    }

    /// Whether any field is buffered
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.number.is_none() && self.name.is_none() && self.date.is_none() && self.time.is_none()
    }

    fn take_complete(&mut self) -> Option<CallerRecord> {
        if self.number.is_none() || self.name.is_none() || self.date.is_none() || self.time.is_none() {
            return None;
        }
        Some(CallerRecord {
            number: self.number.take()?,
            name: self.name.take()?,
            date: self.date.take()?,
            time: self.time.take()?,
        })
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn noon() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 9, 12, 5, 0).unwrap()
    }

    #[test]
    fn test_complete_record_emitted_once() {
        let mut decoder = CallerIdDecoder::new();
        let now = noon();

        assert!(decoder.feed_at("RING", now).ring);
        assert_eq!(decoder.feed_at("DATE=0801", now).record, None);
        assert_eq!(decoder.feed_at("TIME=1801", now).record, None);
        assert_eq!(decoder.feed_at("NMBR=8055554567", now).record, None);

        let decoded = decoder.feed_at("NAME=Test1", now);
        assert_eq!(
            decoded.record,
            Some(CallerRecord {
                number: "8055554567".to_string(),
                name: "Test1".to_string(),
                date: "0801".to_string(),
                time: "1801".to_string(),
            })
        );
        assert!(decoder.is_empty());

        // Following rings do not re-emit
        assert_eq!(decoder.feed_at("RING", now).record, None);
        assert_eq!(decoder.feed_at("", now).record, None);
    }

    #[test]
    fn test_spaces_around_equals() {
        let mut decoder = CallerIdDecoder::new();
        let now = noon();
        decoder.feed_at("DATE = 0805", now);
        decoder.feed_at("TIME = 1805", now);
        decoder.feed_at("NMBR = 8055554567", now);
        let record = decoder.feed_at("NAME = Test5 - Permitted", now).record.unwrap();
        assert_eq!(record.name, "Test5 - Permitted");
        assert_eq!(record.number, "8055554567");
    }

    #[test]
    fn test_partial_without_number_discarded() {
        let mut decoder = CallerIdDecoder::new();
        let now = noon();
        decoder.feed_at("DATE=0801", now);
        decoder.feed_at("NAME=Nobody", now);

        let decoded = decoder.feed_at("RING", now);
        assert!(decoded.ring);
        assert_eq!(decoded.record, None);
        assert!(decoder.is_empty());

        decoder.feed_at("TIME=0101", now);
        assert_eq!(decoder.feed_at("", now).record, None);
        assert!(decoder.is_empty());
    }

    #[test]
    fn test_partial_with_number_gets_defaults() {
        let mut decoder = CallerIdDecoder::new();
        decoder.feed_at("RING", noon());
        decoder.feed_at("NMBR = 1234567890", noon());

        let record = decoder.feed_at("", noon()).record.unwrap();
        assert_eq!(record.number, "1234567890");
        assert_eq!(record.name, UNKNOWN_NAME);
        assert_eq!(record.date, "0309");
        assert_eq!(record.time, "1205");
    }

    #[test]
    fn test_partial_completed_by_next_ring() {
        let mut decoder = CallerIdDecoder::new();
        decoder.feed_at("NMBR=5551234567", noon());
        decoder.feed_at("NAME=Test2 - Spammer", noon());

        let decoded = decoder.feed_at("RING", noon());
        assert!(decoded.ring);
        let record = decoded.record.unwrap();
        assert_eq!(record.name, "Test2 - Spammer");
        assert_eq!(record.date, "0309");
    }

    #[test]
    fn test_name_containing_ring_is_a_field() {
        let mut decoder = CallerIdDecoder::new();
        let decoded = decoder.feed_at("NAME=RINGO STARR", noon());
        assert!(!decoded.ring);
        assert!(!decoder.is_empty());
    }
}
