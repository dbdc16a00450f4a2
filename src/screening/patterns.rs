//! Permit/block lists and caller ID patterns
//!
//! Patterns come from a YAML file of regex → reason maps:
//!
//! ```yaml
//! permitnames:
//!   "^SMITH": "Family"
//! permitnumbers:
//!   "^805555": "Neighbourhood"
//! blocknames:
//!   "V[0-9]{15}": "Telemarketer"
//! blocknumbers:
//!   "^1800": "Toll free"
//! ```
//!
//! Name patterns ignore case; number patterns do not.

use std::collections::HashMap;
use std::path::Path;

use parking_lot::RwLock;
use regex::{Regex, RegexBuilder};
use serde::Deserialize;
use serde_yaml::{Mapping, Value};

use super::{CallClass, Classification, Classifier};
use crate::modem::CallerRecord;
use crate::{Error, Result};

/// Which lists take part in screening
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreeningMode {
    pub whitelist: bool,
    pub blacklist: bool,
}

impl Default for ScreeningMode {
    fn default() -> Self {
        Self {
            whitelist: true,
            blacklist: true,
        }
    }
}

impl ScreeningMode {
    /// Build from mode names (`whitelist`, `blacklist`)
    ///
    /// # Errors
    ///
    /// Returns error on an unknown mode name
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self> {
        let mut mode = Self {
            whitelist: false,
            blacklist: false,
        };
        for name in names {
            match name.as_ref().trim().to_ascii_lowercase().as_str() {
                "whitelist" => mode.whitelist = true,
                "blacklist" => mode.blacklist = true,
                other => return Err(Error::Config(format!("invalid screening mode: {other}"))),
            }
        }
        Ok(mode)
    }
}

#[derive(Debug, Clone)]
struct Pattern {
    regex: Regex,
    reason: String,
}

#[derive(Debug, Default, Deserialize)]
struct PatternsFile {
    permitnames: Option<Mapping>,
    permitnumbers: Option<Mapping>,
    blocknames: Option<Mapping>,
    blocknumbers: Option<Mapping>,
}

/// Compiled caller ID patterns
#[derive(Debug, Clone, Default)]
pub struct CallerIdPatterns {
    permit_names: Vec<Pattern>,
    permit_numbers: Vec<Pattern>,
    block_names: Vec<Pattern>,
    block_numbers: Vec<Pattern>,
}

impl CallerIdPatterns {
    /// Load patterns from `path`
    ///
    /// A missing file yields no patterns.
    ///
    /// # Errors
    ///
    /// Returns error if the file is unreadable, not valid YAML, or holds
    /// an invalid regex
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::warn!(path = %path.display(), "caller id patterns file not found");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let patterns = Self::from_yaml(&content)?;
        tracing::info!(path = %path.display(), "loaded caller id patterns");
        Ok(patterns)
    }

    /// Parse patterns from YAML text
    ///
    /// # Errors
    ///
    /// Returns error on malformed YAML or an invalid regex
    pub fn from_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let file: PatternsFile = serde_yaml::from_str(content)?;
        Ok(Self {
            permit_names: compile(file.permitnames, true)?,
            permit_numbers: compile(file.permitnumbers, false)?,
            block_names: compile(file.blocknames, true)?,
            block_numbers: compile(file.blocknumbers, false)?,
        })
    }

    fn permit_reason(&self, caller: &CallerRecord) -> Option<&str> {
        first_match(&self.permit_names, &caller.name)
            .or_else(|| first_match(&self.permit_numbers, &caller.number))
    }

    fn block_reason(&self, caller: &CallerRecord) -> Option<&str> {
        first_match(&self.block_names, &caller.name)
            .or_else(|| first_match(&self.block_numbers, &caller.number))
    }
}

fn compile(mapping: Option<Mapping>, ignore_case: bool) -> Result<Vec<Pattern>> {
    let Some(mapping) = mapping else {
        return Ok(Vec::new());
    };

    let mut patterns = Vec::with_capacity(mapping.len());
    for (key, reason) in mapping {
        let Some(source) = scalar_text(&key) else {
            return Err(Error::Config(format!("pattern must be a string: {key:?}")));
        };
        let regex = RegexBuilder::new(&source).case_insensitive(ignore_case).build()?;
        patterns.push(Pattern {
            regex,
            reason: scalar_text(&reason).unwrap_or_default(),
        });
    }
    Ok(patterns)
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn first_match<'a>(patterns: &'a [Pattern], text: &str) -> Option<&'a str> {
    patterns
        .iter()
        .find(|p| p.regex.is_match(text))
        .map(|p| p.reason.as_str())
}

/// [`Classifier`] over permit/block number lists and caller ID patterns
///
/// The permit side is consulted first; a caller on neither side is
/// screened.
#[derive(Debug)]
pub struct PatternScreener {
    mode: ScreeningMode,
    patterns: CallerIdPatterns,
    permitted: RwLock<HashMap<String, String>>,
    blocked: RwLock<HashMap<String, String>>,
}

impl PatternScreener {
    #[must_use]
    pub fn new(mode: ScreeningMode, patterns: CallerIdPatterns) -> Self {
        Self {
            mode,
            patterns,
            permitted: RwLock::new(HashMap::new()),
            blocked: RwLock::new(HashMap::new()),
        }
    }

    /// Seed the permit list
    #[must_use]
    pub fn with_permitted<I, S>(self, numbers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.permitted
            .write()
            .extend(numbers.into_iter().map(|n| (n.into(), "Permit list".to_string())));
        self
    }

    /// Seed the block list
    #[must_use]
    pub fn with_blocked<I, S>(self, numbers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.blocked
            .write()
            .extend(numbers.into_iter().map(|n| (n.into(), "Block list".to_string())));
        self
    }

    /// Block a caller from now on
    pub fn block(&self, caller: &CallerRecord, reason: &str) {
        tracing::info!(number = %caller.number, reason, "caller blocked");
        self.blocked
            .write()
            .insert(caller.number.clone(), reason.to_string());
    }

    fn permitted_reason(&self, caller: &CallerRecord) -> Option<String> {
        if let Some(reason) = self.permitted.read().get(&caller.number) {
            return Some(reason.clone());
        }
        tracing::debug!("checking permitted patterns");
        self.patterns.permit_reason(caller).map(ToString::to_string)
    }

    fn blocked_reason(&self, caller: &CallerRecord) -> Option<String> {
        if let Some(reason) = self.blocked.read().get(&caller.number) {
            return Some(reason.clone());
        }
        tracing::debug!("checking blocked patterns");
        self.patterns.block_reason(caller).map(ToString::to_string)
    }
}

impl Classifier for PatternScreener {
    fn classify(&self, caller: &CallerRecord) -> Classification {
        if self.mode.whitelist
            && let Some(reason) = self.permitted_reason(caller)
        {
            return Classification::new(CallClass::Permitted, reason);
        }
        if self.mode.blacklist
            && let Some(reason) = self.blocked_reason(caller)
        {
            return Classification::new(CallClass::Blocked, reason);
        }
        Classification::new(CallClass::Screened, "Not found")
    }

    fn permit(&self, caller: &CallerRecord, reason: &str) -> Result<()> {
        tracing::info!(number = %caller.number, reason, "caller permitted");
        self.permitted
            .write()
            .insert(caller.number.clone(), reason.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PATTERNS: &str = r#"
permitnames:
  "^smith": "Family"
permitnumbers:
  "^805555": "Neighbourhood"
blocknames:
  "V[0-9]{15}": "Telemarketer"
  "spam": "Spammer"
blocknumbers:
  "^1800": "Toll free"
"#;

    fn caller(number: &str, name: &str) -> CallerRecord {
        CallerRecord {
            number: number.to_string(),
            name: name.to_string(),
            date: "0801".to_string(),
            time: "1801".to_string(),
        }
    }

    fn screener() -> PatternScreener {
        PatternScreener::new(
            ScreeningMode::default(),
            CallerIdPatterns::from_yaml(PATTERNS).unwrap(),
        )
    }

    #[test]
    fn test_name_patterns_ignore_case() {
        let result = screener().classify(&caller("3105550000", "SMITH JOHN"));
        assert_eq!(result, Classification::new(CallClass::Permitted, "Family"));

        let result = screener().classify(&caller("3105550000", "Test2 - SPAMMER"));
        assert_eq!(result, Classification::new(CallClass::Blocked, "Spammer"));
    }

    #[test]
    fn test_number_patterns() {
        let result = screener().classify(&caller("8055554567", "Test1"));
        assert_eq!(result.class, CallClass::Permitted);

        let result = screener().classify(&caller("18005551212", "Unknown"));
        assert_eq!(result, Classification::new(CallClass::Blocked, "Toll free"));
    }

    #[test]
    fn test_unmatched_caller_is_screened() {
        let result = screener().classify(&caller("3105550000", "Test3"));
        assert_eq!(result.class, CallClass::Screened);
    }

    #[test]
    fn test_permit_list_beats_block_patterns() {
        let screener = screener().with_permitted(["18005551212"]);
        let result = screener.classify(&caller("18005551212", "Unknown"));
        assert_eq!(result.class, CallClass::Permitted);
    }

    #[test]
    fn test_permit_and_block_at_runtime() {
        let screener = screener();
        let pressed_zero = caller("3105550000", "Test3");

        screener.permit(&pressed_zero, "Caller pressed 0").unwrap();
        let result = screener.classify(&pressed_zero);
        assert_eq!(result, Classification::new(CallClass::Permitted, "Caller pressed 0"));

        let other = caller("3105559999", "Test4");
        screener.block(&other, "Robocall");
        assert_eq!(screener.classify(&other).class, CallClass::Blocked);
    }

    #[test]
    fn test_mode_limits_lists() {
        let screener = PatternScreener::new(
            ScreeningMode::from_names(&["blacklist"]).unwrap(),
            CallerIdPatterns::from_yaml(PATTERNS).unwrap(),
        );
        assert_eq!(screener.classify(&caller("8055554567", "Test1")).class, CallClass::Screened);
        assert!(ScreeningMode::from_names(&["greylist"]).is_err());
    }

    #[test]
    fn test_empty_and_missing_patterns() {
        assert!(CallerIdPatterns::from_yaml("").unwrap().permit_names.is_empty());
        assert!(CallerIdPatterns::from_yaml("blocknames:\n").unwrap().block_names.is_empty());
        assert!(CallerIdPatterns::from_yaml("blocknames:\n  \"(\": bad\n").is_err());

        let dir = tempfile::tempdir().unwrap();
        let patterns = CallerIdPatterns::load(&dir.path().join("missing.yaml")).unwrap();
        assert!(patterns.block_numbers.is_empty());
    }
}
