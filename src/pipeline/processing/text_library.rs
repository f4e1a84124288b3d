//! CPA shared text table.
//!
//! CPA projects keep most visible strings in one table of numbered entries, each stored
//! as space-separated 4-digit hex UTF-16 code units:
//!
//! ```text
//! No=1636
//! TextW=0054 0049 0054 002D 0033 0036 0039 0032
//! ```
//!
//! Screen objects and alarms then refer to entries as `@1636`.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

static HEX_UNIT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[0-9A-Fa-f]{4}\b").expect("valid regex"));
static TEXT_REF: Lazy<Regex> = Lazy::new(|| Regex::new(r"^@(\d+)$").expect("valid regex"));

/// Decode one `TextW` value. Unpaired surrogates are dropped; the result is trimmed.
pub fn decode_textw(raw: &str) -> String {
    let units: Vec<u16> = HEX_UNIT
        .find_iter(raw)
        .filter_map(|m| u16::from_str_radix(m.as_str(), 16).ok())
        .collect();

    char::decode_utf16(units)
        .filter_map(|c| c.ok())
        .collect::<String>()
        .trim()
        .to_string()
}

/// Text id to decoded string, built once per project and read-only afterwards
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextLibrary {
    entries: BTreeMap<u32, String>,
}

impl TextLibrary {
    /// Build the library from the raw project bytes.
    pub fn build(raw: &[u8]) -> Self {
        Self::from_text(&String::from_utf8_lossy(raw))
    }

    /// Pair every `No=` line with the `TextW=` line that follows it.
    ///
    /// Entries that decode to nothing are not stored.
    pub fn from_text(text: &str) -> Self {
        let mut entries = BTreeMap::new();
        let mut current: Option<u32> = None;

        for line in text.lines() {
            let line = line.trim();
            if let Some(value) = line.strip_prefix("No=") {
                current = value.trim().parse().ok();
            } else if let Some(value) = line.strip_prefix("TextW=") {
                if let Some(id) = current {
                    let decoded = decode_textw(value);
                    if !decoded.is_empty() {
                        entries.insert(id, decoded);
                    }
                }
            }
        }

        Self { entries }
    }

    /// Look up a text id; absent ids resolve to an empty string.
    pub fn resolve(&self, id: u32) -> String {
        self.entries.get(&id).cloned().unwrap_or_default()
    }

    pub fn get(&self, id: u32) -> Option<&str> {
        self.entries.get(&id).map(String::as_str)
    }

    /// Resolve an object attribute that is either literal text or an `@N` reference.
    pub fn resolve_value(&self, value: &str) -> TextValue {
        let value = value.trim();
        if value.is_empty() {
            return TextValue::Empty;
        }
        match TEXT_REF.captures(value).and_then(|c| c[1].parse::<u32>().ok()) {
            Some(id) => match self.get(id) {
                Some(text) => TextValue::Resolved(text.to_string()),
                None => TextValue::Missing(id),
            },
            None => TextValue::Resolved(value.to_string()),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Result of resolving a possibly-encoded text attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextValue {
    Resolved(String),
    /// An `@N` reference with no library entry
    Missing(u32),
    Empty,
}

impl TextValue {
    pub fn into_option(self) -> Option<String> {
        match self {
            TextValue::Resolved(s) => Some(s),
            _ => None,
        }
    }
}

/// Build a text library from raw CPA bytes.
pub fn build_library(raw: &[u8]) -> TextLibrary {
    TextLibrary::build(raw)
}

/// Resolve a text id against a library, empty when absent.
pub fn resolve(id: u32, library: &TextLibrary) -> String {
    library.resolve(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
[[[Text]]]
No=1636
TextW=0054 0049 0054 002D 0033 0036 0039 0032
No=1637
TextW=
No=1638
TextW=0020 0050 0053 0049 0047 0020
No=oops
TextW=0041
";

    #[test]
    fn test_decode_textw() {
        assert_eq!(decode_textw("0054 0049 0054"), "TIT");
        assert_eq!(decode_textw("00b0 0046"), "\u{b0}F");
    }

    #[test]
    fn test_decode_skips_unpaired_surrogates() {
        assert_eq!(decode_textw("0041 D800 0042"), "AB");
        assert_eq!(decode_textw("D83D DE00"), "\u{1F600}");
    }

    #[test]
    fn test_build_library_pairs_entries() {
        let library = build_library(SAMPLE.as_bytes());
        assert_eq!(resolve(1636, &library), "TIT-3692");
        assert_eq!(resolve(1638, &library), "PSIG");
        assert_eq!(library.len(), 2);
    }

    #[test]
    fn test_missing_id_resolves_empty() {
        let library = build_library(SAMPLE.as_bytes());
        assert_eq!(resolve(1637, &library), "");
        assert_eq!(resolve(9999, &library), "");
    }

    #[test]
    fn test_invalid_number_does_not_reuse_previous_id() {
        let library = build_library(SAMPLE.as_bytes());
        assert_eq!(library.get(1638), Some("PSIG"));
        assert!(!library.is_empty());
    }

    #[test]
    fn test_resolve_value() {
        let library = build_library(SAMPLE.as_bytes());
        assert_eq!(
            library.resolve_value("@1636"),
            TextValue::Resolved("TIT-3692".into())
        );
        assert_eq!(library.resolve_value("@42"), TextValue::Missing(42));
        assert_eq!(
            library.resolve_value(" Feed Pump "),
            TextValue::Resolved("Feed Pump".into())
        );
        assert_eq!(library.resolve_value("  "), TextValue::Empty);
    }

    #[test]
    fn test_build_is_deterministic() {
        assert_eq!(
            build_library(SAMPLE.as_bytes()),
            build_library(SAMPLE.as_bytes())
        );
    }
}
