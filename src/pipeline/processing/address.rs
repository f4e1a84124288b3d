//! Address normalization shared by every parser and enricher.
//!
//! Addresses are the merge key of the whole pipeline, so every source runs its raw
//! addresses through the same [`AddressNormalizer`] before using them.

use once_cell::sync::Lazy;
use regex::Regex;

/// Non-semantic access markers appended to PLC addresses, in match order
pub const DEFAULT_SUFFIXES: &[&str] = &[
    "!RD", "!WR", "!SC", "!BI", "!BO", "!AI", "!AO", "!DI", "!DO", "!ST", "!EN", "!DN", "!PV",
    "!SP", "!CV",
];

static ARRAY_IDENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z_][A-Za-z0-9_]*)\[").expect("valid regex"));
static LETTERS_THEN_DIGITS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Z]+)(\d.*)$").expect("valid regex"));

/// Strips access-marker suffixes and canonicalizes array identifiers.
#[derive(Debug, Clone)]
pub struct AddressNormalizer {
    suffixes: Vec<String>,
}

impl Default for AddressNormalizer {
    fn default() -> Self {
        Self::new(DEFAULT_SUFFIXES.iter().copied())
    }
}

impl AddressNormalizer {
    pub fn new<I, S>(suffixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            suffixes: suffixes
                .into_iter()
                .map(|s| s.as_ref().trim().to_ascii_uppercase())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }

    pub fn suffixes(&self) -> &[String] {
        &self.suffixes
    }

    /// Normalize a raw address.
    ///
    /// Trims whitespace, strips recognized suffixes (case-insensitively, until none is
    /// left) and upper-cases the identifier in front of an array index. Anything not
    /// recognized is returned as is.
    pub fn normalize(&self, raw: &str) -> String {
        let mut addr = raw.trim().to_string();

        while let Some(len) = self.matching_suffix_len(&addr) {
            addr.truncate(addr.len() - len);
            addr = addr.trim_end().to_string();
        }

        uppercase_array_ident(&addr)
    }

    fn matching_suffix_len(&self, addr: &str) -> Option<usize> {
        let upper = addr.to_ascii_uppercase();
        self.suffixes
            .iter()
            .find(|s| upper.len() > s.len() && upper.ends_with(s.as_str()))
            .map(|s| s.len())
    }
}

/// PLC tag names are case-insensitive; `rack00_slot06[10]` and `RACK00_SLOT06[10]` are one point.
fn uppercase_array_ident(addr: &str) -> String {
    match ARRAY_IDENT.captures(addr) {
        Some(caps) => {
            let ident = &caps[1];
            format!("{}{}", ident.to_ascii_uppercase(), &addr[ident.len()..])
        }
        None => addr.to_string(),
    }
}

/// Canonical ISA tag form: upper case, `-` separator between prefix and loop number.
///
/// Returns an empty string for placeholders (`SPARE`, `N/A`, `M/A`) and for values too
/// long to be a tag.
///
/// ```
/// use mtl_converter::pipeline::processing::address::clean_target_id;
/// assert_eq!(clean_target_id("pt_200"), "PT-200");
/// assert_eq!(clean_target_id("PIT801"), "PIT-801");
/// assert_eq!(clean_target_id("SPARE"), "");
/// ```
pub fn clean_target_id(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.chars().count() > 30 {
        return String::new();
    }
    let upper = trimmed.to_uppercase();
    if matches!(upper.as_str(), "SPARE" | "M/A" | "N/A") {
        return String::new();
    }

    let cleaned = upper.replace('_', "-");
    if cleaned.contains('-') {
        return cleaned;
    }
    match LETTERS_THEN_DIGITS.captures(&cleaned) {
        Some(caps) => format!("{}-{}", &caps[1], &caps[2]),
        None => cleaned,
    }
}

/// Canonical spelling of an engineering unit as read from a screen or export.
pub fn normalize_unit(raw: &str) -> String {
    let unit = raw.trim().to_uppercase();
    match unit.as_str() {
        "" | "M/A" | "N/A" | "SPARE" => String::new(),
        "\"WC" | "IN WC" | "INWC" => "\" WC".to_string(),
        "BBLS" => "BPD".to_string(),
        "MA" => "mA".to_string(),
        "\"" => "IN".to_string(),
        "DEG F" => "DEGF".to_string(),
        "DEG C" => "DEGC".to_string(),
        _ => unit,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_read_suffix() {
        let n = AddressNormalizer::default();
        assert_eq!(n.normalize("PIT-801!RD"), "PIT-801");
        assert_eq!(n.normalize("RACK00_SLOT06[10]!RD"), "RACK00_SLOT06[10]");
    }

    #[test]
    fn test_suffix_match_is_case_insensitive_and_trims() {
        let n = AddressNormalizer::default();
        assert_eq!(n.normalize("  WRITEFLOAT[3]!wr  "), "WRITEFLOAT[3]");
        assert_eq!(n.normalize("PIT-801 !RD"), "PIT-801");
    }

    #[test]
    fn test_stacked_suffixes_are_all_removed() {
        let n = AddressNormalizer::default();
        assert_eq!(n.normalize("ALARM[4]!DN!RD"), "ALARM[4]");
        assert_eq!(n.normalize(&n.normalize("ALARM[4]!DN!RD")), "ALARM[4]");
    }

    #[test]
    fn test_unknown_address_passes_through() {
        let n = AddressNormalizer::default();
        assert_eq!(n.normalize("Tags.PumpSpeed"), "Tags.PumpSpeed");
        assert_eq!(n.normalize("N7:0/3"), "N7:0/3");
    }

    #[test]
    fn test_bare_suffix_is_not_stripped_to_nothing() {
        let n = AddressNormalizer::default();
        assert_eq!(n.normalize("!RD"), "!RD");
    }

    #[test]
    fn test_array_identifier_is_uppercased() {
        let n = AddressNormalizer::default();
        assert_eq!(n.normalize("rack00_slot06[10]"), "RACK00_SLOT06[10]");
        assert_eq!(n.normalize("readfloat[2]!rd"), "READFLOAT[2]");
    }

    #[test]
    fn test_custom_suffix_table() {
        let n = AddressNormalizer::new(["#Q"]);
        assert_eq!(n.normalize("PIT-801#q"), "PIT-801");
        assert_eq!(n.normalize("PIT-801!RD"), "PIT-801!RD");
    }

    #[test]
    fn test_clean_target_id() {
        assert_eq!(clean_target_id("PT_200"), "PT-200");
        assert_eq!(clean_target_id("PIT-301"), "PIT-301");
        assert_eq!(clean_target_id("lxy_801a"), "LXY-801A");
        assert_eq!(clean_target_id("PIT801"), "PIT-801");
        assert_eq!(clean_target_id("n/a"), "");
        assert_eq!(clean_target_id(&"X".repeat(31)), "");
    }

    #[test]
    fn test_normalize_unit() {
        assert_eq!(normalize_unit("psig"), "PSIG");
        assert_eq!(normalize_unit("\"WC"), "\" WC");
        assert_eq!(normalize_unit("ma"), "mA");
        assert_eq!(normalize_unit("Deg F"), "DEGF");
        assert_eq!(normalize_unit("M/A"), "");
    }
}
