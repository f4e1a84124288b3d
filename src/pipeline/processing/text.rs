//! Abbreviation expansion and capitalization for MTL description columns.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::HashMap;

use super::classify::ClassificationTables;
use crate::config::ProcessingConfig;

static ORDINAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(\d+)(st|nd|rd|th)$").expect("valid regex"));

/// Rewrites free text into the spelling used in the Master Tag List.
///
/// Both steps are idempotent, so running the processor over its own output changes
/// nothing.
#[derive(Debug, Clone)]
pub struct TextProcessor {
    /// Upper-cased abbreviation -> expansion
    abbreviations: HashMap<String, String>,
    /// Whole-token alternation of every abbreviation, longest first
    abbreviation_pattern: Option<Regex>,
    /// Upper-cased acronym -> canonical spelling
    acronyms: HashMap<String, String>,
    expand: bool,
    capitalize: bool,
    preserve_acronyms: bool,
}

impl Default for TextProcessor {
    fn default() -> Self {
        Self::new(&ClassificationTables::standard(), &ProcessingConfig::default())
    }
}

impl TextProcessor {
    pub fn new(tables: &ClassificationTables, config: &ProcessingConfig) -> Self {
        let abbreviations: HashMap<String, String> = tables
            .abbreviations
            .iter()
            .map(|(short, long)| (short.to_uppercase(), long.clone()))
            .collect();

        let mut keys: Vec<&String> = abbreviations.keys().collect();
        keys.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        let abbreviation_pattern = if keys.is_empty() {
            None
        } else {
            let alternation = keys
                .iter()
                .map(|k| regex::escape(k))
                .collect::<Vec<_>>()
                .join("|");
            Regex::new(&format!(r"(?i)\b(?:{alternation})\b")).ok()
        };

        Self {
            abbreviations,
            abbreviation_pattern,
            acronyms: tables
                .preserved_acronyms
                .iter()
                .map(|a| (a.to_uppercase(), a.clone()))
                .collect(),
            expand: config.expand_abbreviations,
            capitalize: config.apply_capitalization,
            preserve_acronyms: config.preserve_acronyms,
        }
    }

    pub fn process(&self, text: &str) -> String {
        let mut out = text.split_whitespace().collect::<Vec<_>>().join(" ");
        if self.expand {
            out = self.expand_abbreviations(&out);
        }
        if self.capitalize {
            out = self.proper_case(&out);
        }
        out
    }

    pub fn expand_abbreviations(&self, text: &str) -> String {
        let Some(pattern) = &self.abbreviation_pattern else {
            return text.to_string();
        };
        pattern
            .replace_all(text, |caps: &Captures<'_>| {
                self.abbreviations
                    .get(&caps[0].to_uppercase())
                    .cloned()
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }

    /// Capitalize each word; hyphen and slash separated parts are handled separately.
    pub fn proper_case(&self, text: &str) -> String {
        text.split_whitespace()
            .map(|word| self.proper_case_word(word))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn proper_case_word(&self, word: &str) -> String {
        let mut out = String::with_capacity(word.len());
        let mut part = String::new();
        for c in word.chars() {
            if c == '-' || c == '/' {
                out.push_str(&self.proper_case_part(&part));
                out.push(c);
                part.clear();
            } else {
                part.push(c);
            }
        }
        out.push_str(&self.proper_case_part(&part));
        out
    }

    fn proper_case_part(&self, part: &str) -> String {
        let start = part
            .find(|c: char| c.is_alphanumeric())
            .unwrap_or(part.len());
        let end = part
            .rfind(|c: char| c.is_alphanumeric())
            .map_or(start, |i| i + part[i..].chars().next().map_or(1, char::len_utf8));
        if start >= end {
            return part.to_string();
        }
        let (lead, core, trail) = (&part[..start], &part[start..end], &part[end..]);

        let cased = if self.preserve_acronyms {
            self.acronyms.get(&core.to_uppercase()).cloned()
        } else {
            None
        }
        .unwrap_or_else(|| {
            if let Some(caps) = ORDINAL.captures(core) {
                format!("{}{}", &caps[1], caps[2].to_lowercase())
            } else if core.chars().any(|c| c.is_ascii_digit()) {
                core.to_string()
            } else {
                capitalize(core)
            }
        });
        format!("{lead}{cased}{trail}")
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}
