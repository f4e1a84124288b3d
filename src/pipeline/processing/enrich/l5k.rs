use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use tracing::{debug, info};

use super::{unreadable_source, EnrichOutcome, Enricher, RecordIndex};
use crate::domain::{EnrichmentFragment, IoRecord, SourceTag};
use crate::io::SourceDocument;
use crate::pipeline::processing::address::AddressNormalizer;

static RUNG_COMMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^\s*RC:\s*"((?:[^"]|"")+)""#).expect("valid regex"));
static RUNG: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*N:").expect("valid regex"));
static RUNG_OPERAND: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        concat!(
            r"(?:READ|WRITE|EXTER_READ)FLOAT\[\d+\]|RACK\d+_SLOT\d+_TABLE\[\d+\]",
            r"|ALARM\[\d+\](?:\.\d+)?",
        ),
    )
    .expect("valid regex")
});
static TAG_DECLARATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*([A-Za-z_][A-Za-z0-9_]*)\s*(?::|OF\s+([A-Za-z0-9_:.\[\]]+))")
        .expect("valid regex")
});
static TAG_DESCRIPTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"Description\s*:=\s*"((?:[^"]|"")*)""#).expect("valid regex"));

/// Rung comments and tag descriptions from a PLC program export (`.L5K`).
#[derive(Debug, Clone, Default)]
pub struct L5kEnricher {
    normalizer: AddressNormalizer,
}

impl L5kEnricher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Address -> description.
    ///
    /// A rung comment applies to every PLC I/O operand of the rung that follows it; the
    /// first comment seen for an operand wins. Tag declarations with a `Description`
    /// only fill addresses no rung comment covered.
    pub fn read_descriptions(&self, content: &str) -> BTreeMap<String, String> {
        let mut descriptions = BTreeMap::new();
        let lines: Vec<&str> = content.lines().collect();

        for pair in lines.windows(2) {
            let Some(caps) = RUNG_COMMENT.captures(pair[0]) else {
                continue;
            };
            if !RUNG.is_match(pair[1]) {
                continue;
            }
            let comment = decode_l5k_string(&caps[1]);
            if comment.is_empty() {
                continue;
            }
            for operand in RUNG_OPERAND.find_iter(pair[1]) {
                descriptions
                    .entry(self.normalizer.normalize(operand.as_str()))
                    .or_insert_with(|| comment.clone());
            }
        }
        let from_rungs = descriptions.len();

        let mut from_tags: BTreeMap<String, String> = BTreeMap::new();
        for line in &lines {
            let (Some(decl), Some(desc)) =
                (TAG_DECLARATION.captures(line), TAG_DESCRIPTION.captures(line))
            else {
                continue;
            };
            let description = decode_l5k_string(&desc[1]);
            if description.is_empty() {
                continue;
            }
            let mut keys = vec![self.normalizer.normalize(&decl[1])];
            if let Some(target) = decl.get(2) {
                keys.push(self.normalizer.normalize(target.as_str()));
            }
            for key in keys {
                from_tags.entry(key).or_insert_with(|| description.clone());
            }
        }
        for (address, description) in from_tags {
            descriptions.entry(address).or_insert(description);
        }

        debug!(
            "L5K: {} rung-comment descriptions, {} total",
            from_rungs,
            descriptions.len()
        );
        descriptions
    }
}

impl Enricher for L5kEnricher {
    fn source_tag(&self) -> SourceTag {
        SourceTag::L5k
    }

    fn enrich(&self, records: &[IoRecord], source: &SourceDocument) -> EnrichOutcome {
        let mut outcome = EnrichOutcome::default();
        let Some(content) = source.as_text() else {
            outcome
                .notes
                .push(unreadable_source(self.source_tag(), source, "an L5K program export"));
            return outcome;
        };

        let index = RecordIndex::new(records);
        for (address, description) in self.read_descriptions(content) {
            outcome.push(
                EnrichmentFragment::new(address, SourceTag::L5k).with_description(description),
                &index,
            );
        }

        info!(
            "L5K export {}: {} fragments, {} unmatched",
            source.name(),
            outcome.fragments.len(),
            outcome.unmatched
        );
        outcome
    }
}

/// Undo L5K string escapes (`$N` newline, `$Q` quote, `$$`) and collapse whitespace.
fn decode_l5k_string(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '$' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('N' | 'n' | 'L' | 'l' | 'R' | 'r' | 'T' | 't') => out.push(' '),
            Some('Q' | 'q') => out.push('"'),
            Some('\'') => out.push('\''),
            Some('$') => out.push('$'),
            Some(other) => {
                out.push('$');
                out.push(other);
            }
            None => out.push('$'),
        }
    }
    out.replace("\"\"", "\"")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
