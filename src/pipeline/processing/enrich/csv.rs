use std::collections::BTreeMap;
use tracing::{debug, info};

use super::{unreadable_source, EnrichOutcome, Enricher, RecordIndex};
use crate::domain::{EnrichmentFragment, IoRecord, SourceTag};
use crate::io::SourceDocument;
use crate::pipeline::processing::address::{clean_target_id, AddressNormalizer};

/// `COMMENT` descriptions and `ALIAS` tag names from a control-system CSV tag export.
///
/// Emits [`SourceTag::CsvAlias`] fragments (tag id plus description) and
/// [`SourceTag::Csv`] fragments (description only); the alias fragments outrank the
/// comment fragments in the merge.
#[derive(Debug, Clone, Default)]
pub struct CsvEnricher {
    normalizer: AddressNormalizer,
}

#[derive(Debug, Default, PartialEq)]
pub struct CsvExport {
    /// address -> comment text
    pub comments: BTreeMap<String, String>,
    /// address -> (alias name, description)
    pub aliases: BTreeMap<String, (String, String)>,
}

impl CsvEnricher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the `COMMENT` and `ALIAS` lines; the first entry per address wins.
    pub fn read_export(&self, content: &str) -> CsvExport {
        let mut export = CsvExport::default();

        for line in content.lines().map(str::trim) {
            if line.starts_with("COMMENT,,") {
                let fields = split_fields(line);
                if fields.len() < 6 {
                    continue;
                }
                let description = fields[3].trim();
                let address = self.normalizer.normalize(&fields[fields.len() - 1]);
                if description.is_empty() || address.is_empty() {
                    continue;
                }
                export
                    .comments
                    .entry(address)
                    .or_insert_with(|| description.to_string());
            } else if line.starts_with("ALIAS,,") {
                let fields = split_fields(line);
                if fields.len() < 6 {
                    continue;
                }
                let alias = fields[2].trim();
                let address = self.normalizer.normalize(&fields[5]);
                if alias.is_empty() || address.is_empty() {
                    continue;
                }
                export
                    .aliases
                    .entry(address)
                    .or_insert_with(|| (alias.to_string(), fields[3].trim().to_string()));
            }
        }

        debug!(
            "CSV export: {} COMMENT lines, {} ALIAS lines",
            export.comments.len(),
            export.aliases.len()
        );
        export
    }
}

impl Enricher for CsvEnricher {
    fn source_tag(&self) -> SourceTag {
        SourceTag::Csv
    }

    fn enrich(&self, records: &[IoRecord], source: &SourceDocument) -> EnrichOutcome {
        let mut outcome = EnrichOutcome::default();
        let Some(content) = source.as_text() else {
            outcome
                .notes
                .push(unreadable_source(self.source_tag(), source, "a CSV tag export"));
            return outcome;
        };

        let index = RecordIndex::new(records);
        let export = self.read_export(content);

        for (address, (alias, description)) in export.aliases {
            let fragment = EnrichmentFragment::new(address, SourceTag::CsvAlias)
                .with_tag_id(clean_target_id(&alias))
                .with_description(description);
            outcome.push(fragment, &index);
        }
        for (address, comment) in export.comments {
            outcome.push(
                EnrichmentFragment::new(address, SourceTag::Csv).with_description(comment),
                &index,
            );
        }

        info!(
            "CSV export {}: {} fragments, {} unmatched",
            source.name(),
            outcome.fragments.len(),
            outcome.unmatched
        );
        outcome
    }
}

/// Split one CSV line on commas outside double quotes; `""` inside quotes is a literal quote.
pub fn split_fields(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => fields.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    fields.push(current);
    fields
}
