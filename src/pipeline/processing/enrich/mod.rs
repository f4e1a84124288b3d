pub mod cpa_screen;
pub mod csv;
pub mod l5k;
pub mod layout;
pub mod neoproj_rack;

use std::collections::{HashMap, HashSet};

use crate::config::Config;
use crate::domain::{EnrichmentFragment, IoRecord, Note, NoteKind, SourceFormat, SourceTag};
use crate::io::SourceDocument;

pub use cpa_screen::CpaScreenEnricher;
pub use csv::CsvEnricher;
pub use l5k::L5kEnricher;
pub use neoproj_rack::NeoProjRackEnricher;

/// Fragments produced by one enricher
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnrichOutcome {
    pub fragments: Vec<EnrichmentFragment>,
    pub notes: Vec<Note>,
    /// Source entries whose address matched no record
    pub unmatched: usize,
}

impl EnrichOutcome {
    /// Keep `fragment` when it targets a known record, otherwise count and note it.
    pub fn push(&mut self, fragment: EnrichmentFragment, index: &RecordIndex<'_>) {
        if fragment.is_empty() {
            return;
        }
        if index.contains(&fragment.address) {
            self.fragments.push(fragment);
        } else {
            self.unmatched += 1;
            self.notes.push(Note::info(
                NoteKind::UnmatchedFragment,
                Some(&fragment.address),
                format!("{} entry matches no extracted record", fragment.source_tag),
            ));
        }
    }
}

/// Reads one auxiliary source and proposes field values for known records.
pub trait Enricher {
    fn source_tag(&self) -> SourceTag;

    /// Never fails: an unreadable source yields no fragments and a note.
    fn enrich(&self, records: &[IoRecord], source: &SourceDocument) -> EnrichOutcome;
}

/// Lookup of extracted records by address and by HMI tag name
pub struct RecordIndex<'a> {
    addresses: HashSet<&'a str>,
    by_name: HashMap<&'a str, &'a str>,
}

impl<'a> RecordIndex<'a> {
    pub fn new(records: &'a [IoRecord]) -> Self {
        Self {
            addresses: records.iter().map(|r| r.address.as_str()).collect(),
            by_name: records
                .iter()
                .map(|r| (r.raw_name.as_str(), r.address.as_str()))
                .collect(),
        }
    }

    pub fn contains(&self, address: &str) -> bool {
        self.addresses.contains(address)
    }

    /// Address of the record whose raw name is `name`
    pub fn address_for_name(&self, name: &str) -> Option<&'a str> {
        self.by_name.get(name).copied()
    }
}

/// The screen enricher matching the configured HMI type.
pub fn screen_enricher_for(config: &Config) -> Box<dyn Enricher> {
    match config.hmi_type {
        SourceFormat::Cpa => Box::new(CpaScreenEnricher::new()),
        SourceFormat::NeoProj => Box::new(NeoProjRackEnricher::from_config(config)),
    }
}

/// Note for an enricher handed a source it cannot read.
pub(crate) fn unreadable_source(tag: SourceTag, source: &SourceDocument, expected: &str) -> Note {
    Note::warning(
        NoteKind::MissingSource,
        None,
        format!(
            "{} enricher expected {}, got {}; no fragments produced",
            tag,
            expected,
            source.name()
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_counts_unmatched_fragments() {
        let records = vec![IoRecord::new("READFLOAT[4]", SourceFormat::Cpa)];
        let index = RecordIndex::new(&records);
        let mut outcome = EnrichOutcome::default();

        outcome.push(
            EnrichmentFragment::new("READFLOAT[4]", SourceTag::Csv).with_description("A"),
            &index,
        );
        outcome.push(
            EnrichmentFragment::new("READFLOAT[5]", SourceTag::Csv).with_description("B"),
            &index,
        );
        outcome.push(EnrichmentFragment::new("READFLOAT[4]", SourceTag::Csv), &index);

        assert_eq!(outcome.fragments.len(), 1);
        assert_eq!(outcome.unmatched, 1);
        assert_eq!(outcome.notes[0].kind, NoteKind::UnmatchedFragment);
    }

    #[test]
    fn test_index_resolves_tag_names() {
        let mut record = IoRecord::new("RACK00_SLOT02[1]", SourceFormat::NeoProj);
        record.raw_name = "Tags.PT_200".into();
        let records = vec![record];
        let index = RecordIndex::new(&records);
        assert_eq!(index.address_for_name("Tags.PT_200"), Some("RACK00_SLOT02[1]"));
        assert_eq!(index.address_for_name("Tags.Other"), None);
    }

    #[test]
    fn test_screen_enricher_follows_configured_format() {
        let mut config = Config::default();
        assert_eq!(screen_enricher_for(&config).source_tag(), SourceTag::CpaScreen);
        config.hmi_type = SourceFormat::NeoProj;
        assert_eq!(screen_enricher_for(&config).source_tag(), SourceTag::NeoProjRack);
    }
}
