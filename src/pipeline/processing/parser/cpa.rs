use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::{debug, info};

use super::cpa_document::CpaDocument;
use super::{ParseOutcome, ProjectInput, ProjectParser};
use crate::config::Config;
use crate::constants::{PROVENANCE_ALARM, PROVENANCE_IONAMING};
use crate::domain::{IoKind, IoRecord, Note, NoteKind, SourceFormat};
use crate::error::{PipelineError, Result};
use crate::pipeline::processing::address::AddressNormalizer;
use crate::pipeline::processing::text_library::{TextLibrary, TextValue};

/// Extracts I/O records from a CPA project.
///
/// A record exists for every address bound to a tracked graphic object on a
/// non-excluded screen, and for every alarm address even when no screen shows it.
pub struct CpaParser {
    graphic_objects: HashSet<String>,
    excluded_screens: HashSet<String>,
    normalizer: AddressNormalizer,
}

impl CpaParser {
    pub fn new<G, E>(graphic_objects: G, excluded_screens: E) -> Self
    where
        G: IntoIterator,
        G::Item: AsRef<str>,
        E: IntoIterator,
        E::Item: AsRef<str>,
    {
        Self {
            graphic_objects: graphic_objects
                .into_iter()
                .map(|s| s.as_ref().trim().to_string())
                .collect(),
            excluded_screens: excluded_screens
                .into_iter()
                .map(|s| s.as_ref().trim().to_lowercase())
                .collect(),
            normalizer: AddressNormalizer::default(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.cpa.graphic_objects, &config.cpa.excluded_screens)
    }

    fn is_excluded(&self, screen: &str) -> bool {
        self.excluded_screens.contains(&screen.trim().to_lowercase())
    }

    /// Parse already-loaded project text.
    pub fn parse_text(&self, content: &str) -> Result<ParseOutcome> {
        let doc = CpaDocument::parse(content)?;
        let mut outcome = ParseOutcome::default();

        if doc.malformed > 0 {
            outcome.skipped = doc.malformed;
            outcome.notes.push(Note::warning(
                NoteKind::SkippedRecord,
                None,
                format!(
                    "{} IONaming/Alarm blocks skipped for a missing address or text",
                    doc.malformed
                ),
            ));
        }

        let mut descriptions: BTreeMap<String, (String, &'static str)> = BTreeMap::new();
        for entry in &doc.io_naming {
            let address = self.normalizer.normalize(&entry.address);
            if address.is_empty() {
                continue;
            }
            let Some(comment) = resolve_text(&doc.library, &entry.comment, &address, &mut outcome)
            else {
                continue;
            };
            if descriptions.contains_key(&address) {
                outcome.duplicates += 1;
                outcome.notes.push(Note::warning(
                    NoteKind::DuplicateAddress,
                    Some(&address),
                    format!("second IONaming comment '{}' ignored", comment),
                ));
                continue;
            }
            descriptions.insert(address, (comment, PROVENANCE_IONAMING));
        }

        let mut alarm_addresses: BTreeSet<String> = BTreeSet::new();
        for entry in &doc.alarms {
            let address = self.normalizer.normalize(&entry.address);
            if address.is_empty() {
                continue;
            }
            if !alarm_addresses.insert(address.clone()) {
                outcome.duplicates += 1;
                outcome.notes.push(Note::warning(
                    NoteKind::DuplicateAddress,
                    Some(&address),
                    "address referenced by more than one alarm block",
                ));
                continue;
            }
            if let Some(text) = resolve_text(&doc.library, &entry.text, &address, &mut outcome) {
                descriptions
                    .entry(address)
                    .or_insert((text, PROVENANCE_ALARM));
            }
        }

        let mut screens_by_address: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for screen in &doc.screens {
            if self.is_excluded(&screen.name) {
                debug!("Skipping excluded screen '{}'", screen.name);
                continue;
            }
            let mut found = 0usize;
            for object in &screen.objects {
                if !self.graphic_objects.contains(&object.kind) {
                    continue;
                }
                if let Some(io) = object.io() {
                    let address = self.normalizer.normalize(io);
                    if address.is_empty() {
                        continue;
                    }
                    screens_by_address
                        .entry(address)
                        .or_default()
                        .insert(screen.name.clone());
                    found += 1;
                }
            }
            debug!("Screen '{}': {} bound objects", screen.name, found);
        }

        let addresses: BTreeSet<String> = screens_by_address
            .keys()
            .cloned()
            .chain(alarm_addresses.iter().cloned())
            .collect();

        for address in addresses {
            let mut record = IoRecord::new(address.clone(), SourceFormat::Cpa);
            if let Some((text, provenance)) = descriptions.get(&address) {
                record = record.with_description(text.clone(), provenance);
            }
            if let Some(screens) = screens_by_address.remove(&address) {
                record.screen_refs = screens;
            }
            record.is_alarm = alarm_addresses.contains(&address);
            record.io_kind = Some(IoKind::from_address(&address, ""));
            outcome.records.push(record);
        }

        info!(
            "CPA: {} screens, {} records, {} alarms, {} descriptions",
            doc.screens.len(),
            outcome.records.len(),
            alarm_addresses.len(),
            descriptions.len()
        );
        Ok(outcome)
    }
}

/// Resolve an IONaming or alarm text, recording unresolved `@N` references.
fn resolve_text(
    library: &TextLibrary,
    raw: &str,
    address: &str,
    outcome: &mut ParseOutcome,
) -> Option<String> {
    match library.resolve_value(raw) {
        TextValue::Resolved(text) => Some(text),
        TextValue::Missing(id) => {
            outcome.missing_text += 1;
            outcome.notes.push(Note::warning(
                NoteKind::MissingText,
                Some(address),
                format!("text reference @{} not found in the text library", id),
            ));
            None
        }
        TextValue::Empty => None,
    }
}

impl ProjectParser for CpaParser {
    fn format(&self) -> SourceFormat {
        SourceFormat::Cpa
    }

    fn parse(&self, input: &ProjectInput<'_>) -> Result<ParseOutcome> {
        let container = input
            .container
            .ok_or_else(|| PipelineError::container("CPA", "no project file was provided"))?;
        let content = container.as_text().ok_or_else(|| {
            PipelineError::container("CPA", format!("{} is not a text project", container.name()))
        })?;
        self.parse_text(content)
    }
}
