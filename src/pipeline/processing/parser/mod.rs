pub mod cpa;
pub mod cpa_document;
pub mod neoproj;

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::warn;

use crate::config::Config;
use crate::domain::{IoRecord, Note, NoteKind, SourceFormat};
use crate::error::Result;
use crate::io::{PipelineInputs, SourceDocument, Table};
use crate::metrics::ParserMetrics;

pub use cpa::CpaParser;
pub use cpa_document::CpaDocument;
pub use neoproj::NeoProjParser;

/// Everything a project parser may read
#[derive(Debug, Clone, Copy, Default)]
pub struct ProjectInput<'a> {
    pub container: Option<&'a SourceDocument>,
    pub tags_export: Option<&'a Table>,
    pub alarms_export: Option<&'a Table>,
}

impl<'a> From<&'a PipelineInputs> for ProjectInput<'a> {
    fn from(inputs: &'a PipelineInputs) -> Self {
        Self {
            container: inputs.project.as_ref(),
            tags_export: inputs.tags_export.as_ref(),
            alarms_export: inputs.alarms_export.as_ref(),
        }
    }
}

/// Records extracted from one project plus what went wrong along the way
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParseOutcome {
    pub records: Vec<IoRecord>,
    pub notes: Vec<Note>,
    /// Blocks or rows skipped because a mandatory field was missing
    pub skipped: usize,
    /// Records dropped because their address was already taken
    pub duplicates: usize,
    /// `@N` text references with no library entry
    pub missing_text: usize,
}

/// Turns one vendor project container into I/O records.
pub trait ProjectParser {
    fn format(&self) -> SourceFormat;

    /// Fails only on a container that cannot be read at all; everything else is
    /// reported through [`ParseOutcome::notes`].
    fn parse(&self, input: &ProjectInput<'_>) -> Result<ParseOutcome>;
}

/// A wrapper that adds metrics to any parser implementation
pub struct MetricsParser<P: ProjectParser> {
    inner: P,
}

impl<P: ProjectParser> MetricsParser<P> {
    pub fn new(inner: P) -> Self {
        Self { inner }
    }
}

impl<P: ProjectParser> ProjectParser for MetricsParser<P> {
    fn format(&self) -> SourceFormat {
        self.inner.format()
    }

    fn parse(&self, input: &ProjectInput<'_>) -> Result<ParseOutcome> {
        let start_time = std::time::Instant::now();
        let hmi_type = self.inner.format().as_str();

        match self.inner.parse(input) {
            Ok(outcome) => {
                ParserMetrics::record_parse_success(
                    hmi_type,
                    outcome.records.len(),
                    start_time.elapsed().as_secs_f64(),
                );
                ParserMetrics::record_duplicates(outcome.duplicates);
                ParserMetrics::record_skipped(outcome.skipped);
                ParserMetrics::record_missing_text(outcome.missing_text);
                Ok(outcome)
            }
            Err(e) => {
                ParserMetrics::record_parse_error(hmi_type);
                Err(e)
            }
        }
    }
}

/// The parser for the configured HMI type, wrapped with metrics.
pub fn parser_for(config: &Config) -> Box<dyn ProjectParser> {
    match config.hmi_type {
        SourceFormat::Cpa => Box::new(MetricsParser::new(CpaParser::from_config(config))),
        SourceFormat::NeoProj => Box::new(MetricsParser::new(NeoProjParser::from_config(config))),
    }
}

/// Keep the first record per address.
///
/// Later duplicates contribute their screens to the kept record and are reported as
/// warnings. Returns the number of records dropped.
pub fn dedupe_by_address(records: &mut Vec<IoRecord>, notes: &mut Vec<Note>) -> usize {
    let mut seen: HashSet<String> = HashSet::new();
    let mut kept: Vec<IoRecord> = Vec::with_capacity(records.len());
    let mut dropped = 0;

    for record in records.drain(..) {
        if seen.insert(record.address.clone()) {
            kept.push(record);
            continue;
        }
        dropped += 1;
        warn!("Duplicate address {} dropped", record.address);
        notes.push(Note::warning(
            NoteKind::DuplicateAddress,
            Some(&record.address),
            format!(
                "address already defined, keeping the first definition (dropped '{}')",
                record.raw_name
            ),
        ));
        if let Some(first) = kept.iter_mut().find(|r| r.address == record.address) {
            first.screen_refs.extend(record.screen_refs);
            first.is_alarm |= record.is_alarm;
        }
    }

    *records = kept;
    dropped
}
