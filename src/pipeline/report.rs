//! Run summary persisted next to the stage artifacts and printed by the CLI.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use super::EnrichStage;
use crate::domain::{EnrichedRecord, MtlRow, Note, NoteSeverity, SourceFormat};
use crate::pipeline::processing::{MtlOutcome, ParseOutcome};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractSummary {
    pub records: usize,
    pub skipped: usize,
    pub duplicates: usize,
    pub missing_text: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnrichSummary {
    pub records: usize,
    pub fragments: usize,
    pub unmatched: usize,
    pub with_description: usize,
    pub filtered_unused: usize,
    /// description_source label -> record count
    pub description_sources: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConvertSummary {
    pub rows: usize,
    pub unclassified: usize,
    pub collisions: usize,
    pub alarms_remapped: usize,
    pub units_filled: usize,
    pub states_filled: usize,
    pub scaling_filled: usize,
    pub category_counts: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineReport {
    pub run_id: Uuid,
    pub hmi_type: SourceFormat,
    pub generated_at: DateTime<Utc>,
    pub extract: ExtractSummary,
    pub enrich: EnrichSummary,
    pub convert: ConvertSummary,
    pub warnings: usize,
    pub infos: usize,
    pub duration_secs: f64,
}

impl ExtractSummary {
    pub fn from_outcome(outcome: &ParseOutcome) -> Self {
        Self {
            records: outcome.records.len(),
            skipped: outcome.skipped,
            duplicates: outcome.duplicates,
            missing_text: outcome.missing_text,
        }
    }
}

impl EnrichSummary {
    pub fn from_stage(stage: &EnrichStage) -> Self {
        Self::from_records(&stage.records, stage.fragments, stage.unmatched, stage.filtered)
    }

    pub fn from_records(
        records: &[EnrichedRecord],
        fragments: usize,
        unmatched: usize,
        filtered_unused: usize,
    ) -> Self {
        let mut description_sources = BTreeMap::new();
        for record in records {
            *description_sources
                .entry(record.description_source.clone())
                .or_insert(0) += 1;
        }
        Self {
            records: records.len(),
            fragments,
            unmatched,
            with_description: records
                .iter()
                .filter(|r| !r.description.trim().is_empty())
                .count(),
            filtered_unused,
            description_sources,
        }
    }
}

impl ConvertSummary {
    pub fn from_outcome(outcome: &MtlOutcome) -> Self {
        let filled = |field: fn(&MtlRow) -> &str| {
            outcome
                .rows
                .iter()
                .filter(|row| !field(row).is_empty())
                .count()
        };
        Self {
            rows: outcome.rows.len(),
            unclassified: outcome.unclassified,
            collisions: outcome.collisions,
            alarms_remapped: outcome.alarms_remapped,
            units_filled: filled(|row| row.target_units.as_str()),
            states_filled: filled(|row| row.states.as_str()),
            scaling_filled: filled(|row| row.target_scaling.as_str()),
            category_counts: outcome.category_counts.clone(),
        }
    }
}

impl PipelineReport {
    pub fn new(run_id: Uuid, hmi_type: SourceFormat) -> Self {
        Self {
            run_id,
            hmi_type,
            generated_at: Utc::now(),
            extract: ExtractSummary::default(),
            enrich: EnrichSummary::default(),
            convert: ConvertSummary::default(),
            warnings: 0,
            infos: 0,
            duration_secs: 0.0,
        }
    }

    /// Tally note severities across all stages.
    pub fn count_notes<'a>(&mut self, notes: impl IntoIterator<Item = &'a Note>) {
        for note in notes {
            match note.severity {
                NoteSeverity::Warning => self.warnings += 1,
                NoteSeverity::Info => self.infos += 1,
            }
        }
    }

    /// Human readable lines for the terminal
    pub fn summary_lines(&self) -> Vec<String> {
        let mut lines = vec![
            format!("📊 MTL run {} ({})", self.run_id, self.hmi_type),
            format!(
                "   Extracted: {} records ({} skipped, {} duplicates, {} missing texts)",
                self.extract.records,
                self.extract.skipped,
                self.extract.duplicates,
                self.extract.missing_text
            ),
            format!(
                "   Enriched: {} records, {} with a description ({} fragments, {} unmatched)",
                self.enrich.records,
                self.enrich.with_description,
                self.enrich.fragments,
                self.enrich.unmatched
            ),
        ];
        if self.enrich.filtered_unused > 0 {
            lines.push(format!(
                "   Filtered unused I/O: {}",
                self.enrich.filtered_unused
            ));
        }
        lines.push(format!(
            "   MTL rows: {} ({} unclassified, {} alarms remapped, {} renamed)",
            self.convert.rows,
            self.convert.unclassified,
            self.convert.alarms_remapped,
            self.convert.collisions
        ));
        lines.push(format!(
            "   Filled: units {}, states {}, scaling {}",
            self.convert.units_filled, self.convert.states_filled, self.convert.scaling_filled
        ));
        for (label, count) in &self.convert.category_counts {
            lines.push(format!("      {label}: {count}"));
        }
        if self.warnings > 0 {
            lines.push(format!("⚠️  {} warnings, {} notes", self.warnings, self.infos));
        }
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::NoteKind;

    fn row(units: &str, states: &str) -> MtlRow {
        MtlRow {
            target_id: "PIT-801".into(),
            target_units: units.into(),
            equipment_description: String::new(),
            target_name_description: "Process Value".into(),
            target_scaling: String::new(),
            states: states.into(),
            iconics_plc_path: "READFLOAT[4]".into(),
            target_description: String::new(),
            description_source: "CSV".into(),
            screens: String::new(),
        }
    }

    #[test]
    fn test_convert_summary_counts_filled_columns() {
        let outcome = MtlOutcome {
            rows: vec![row("psig", ""), row("", "1=Ok;0=High Level"), row("ft", "")],
            ..MtlOutcome::default()
        };
        let summary = ConvertSummary::from_outcome(&outcome);
        assert_eq!(summary.rows, 3);
        assert_eq!(summary.units_filled, 2);
        assert_eq!(summary.states_filled, 1);
        assert_eq!(summary.scaling_filled, 0);
    }

    #[test]
    fn test_count_notes_by_severity() {
        let mut report = PipelineReport::new(Uuid::new_v4(), SourceFormat::Cpa);
        let notes = vec![
            Note::warning(NoteKind::Unclassified, Some("N7:0"), "x"),
            Note::info(NoteKind::UnmatchedFragment, None, "y"),
            Note::info(NoteKind::FilteredUnused, None, "z"),
        ];
        report.count_notes(&notes);
        assert_eq!(report.warnings, 1);
        assert_eq!(report.infos, 2);
        assert!(report.summary_lines().iter().any(|l| l.contains("1 warnings")));
    }
}
