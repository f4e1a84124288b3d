//! Master Tag List assembly: classification, text processing and target id uniqueness.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::time::Instant;
use tracing::{info, instrument, warn};

use super::classify::{ClassificationTables, Classifier};
use super::text::TextProcessor;
use crate::config::Config;
use crate::domain::{EnrichedRecord, MtlRow, Note, NoteKind};
use crate::metrics::ConverterMetrics;

/// The finished row set and what happened while building it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MtlOutcome {
    pub rows: Vec<MtlRow>,
    pub notes: Vec<Note>,
    pub unclassified: usize,
    /// Rows renamed with a `#n` discriminator
    pub collisions: usize,
    /// Alarm rows carried under their transmitter's tag
    pub alarms_remapped: usize,
    /// Category label -> row count
    pub category_counts: BTreeMap<String, usize>,
}

pub struct MtlBuilder {
    classifier: Classifier,
    text: TextProcessor,
}

impl MtlBuilder {
    pub fn new(classifier: Classifier, text: TextProcessor) -> Self {
        Self { classifier, text }
    }

    pub fn from_config(config: &Config) -> Self {
        let tables = ClassificationTables::standard();
        let text = TextProcessor::new(&tables, &config.processing);
        Self::new(Classifier::new(tables), text)
    }

    /// One row per record, sorted by `(target_id, sort_order, address)`, with colliding
    /// target ids renamed `<id>#<n>`.
    #[instrument(skip(self, records), fields(records = records.len()))]
    pub fn build(&self, records: &[EnrichedRecord]) -> MtlOutcome {
        let start_time = Instant::now();
        let mut outcome = MtlOutcome::default();

        let mut keyed: Vec<(u32, MtlRow)> = Vec::with_capacity(records.len());
        for record in records {
            let result = self.classifier.classify(record);
            if result.unclassified {
                outcome.unclassified += 1;
                outcome.notes.push(Note::warning(
                    NoteKind::Unclassified,
                    Some(record.address()),
                    "no classification rule matched",
                ));
            }
            if result.alarm_level.is_some() && !result.is_switch {
                outcome.alarms_remapped += 1;
            }
            *outcome
                .category_counts
                .entry(result.category_label.clone())
                .or_insert(0) += 1;

            let row = MtlRow {
                target_id: result.target_id,
                target_units: result.units,
                equipment_description: self.text.process(&result.equipment),
                target_name_description: result.category_label,
                target_scaling: result.scaling_info,
                states: result.states,
                iconics_plc_path: record.address().to_string(),
                target_description: self.text.process(&record.description),
                description_source: record.description_source.clone(),
                screens: record
                    .screens
                    .iter()
                    .map(String::as_str)
                    .collect::<Vec<_>>()
                    .join(", "),
            };
            keyed.push((result.sort_order, row));
        }

        keyed.sort_by(|(order_a, a), (order_b, b)| {
            a.target_id
                .cmp(&b.target_id)
                .then(order_a.cmp(order_b))
                .then_with(|| a.iconics_plc_path.cmp(&b.iconics_plc_path))
        });
        let mut rows: Vec<MtlRow> = keyed.into_iter().map(|(_, row)| row).collect();

        outcome.collisions = resolve_collisions(&mut rows, &mut outcome.notes);
        if outcome.collisions > 0 {
            warn!("Renamed {} colliding target ids", outcome.collisions);
            sort_by_discriminator(&mut rows);
        }
        outcome.rows = rows;

        ConverterMetrics::record_conversion(
            outcome.rows.len(),
            outcome.unclassified,
            outcome.alarms_remapped,
            outcome.collisions,
            start_time.elapsed().as_secs_f64(),
        );
        info!(
            "Built {} MTL rows ({} unclassified, {} alarms remapped)",
            outcome.rows.len(),
            outcome.unclassified,
            outcome.alarms_remapped
        );
        outcome
    }
}

/// Rename every repeat of a target id to the first free `<id>#<n>`, n from 2.
///
/// Rows must already be in output order; the first row keeps the plain id.
pub fn resolve_collisions(rows: &mut [MtlRow], notes: &mut Vec<Note>) -> usize {
    let taken: HashSet<String> = rows.iter().map(|r| r.target_id.clone()).collect();
    let mut used: HashSet<String> = HashSet::with_capacity(rows.len());
    let mut renamed = 0;

    for row in rows.iter_mut() {
        if used.insert(row.target_id.clone()) {
            continue;
        }
        let original = row.target_id.clone();
        let mut n = 2;
        let candidate = loop {
            let candidate = format!("{original}#{n}");
            if !taken.contains(&candidate) && !used.contains(&candidate) {
                break candidate;
            }
            n += 1;
        };
        notes.push(Note::warning(
            NoteKind::TargetIdCollision,
            Some(&row.iconics_plc_path),
            format!("target id {original} already used; renamed to {candidate}"),
        ));
        used.insert(candidate.clone());
        row.target_id = candidate;
        renamed += 1;
    }
    renamed
}

/// `PIT-1#3` -> (`PIT-1`, 3); ids without a numeric discriminator get 0.
fn discriminator_key(target_id: &str) -> (&str, u32) {
    target_id
        .rsplit_once('#')
        .and_then(|(base, n)| n.parse().ok().map(|n| (base, n)))
        .unwrap_or((target_id, 0))
}

/// Put renamed rows in discriminator order (`#2` before `#3` before `#10`).
///
/// The sort is stable, so rows sharing an id keep their `(sort_order, address)` order.
pub fn sort_by_discriminator(rows: &mut [MtlRow]) {
    rows.sort_by(|a, b| discriminator_key(&a.target_id).cmp(&discriminator_key(&b.target_id)));
}
