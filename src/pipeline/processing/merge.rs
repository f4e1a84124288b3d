//! Folding enrichment fragments into the extracted records.
//!
//! Every field is resolved independently: fragments for an address are ranked by
//! precedence (lower `rank` first, then `source_tag`), and the first fragment carrying a
//! value for the field supplies it. The record's own parser description, tag hint and
//! unit hint only fill what no fragment supplied. The ranking never looks at the order
//! fragments arrived in, so shuffling the fragment list cannot change the result.

use std::collections::HashMap;
use tracing::debug;

use crate::constants::PROVENANCE_NONE;
use crate::domain::{EnrichedRecord, EnrichmentFragment, IoRecord, Note, NoteKind, SourceTag};

/// Merge `fragments` into `base`, one enriched record per base record, in base order.
///
/// Fragments whose address matches no record are ignored.
pub fn merge(base: Vec<IoRecord>, fragments: &[EnrichmentFragment]) -> Vec<EnrichedRecord> {
    let mut by_address: HashMap<&str, Vec<&EnrichmentFragment>> = HashMap::new();
    for fragment in fragments {
        by_address
            .entry(fragment.address.as_str())
            .or_default()
            .push(fragment);
    }
    for group in by_address.values_mut() {
        group.sort_by(|a, b| precedence_key(a).cmp(&precedence_key(b)));
    }

    base.into_iter()
        .map(|record| {
            let ranked = by_address
                .get(record.address.as_str())
                .map(Vec::as_slice)
                .unwrap_or_default();
            merge_record(record, ranked)
        })
        .collect()
}

type PrecedenceKey<'a> = (
    u8,
    SourceTag,
    Option<&'a str>,
    Option<&'a str>,
    Option<&'a str>,
    Option<&'a str>,
);

/// Total order over fragments: precedence first, content as the tie-breaker.
fn precedence_key(f: &EnrichmentFragment) -> PrecedenceKey<'_> {
    (
        f.rank,
        f.source_tag,
        f.description.as_deref(),
        f.equipment_name.as_deref(),
        f.tag_id.as_deref(),
        f.units.as_deref(),
    )
}

fn merge_record(record: IoRecord, ranked: &[&EnrichmentFragment]) -> EnrichedRecord {
    let mut merged = EnrichedRecord::from_record(record);

    // A fragment without a description still names the equipment
    let description = ranked.iter().find_map(|f| {
        f.description
            .as_deref()
            .or(f.equipment_name.as_deref())
            .map(|text| (text, f.source_tag.label()))
    });
    if let Some((text, label)) = description {
        merged.description = text.to_string();
        merged.description_source = label.to_string();
    } else if merged.description.is_empty() {
        merged.description_source = PROVENANCE_NONE.to_string();
    }

    if let Some(units) = ranked.iter().find_map(|f| f.units.as_deref()) {
        merged.units = units.to_string();
    }
    if let Some(name) = ranked.iter().find_map(|f| f.equipment_name.as_deref()) {
        merged.equipment_name = name.to_string();
    }
    if let Some(tag) = ranked.iter().find_map(|f| f.tag_id.as_deref()) {
        merged.tag_id = tag.to_string();
    }
    for fragment in ranked {
        merged.screens.extend(fragment.screens.iter().cloned());
    }

    merged
}

/// Drop records that appear on no screen.
pub fn filter_unused(records: Vec<EnrichedRecord>) -> (Vec<EnrichedRecord>, Vec<Note>) {
    let (kept, dropped): (Vec<_>, Vec<_>) = records
        .into_iter()
        .partition(|r| !r.screens.is_empty());

    let notes = dropped
        .iter()
        .map(|r| {
            Note::info(
                NoteKind::FilteredUnused,
                Some(r.address()),
                "not referenced by any screen; dropped",
            )
        })
        .collect();
    debug!("Unused I/O filter: kept {}, dropped {}", kept.len(), dropped.len());
    (kept, notes)
}
