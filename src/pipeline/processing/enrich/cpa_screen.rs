use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use super::layout::{Anchor, LayoutProfile, PlacedText, ScreenRow, DISCRETE_ANALOG, RACK};
use super::{unreadable_source, EnrichOutcome, Enricher, RecordIndex};
use crate::domain::{EnrichmentFragment, IoRecord, Note, NoteKind, SourceTag};
use crate::io::SourceDocument;
use crate::pipeline::processing::address::{clean_target_id, normalize_unit, AddressNormalizer};
use crate::pipeline::processing::parser::cpa_document::{CpaDocument, CpaScreen};
use crate::pipeline::processing::text_library::TextLibrary;

static DISCRETE_ANALOG_SCREEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        concat!(
            r"(?i)^(Discrete\s*Input|Discrete\s*Output|Analog\s*Input|Analog\s*Output",
            r"|(DI|DO|AI|AO)\s*[\(\[\s])",
        ),
    )
    .expect("valid regex")
});

/// Tag, unit and description columns of CPA rack and discrete/analog I/O screens.
#[derive(Debug, Clone, Default)]
pub struct CpaScreenEnricher {
    normalizer: AddressNormalizer,
}

impl CpaScreenEnricher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enrich_document(&self, records: &[IoRecord], doc: &CpaDocument) -> EnrichOutcome {
        let index = RecordIndex::new(records);
        let mut outcome = EnrichOutcome::default();
        // address -> (row, screen); rack screens are read first so they win
        let mut rows: BTreeMap<String, (ScreenRow, String)> = BTreeMap::new();

        let rack_screens = doc.screens.iter().filter(|s| is_rack_screen(&s.name));
        let da_screens = doc
            .screens
            .iter()
            .filter(|s| !is_rack_screen(&s.name) && DISCRETE_ANALOG_SCREEN.is_match(&s.name));

        let mut screens_read = 0usize;
        for (screen, profile) in rack_screens
            .map(|s| (s, &*RACK))
            .chain(da_screens.map(|s| (s, &*DISCRETE_ANALOG)))
        {
            screens_read += 1;
            let screen_rows = screen_rows(screen, &doc.library, profile);
            debug!("Screen '{}': {} table rows", screen.name, screen_rows.len());
            for row in screen_rows {
                let address = self.normalizer.normalize(&row.binding);
                if address.is_empty() {
                    continue;
                }
                rows.entry(address)
                    .or_insert_with(|| (row, screen.name.clone()));
            }
        }

        for (address, (row, screen)) in rows {
            let fragment = EnrichmentFragment::new(address, SourceTag::CpaScreen)
                .with_description(row.description.clone())
                .with_equipment_name(row.description)
                .with_tag_id(clean_target_id(&row.tag_id))
                .with_units(normalize_unit(&row.unit))
                .with_screen(screen);
            outcome.push(fragment, &index);
        }

        info!(
            "CPA screens: {} I/O screens read, {} fragments, {} unmatched",
            screens_read,
            outcome.fragments.len(),
            outcome.unmatched
        );
        outcome
    }
}

impl Enricher for CpaScreenEnricher {
    fn source_tag(&self) -> SourceTag {
        SourceTag::CpaScreen
    }

    fn enrich(&self, records: &[IoRecord], source: &SourceDocument) -> EnrichOutcome {
        let Some(content) = source.as_text() else {
            let mut outcome = EnrichOutcome::default();
            outcome
                .notes
                .push(unreadable_source(self.source_tag(), source, "a CPA project"));
            return outcome;
        };
        match CpaDocument::parse(content) {
            Ok(doc) => self.enrich_document(records, &doc),
            Err(e) => {
                warn!("CPA screens not read: {}", e);
                let mut outcome = EnrichOutcome::default();
                outcome.notes.push(Note::warning(
                    NoteKind::MissingSource,
                    None,
                    format!("CPA screens not read: {}", e),
                ));
                outcome
            }
        }
    }
}

fn is_rack_screen(name: &str) -> bool {
    name.trim().to_uppercase().starts_with("RACK")
}

/// Split a screen into placed texts and bound anchors, then read its table.
fn screen_rows(
    screen: &CpaScreen,
    library: &TextLibrary,
    profile: &LayoutProfile,
) -> Vec<ScreenRow> {
    let mut texts = Vec::new();
    let mut anchors = Vec::new();

    for object in &screen.objects {
        let (Some(x), Some(y)) = (object.x(), object.y()) else {
            continue;
        };
        if let Some(io) = object.io() {
            anchors.push(Anchor::new(x, y, io));
        }
        if let Some(text) = object
            .get("Text")
            .and_then(|raw| library.resolve_value(raw).into_option())
        {
            texts.push(PlacedText::new(x, y, text));
        }
    }

    if anchors.is_empty() {
        return Vec::new();
    }
    let layout = profile.infer(&texts);
    profile.extract_rows(&layout, &anchors, &texts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SourceFormat;

    fn object(kind: &str, x: i32, y: i32, attr: (&str, &str)) -> String {
        format!("[[[[{kind}]]]]\nx={x}\ny={y}\n{}={}\n", attr.0, attr.1)
    }

    fn project() -> String {
        let mut cpa = String::from("[[[TextLibrary]]]\nNo=7\n");
        cpa.push_str("TextW=0050 0049 0054 002D 0038 0030 0031\n");
        cpa.push_str("[[[GraphicBlock]]]\nName=RACK 1 ANALOG\n");
        cpa.push_str(&object("GrText", 100, 60, ("Text", "TAG")));
        cpa.push_str(&object("GrText", 300, 60, ("Text", "UNITS")));
        cpa.push_str(&object("GrText", 400, 60, ("Text", "DESCRIPTION")));
        cpa.push_str(&object("GrText", 100, 100, ("Text", "@7")));
        cpa.push_str(&object("GrText", 300, 100, ("Text", "psig")));
        cpa.push_str(&object("GrText", 400, 100, ("Text", "V-800 INLET SEPARATOR PRESSURE")));
        cpa.push_str(&object("GrAnaNumeric", 600, 100, ("IO", "RACK00_SLOT02[1]!RD")));
        cpa.push_str(&object("GrText", 100, 140, ("Text", "LIT_802")));
        cpa.push_str(&object("GrText", 400, 140, ("Text", "V-800 INLET SEPARATOR LEVEL")));
        cpa.push_str(&object("GrAnaNumeric", 600, 140, ("IO", "RACK00_SLOT02[2]")));
        cpa.push_str("[[[GraphicBlock]]]\nName=Discrete Inputs (Slot 6)\n");
        cpa.push_str(&object("GrText", 100, 100, ("Text", "LSHH-701")));
        cpa.push_str(&object("GrText", 300, 100, ("Text", "V-700 LEVEL SWITCH HIGH HIGH")));
        cpa.push_str(&object("GrDigSymbol", 500, 100, ("IO", "RACK00_SLOT06[3]")));
        cpa.push_str(&object("GrText", 100, 140, ("Text", "PSL-702")));
        cpa.push_str(&object("GrText", 300, 140, ("Text", "V-700 PRESSURE SWITCH LOW")));
        cpa.push_str(&object("GrDigSymbol", 500, 140, ("IO", "RACK00_SLOT06[4]")));
        cpa.push_str("[[[GraphicBlock]]]\nName=Overview\n");
        cpa.push_str(&object("GrText", 100, 100, ("Text", "SOMETHING ELSE ENTIRELY")));
        cpa.push_str(&object("GrAnaNumeric", 300, 100, ("IO", "READFLOAT[4]")));
        cpa
    }

    fn records() -> Vec<IoRecord> {
        ["RACK00_SLOT02[1]", "RACK00_SLOT02[2]", "RACK00_SLOT06[3]", "READFLOAT[4]"]
            .iter()
            .map(|a| IoRecord::new(*a, SourceFormat::Cpa))
            .collect()
    }

    #[test]
    fn test_rack_rows_become_fragments() {
        let source = SourceDocument::text("plant.cpa", project());
        let outcome = CpaScreenEnricher::new().enrich(&records(), &source);

        let pressure = outcome
            .fragments
            .iter()
            .find(|f| f.address == "RACK00_SLOT02[1]")
            .unwrap();
        assert_eq!(pressure.tag_id.as_deref(), Some("PIT-801"));
        assert_eq!(pressure.units.as_deref(), Some("PSIG"));
        assert_eq!(
            pressure.description.as_deref(),
            Some("V-800 INLET SEPARATOR PRESSURE")
        );
        assert!(pressure.screens.contains("RACK 1 ANALOG"));

        let level = outcome
            .fragments
            .iter()
            .find(|f| f.address == "RACK00_SLOT02[2]")
            .unwrap();
        assert_eq!(level.tag_id.as_deref(), Some("LIT-802"));
        assert!(level.units.is_none());
    }

    #[test]
    fn test_discrete_screen_rows_and_unmatched_addresses() {
        let source = SourceDocument::text("plant.cpa", project());
        let outcome = CpaScreenEnricher::new().enrich(&records(), &source);

        let switch = outcome
            .fragments
            .iter()
            .find(|f| f.address == "RACK00_SLOT06[3]")
            .unwrap();
        assert_eq!(switch.tag_id.as_deref(), Some("LSHH-701"));
        // RACK00_SLOT06[4] is on the screen but was never extracted
        assert_eq!(outcome.unmatched, 1);
        // Overview is not an I/O table screen
        assert!(outcome.fragments.iter().all(|f| f.address != "READFLOAT[4]"));
    }

    #[test]
    fn test_archive_source_yields_a_note() {
        let source = SourceDocument::Archive(crate::io::ProjectArchive::new("x.zip"));
        let outcome = CpaScreenEnricher::new().enrich(&records(), &source);
        assert!(outcome.fragments.is_empty());
        assert_eq!(outcome.notes[0].kind, NoteKind::MissingSource);
    }
}
