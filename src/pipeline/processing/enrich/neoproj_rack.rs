use once_cell::sync::Lazy;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader as XmlReader;
use regex::Regex;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use super::layout::{Anchor, PlacedText, ScreenRow, NEOPROJ_RACK};
use super::{unreadable_source, EnrichOutcome, Enricher, RecordIndex};
use crate::config::Config;
use crate::constants::NEOPROJ_TAG_PREFIX;
use crate::domain::{EnrichmentFragment, IoRecord, Note, NoteKind, SourceTag};
use crate::error::{PipelineError, Result};
use crate::io::archive::file_stem;
use crate::io::SourceDocument;
use crate::pipeline::processing::address::{clean_target_id, normalize_unit};

static TAG_BINDING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\[Tags\.([^\]]+)\]").expect("valid regex"));

/// Tag, unit and description labels next to the numeric displays of `RACK*.xaml` screens.
#[derive(Debug, Clone)]
pub struct NeoProjRackEnricher {
    /// Upper-cased screen name prefixes
    prefixes: Vec<String>,
}

impl Default for NeoProjRackEnricher {
    fn default() -> Self {
        Self::new(["RACK"])
    }
}

impl NeoProjRackEnricher {
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            prefixes: prefixes
                .into_iter()
                .map(|p| p.as_ref().trim().to_uppercase())
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.neoproj.rack_prefixes)
    }

    fn is_rack_screen(&self, screen: &str) -> bool {
        let upper = screen.to_uppercase();
        self.prefixes.iter().any(|p| upper.starts_with(p.as_str()))
    }
}

impl Enricher for NeoProjRackEnricher {
    fn source_tag(&self) -> SourceTag {
        SourceTag::NeoProjRack
    }

    fn enrich(&self, records: &[IoRecord], source: &SourceDocument) -> EnrichOutcome {
        let mut outcome = EnrichOutcome::default();
        let Some(archive) = source.as_archive() else {
            outcome
                .notes
                .push(unreadable_source(self.source_tag(), source, "a NeoProj project"));
            return outcome;
        };

        let index = RecordIndex::new(records);
        // tag name -> (row, screen); files are visited in path order and the first row wins
        let mut rows: BTreeMap<String, (ScreenRow, String)> = BTreeMap::new();
        let mut screens_read = 0usize;

        for (path, bytes) in archive.files_with_extension("xaml") {
            let screen = file_stem(path);
            if !self.is_rack_screen(screen) {
                continue;
            }
            let (anchors, texts) = match read_rack_xaml(&String::from_utf8_lossy(bytes)) {
                Ok(parsed) => parsed,
                Err(e) => {
                    warn!("Skipping rack screen {}: {}", path, e);
                    outcome.notes.push(Note::warning(
                        NoteKind::SkippedRecord,
                        None,
                        format!("rack screen {} not read: {}", path, e),
                    ));
                    continue;
                }
            };
            screens_read += 1;

            let layout = NEOPROJ_RACK.infer(&texts);
            let screen_rows = NEOPROJ_RACK.extract_rows(&layout, &anchors, &texts);
            debug!("Rack screen '{}': {} rows", screen, screen_rows.len());
            for row in screen_rows {
                rows.entry(row.binding.clone())
                    .or_insert_with(|| (row, screen.to_string()));
            }
        }

        for (tag_name, (row, screen)) in rows {
            let hmi_name = format!("{}{}", NEOPROJ_TAG_PREFIX, tag_name);
            let address = index
                .address_for_name(&hmi_name)
                .map(str::to_string)
                .unwrap_or(hmi_name);
            let fragment = EnrichmentFragment::new(address, SourceTag::NeoProjRack)
                .with_equipment_name(row.description)
                .with_tag_id(clean_target_id(&row.tag_id))
                .with_units(normalize_unit(&row.unit))
                .with_screen(screen);
            outcome.push(fragment, &index);
        }

        info!(
            "NeoProj rack screens: {} read, {} fragments, {} unmatched",
            screens_read,
            outcome.fragments.len(),
            outcome.unmatched
        );
        outcome
    }
}

#[derive(Default)]
struct PendingNumeric {
    x: Option<f64>,
    y: Option<f64>,
    binding: Option<String>,
}

/// Numeric displays (anchors) and labels (texts) of one rack screen.
pub fn read_rack_xaml(xml: &str) -> Result<(Vec<Anchor>, Vec<PlacedText>)> {
    let mut reader = XmlReader::from_str(xml);
    reader.trim_text(true);
    let mut buf = Vec::new();
    let mut anchors = Vec::new();
    let mut texts = Vec::new();
    let mut pending: Option<PendingNumeric> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                if e.local_name().as_ref() == b"AnalogNumericFX" {
                    pending = Some(numeric_from(&e)?);
                } else {
                    visit_element(&e, &mut pending, &mut texts)?;
                }
            }
            Ok(Event::Empty(e)) => {
                if e.local_name().as_ref() == b"AnalogNumericFX" {
                    push_anchor(numeric_from(&e)?, &mut anchors);
                } else {
                    visit_element(&e, &mut pending, &mut texts)?;
                }
            }
            Ok(Event::End(e)) => {
                if e.local_name().as_ref() == b"AnalogNumericFX" {
                    if let Some(numeric) = pending.take() {
                        push_anchor(numeric, &mut anchors);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(PipelineError::container(
                    "NEOPROJ",
                    format!("invalid XAML at byte {}: {}", reader.buffer_position(), e),
                ))
            }
            _ => {}
        }
        buf.clear();
    }

    Ok((anchors, texts))
}

fn numeric_from(e: &BytesStart<'_>) -> Result<PendingNumeric> {
    let mut numeric = PendingNumeric::default();
    for (key, value) in attributes(e)? {
        match key.as_str() {
            "Canvas.Left" => numeric.x = value.trim().parse().ok(),
            "Canvas.Top" => numeric.y = value.trim().parse().ok(),
            _ => {
                if numeric.binding.is_none() {
                    numeric.binding = binding_of(&key, &value);
                }
            }
        }
    }
    Ok(numeric)
}

/// Labels become texts; any element nested in a numeric display may carry its binding.
fn visit_element(
    e: &BytesStart<'_>,
    pending: &mut Option<PendingNumeric>,
    texts: &mut Vec<PlacedText>,
) -> Result<()> {
    let attrs = attributes(e)?;

    if let Some(numeric) = pending.as_mut() {
        if numeric.binding.is_none() {
            numeric.binding = attrs.iter().find_map(|(k, v)| binding_of(k, v));
        }
    }

    if e.local_name().as_ref() == b"Label" {
        let get = |name: &str| attrs.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str());
        let x = get("Canvas.Left").and_then(|v| v.trim().parse::<f64>().ok());
        let y = get("Canvas.Top").and_then(|v| v.trim().parse::<f64>().ok());
        if let (Some(text), Some(x), Some(y)) = (get("Text"), x, y) {
            let text = text.trim();
            if !text.is_empty() {
                texts.push(PlacedText::new(x.round() as i32, y.round() as i32, text));
            }
        }
    }
    Ok(())
}

fn push_anchor(numeric: PendingNumeric, anchors: &mut Vec<Anchor>) {
    if let (Some(x), Some(y), Some(binding)) = (numeric.x, numeric.y, numeric.binding) {
        anchors.push(Anchor::new(x.round() as i32, y.round() as i32, binding));
    }
}

fn binding_of(key: &str, value: &str) -> Option<String> {
    if key != "Path" && !key.ends_with(".Path") {
        return None;
    }
    TAG_BINDING.captures(value.trim()).map(|c| c[1].to_string())
}

fn attributes(e: &BytesStart<'_>) -> Result<Vec<(String, String)>> {
    let mut out = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| {
            PipelineError::container("NEOPROJ", format!("invalid XAML attribute: {err}"))
        })?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|err| {
                PipelineError::container("NEOPROJ", format!("invalid XAML attribute value: {err}"))
            })?
            .into_owned();
        out.push((key, value));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SourceFormat;
    use crate::io::ProjectArchive;

    const RACK_XAML: &str = r#"<Canvas xmlns:nac="clr-namespace:Neo.ApplicationFramework.Controls">
  <nac:Label Text="TAG" Canvas.Left="100" Canvas.Top="60" />
  <nac:Label Text="DESCRIPTION" Canvas.Left="300" Canvas.Top="60" />
  <nac:Label Text="1" Canvas.Left="20" Canvas.Top="100" />
  <nac:Label Text="PT_200" Canvas.Left="100" Canvas.Top="100" />
  <nac:Label Text="TEST HEADER PRESSURE" Canvas.Left="300" Canvas.Top="100" />
  <nac:Label Text="PSIG" Canvas.Left="520" Canvas.Top="100" />
  <nac:AnalogNumericFX Canvas.Left="600" Canvas.Top="98">
    <nac:AnalogNumericFX.Value>
      <Binding Path="[Tags.PT_200].Value" />
    </nac:AnalogNumericFX.Value>
  </nac:AnalogNumericFX>
  <nac:Label Text="LIT-300" Canvas.Left="100" Canvas.Top="160" />
  <nac:Label Text="TANK &amp; SUMP LEVEL" Canvas.Left="300" Canvas.Top="160" />
  <nac:AnalogNumericFX Canvas.Left="600" Canvas.Top="160" Path="[Tags.LT_300]" />
  <nac:Label Text="SPARE" Canvas.Left="100" Canvas.Top="220" />
  <nac:AnalogNumericFX Canvas.Left="600" Canvas.Top="220" Path="[Tags.Spare_1]" />
</Canvas>"#;

    #[test]
    fn test_read_rack_xaml() {
        let (anchors, texts) = read_rack_xaml(RACK_XAML).unwrap();
        assert_eq!(
            anchors,
            vec![
                Anchor::new(600, 98, "PT_200"),
                Anchor::new(600, 160, "LT_300"),
                Anchor::new(600, 220, "Spare_1"),
            ]
        );
        assert!(texts.iter().any(|t| t.text == "TANK & SUMP LEVEL"));
    }

    #[test]
    fn test_rack_rows_map_to_records_by_tag_name() {
        let mut pressure = IoRecord::new("RACK00_SLOT02[1]", SourceFormat::NeoProj);
        pressure.raw_name = "Tags.PT_200".into();
        let mut level = IoRecord::new("Tags.LT_300", SourceFormat::NeoProj);
        level.raw_name = "Tags.LT_300".into();
        let records = vec![pressure, level];

        let archive = ProjectArchive::new("Plant.zip")
            .with_file("RACK01.xaml", RACK_XAML)
            .with_file("Overview.xaml", RACK_XAML.replace("PT_200", "XX_1"));
        let source = SourceDocument::Archive(archive);

        let outcome = NeoProjRackEnricher::default().enrich(&records, &source);
        assert_eq!(outcome.fragments.len(), 2);
        assert_eq!(outcome.unmatched, 0);

        let first = &outcome.fragments[0];
        assert_eq!(first.address, "Tags.LT_300");
        assert_eq!(first.tag_id.as_deref(), Some("LIT-300"));
        assert_eq!(first.equipment_name.as_deref(), Some("TANK & SUMP LEVEL"));

        let second = &outcome.fragments[1];
        assert_eq!(second.address, "RACK00_SLOT02[1]");
        assert_eq!(second.tag_id.as_deref(), Some("PT-200"));
        assert_eq!(second.units.as_deref(), Some("PSIG"));
        assert!(second.screens.contains("RACK01"));
    }

    #[test]
    fn test_malformed_xaml_is_skipped_with_a_note() {
        let archive = ProjectArchive::new("Plant.zip").with_file("RACK02.xaml", "<Canvas><a></b>");
        let outcome =
            NeoProjRackEnricher::default().enrich(&[], &SourceDocument::Archive(archive));
        assert!(outcome.fragments.is_empty());
        assert_eq!(outcome.notes[0].kind, NoteKind::SkippedRecord);
    }
}
