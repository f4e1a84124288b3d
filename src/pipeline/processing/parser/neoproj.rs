use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, info, warn};

use super::{dedupe_by_address, ParseOutcome, ProjectInput, ProjectParser};
use crate::config::Config;
use crate::constants::{
    ALARMS_EXPORT_PATTERNS, NEOPROJ_TAG_PREFIX, PROVENANCE_ALARM, PROVENANCE_TAGS_EXPORT,
    TAGS_EXPORT_PATTERNS,
};
use crate::domain::{IoKind, IoRecord, Note, NoteKind, SourceFormat};
use crate::error::{PipelineError, Result};
use crate::io::archive::{file_name, file_stem};
use crate::io::{ProjectArchive, Table};
use crate::pipeline::processing::address::AddressNormalizer;

static XAML_TAG_BINDING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)Path="\[Tags\.([^\]]+)\]"#).expect("valid regex"));

static TAG_IN_PARENS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(([A-Z]{2,6}[-_]\d+[A-Z]?)\)").expect("valid regex"));
static ALARM_SWITCH_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        concat!(
            r"\b((?:PAHH|PAH|PAL|PALL|TAHH|TAH|TAL|TALL|LAHH|LAH|LAL|LALL|LSHH|LSH|LSL|LSLL)",
            r"[-_]\d+[A-Z]?)\b",
        ),
    )
    .expect("valid regex")
});
static TRANSMITTER_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b((?:PIT|LIT|TIT|FIT|FQIT|AIT|PDT)[-_]\d+[A-Z]?)\b").expect("valid regex")
});
static VALVE_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b((?:PY|LY|TY|FY|XY|ZSO|ZSC|PCV|LCV|TCV|FCV)[-_]\d+[A-Z]?)\b")
        .expect("valid regex")
});
static LEADING_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Z]{2,6}[-_]\d+[A-Z]?)\s").expect("valid regex"));

static RANGE_UNIT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\([\d\-,\s]+\s*([A-Z%]+)\)$").expect("valid regex"));
static TRAILING_RANGE_UNIT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r",\s*[\d\-]+\s*([A-Z]+)\)").expect("valid regex"));
static PERCENT_RANGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d+-\d+%|\(\d+%\)").expect("valid regex"));

const NAME_COLUMNS: &[&str] = &["// Name", "Name"];
const DATA_TYPE_COLUMNS: &[&str] = &["DataType"];
const ADDRESS_COLUMNS: &[&str] = &["Address_1", "Address"];
const DESCRIPTION_COLUMNS: &[&str] = &["Description"];
const ALARM_TEXT_COLUMNS: &[&str] = &["Text", "AlarmText"];
const DATA_CONNECTION_COLUMNS: &[&str] = &["DataConnection"];

/// Extracts I/O records from an IX Developer project.
///
/// The tag list comes from the Tags Export spreadsheet, supplied next to the project
/// or found inside it. Screen usage comes from the `[Tags.X]` bindings in the XAML
/// screens, and alarm texts fill in descriptions the export leaves empty.
#[derive(Debug, Clone, Default)]
pub struct NeoProjParser {
    normalizer: AddressNormalizer,
}

impl NeoProjParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(_config: &Config) -> Self {
        Self::default()
    }

    /// Build records from the tag export, alarm export and screen bindings.
    pub fn parse_tables(
        &self,
        tags: &Table,
        alarms: Option<&Table>,
        tag_screens: &HashMap<String, BTreeSet<String>>,
    ) -> ParseOutcome {
        let mut outcome = ParseOutcome::default();
        let alarm_texts = alarms.map(alarm_lookup).unwrap_or_default();

        let name_col = tags.column(NAME_COLUMNS);
        let type_col = tags.column(DATA_TYPE_COLUMNS);
        let address_col = tags.column(ADDRESS_COLUMNS);
        let description_col = tags.column(DESCRIPTION_COLUMNS);

        if name_col.is_none() {
            warn!("Tags Export has no Name column, no records extracted");
            outcome.notes.push(Note::warning(
                NoteKind::SkippedRecord,
                None,
                "Tags Export has no Name column",
            ));
            outcome.skipped = tags.len();
            return outcome;
        }

        for (index, row) in tags.rows().iter().enumerate() {
            let name = Table::cell(row, name_col).trim();
            if name.is_empty() {
                outcome.skipped += 1;
                outcome.notes.push(Note::warning(
                    NoteKind::SkippedRecord,
                    None,
                    format!("Tags Export row {} has no tag name", index + 2),
                ));
                continue;
            }

            let data_type = Table::cell(row, type_col).trim();
            let raw_address = Table::cell(row, address_col).trim();
            let hmi_name = format!("{}{}", NEOPROJ_TAG_PREFIX, name);
            let address = match self.normalizer.normalize(raw_address) {
                a if a.is_empty() => hmi_name.clone(),
                a => a,
            };

            let mut record = IoRecord::new(address, SourceFormat::NeoProj);
            record.raw_name = hmi_name;
            record.data_type = Some(data_type.to_string()).filter(|d| !d.is_empty());
            record.io_kind = Some(IoKind::from_address(raw_address, data_type));

            let description = Table::cell(row, description_col).trim();
            if !description.is_empty() {
                record = record.with_description(description, PROVENANCE_TAGS_EXPORT);
            } else if let Some(text) = alarm_texts.get(name) {
                record = record.with_description(text.clone(), PROVENANCE_ALARM);
                record.is_alarm = true;
            }

            record.tag_hint =
                Some(extract_tag_hint(&record.raw_description)).filter(|t| !t.is_empty());
            record.unit_hint =
                Some(extract_unit_hint(&record.raw_description)).filter(|u| !u.is_empty());
            if let Some(screens) = tag_screens.get(name) {
                record.screen_refs = screens.clone();
            }
            record.is_alarm |= alarm_texts.contains_key(name);

            outcome.records.push(record);
        }

        outcome.duplicates = dedupe_by_address(&mut outcome.records, &mut outcome.notes);
        outcome
    }
}

impl ProjectParser for NeoProjParser {
    fn format(&self) -> SourceFormat {
        SourceFormat::NeoProj
    }

    fn parse(&self, input: &ProjectInput<'_>) -> Result<ParseOutcome> {
        let archive = input.container.and_then(|c| c.as_archive());

        let embedded_tags;
        let tags = match (input.tags_export, archive) {
            (Some(table), _) => table,
            (None, Some(archive)) => {
                embedded_tags = embedded_table(archive, TAGS_EXPORT_PATTERNS)?.ok_or_else(|| {
                    PipelineError::container(
                        "NEOPROJ",
                        format!("no Tags Export found in {} or next to it", archive.name()),
                    )
                })?;
                &embedded_tags
            }
            (None, None) => {
                return Err(PipelineError::container(
                    "NEOPROJ",
                    "no project container and no Tags Export were provided",
                ))
            }
        };

        let embedded_alarms;
        let alarms = match (input.alarms_export, archive) {
            (Some(table), _) => Some(table),
            (None, Some(archive)) => {
                embedded_alarms = embedded_table(archive, ALARMS_EXPORT_PATTERNS)?;
                embedded_alarms.as_ref()
            }
            (None, None) => None,
        };

        let tag_screens = archive.map(screen_usage).unwrap_or_default();
        let mut outcome = self.parse_tables(tags, alarms, &tag_screens);
        if archive.is_none() {
            outcome.notes.push(Note::info(
                NoteKind::MissingSource,
                None,
                "no project archive, screen usage is unknown",
            ));
        }

        info!(
            "NEOPROJ: {} tags, {} records, {} used on screens",
            tags.len(),
            outcome.records.len(),
            outcome
                .records
                .iter()
                .filter(|r| !r.screen_refs.is_empty())
                .count()
        );
        Ok(outcome)
    }
}

/// First export spreadsheet inside the archive matching `patterns`.
fn embedded_table(archive: &ProjectArchive, patterns: &[&str]) -> Result<Option<Table>> {
    match archive.find_by_suffix(patterns) {
        Some((path, bytes)) => {
            debug!("Using embedded export {}", path);
            Table::from_spreadsheet(file_name(path), bytes).map(Some)
        }
        None => Ok(None),
    }
}

/// Alarm text per tag name, from `DataConnection` values of the form `Tags.<name>`.
///
/// A tag with several alarms keeps the text of the last one in the export.
fn alarm_lookup(alarms: &Table) -> HashMap<String, String> {
    let text_col = alarms.column(ALARM_TEXT_COLUMNS);
    let connection_col = alarms.column(DATA_CONNECTION_COLUMNS);
    let mut lookup = HashMap::new();

    for row in alarms.rows() {
        let connection = Table::cell(row, connection_col).trim();
        if let Some(tag) = connection.strip_prefix(NEOPROJ_TAG_PREFIX) {
            let text = Table::cell(row, text_col).trim();
            lookup.insert(tag.to_string(), text.to_string());
        }
    }
    lookup
}

/// Screens (XAML file stems) binding each tag name.
pub fn screen_usage(archive: &ProjectArchive) -> HashMap<String, BTreeSet<String>> {
    let mut usage: HashMap<String, BTreeSet<String>> = HashMap::new();
    for (path, bytes) in archive.files_with_extension("xaml") {
        let screen = file_stem(path).to_string();
        let content = String::from_utf8_lossy(bytes);
        for caps in XAML_TAG_BINDING.captures_iter(&content) {
            usage
                .entry(caps[1].to_string())
                .or_default()
                .insert(screen.clone());
        }
    }
    usage
}

/// ISA tag named in an export description, `_` separators turned into `-`.
///
/// ```
/// use mtl_converter::pipeline::processing::parser::neoproj::extract_tag_hint;
/// assert_eq!(extract_tag_hint("TEST HEADER PRESS (PIT-110)"), "PIT-110");
/// assert_eq!(extract_tag_hint("V-700 LP SEPARATOR LEVEL LSHH_701"), "LSHH-701");
/// ```
pub fn extract_tag_hint(description: &str) -> String {
    let found = TAG_IN_PARENS
        .captures(description)
        .or_else(|| ALARM_SWITCH_TAG.captures(description))
        .or_else(|| TRANSMITTER_TAG.captures(description))
        .or_else(|| VALVE_TAG.captures(description))
        .or_else(|| LEADING_TAG.captures(description));
    found
        .map(|caps| caps[1].replace('_', "-"))
        .unwrap_or_default()
}

/// Engineering unit written as a range at the end of an export description.
pub fn extract_unit_hint(description: &str) -> String {
    if let Some(caps) = RANGE_UNIT.captures(description) {
        return caps[1].to_string();
    }
    if let Some(caps) = TRAILING_RANGE_UNIT.captures(description) {
        return caps[1].to_string();
    }
    if PERCENT_RANGE.is_match(description) {
        return "%".to_string();
    }
    String::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::SourceDocument;

    fn tags_table() -> Table {
        Table::from_rows(vec![
            vec!["// Name", "DataType", "Address_1", "Description"],
            vec!["PT_200", "REAL", "RACK00_SLOT02[1]!RD", "TEST HEADER PRESS (0-250 PSIG)"],
            vec!["LSHH_701", "BOOL", "RACK00_SLOT06[3]", ""],
            vec!["Setpoint1", "REAL", "", "V-700 LP SEPARATOR LEVEL (PIT-110)"],
            vec!["", "BOOL", "RACK00_SLOT06[4]", "orphan"],
            vec!["PT_200_DUP", "REAL", "rack00_slot02[1]", "duplicate address"],
        ])
    }

    fn alarms_table() -> Table {
        Table::from_rows(vec![
            vec!["// Name", "Text", "DataConnection"],
            vec!["Alarm1", "V-700 LEVEL HIGH HIGH LSHH-701", "Tags.LSHH_701"],
            vec!["Alarm2", "ignored", "Other.Thing"],
        ])
    }

    #[test]
    fn test_later_alarm_text_replaces_earlier_one() {
        let alarms = Table::from_rows(vec![
            vec!["// Name", "Text", "DataConnection"],
            vec!["Alarm1", "V-700 LEVEL HIGH", "Tags.LT_3692"],
            vec!["Alarm2", "V-700 LEVEL HIGH HIGH", "Tags.LT_3692"],
        ]);
        let lookup = alarm_lookup(&alarms);
        assert_eq!(lookup.len(), 1);
        assert_eq!(lookup["LT_3692"], "V-700 LEVEL HIGH HIGH");
    }

    #[test]
    fn test_records_from_tags_export() {
        let usage = HashMap::from([(
            "PT_200".to_string(),
            BTreeSet::from(["RACK1".to_string()]),
        )]);
        let outcome =
            NeoProjParser::new().parse_tables(&tags_table(), Some(&alarms_table()), &usage);

        assert_eq!(outcome.records.len(), 3);
        assert_eq!(outcome.skipped, 1);
        assert_eq!(outcome.duplicates, 1);

        let pressure = &outcome.records[0];
        assert_eq!(pressure.address, "RACK00_SLOT02[1]");
        assert_eq!(pressure.raw_name, "Tags.PT_200");
        assert_eq!(pressure.provenance, "Tags_Export");
        assert_eq!(pressure.unit_hint.as_deref(), Some("PSIG"));
        assert_eq!(pressure.io_kind, Some(IoKind::AnalogIo));
        assert!(pressure.screen_refs.contains("RACK1"));

        let switch = &outcome.records[1];
        assert_eq!(switch.raw_description, "V-700 LEVEL HIGH HIGH LSHH-701");
        assert_eq!(switch.provenance, "Alarm");
        assert!(switch.is_alarm);
        assert_eq!(switch.tag_hint.as_deref(), Some("LSHH-701"));
        assert_eq!(switch.io_kind, Some(IoKind::DiscreteIo));

        let internal = &outcome.records[2];
        assert_eq!(internal.address, "Tags.Setpoint1");
        assert_eq!(internal.tag_hint.as_deref(), Some("PIT-110"));
        assert_eq!(internal.io_kind, Some(IoKind::Unknown));
    }

    #[test]
    fn test_parse_reads_embedded_export_and_screens() {
        let csv = "// Name,DataType,Address_1,Description\n\
                   PT_200,REAL,RACK00_SLOT02[1],HEADER PRESS\n";
        let archive = ProjectArchive::new("Plant.zip")
            .with_file("Plant_Tags Export.csv", csv)
            .with_file(
                "RACK1.xaml",
                concat!(
                    r#"<nac:AnalogNumericFX><Binding Path="[Tags.PT_200].Value" />"#,
                    "</nac:AnalogNumericFX>",
                ),
            );
        let document = SourceDocument::Archive(archive);
        let input = ProjectInput {
            container: Some(&document),
            ..Default::default()
        };

        let outcome = NeoProjParser::new().parse(&input).unwrap();
        assert_eq!(outcome.records.len(), 1);
        assert!(outcome.records[0].screen_refs.contains("RACK1"));
    }

    #[test]
    fn test_missing_tags_export_is_fatal() {
        let document = SourceDocument::Archive(ProjectArchive::new("Empty.zip"));
        let input = ProjectInput {
            container: Some(&document),
            ..Default::default()
        };
        assert!(NeoProjParser::new().parse(&input).unwrap_err().is_fatal());
        assert!(NeoProjParser::new()
            .parse(&ProjectInput::default())
            .unwrap_err()
            .is_fatal());
    }

    #[test]
    fn test_unit_hint_shapes() {
        assert_eq!(extract_unit_hint("SUCTION PRESS (0-250 PSIG)"), "PSIG");
        assert_eq!(extract_unit_hint("TANK LEVEL (0-100%)"), "%");
        assert_eq!(extract_unit_hint("FLOW (METER 2, 0-500 GPM)"), "GPM");
        assert_eq!(extract_unit_hint("PUMP RUNNING"), "");
    }
}
