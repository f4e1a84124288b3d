use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::constants;
use crate::error::PipelineError;

/// Vendor format of the HMI project export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SourceFormat {
    /// Iconics / CIMREX `.cpa` project text
    #[serde(rename = "CPA", alias = "cpa")]
    Cpa,
    /// IX Developer project, zipped or extracted
    #[serde(rename = "NEOPROJ", alias = "neoproj", alias = "NeoProj")]
    NeoProj,
}

impl SourceFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceFormat::Cpa => "CPA",
            SourceFormat::NeoProj => "NEOPROJ",
        }
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceFormat {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CPA" => Ok(SourceFormat::Cpa),
            "NEOPROJ" => Ok(SourceFormat::NeoProj),
            other => Err(PipelineError::Config(format!(
                "unknown HMI type '{}', expected CPA or NEOPROJ",
                other
            ))),
        }
    }
}

/// Coarse kind of I/O point, derived from the PLC address shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IoKind {
    Alarm,
    Setpoint,
    Calculated,
    DiscreteIo,
    AnalogIo,
    InternalBit,
    Other,
    Unknown,
}

impl IoKind {
    /// Classify a PLC address, using the declared data type to split rack I/O.
    pub fn from_address(address: &str, data_type: &str) -> Self {
        let addr = address.trim().to_ascii_uppercase();
        if addr.is_empty() {
            IoKind::Unknown
        } else if addr.contains("ALARM") {
            IoKind::Alarm
        } else if addr.contains("WRITEFLOAT") {
            IoKind::Setpoint
        } else if addr.contains("READFLOAT") {
            IoKind::Calculated
        } else if addr.contains("RACK") {
            if data_type.trim().eq_ignore_ascii_case("BOOL") {
                IoKind::DiscreteIo
            } else {
                IoKind::AnalogIo
            }
        } else if addr.contains("BIT") {
            IoKind::InternalBit
        } else {
            IoKind::Other
        }
    }
}

/// One physical or logical I/O point as found in the project export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IoRecord {
    /// Normalized vendor address, unique within a project
    pub address: String,
    /// Tag or point name as found in the source
    pub raw_name: String,
    /// Free-text description as found in the source (already decoded)
    pub raw_description: String,
    /// Which parser block supplied `raw_description` ("IONaming", "Alarm", "Tags_Export")
    pub provenance: String,
    /// Screens the point appears on
    pub screen_refs: BTreeSet<String>,
    pub source_format: SourceFormat,
    /// Referenced by an alarm definition
    #[serde(default)]
    pub is_alarm: bool,
    #[serde(default)]
    pub data_type: Option<String>,
    #[serde(default)]
    pub io_kind: Option<IoKind>,
    /// ISA tag spotted in the source description
    #[serde(default)]
    pub tag_hint: Option<String>,
    /// Engineering unit spotted in the source description
    #[serde(default)]
    pub unit_hint: Option<String>,
}

impl IoRecord {
    pub fn new(address: impl Into<String>, source_format: SourceFormat) -> Self {
        let address = address.into();
        Self {
            raw_name: address.clone(),
            address,
            raw_description: String::new(),
            provenance: String::new(),
            screen_refs: BTreeSet::new(),
            source_format,
            is_alarm: false,
            data_type: None,
            io_kind: None,
            tag_hint: None,
            unit_hint: None,
        }
    }

    pub fn with_description(mut self, text: impl Into<String>, provenance: &str) -> Self {
        self.raw_description = text.into();
        self.provenance = provenance.to_string();
        self
    }

    pub fn with_screen(mut self, screen: impl Into<String>) -> Self {
        self.screen_refs.insert(screen.into());
        self
    }
}

/// The auxiliary source an enrichment fragment came from
///
/// Variant order is precedence order: earlier variants win field conflicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SourceTag {
    /// CPA rack / discrete / analog screen tables
    CpaScreen,
    /// NeoProj RACK XAML screens
    NeoProjRack,
    /// `ALIAS` lines of a control-system CSV export
    CsvAlias,
    /// `COMMENT` lines of a control-system CSV export
    Csv,
    /// Rung comments and tag descriptions of a PLC program export
    L5k,
}

impl SourceTag {
    /// Provenance label recorded in `description_source`
    pub fn label(&self) -> &'static str {
        match self {
            SourceTag::CpaScreen => "CPA_Screen",
            SourceTag::NeoProjRack => "NeoProj_Rack",
            SourceTag::CsvAlias => "CSV_ALIAS",
            SourceTag::Csv => "CSV",
            SourceTag::L5k => "L5K",
        }
    }

    /// Precedence rank, lower is more trusted
    pub fn default_rank(&self) -> u8 {
        match self {
            SourceTag::CpaScreen | SourceTag::NeoProjRack => 10,
            SourceTag::CsvAlias => 20,
            SourceTag::Csv => 21,
            SourceTag::L5k => 30,
        }
    }

    pub fn is_screen(&self) -> bool {
        matches!(self, SourceTag::CpaScreen | SourceTag::NeoProjRack)
    }
}

impl fmt::Display for SourceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Partial, address-keyed update produced by one enricher
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentFragment {
    /// Normalized address of the record this fragment applies to
    pub address: String,
    pub description: Option<String>,
    pub units: Option<String>,
    pub equipment_name: Option<String>,
    /// ISA tag the source associates with the address
    pub tag_id: Option<String>,
    /// Screens the source saw the address on
    pub screens: BTreeSet<String>,
    pub source_tag: SourceTag,
    /// Precedence rank, lower wins
    pub rank: u8,
}

impl EnrichmentFragment {
    pub fn new(address: impl Into<String>, source_tag: SourceTag) -> Self {
        Self {
            address: address.into(),
            description: None,
            units: None,
            equipment_name: None,
            tag_id: None,
            screens: BTreeSet::new(),
            source_tag,
            rank: source_tag.default_rank(),
        }
    }

    pub fn with_description(mut self, text: impl Into<String>) -> Self {
        self.description = non_empty(text.into());
        self
    }

    pub fn with_units(mut self, units: impl Into<String>) -> Self {
        self.units = non_empty(units.into());
        self
    }

    pub fn with_equipment_name(mut self, name: impl Into<String>) -> Self {
        self.equipment_name = non_empty(name.into());
        self
    }

    pub fn with_tag_id(mut self, tag: impl Into<String>) -> Self {
        self.tag_id = non_empty(tag.into());
        self
    }

    pub fn with_screen(mut self, screen: impl Into<String>) -> Self {
        self.screens.insert(screen.into());
        self
    }

    /// True when the fragment carries nothing a merge could use
    pub fn is_empty(&self) -> bool {
        self.description.is_none()
            && self.units.is_none()
            && self.equipment_name.is_none()
            && self.tag_id.is_none()
            && self.screens.is_empty()
    }
}

fn non_empty(s: String) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// An I/O record with all applicable fragments merged in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedRecord {
    pub record: IoRecord,
    pub description: String,
    pub units: String,
    pub equipment_name: String,
    /// ISA tag from the most trusted source that named one
    pub tag_id: String,
    /// Label of whichever source supplied `description`, or "none"
    pub description_source: String,
    /// Union of the record's screens and every fragment's screens
    pub screens: BTreeSet<String>,
}

impl EnrichedRecord {
    /// An enriched record with nothing merged in beyond the record itself
    pub fn from_record(record: IoRecord) -> Self {
        let (description, description_source) = if record.raw_description.trim().is_empty() {
            (String::new(), constants::PROVENANCE_NONE.to_string())
        } else {
            (record.raw_description.clone(), record.provenance.clone())
        };
        Self {
            units: record.unit_hint.clone().unwrap_or_default(),
            tag_id: record.tag_hint.clone().unwrap_or_default(),
            equipment_name: String::new(),
            screens: record.screen_refs.clone(),
            description,
            description_source,
            record,
        }
    }

    pub fn address(&self) -> &str {
        &self.record.address
    }
}

/// Alarm condition carried by an alarm or switch tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AlarmLevel {
    HighHigh,
    High,
    Low,
    LowLow,
}

impl AlarmLevel {
    pub fn from_code(code: &str) -> Option<Self> {
        match code.to_ascii_uppercase().as_str() {
            "HH" => Some(AlarmLevel::HighHigh),
            "H" => Some(AlarmLevel::High),
            "L" => Some(AlarmLevel::Low),
            "LL" => Some(AlarmLevel::LowLow),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AlarmLevel::HighHigh => "HH",
            AlarmLevel::High => "H",
            AlarmLevel::Low => "L",
            AlarmLevel::LowLow => "LL",
        }
    }

    /// Target name used when the alarm is folded into its primary tag
    pub fn alarm_label(&self) -> &'static str {
        match self {
            AlarmLevel::HighHigh => "High High Alarm",
            AlarmLevel::High => "High Alarm",
            AlarmLevel::Low => "Low Alarm",
            AlarmLevel::LowLow => "Low Low Alarm",
        }
    }

    pub fn is_high(&self) -> bool {
        matches!(self, AlarmLevel::HighHigh | AlarmLevel::High)
    }

    /// Row position after the primary tag (which sorts at 0)
    pub fn sort_order(&self) -> u32 {
        match self {
            AlarmLevel::HighHigh => 1,
            AlarmLevel::High => 2,
            AlarmLevel::Low => 3,
            AlarmLevel::LowLow => 4,
        }
    }
}

/// Outcome of classifying one enriched record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// Letter prefix after alarm remapping, empty when unclassified
    pub isa_prefix: String,
    pub target_id: String,
    /// Target name description, e.g. "Process Value" or "High High Alarm"
    pub category_label: String,
    pub scaling_info: String,
    pub states: String,
    pub units: String,
    /// Equipment text with the tag and alarm wording removed, not yet text-processed
    pub equipment: String,
    pub alarm_level: Option<AlarmLevel>,
    pub is_switch: bool,
    /// Alarm tag the record was folded from, e.g. `LAHH-3692` for `LIT-3692`
    pub remapped_from: Option<String>,
    pub unclassified: bool,
    /// Position among rows sharing a loop number (transmitter first, then HH, H, L, LL)
    pub sort_order: u32,
}

/// Final Master Tag List row, columns in output order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MtlRow {
    pub target_id: String,
    pub target_units: String,
    pub equipment_description: String,
    pub target_name_description: String,
    pub target_scaling: String,
    pub states: String,
    pub iconics_plc_path: String,
    pub target_description: String,
    pub description_source: String,
    pub screens: String,
}

pub const MTL_COLUMNS: [&str; 10] = [
    "target_id",
    "target_units",
    "equipment_description",
    "target_name_description",
    "target_scaling",
    "states",
    "iconics_plc_path",
    "target_description",
    "description_source",
    "screens",
];

/// Severity of a pipeline note
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NoteSeverity {
    /// Worth reporting, nothing degraded
    Info,
    /// A record was degraded, skipped or renamed
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NoteKind {
    DuplicateAddress,
    SkippedRecord,
    MissingText,
    UnmatchedFragment,
    Unclassified,
    TargetIdCollision,
    MissingSource,
    FilteredUnused,
}

/// A recoverable condition met while processing, attached to the stage outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub severity: NoteSeverity,
    pub kind: NoteKind,
    pub address: Option<String>,
    pub message: String,
}

impl Note {
    pub fn warning(kind: NoteKind, address: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            severity: NoteSeverity::Warning,
            kind,
            address: address.map(str::to_string),
            message: message.into(),
        }
    }

    pub fn info(kind: NoteKind, address: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            severity: NoteSeverity::Info,
            kind,
            address: address.map(str::to_string),
            message: message.into(),
        }
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.address {
            Some(address) => write!(f, "[{:?}] {}: {}", self.kind, address, self.message),
            None => write!(f, "[{:?}] {}", self.kind, self.message),
        }
    }
}
