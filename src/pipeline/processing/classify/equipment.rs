//! Equipment-aware rules: motors, valves, hand/off/auto selectors, transmitter prefix
//! aliases, alarm severity codes and equipment text clean-up.
//!
//! The word lists come from [`ClassificationTables`]; [`EquipmentRules`] compiles them once
//! per classifier.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

use super::isa_prefix;
use super::patterns::{ClassificationTables, PatternClass};
use crate::domain::AlarmLevel;

fn re(pattern: &str) -> Regex {
    Regex::new(pattern).expect("valid regex")
}

/// Case-insensitive whole-word alternation, longest entry first.
fn word_alternation<'a>(words: impl IntoIterator<Item = &'a str>) -> Option<Regex> {
    let mut words: Vec<&str> = words
        .into_iter()
        .map(str::trim)
        .filter(|w| !w.is_empty())
        .collect();
    if words.is_empty() {
        return None;
    }
    words.sort_by_key(|w| std::cmp::Reverse(w.len()));
    let body = words
        .iter()
        .map(|w| regex::escape(w))
        .collect::<Vec<_>>()
        .join("|");
    Some(re(&format!(r"(?i)\b(?:{body})\b")))
}

static VALVE_POSITION_SWITCH: Lazy<Regex> = Lazy::new(|| re(r"(?i)^[ZX][SI][OC][-_]"));
static POSITION_SWITCH_IN_TEXT: Lazy<Regex> = Lazy::new(|| re(r"\b[ZX][IS][OC][-_]?\d+"));
static OPEN_POSITION: Lazy<Regex> = Lazy::new(|| re(r"^[ZX][SI]O$"));
static CLOSED_POSITION: Lazy<Regex> = Lazy::new(|| re(r"^[ZX][SI]C$"));
static OPEN_ADDRESS: Lazy<Regex> = Lazy::new(|| re(r"(?i)^[ZX]SO[-_]"));
static CLOSED_ADDRESS: Lazy<Regex> = Lazy::new(|| re(r"(?i)^[ZX]SC[-_]"));
static OPEN_WORD: Lazy<Regex> = Lazy::new(|| re(r"\bOPEN\b"));
static CLOSE_WORD: Lazy<Regex> = Lazy::new(|| re(r"\bCLOS"));
static SWITCH_PREFIX: Lazy<Regex> =
    Lazy::new(|| re(r"^(?:PD|DP|[PLTFAVD])[XID]?S(?:HH|H|LL|L)?$"));

static HOA_WORD: Lazy<Regex> = Lazy::new(|| re(r"\bHOA\b"));
static HOA_SPELLED: Lazy<Regex> = Lazy::new(|| re(r"HAND[/-]OFF[/-]AUTO"));
static HOA_LETTERS: Lazy<Regex> = Lazy::new(|| re(r"\bH[/-]O[/-]A\b"));

static UDT_SETPOINT: Lazy<Regex> = Lazy::new(|| re(r"\b(HH|LL|H|L)SETPOINT\b"));
static ALARM_HIGH_HIGH: Lazy<Regex> =
    Lazy::new(|| re(r"\bALARM[-_](?:HIGH[-_]HIGH|HIHI|HI[-_]HI)\b"));
static ALARM_LOW_LOW: Lazy<Regex> = Lazy::new(|| re(r"\bALARM[-_](?:LOW[-_]LOW|LOLO|LO[-_]LO)\b"));
static ALARM_CODE: Lazy<Regex> = Lazy::new(|| re(r"\bALARM[-_]?A?(HH|LL|H|L)(?:[-_0-9]|\b)"));
static FREE_HIGH_HIGH: Lazy<Regex> =
    Lazy::new(|| re(r"\bHI\s*HI\b|\bHIGH\s*HIGH\b|\bHIHI\b|\bHH\b"));
static FREE_LOW_LOW: Lazy<Regex> = Lazy::new(|| re(r"\bLO\s*LO\b|\bLOW\s*LOW\b|\bLOLO\b|\bLL\b"));
static FREE_HIGH: Lazy<Regex> = Lazy::new(|| re(r"\b(?:HI|HIGH)\b"));
static FREE_LOW: Lazy<Regex> = Lazy::new(|| re(r"\b(?:LO|LOW)\b"));
static SEPARATORS: Lazy<Regex> = Lazy::new(|| re(r"[_\-./]"));

static BRACKETED_RANGE: Lazy<Regex> = Lazy::new(|| {
    re(r"\s*\(\s*(-?\d+(?:\.\d+)?)\s*[-\x{2013}]\s*(-?\d+(?:\.\d+)?)\s*([A-Za-z%]*)\s*\)")
});
static SPELLED_RANGE: Lazy<Regex> = Lazy::new(|| {
    re(r"(?i)\s*(-?\d+(?:\.\d+)?)\s+to\s+(-?\d+(?:\.\d+)?)(?:\s+([A-Za-z%]+))?.*$")
});
static BRACKETED_UNIT_ONLY: Lazy<Regex> =
    Lazy::new(|| re(r"(?i)\s*\(\s*(?:psig|ma|gpm|bpd|ips|degf|psid|%)\s*\)"));
static DEGREES: Lazy<Regex> = Lazy::new(|| re(r"(?i)\bdegrees(?:\s+celsius)?\b"));
static UNIT_WORDS: Lazy<Regex> = Lazy::new(|| re(r"(?i)\b(?:psig|ma|gpm|bpd|ips|degf|psid)\b"));
static TRANSMITTER_WORD: Lazy<Regex> = Lazy::new(|| re(r"(?i)\s*\bTransmitter\b"));
static LONE_PERCENT: Lazy<Regex> = Lazy::new(|| re(r"\s+%(?:\s|$)"));
static EMPTY_PARENS: Lazy<Regex> = Lazy::new(|| re(r"\(\s*\)"));

static MOTOR_TAG_BARE: Lazy<Regex> = Lazy::new(|| re(r"(?i)^[HX][ISC]\s*[-_]\s+"));
static MOTOR_TAG_NUMBERED: Lazy<Regex> =
    Lazy::new(|| re(r"(?i)^[HX][ISC][-_]?[A-Z]?\d+[A-Z]?\s+"));
static VALVE_TAG_LEADING: Lazy<Regex> = Lazy::new(|| re(r"(?i)^Z[ISO][OC][-_]?\d+\s*"));
static VALVE_NOISE: Lazy<Regex> = Lazy::new(|| {
    word_alternation([
        "Open Status Limit Switch",
        "Closed Status Limit Switch",
        "Open Status",
        "Closed Status",
        "Limit Switch",
        "Status Switch",
        "Status",
    ])
    .expect("non-empty word list")
});

const MOTOR_PHRASES: &[&str] = &[
    "Hand Switch In Auto",
    "Hand Switch In",
    "Hand Switch",
    "Status Switch",
    "Run Status Relay",
    "Run Status",
    "Auto Status",
    "Running Indication",
    "Run Indication",
    "Start Command",
    "Run Command",
    "Output Command",
];
const MOTOR_RESIDUE: &[&str] = &[
    "motor",
    "status",
    "relay",
    "indication",
    "switch",
    "command",
    "run",
];

const MEASUREMENTS: [(char, &str); 6] = [
    ('P', "Pressure"),
    ('T', "Temperature"),
    ('L', "Level"),
    ('F', "Flow"),
    ('A', "Analytical"),
    ('V', "Vibration"),
];

/// Which family of field device a tag belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EquipmentClass {
    /// Control valves, on/off valves and their position switches
    Valve,
    /// Process switches such as `LSHH` or `PSL`
    Switch,
    /// Pumps, fans, compressors and other driven equipment
    Motor,
    Generic,
}

/// Label and state text implied by a motor or valve point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EquipmentStatus {
    pub label: &'static str,
    pub states: &'static str,
}

const RUN_STATUS: EquipmentStatus = EquipmentStatus {
    label: "Run Status",
    states: "0=Off;1=Running",
};
const AUTO_STATUS: EquipmentStatus = EquipmentStatus {
    label: "Auto Status",
    states: "0=Not in Auto;1=Auto",
};
const VFD_FAULT: EquipmentStatus = EquipmentStatus {
    label: "VFD Fault Status",
    states: "0=Ok;1=Fault",
};
const OPEN_SWITCH: EquipmentStatus = EquipmentStatus {
    label: "Open Switch Status",
    states: "0=Not Open;1=Open",
};
const CLOSED_SWITCH: EquipmentStatus = EquipmentStatus {
    label: "Closed Switch Status",
    states: "0=Not Closed;1=Closed",
};

/// An instrument range written into a description: `(0-20 FT)`, `0 to 250 psig`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScalingRange {
    pub low: String,
    pub high: String,
    /// Unit written after the range, as found; empty when none
    pub unit: String,
}

impl ScalingRange {
    /// `0-20`
    pub fn span(&self) -> String {
        format!("{}-{}", self.low, self.high)
    }
}

/// Range written into the description, bracketed form first.
pub fn scaling_range(description: &str) -> Option<ScalingRange> {
    BRACKETED_RANGE
        .captures(description)
        .or_else(|| SPELLED_RANGE.captures(description))
        .map(|caps| ScalingRange {
            low: caps[1].to_string(),
            high: caps[2].to_string(),
            unit: caps.get(3).map_or("", |m| m.as_str()).to_string(),
        })
}

/// Remove ranges, unit words and the word `Transmitter` from an equipment text.
pub fn strip_scaling_range(text: &str) -> String {
    let mut cleaned = BRACKETED_RANGE.replace_all(text, "").into_owned();
    for pattern in [
        &*BRACKETED_UNIT_ONLY,
        &*SPELLED_RANGE,
        &*DEGREES,
        &*UNIT_WORDS,
        &*TRANSMITTER_WORD,
    ] {
        cleaned = pattern.replace_all(&cleaned, "").into_owned();
    }
    cleaned = LONE_PERCENT.replace_all(&cleaned, " ").into_owned();
    cleaned = EMPTY_PARENS.replace_all(&cleaned, "").into_owned();
    collapse_spaces(&cleaned)
}

fn collapse_spaces(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Hand/Off/Auto selector wording (`HOA`, `HAND/OFF/AUTO`, `H-O-A`).
pub fn is_hand_off_auto(description: &str) -> bool {
    let upper = description.to_uppercase();
    HOA_WORD.is_match(&upper)
        || (upper.contains("HAND") && upper.contains("OFF") && upper.contains("AUTO"))
        || HOA_SPELLED.is_match(&upper)
        || HOA_LETTERS.is_match(&upper)
}

/// Open or closed switch label for a valve point, `None` when nothing says which.
///
/// `tag` is the tag before any `ZSO` -> `XV` rewrite, so the position letter is still there.
pub fn valve_status(tag: &str, address: &str, description: &str) -> Option<EquipmentStatus> {
    let prefix = isa_prefix(tag);
    if OPEN_POSITION.is_match(&prefix) {
        return Some(OPEN_SWITCH);
    }
    if CLOSED_POSITION.is_match(&prefix) {
        return Some(CLOSED_SWITCH);
    }
    let upper = description.to_uppercase();
    if OPEN_WORD.is_match(&upper) || OPEN_ADDRESS.is_match(address) {
        return Some(OPEN_SWITCH);
    }
    if CLOSE_WORD.is_match(&upper) || CLOSED_ADDRESS.is_match(address) {
        return Some(CLOSED_SWITCH);
    }
    None
}

/// Valve text without its position-switch tag or status wording.
pub fn strip_valve_words(text: &str) -> String {
    let text = VALVE_TAG_LEADING.replace(text.trim(), "");
    collapse_spaces(&VALVE_NOISE.replace_all(&text, ""))
}

/// Append the measured variable a tag's first letter stands for when the text lacks it.
///
/// `LIT-12` with `TANK 1` gives `TANK 1 Level`. A token that abbreviates the word
/// (`PRESS`, `LVL`) counts as mentioning it. Single-letter equipment tags (`V-700`) are
/// not instruments and are left alone.
pub fn with_measurement(equipment: &str, tag: &str, abbreviations: &[(String, String)]) -> String {
    let prefix = isa_prefix(tag);
    let Some(first) = prefix.chars().next().filter(|_| prefix.len() >= 2) else {
        return equipment.to_string();
    };
    let Some((_, measurement)) = MEASUREMENTS.iter().find(|(letter, _)| *letter == first) else {
        return equipment.to_string();
    };
    if equipment.trim().is_empty() {
        return equipment.to_string();
    }

    let upper = equipment.to_uppercase();
    let wanted = measurement.to_uppercase();
    let mentioned = upper.contains(&wanted)
        || upper
            .split(|c: char| !c.is_ascii_alphanumeric())
            .filter(|t| !t.is_empty())
            .any(|token| {
                abbreviations.iter().any(|(abbr, full)| {
                    abbr.eq_ignore_ascii_case(token) && full.to_uppercase().contains(&wanted)
                })
            });
    if mentioned {
        equipment.to_string()
    } else {
        format!("{} {}", equipment.trim(), measurement)
    }
}

/// Compiled equipment rules for one set of classification tables
#[derive(Debug, Clone)]
pub struct EquipmentRules {
    transmitter_aliases: HashMap<String, String>,
    valve_outputs: HashMap<String, String>,
    valve_position_switches: Vec<String>,
    valve_prefixes: Vec<String>,
    motor_prefixes: Vec<String>,
    motor_words: Vec<String>,
    auto_status: Option<Regex>,
    run_status: Option<Regex>,
    motor_trigger: Option<Regex>,
    motor_noise: Option<Regex>,
    severity_appended: Option<Regex>,
    severity_compact: Option<Regex>,
}

impl EquipmentRules {
    pub fn new(tables: &ClassificationTables) -> Self {
        let triggers: Vec<&str> = tables
            .auto_status_triggers
            .iter()
            .chain(&tables.run_status_triggers)
            .chain(&tables.run_command_triggers)
            .map(String::as_str)
            .collect();
        let noise: Vec<&str> = MOTOR_PHRASES
            .iter()
            .chain(MOTOR_RESIDUE)
            .copied()
            .chain(triggers.iter().copied())
            .collect();

        let variables = |keep: fn(usize) -> bool| {
            let list: Vec<String> = tables
                .severity_variables
                .iter()
                .filter(|v| keep(v.len()))
                .map(|v| regex::escape(&v.to_uppercase()))
                .collect();
            (!list.is_empty()).then(|| list.join("|"))
        };
        let severity_appended = variables(|len| len >= 2)
            .map(|ivs| re(&format!(r"\b(?:{ivs})[-_]A?(HH|LL|H|L)(?:[-_0-9]|\b)")));
        let severity_compact = variables(|len| len <= 2)
            .map(|ivs| re(&format!(r"\b(?:{ivs})A(HH|LL|H|L)(?:[-_0-9]|\b)")));

        Self {
            transmitter_aliases: tables.transmitter_aliases.clone(),
            valve_outputs: tables.valve_outputs.clone(),
            valve_position_switches: tables.valve_position_switches.clone(),
            valve_prefixes: tables
                .patterns
                .iter()
                .filter(|p| p.class == PatternClass::Valve)
                .map(|p| p.pattern.clone())
                .collect(),
            motor_prefixes: tables.motor_prefixes.clone(),
            motor_words: tables
                .motor_equipment_words
                .iter()
                .map(|w| w.to_uppercase())
                .collect(),
            auto_status: word_alternation(tables.auto_status_triggers.iter().map(String::as_str)),
            run_status: word_alternation(tables.run_status_triggers.iter().map(String::as_str)),
            motor_trigger: word_alternation(triggers),
            motor_noise: word_alternation(noise),
            severity_appended,
            severity_compact,
        }
    }

    /// `PT-100` -> `PIT-100`, `LI-7` -> `LIT-7`; other tags unchanged.
    pub fn normalize_transmitter_prefix(&self, tag: &str) -> String {
        match tag.split_once('-') {
            Some((prefix, number)) => match self.transmitter_aliases.get(&prefix.to_uppercase()) {
                Some(alias) => format!("{alias}-{number}"),
                None => tag.to_string(),
            },
            None => tag.to_string(),
        }
    }

    /// `LY-100` -> `LV-100`; valve position switches report under the valve, `ZSO-3` -> `XV-3`.
    pub fn resolve_valve_target_id(&self, tag: &str) -> String {
        let Some((prefix, number)) = tag.split_once('-') else {
            return tag.to_string();
        };
        let prefix = prefix.to_uppercase();
        if self.valve_position_switches.contains(&prefix) {
            return format!("XV-{number}");
        }
        match self.valve_outputs.get(&prefix) {
            Some(valve) => format!("{valve}-{number}"),
            None => tag.to_string(),
        }
    }

    pub fn is_valve_tag(&self, tag: &str, description: &str) -> bool {
        let prefix = isa_prefix(tag);
        if prefix.is_empty() {
            return false;
        }
        self.valve_prefixes.contains(&prefix)
            || self.valve_outputs.contains_key(&prefix)
            || self.valve_position_switches.contains(&prefix)
            || ((2..=4).contains(&prefix.len()) && prefix.ends_with('V') && prefix != "PV")
            || POSITION_SWITCH_IN_TEXT.is_match(&description.to_uppercase())
    }

    fn has_motor_word(&self, description: &str) -> bool {
        let upper = description.to_uppercase();
        upper
            .split(|c: char| !c.is_ascii_alphanumeric())
            .any(|token| {
                self.motor_words.iter().any(|word| {
                    token == word || token.strip_prefix(word.as_str()) == Some("S")
                })
            })
    }

    fn has_motor_trigger(&self, address: &str, description: &str) -> bool {
        let Some(trigger) = &self.motor_trigger else {
            return false;
        };
        trigger.is_match(description) || trigger.is_match(&SEPARATORS.replace_all(address, " "))
    }

    /// Valve beats switch beats motor; everything else is generic.
    pub fn classify(&self, address: &str, description: &str, tag: &str) -> EquipmentClass {
        let prefix = isa_prefix(tag);
        if VALVE_POSITION_SWITCH.is_match(tag) || self.is_valve_tag(tag, description) {
            EquipmentClass::Valve
        } else if SWITCH_PREFIX.is_match(&prefix) {
            EquipmentClass::Switch
        } else if self.motor_prefixes.contains(&prefix)
            || (self.has_motor_word(description) && self.has_motor_trigger(address, description))
        {
            EquipmentClass::Motor
        } else {
            EquipmentClass::Generic
        }
    }

    /// Run, auto or VFD fault status of a motor point. Defaults to run status.
    pub fn motor_status(&self, address: &str, description: &str) -> EquipmentStatus {
        let combined = format!("{address} {description}").to_uppercase();
        if (combined.contains("VFD") || combined.contains("VSD"))
            && (combined.contains("FAULT") || combined.contains("FAIL"))
        {
            return VFD_FAULT;
        }
        let spaced = SEPARATORS.replace_all(&combined, " ");
        if self.auto_status.as_ref().is_some_and(|r| r.is_match(&spaced)) {
            return AUTO_STATUS;
        }
        if self.run_status.as_ref().is_some_and(|r| r.is_match(&spaced)) {
            return RUN_STATUS;
        }
        RUN_STATUS
    }

    /// Motor text without hand-switch tags, trigger words or status wording.
    pub fn strip_motor_words(&self, text: &str) -> String {
        let mut cleaned = text.trim().to_string();
        for pattern in [&*MOTOR_TAG_BARE, &*MOTOR_TAG_NUMBERED] {
            cleaned = pattern.replace(&cleaned, "").into_owned();
        }
        if let Some(noise) = &self.motor_noise {
            cleaned = noise.replace_all(&cleaned, "").into_owned();
        }
        collapse_spaces(&cleaned)
    }

    /// Alarm severity spelled into a tag or description.
    ///
    /// Structured forms (`PIT-AHH`, `LAHH`, `HHSetpoint`, `ALARM_HH`) are always read;
    /// loose words (`HI`, `LOW`, `HH`) only when `free_text` is set.
    pub fn severity(&self, text: &str, free_text: bool) -> Option<AlarmLevel> {
        let upper = text.to_uppercase();
        let code = |pattern: &Regex| {
            pattern
                .captures(&upper)
                .and_then(|caps| AlarmLevel::from_code(&caps[1]))
        };

        if let Some(level) = self.severity_appended.as_ref().and_then(code) {
            return Some(level);
        }
        if let Some(level) = self.severity_compact.as_ref().and_then(code) {
            return Some(level);
        }
        if let Some(level) = code(&*UDT_SETPOINT) {
            return Some(level);
        }
        if ALARM_HIGH_HIGH.is_match(&upper) {
            return Some(AlarmLevel::HighHigh);
        }
        if ALARM_LOW_LOW.is_match(&upper) {
            return Some(AlarmLevel::LowLow);
        }
        if let Some(level) = code(&*ALARM_CODE) {
            return Some(level);
        }
        if !free_text {
            return None;
        }

        let spaced = SEPARATORS.replace_all(&upper, " ");
        if FREE_HIGH_HIGH.is_match(&spaced) {
            Some(AlarmLevel::HighHigh)
        } else if FREE_LOW_LOW.is_match(&spaced) {
            Some(AlarmLevel::LowLow)
        } else if FREE_HIGH.is_match(&spaced) {
            Some(AlarmLevel::High)
        } else if FREE_LOW.is_match(&spaced) {
            Some(AlarmLevel::Low)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> EquipmentRules {
        EquipmentRules::new(&ClassificationTables::standard())
    }

    #[test]
    fn test_transmitter_aliases() {
        let rules = rules();
        for (tag, expected) in [
            ("PT-100", "PIT-100"),
            ("LI-7", "LIT-7"),
            ("FT-220A", "FIT-220A"),
            ("DPT-4", "PDIT-4"),
            ("PIT-100", "PIT-100"),
            ("TE-3", "TE-3"),
            ("READFLOAT-4", "READFLOAT-4"),
        ] {
            assert_eq!(rules.normalize_transmitter_prefix(tag), expected, "{tag}");
        }
    }

    #[test]
    fn test_valve_target_ids() {
        let rules = rules();
        assert_eq!(rules.resolve_valve_target_id("LY-100"), "LV-100");
        assert_eq!(rules.resolve_valve_target_id("PY-7"), "PV-7");
        assert_eq!(rules.resolve_valve_target_id("ZSO-300"), "XV-300");
        assert_eq!(rules.resolve_valve_target_id("ZSC-300"), "XV-300");
        assert_eq!(rules.resolve_valve_target_id("LXY-801"), "LXY-801");
        assert_eq!(rules.resolve_valve_target_id("XV-200"), "XV-200");
    }

    #[test]
    fn test_equipment_classes() {
        let rules = rules();
        let class = |address, description, tag| rules.classify(address, description, tag);
        assert_eq!(class("READFLOAT[1]", "", "ZSO-300"), EquipmentClass::Valve);
        assert_eq!(class("READFLOAT[1]", "", "XV-200"), EquipmentClass::Valve);
        assert_eq!(class("READFLOAT[1]", "", "LY-100"), EquipmentClass::Valve);
        assert_eq!(class("READFLOAT[1]", "", "PV-100"), EquipmentClass::Generic);
        assert_eq!(class("ALARM[1]", "", "LSHH-701"), EquipmentClass::Switch);
        assert_eq!(class("RACK00_SLOT02[1]", "", "P-101"), EquipmentClass::Motor);
        assert_eq!(
            class("RACK00_SLOT02[1]", "TRANSFER PUMPS RUNNING", "RACK00-SLOT02"),
            EquipmentClass::Motor
        );
        // Equipment word without a trigger is not enough
        assert_eq!(
            class("READFLOAT[2]", "TRANSFER PUMP DISCHARGE", "READFLOAT-2"),
            EquipmentClass::Generic
        );
        assert_eq!(class("READFLOAT[2]", "", "PIT-801"), EquipmentClass::Generic);
        assert_eq!(class("READFLOAT[2]", "V-700 LEVEL", "V-700"), EquipmentClass::Generic);
    }

    #[test]
    fn test_motor_status() {
        let rules = rules();
        assert_eq!(rules.motor_status("X", "P-101 TRANSFER PUMP RUNNING"), RUN_STATUS);
        assert_eq!(rules.motor_status("X", "P-101 IN AUTO"), AUTO_STATUS);
        assert_eq!(rules.motor_status("X", "P-101 VFD FAULT"), VFD_FAULT);
        assert_eq!(rules.motor_status("Tags.P101_Auto", ""), AUTO_STATUS);
        assert_eq!(rules.motor_status("X", "P-101"), RUN_STATUS);
    }

    #[test]
    fn test_valve_status() {
        assert_eq!(valve_status("ZSO-300", "", "OPEN LIMIT"), Some(OPEN_SWITCH));
        assert_eq!(valve_status("ZSC-300", "", "LIMIT"), Some(CLOSED_SWITCH));
        assert_eq!(valve_status("XV-200", "", "XV-200 VALVE OPEN"), Some(OPEN_SWITCH));
        assert_eq!(valve_status("XV-200", "", "Valve closed"), Some(CLOSED_SWITCH));
        assert_eq!(valve_status("LY-100", "", "LEVEL CONTROL VALVE"), None);
    }

    #[test]
    fn test_hand_off_auto() {
        assert!(is_hand_off_auto("P-101 HAND/OFF/AUTO"));
        assert!(is_hand_off_auto("pump hoa selector"));
        assert!(is_hand_off_auto("P-101 H-O-A"));
        assert!(!is_hand_off_auto("P-101 IN AUTO"));
    }

    #[test]
    fn test_severity_codes() {
        let rules = rules();
        assert_eq!(rules.severity("PIT_AHH", false), Some(AlarmLevel::HighHigh));
        assert_eq!(rules.severity("LIT-LL trip", false), Some(AlarmLevel::LowLow));
        assert_eq!(rules.severity("see PAL-3", false), Some(AlarmLevel::Low));
        assert_eq!(rules.severity("Tank1.HSetpoint", false), Some(AlarmLevel::High));
        assert_eq!(rules.severity("ALARM_HIHI", false), Some(AlarmLevel::HighHigh));
        assert_eq!(rules.severity("PALLET CONVEYOR", false), None);
        assert_eq!(rules.severity("SEPARATOR HI", false), None);
        assert_eq!(rules.severity("SEPARATOR HI", true), Some(AlarmLevel::High));
        assert_eq!(rules.severity("TANK LO-LO", true), Some(AlarmLevel::LowLow));
        assert_eq!(rules.severity("THIS IS FINE", true), None);
    }

    #[test]
    fn test_scaling_range() {
        let range = scaling_range("LIT-400 TANK LEVEL (0-20 FT)").unwrap();
        assert_eq!(range.span(), "0-20");
        assert_eq!(range.unit, "FT");
        let range = scaling_range("Inlet pressure 0 to 250 psig").unwrap();
        assert_eq!(range.span(), "0-250");
        assert_eq!(range.unit, "psig");
        assert_eq!(scaling_range("V-700 LEVEL"), None);
    }

    #[test]
    fn test_strip_scaling_range() {
        assert_eq!(strip_scaling_range("TANK LEVEL (0-20 FT)"), "TANK LEVEL");
        assert_eq!(strip_scaling_range("SEP PRESS (PSIG)"), "SEP PRESS");
        assert_eq!(
            strip_scaling_range("Inlet Pressure Transmitter 0 to 250 psig"),
            "Inlet Pressure"
        );
        assert_eq!(strip_scaling_range("Gas temp degrees celsius"), "Gas temp");
        assert_eq!(strip_scaling_range("V-700 LEVEL"), "V-700 LEVEL");
    }

    #[test]
    fn test_strip_motor_and_valve_words() {
        let rules = rules();
        assert_eq!(rules.strip_motor_words("TRANSFER PUMP RUNNING"), "TRANSFER PUMP");
        assert_eq!(rules.strip_motor_words("HS-101 Feed Pump Run Status"), "Feed Pump");
        assert_eq!(rules.strip_motor_words("Fan motor in auto"), "Fan");
        assert_eq!(strip_valve_words("ZSO-300 Inlet Valve Open Status"), "Inlet Valve");
        assert_eq!(strip_valve_words("Outlet Limit Switch"), "Outlet");
    }

    #[test]
    fn test_with_measurement() {
        let abbreviations = ClassificationTables::standard().abbreviations;
        assert_eq!(with_measurement("TANK 1", "LIT-12", &abbreviations), "TANK 1 Level");
        assert_eq!(with_measurement("SEP PRESS", "PIT-801", &abbreviations), "SEP PRESS");
        assert_eq!(with_measurement("Inlet Pressure", "PIT-1", &abbreviations), "Inlet Pressure");
        assert_eq!(with_measurement("Header", "XV-1", &abbreviations), "Header");
        assert_eq!(with_measurement("INLET", "V-700", &abbreviations), "INLET");
        assert_eq!(with_measurement("", "LIT-12", &abbreviations), "");
    }
}
