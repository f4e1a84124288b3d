//! ISA tag classification.
//!
//! A record's tag id is taken from the most specific place that names one (an enricher's
//! tag id, an alarm tag inside the description, a transmitter id, a leading tag) and falls
//! back to a tag derived from the address. Alarm tags are then folded into their primary
//! transmitter (`LAHH-3692` -> `LIT-3692`) and the alarm condition moves into the category
//! label, so an alarm never gets a `target_id` of its own.
//!
//! Tags written without a function letter are normalized (`PT-100` -> `PIT-100`), valve
//! outputs and position switches report under their valve, and motor and valve points get
//! their run, auto or open/closed status from [`equipment`].

pub mod equipment;
pub mod extract;
pub mod patterns;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::constants::UNCLASSIFIED;
use crate::domain::{AlarmLevel, ClassificationResult, EnrichedRecord};
use crate::pipeline::processing::address::clean_target_id;
use equipment::{
    is_hand_off_auto, scaling_range, strip_scaling_range, strip_valve_words, valve_status,
    with_measurement, EquipmentClass, EquipmentRules, EquipmentStatus,
};
use extract::{
    clean_alarm_description, clean_tag_prefix, day_volume, has_setpoint, is_alarm_address,
    is_flow_rate, is_writefloat_address, leading_alarm_switch_tag, leading_tag,
    level_from_keywords, level_from_trailing_tag, mentions_alarm, normalize_unit_lowercase,
    plc_suffix_label, remap_alarm_tag, setpoint_kind, strip_alarm_tags, strip_leading_tag,
    tag_from_address, tag_from_alarm_description, unit_from_description, writefloat_setpoint,
    TransmitterFinder,
};
pub use patterns::{ClassificationTables, PatternClass, PatternInfo};

static SWITCH_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:PD|DP|[PLTFAVD])[XD]?S(HH|H|LL|L)-").expect("valid regex")
});
// Tag written without its separator, e.g. `LAHH3692`
static COMPACT_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z]{1,6}\d+[A-Za-z]?$").expect("valid regex"));

/// Labels that sort ahead of the alarm rows of the same loop
const PRIMARY_LABELS: &[&str] = &[
    "Process Value",
    "Process Variable",
    "Control Signal",
    "Control Valve",
];

const HIGH_SWITCH_STATES: &str = "1=Ok;0=High Level";
const LOW_SWITCH_STATES: &str = "1=Ok;0=Low Level";

/// Where the tag id came from, with the equipment text that goes with it
struct TagCandidate {
    tag: String,
    equipment: String,
    /// Derived from the address because nothing else named a tag
    from_address: bool,
}

pub struct Classifier {
    tables: ClassificationTables,
    transmitters: TransmitterFinder,
    equipment: EquipmentRules,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(ClassificationTables::standard())
    }
}

impl Classifier {
    pub fn new(tables: ClassificationTables) -> Self {
        let transmitters = TransmitterFinder::new(&tables.transmitter_prefixes);
        let equipment = EquipmentRules::new(&tables);
        Self {
            tables,
            transmitters,
            equipment,
        }
    }

    pub fn tables(&self) -> &ClassificationTables {
        &self.tables
    }

    /// Classify one record. Never fails: a record nothing recognizes comes back
    /// `unclassified`, keeping a tag its description named or else its address.
    pub fn classify(&self, record: &EnrichedRecord) -> ClassificationResult {
        let address = record.address();
        let description = record.description.trim();
        let range = scaling_range(description);

        let units = if record.units.trim().is_empty() {
            unit_from_description(description)
                .or_else(|| range.as_ref().map(|r| r.unit.clone()))
                .unwrap_or_default()
        } else {
            record.units.clone()
        };
        let units = normalize_unit_lowercase(&units);

        let candidate = self.tag_candidate(record);
        let remap = remap_alarm_tag(&self.tables, &candidate.tag);
        let written_tag = self.equipment.normalize_transmitter_prefix(&remap.tag);
        let class = self.equipment.classify(address, description, &written_tag);
        let tag = if class == EquipmentClass::Valve {
            self.equipment.resolve_valve_target_id(&written_tag)
        } else {
            written_tag.clone()
        };

        let in_alarm_context =
            record.record.is_alarm || is_alarm_address(address) || mentions_alarm(description);
        let alarm = remap
            .level
            .map(|level| (level, remap.is_switch))
            .or_else(|| level_from_trailing_tag(description))
            .or_else(|| {
                if in_alarm_context {
                    level_from_keywords(description)
                } else {
                    None
                }
            })
            .or_else(|| {
                self.equipment
                    .severity(&format!("{address} {description}"), in_alarm_context)
                    .map(|level| (level, class == EquipmentClass::Switch))
            });

        let status = match (alarm, class) {
            (None, EquipmentClass::Motor) => {
                Some(self.equipment.motor_status(address, description))
            }
            (None, EquipmentClass::Valve) => valve_status(&written_tag, address, description),
            _ => None,
        };

        let mut is_switch = alarm.is_some_and(|(_, switch)| switch);
        let mut label = self
            .label_for(address, description, &tag, alarm, status)
            .and_then(|l| self.tables.validate_label(&l).map(str::to_string))
            .filter(|l| l != UNCLASSIFIED && l != "Spare");

        if label.is_none() {
            if let Some((fallback, switch)) = self.classify_from_tag_id(&tag, address) {
                label = Some(fallback);
                is_switch |= switch;
            }
        }

        let Some(category_label) = label else {
            debug!("No classification for {}", address);
            return ClassificationResult {
                isa_prefix: String::new(),
                target_id: if candidate.from_address {
                    address.to_string()
                } else {
                    tag
                },
                category_label: UNCLASSIFIED.to_string(),
                scaling_info: String::new(),
                states: String::new(),
                units,
                equipment: candidate.equipment,
                alarm_level: None,
                is_switch: false,
                remapped_from: None,
                unclassified: true,
                sort_order: 999,
            };
        };
        let status = status.filter(|s| s.label == category_label);

        let level = alarm.map(|(level, _)| level).or_else(|| {
            SWITCH_ID
                .captures(&tag)
                .and_then(|caps| AlarmLevel::from_code(&caps[1]))
        });
        let equipment = match (status, class) {
            (Some(_), EquipmentClass::Motor) => {
                self.equipment.strip_motor_words(&candidate.equipment)
            }
            (Some(_), EquipmentClass::Valve) => strip_valve_words(&candidate.equipment),
            _ => candidate.equipment,
        };
        let equipment = if level.is_some() {
            clean_alarm_description(&equipment)
        } else {
            equipment
        };
        let equipment = strip_scaling_range(&equipment);
        let equipment = match class {
            EquipmentClass::Generic | EquipmentClass::Switch if !candidate.from_address => {
                with_measurement(&equipment, &tag, &self.tables.abbreviations)
            }
            _ => equipment,
        };

        let states = match (level, status) {
            (Some(level), _) if is_switch => {
                if level.is_high() {
                    HIGH_SWITCH_STATES.to_string()
                } else {
                    LOW_SWITCH_STATES.to_string()
                }
            }
            (_, Some(status)) => status.states.to_string(),
            _ => self
                .tables
                .default_states
                .get(&category_label)
                .cloned()
                .unwrap_or_default(),
        };
        let scaling_info = match range.filter(|_| level.is_none() && status.is_none()) {
            Some(range) => range.span(),
            None => self
                .tables
                .default_scaling
                .get(&category_label)
                .cloned()
                .unwrap_or_default(),
        };

        let sort_order = match level {
            Some(level) => level.sort_order(),
            None if PRIMARY_LABELS.contains(&category_label.as_str()) => 0,
            None => 999,
        };

        ClassificationResult {
            isa_prefix: isa_prefix(&tag),
            target_id: tag,
            category_label,
            scaling_info,
            states,
            units,
            equipment,
            alarm_level: level,
            is_switch,
            remapped_from: remap.remapped_from,
            unclassified: false,
            sort_order,
        }
    }

    /// First usable tag id, most specific source first.
    fn tag_candidate(&self, record: &EnrichedRecord) -> TagCandidate {
        let description = record.description.trim();
        let named_equipment = record.equipment_name.trim();
        let equipment_or = |fallback: String| {
            if named_equipment.is_empty() {
                fallback
            } else {
                named_equipment.to_string()
            }
        };

        let mut candidates: Vec<(String, String)> = Vec::new();
        if !record.tag_id.trim().is_empty() {
            candidates.push((record.tag_id.clone(), strip_leading_tag(description)));
        }
        if let Some(tag) = tag_from_alarm_description(&self.tables, description) {
            candidates.push((tag, strip_leading_tag(&strip_alarm_tags(description))));
        }
        if let Some((tag, rest)) = leading_alarm_switch_tag(description) {
            candidates.push((tag, rest));
        }
        if let Some((tag, rest)) = self.transmitters.find(description) {
            candidates.push((tag, rest));
        }
        if let Some((tag, rest)) = leading_tag(description) {
            candidates.push((tag, rest));
        }

        candidates
            .into_iter()
            .find_map(|(tag, equipment)| {
                let tag = clean_target_id(&clean_tag_prefix(&tag));
                (!tag.is_empty()).then(|| TagCandidate {
                    tag,
                    equipment: equipment_or(equipment),
                    from_address: false,
                })
            })
            .unwrap_or_else(|| {
                let tag = tag_from_address(record.address());
                TagCandidate {
                    tag: if COMPACT_TAG.is_match(&tag) {
                        clean_target_id(&tag)
                    } else {
                        tag
                    },
                    equipment: equipment_or(description.to_string()),
                    from_address: true,
                }
            })
    }

    /// Category label in priority order; `None` when nothing applies.
    fn label_for(
        &self,
        address: &str,
        description: &str,
        tag: &str,
        alarm: Option<(AlarmLevel, bool)>,
        status: Option<EquipmentStatus>,
    ) -> Option<String> {
        if let Some(label) = plc_suffix_label(&self.tables, address) {
            return Some(label.to_string());
        }
        if let Some(label) = day_volume(address, description) {
            return Some(label.to_string());
        }
        if is_flow_rate(description) {
            return Some("Rate".to_string());
        }
        if is_writefloat_address(address) {
            return Some(writefloat_setpoint(description).to_string());
        }
        if is_hand_off_auto(description) {
            return Some("Hand/Off/Auto Status".to_string());
        }
        if description.to_uppercase().contains("PERMISSIVE") {
            return Some("Permissive Status".to_string());
        }
        if let Some(status) = status {
            return Some(status.label.to_string());
        }
        if let Some((level, switch)) = alarm {
            let label = if switch {
                if is_alarm_address(address) {
                    "Alarm".to_string()
                } else {
                    "Input".to_string()
                }
            } else if has_setpoint(description) {
                format!("{} Setpoint", level.alarm_label())
            } else {
                level.alarm_label().to_string()
            };
            return Some(label);
        }
        if has_setpoint(description) {
            return Some(setpoint_kind(description).to_string());
        }
        if is_alarm_address(address) {
            return Some("Alarm".to_string());
        }
        if let Some(pattern) = [description, address, tag]
            .into_iter()
            .find_map(|text| self.tables.find_pattern(text))
        {
            return Some(pattern.label.clone());
        }
        self.tables.keyword_category(description).map(str::to_string)
    }

    /// Label implied by the tag id alone, and whether the tag is a switch.
    fn classify_from_tag_id(&self, tag: &str, address: &str) -> Option<(String, bool)> {
        if SWITCH_ID.is_match(tag) {
            let label = if is_alarm_address(address) { "Alarm" } else { "Input" };
            return Some((label.to_string(), true));
        }
        if self.equipment.is_valve_tag(tag, "") {
            return Some(("Control Valve".to_string(), false));
        }
        let prefix = isa_prefix(tag);
        if prefix.len() >= 2 && prefix.ends_with("IT") {
            return Some(("Process Value".to_string(), false));
        }
        if prefix.len() >= 2 && prefix.ends_with("IC") {
            return Some(("Control Signal".to_string(), false));
        }
        self.tables
            .pattern_for_prefix(&prefix)
            .map(|p| (p.label.clone(), p.class == PatternClass::Switch))
    }
}

/// Letter prefix of a tag id: `LIT-3692` -> `LIT`.
pub fn isa_prefix(tag: &str) -> String {
    tag.split('-')
        .next()
        .unwrap_or_default()
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect::<String>()
        .to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{IoRecord, SourceFormat};

    fn enriched(address: &str, description: &str) -> EnrichedRecord {
        EnrichedRecord::from_record(
            IoRecord::new(address, SourceFormat::Cpa).with_description(description, "IONaming"),
        )
    }

    #[test]
    fn test_alarm_tag_folds_into_transmitter() {
        let result = Classifier::default().classify(&enriched("LAHH-3692", ""));
        assert_eq!(result.target_id, "LIT-3692");
        assert_eq!(result.isa_prefix, "LIT");
        assert_eq!(result.category_label, "High High Alarm");
        assert_eq!(result.alarm_level, Some(AlarmLevel::HighHigh));
        assert_eq!(result.remapped_from.as_deref(), Some("LAHH-3692"));
        assert_eq!(result.sort_order, 1);
        assert!(!result.unclassified);
    }

    #[test]
    fn test_compact_alarm_address_is_remapped() {
        let result = Classifier::default().classify(&enriched("LAHH3692", ""));
        assert_eq!(result.target_id, "LIT-3692");
    }

    #[test]
    fn test_unrecognized_record_keeps_its_address() {
        let result = Classifier::default().classify(&enriched("N7:0", ""));
        assert!(result.unclassified);
        assert_eq!(result.category_label, "Unclassified");
        assert_eq!(result.target_id, "N7:0");
        assert_eq!(result.isa_prefix, "");
    }

    #[test]
    fn test_transmitter_in_description() {
        let result = Classifier::default()
            .classify(&enriched("READFLOAT[4]", "PIT-801: SEPARATOR PRESSURE (PSIG)"));
        assert_eq!(result.target_id, "PIT-801");
        assert_eq!(result.category_label, "Process Value");
        assert_eq!(result.units, "psig");
        assert_eq!(result.sort_order, 0);
        assert_eq!(result.equipment, "SEPARATOR PRESSURE");
    }

    #[test]
    fn test_switch_on_alarm_address() {
        let result =
            Classifier::default().classify(&enriched("ALARM[3].2", "V-700 LEVEL LSHH-701"));
        assert_eq!(result.target_id, "LSHH-701");
        assert_eq!(result.category_label, "Alarm");
        assert!(result.is_switch);
        assert_eq!(result.states, "1=Ok;0=High Level");
        assert_eq!(result.equipment, "V-700 LEVEL");
    }

    #[test]
    fn test_switch_on_rack_input() {
        let result = Classifier::default()
            .classify(&enriched("RACK00_SLOT06[10]", "LSLL_702 V-700 LEVEL SWITCH"));
        assert_eq!(result.target_id, "LSLL-702");
        assert_eq!(result.category_label, "Input");
        assert_eq!(result.states, "1=Ok;0=Low Level");
        assert_eq!(result.sort_order, 4);
    }

    #[test]
    fn test_alarm_keywords_on_alarm_address() {
        let result =
            Classifier::default().classify(&enriched("ALARM[5]", "Tank 1 high high level"));
        assert_eq!(result.target_id, "ALARM-5");
        assert_eq!(result.category_label, "High High Alarm");
        assert_eq!(result.sort_order, 1);
    }

    #[test]
    fn test_plc_suffix_and_writefloat_labels() {
        let classifier = Classifier::default();
        let setpoint = classifier.classify(&enriched("PIC_101.SP", ""));
        assert_eq!(setpoint.target_id, "PIC-101");
        assert_eq!(setpoint.category_label, "Setpoint");

        let mut lag = enriched("WRITEFLOAT[12]", "Pump lag 2 start level");
        lag.tag_id = "FT-220".into();
        let lag = classifier.classify(&lag);
        assert_eq!(lag.target_id, "FIT-220");
        assert_eq!(lag.category_label, "Lag2 Start Setpoint");
    }

    #[test]
    fn test_merged_units_win_over_description() {
        let mut record = enriched("READFLOAT[7]", "LIT-12 tank level (FT)");
        record.units = "\" WC".into();
        let result = Classifier::default().classify(&record);
        assert_eq!(result.units, "in wc");
    }

    #[test]
    fn test_spare_is_unclassified() {
        let result = Classifier::default().classify(&enriched("RACK00_SLOT02[7]", "SPARE"));
        assert!(result.unclassified);
        assert_eq!(result.target_id, "RACK00_SLOT02[7]");
    }

    #[test]
    fn test_substitute_tables_drive_keyword_categories() {
        let record = enriched("N7:1", "Agitator");
        assert!(Classifier::default().classify(&record).unclassified);

        let mut tables = ClassificationTables::standard();
        tables.keyword_categories = vec![("Indication".to_string(), vec!["AGITATOR".to_string()])];
        let result = Classifier::new(tables).classify(&record);
        assert_eq!(result.category_label, "Indication");
        assert_eq!(result.target_id, "N7:1");
    }

    struct Expected {
        address: &'static str,
        description: &'static str,
        target_id: &'static str,
        label: &'static str,
        states: &'static str,
        equipment: &'static str,
    }

    #[test]
    fn test_equipment_rules_table() {
        let cases = [
            Expected {
                address: "RACK00_SLOT02_TABLE[1]",
                description: "P-101 TRANSFER PUMP RUNNING",
                target_id: "P-101",
                label: "Run Status",
                states: "0=Off;1=Running",
                equipment: "TRANSFER PUMP",
            },
            Expected {
                address: "RACK00_SLOT02_TABLE[2]",
                description: "P-101 HAND/OFF/AUTO",
                target_id: "P-101",
                label: "Hand/Off/Auto Status",
                states: "",
                equipment: "HAND/OFF/AUTO",
            },
            Expected {
                address: "RACK00_SLOT02_TABLE[3]",
                description: "P-101 TRANSFER PUMP IN AUTO",
                target_id: "P-101",
                label: "Auto Status",
                states: "0=Not in Auto;1=Auto",
                equipment: "TRANSFER PUMP",
            },
            Expected {
                address: "RACK00_SLOT02_TABLE[4]",
                description: "P-102 VFD FAULT",
                target_id: "P-102",
                label: "VFD Fault Status",
                states: "0=Ok;1=Fault",
                equipment: "VFD FAULT",
            },
            Expected {
                address: "READFLOAT[3]",
                description: "PT-100 INLET PRESSURE",
                target_id: "PIT-100",
                label: "Process Value",
                states: "",
                equipment: "INLET PRESSURE",
            },
            Expected {
                address: "READFLOAT[6]",
                description: "LI-7 TANK 1",
                target_id: "LIT-7",
                label: "Process Value",
                states: "",
                equipment: "TANK 1 Level",
            },
            Expected {
                address: "RACK00_SLOT04[1]",
                description: "XV-200 VALVE OPEN",
                target_id: "XV-200",
                label: "Open Switch Status",
                states: "0=Not Open;1=Open",
                equipment: "VALVE OPEN",
            },
            Expected {
                address: "RACK00_SLOT04[2]",
                description: "ZSO-300 OPEN LIMIT",
                target_id: "XV-300",
                label: "Open Switch Status",
                states: "0=Not Open;1=Open",
                equipment: "OPEN LIMIT",
            },
            Expected {
                address: "RACK00_SLOT04[3]",
                description: "ZSC-300 INLET VALVE",
                target_id: "XV-300",
                label: "Closed Switch Status",
                states: "0=Not Closed;1=Closed",
                equipment: "INLET VALVE",
            },
            Expected {
                address: "READFLOAT[8]",
                description: "LY-100 LEVEL CONTROL VALVE",
                target_id: "LV-100",
                label: "Control Valve",
                states: "",
                equipment: "LEVEL CONTROL VALVE",
            },
            Expected {
                address: "READFLOAT[9]",
                description: "LIT-400 TANK LEVEL (0-20 FT)",
                target_id: "LIT-400",
                label: "Process Value",
                states: "",
                equipment: "TANK LEVEL",
            },
            Expected {
                address: "ALARM[4]",
                description: "TDAH-1 HEATER DIFF TEMPERATURE",
                target_id: "TDIT-1",
                label: "High Alarm",
                states: "",
                equipment: "HEATER DIFF TEMPERATURE",
            },
        ];

        let classifier = Classifier::default();
        for case in cases {
            let result = classifier.classify(&enriched(case.address, case.description));
            assert_eq!(result.target_id, case.target_id, "{}", case.description);
            assert_eq!(result.category_label, case.label, "{}", case.description);
            assert_eq!(result.states, case.states, "{}", case.description);
            assert_eq!(result.equipment, case.equipment, "{}", case.description);
            assert!(!result.unclassified, "{}", case.description);
        }
    }

    #[test]
    fn test_scaling_range_fills_scaling_and_units() {
        let record = enriched("READFLOAT[9]", "LIT-400 TANK LEVEL (0-20 FT)");
        let result = Classifier::default().classify(&record);
        assert_eq!(result.scaling_info, "0-20");
        assert_eq!(result.units, "ft");
        assert_eq!(result.sort_order, 0);
    }

    #[test]
    fn test_valve_switch_keeps_default_scaling() {
        let result = Classifier::default().classify(&enriched("RACK00_SLOT04[2]", "ZSO-300 OPEN"));
        assert_eq!(result.scaling_info, "0=Not Open; 1=Open");
        assert_eq!(result.isa_prefix, "XV");
    }

    #[test]
    fn test_severity_code_in_description() {
        let result =
            Classifier::default().classify(&enriched("READFLOAT[12]", "Inlet PIT-AHH trip value"));
        assert_eq!(result.alarm_level, Some(AlarmLevel::HighHigh));
        assert_eq!(result.category_label, "High High Alarm");

        // Loose HI/LO words need an alarm context
        let plain = Classifier::default().classify(&enriched("READFLOAT[13]", "PIT-9 HI SIDE"));
        assert_eq!(plain.alarm_level, None);
        assert_eq!(plain.category_label, "Process Value");
    }

    #[test]
    fn test_description_tag_survives_unclassified() {
        let result = Classifier::default().classify(&enriched("N7:4", "PT-100"));
        assert_eq!(result.target_id, "PIT-100");

        let result = Classifier::default().classify(&enriched("N7:5", "QQ-12 spare"));
        assert!(result.unclassified);
        assert_eq!(result.target_id, "QQ-12");
    }

    #[test]
    fn test_isa_prefix() {
        assert_eq!(isa_prefix("LXIT-301"), "LXIT");
        assert_eq!(isa_prefix("READFLOAT-4"), "READFLOAT");
        assert_eq!(isa_prefix("N7:0"), "N");
    }
}
