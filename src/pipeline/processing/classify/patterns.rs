//! Static ISA classification data.
//!
//! Everything the classifier and the text processor look up lives in one
//! [`ClassificationTables`] value. It is built once per run and handed to both, so a test
//! can substitute its own tables without touching any global state.

use std::collections::HashMap;

/// What kind of instrument a pattern names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatternClass {
    Alarm,
    Switch,
    Transmitter,
    Controller,
    Valve,
}

/// One ISA prefix and what it means
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternInfo {
    pub pattern: String,
    /// Measured variable, e.g. "Level"
    pub measurement: String,
    /// Category label the pattern implies
    pub label: String,
    /// Position among rows sharing a loop number
    pub order: u32,
    pub class: PatternClass,
}

#[derive(Debug, Clone)]
pub struct ClassificationTables {
    /// Alarm and switch patterns longest first, then transmitters, controllers and valves
    pub patterns: Vec<PatternInfo>,
    /// Prefixes searched for a transmitter id inside free text, in order
    pub transmitter_prefixes: Vec<String>,
    /// PLC member suffix (`.SP`) -> label
    pub plc_suffixes: HashMap<String, String>,
    pub default_states: HashMap<String, String>,
    pub default_scaling: HashMap<String, String>,
    /// Approved category labels, canonical spelling
    pub valid_target_names: Vec<String>,
    /// Fallback label -> keywords, tried in order
    pub keyword_categories: Vec<(String, Vec<String>)>,
    /// Alarm measurement letter(s) -> transmitter prefix
    pub alarm_to_transmitter: HashMap<String, String>,
    /// Abbreviation -> expansion, matched as whole tokens
    pub abbreviations: Vec<(String, String)>,
    /// Tokens whose spelling survives capitalization
    pub preserved_acronyms: Vec<String>,
    /// Instrument prefix written without its function letter -> transmitter prefix
    /// (`PT` -> `PIT`)
    pub transmitter_aliases: HashMap<String, String>,
    /// Valve output prefix -> valve prefix (`LY` -> `LV`)
    pub valve_outputs: HashMap<String, String>,
    /// Position switch prefixes reported under the valve's `XV` tag
    pub valve_position_switches: Vec<String>,
    /// Tag prefixes that name driven equipment (`P-101` is a pump)
    pub motor_prefixes: Vec<String>,
    /// Words naming driven equipment in a description
    pub motor_equipment_words: Vec<String>,
    pub auto_status_triggers: Vec<String>,
    pub run_status_triggers: Vec<String>,
    pub run_command_triggers: Vec<String>,
    /// Initiating-variable letters read as alarm severity codes (`PIT-AHH`, `LAHH`)
    pub severity_variables: Vec<String>,
}

impl Default for ClassificationTables {
    fn default() -> Self {
        Self::standard()
    }
}

fn owned_map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn owned_list(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

const ALARM_LEVELS: [(&str, &str, u32); 4] = [
    ("HH", "High High Alarm", 1),
    ("H", "High Alarm", 2),
    ("L", "Low Alarm", 3),
    ("LL", "Low Low Alarm", 4),
];

const SWITCH_LEVELS: [(&str, u32); 4] = [("HH", 1), ("H", 2), ("L", 3), ("LL", 4)];

impl ClassificationTables {
    /// The ISA S5.1-derived tables the converter ships with.
    pub fn standard() -> Self {
        let mut graded = Vec::new();
        for (stem, measurement) in [
            ("PA", "Pressure"),
            ("LA", "Level"),
            ("LXA", "Interface Level"),
            ("TA", "Temperature"),
            ("FA", "Flow"),
        ] {
            for (level, label, order) in ALARM_LEVELS {
                graded.push(PatternInfo {
                    pattern: format!("{stem}{level}"),
                    measurement: measurement.to_string(),
                    label: label.to_string(),
                    order,
                    class: PatternClass::Alarm,
                });
            }
        }
        for (stem, measurement) in [
            ("LS", "Level"),
            ("LXS", "Interface Level"),
            ("PS", "Pressure"),
            ("TS", "Temperature"),
        ] {
            for (level, order) in SWITCH_LEVELS {
                graded.push(PatternInfo {
                    pattern: format!("{stem}{level}"),
                    measurement: measurement.to_string(),
                    label: "Switch".to_string(),
                    order,
                    class: PatternClass::Switch,
                });
            }
        }
        // Stable sort keeps table order among equal lengths
        graded.sort_by_key(|p| std::cmp::Reverse(p.pattern.len()));

        let mut patterns = graded;
        let ungraded: [(&[(&str, &str)], &str, PatternClass); 3] = [
            (
                &[
                    ("PIT", "Pressure"),
                    ("LIT", "Level"),
                    ("LXIT", "Interface Level"),
                    ("TIT", "Temperature"),
                    ("FIT", "Flow"),
                    ("AT", "Analysis"),
                    ("DPIT", "Differential Pressure"),
                    ("PDIT", "Differential Pressure"),
                ],
                "Process Value",
                PatternClass::Transmitter,
            ),
            (
                &[
                    ("PIC", "Pressure"),
                    ("LIC", "Level"),
                    ("LXIC", "Interface Level"),
                    ("TIC", "Temperature"),
                    ("FIC", "Flow"),
                ],
                "Control Signal",
                PatternClass::Controller,
            ),
            (
                &[
                    ("PY", "Pressure Control Valve"),
                    ("LY", "Level Control Valve"),
                    ("LXY", "Interface Level Control Valve"),
                    ("TY", "Temperature Control Valve"),
                    ("FY", "Flow Control Valve"),
                ],
                "Control Valve",
                PatternClass::Valve,
            ),
        ];
        for (entries, label, class) in ungraded {
            for (pattern, measurement) in entries {
                patterns.push(PatternInfo {
                    pattern: pattern.to_string(),
                    measurement: measurement.to_string(),
                    label: label.to_string(),
                    order: 0,
                    class,
                });
            }
        }

        Self {
            patterns,
            transmitter_prefixes: owned_list(&[
                "PIT", "PI", "FIT", "FI", "TIT", "TI", "LIT", "LI", "LXIT", "LXI", "AT", "AI",
                "DPIT", "DPI", "FCU", "TE", "P",
            ]),
            plc_suffixes: owned_map(&[
                (".SP", "Setpoint"),
                (".PV", "Process Variable"),
                (".OUT", "Control Variable"),
                (".CV", "Control Variable"),
                (".SWM", "Auto/Manual Mode"),
                (".KP", "Proportional"),
                (".KI", "Integral"),
                (".KD", "Derivative"),
                (".SO", "Manual Output"),
                (".MAXO", "Maximum CV"),
                (".MINO", "Minimum CV"),
                (".PRE", "Sample Rate Setpoint"),
            ]),
            default_states: owned_map(&[
                ("Lead/Lag Status", "1=P1 Lead;2=P2 Lead"),
                ("Lead Lag Status", "1=P1 Lead;2=P2 Lead"),
                ("Start Command", "1=Start"),
                ("Stop Command", "1=Stop"),
                ("Beacon Status", "0=On;1=Off"),
                ("State", "0=Off;1=On"),
                ("Solenoid Output Command", "0=De-energized;1=Energized"),
                ("Unit Loaded", "0=Loaded;1=Unloaded"),
            ]),
            default_scaling: owned_map(&[
                ("Open Switch Status", "0=Not Open; 1=Open"),
                ("Closed Switch Status", "0=Not Closed; 1=Closed"),
            ]),
            valid_target_names: owned_list(VALID_TARGET_NAMES),
            keyword_categories: vec![
                ("Spare".to_string(), owned_list(&["SPARE", "UNUSED", "RESERVED"])),
                (
                    "Indication".to_string(),
                    owned_list(&["SPEED", "CURRENT", "VOLTAGE", "FREQUENCY", "HZ", "AMP"]),
                ),
                (
                    "Control Signal".to_string(),
                    owned_list(&["CTRL", "CONTROL", "SIGNAL", "OUTPUT"]),
                ),
                (
                    "Selection".to_string(),
                    owned_list(&["SELECTION", "SELECT", "MODE", "CHOOSE"]),
                ),
                (
                    "Display".to_string(),
                    owned_list(&["DISPLAY", "TEXT", "MESSAGE", "SHOW"]),
                ),
            ],
            alarm_to_transmitter: owned_map(&[
                ("P", "PIT"),
                ("T", "TIT"),
                ("L", "LIT"),
                ("F", "FIT"),
                ("A", "AIT"),
                ("D", "DIT"),
                ("V", "VIT"),
                ("PD", "PDIT"),
                ("DP", "PDIT"),
            ]),
            abbreviations: ABBREVIATIONS
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            preserved_acronyms: owned_list(PRESERVED_ACRONYMS),
            transmitter_aliases: owned_map(&[
                ("PT", "PIT"),
                ("PI", "PIT"),
                ("LT", "LIT"),
                ("LI", "LIT"),
                ("TT", "TIT"),
                ("TI", "TIT"),
                ("FT", "FIT"),
                ("FI", "FIT"),
                ("LXT", "LXIT"),
                ("LXI", "LXIT"),
                ("DPT", "PDIT"),
                ("DPI", "PDIT"),
                ("PDT", "PDIT"),
            ]),
            valve_outputs: owned_map(&[
                ("PY", "PV"),
                ("LY", "LV"),
                ("TY", "TV"),
                ("FY", "FV"),
                ("HY", "HV"),
                ("XY", "XV"),
            ]),
            valve_position_switches: owned_list(&["ZSO", "ZSC", "ZIO", "ZIC", "XSO", "XSC"]),
            motor_prefixes: owned_list(&["P", "PMP", "M", "MTR", "K", "FAN", "BL"]),
            motor_equipment_words: owned_list(&["PUMP", "FAN", "COMPRESSOR", "MOTOR", "BLOWER"]),
            auto_status_triggers: owned_list(&["IN AUTO", "AUTO MODE", "AUTO STATUS", "AUTO"]),
            run_status_triggers: owned_list(&["RUNNING STATUS", "RUN STATUS", "RUNNING", "RUN"]),
            run_command_triggers: owned_list(&[
                "RUN COMMAND",
                "RUN CMD",
                "START COMMAND",
                "START CMD",
                "START",
            ]),
            severity_variables: owned_list(&[
                "PDIT", "LXIT", "PIT", "LIT", "TIT", "FIT", "AIT", "PD", "DP", "P", "L", "T", "F",
                "A", "V", "D",
            ]),
        }
    }

    /// Canonical spelling of `label` if it is an approved category label.
    pub fn validate_label(&self, label: &str) -> Option<&str> {
        self.valid_target_names
            .iter()
            .find(|valid| valid.eq_ignore_ascii_case(label.trim()))
            .map(String::as_str)
    }

    /// Transmitter prefix for an alarm's measurement letter(s) and modifier.
    ///
    /// `("L", "X")` gives `LXIT` and `("T", "D")` gives `TDIT`; unknown letters get `IT`
    /// appended.
    pub fn transmitter_prefix(&self, measurement: &str, modifier: &str) -> String {
        let measurement = measurement.to_ascii_uppercase();
        let modifier = modifier.to_ascii_uppercase();
        let base = self
            .alarm_to_transmitter
            .get(&measurement)
            .cloned()
            .unwrap_or_else(|| format!("{measurement}IT"));
        if matches!(modifier.as_str(), "X" | "D") && measurement.len() == 1 {
            format!("{}{}{}", &base[..1], modifier, &base[1..])
        } else {
            base
        }
    }

    /// First pattern named by a token of `text`.
    ///
    /// A token names a pattern when it equals it or continues with the loop number
    /// (`PIT`, `PIT801`); `PIT-801` splits into the token `PIT`.
    pub fn find_pattern(&self, text: &str) -> Option<&PatternInfo> {
        let upper = text.to_uppercase();
        let tokens: Vec<&str> = upper
            .split(|c: char| !c.is_ascii_alphanumeric())
            .filter(|t| !t.is_empty())
            .collect();
        self.patterns.iter().find(|p| {
            tokens.iter().any(|token| {
                token.strip_prefix(p.pattern.as_str()).is_some_and(|rest| {
                    rest.is_empty() || rest.starts_with(|c: char| c.is_ascii_digit())
                })
            })
        })
    }

    /// Pattern whose prefix is exactly `prefix`
    pub fn pattern_for_prefix(&self, prefix: &str) -> Option<&PatternInfo> {
        self.patterns
            .iter()
            .find(|p| p.pattern.eq_ignore_ascii_case(prefix))
    }

    /// Keyword category label for `text`; a keyword matches the start of a token.
    pub fn keyword_category(&self, text: &str) -> Option<&str> {
        let upper = text.to_uppercase();
        let tokens: Vec<&str> = upper
            .split(|c: char| !c.is_ascii_alphanumeric())
            .filter(|t| !t.is_empty())
            .collect();
        self.keyword_categories
            .iter()
            .find(|(_, keywords)| {
                keywords
                    .iter()
                    .any(|kw| tokens.iter().any(|t| t.starts_with(kw.as_str())))
            })
            .map(|(label, _)| label.as_str())
    }
}

const VALID_TARGET_NAMES: &[&str] = &[
    // Alarms
    "Alarm", "High Alarm", "High High Alarm", "Low Alarm", "Low Low Alarm",
    "High Alarm Setpoint", "High High Alarm Setpoint", "Low Alarm Setpoint",
    "Low Low Alarm Setpoint", "Alarm Delay", "High Alarm Delay", "Alarm Reset",
    "Fail to Open Alarm",
    // Process values
    "Process Value", "Process Variable", "Input", "Analog Input", "Digital Input",
    "Analog Output", "Digital Output",
    // Control
    "Control Signal", "Control Output", "Control Variable", "Setpoint", "Manual Output",
    "Process Value Setpoint", "Control Setpoint", "Proportional", "Integral", "Derivative",
    "Maximum CV", "Minimum CV",
    // Flow and volume
    "Rate", "Rate Day 0 Average", "Day 0 Volume", "Day 1 Volume", "Current Volume",
    "Volume at Midnight", "Day 0 Inventory Change", "Preset Volume",
    // Pumps and motors
    "Run Status", "Run Command", "Run Fail", "Auto Status", "Auto/Manual Mode",
    "Hand/Off/Auto Status", "Motor Current", "Speed Feedback", "VFD Fail", "VFD Fault Status",
    "Runtime",
    "Start Setpoint", "Stop Setpoint", "Start Command", "Stop Command",
    "Lead Start Setpoint", "Lead Stop Setpoint", "Lag Start Setpoint", "Lag Stop Setpoint",
    "Lag1 Start Setpoint", "Lag1 Stop Setpoint", "Lag2 Start Setpoint", "Lag2 Stop Setpoint",
    "Lag3 Start Setpoint", "Lag3 Stop Setpoint", "Level Start Setpoint", "Level Stop Setpoint",
    "Load Start Setpoint", "Lead/Lag Status", "Lead Lag Status",
    // Valves
    "Control Valve", "Pressure Control Valve", "Level Control Valve",
    "Temperature Control Valve", "Flow Control Valve", "Interface Level Control Valve",
    "Open Switch Status", "Closed Switch Status", "Open Setpoint", "Close Setpoint",
    "Output Command", "Solenoid Output Command",
    // Switches and status
    "Switch", "High Switch", "Low Switch", "Status", "Indication", "Running Status",
    "Fault Status", "Permissive Status", "Selection", "Mode", "State", "Selected Tank",
    "Unit Loaded",
    // Site
    "Beacon Status", "Site ESD Status", "Site Well Shutdown Active", "Power Fail", "UPS Fail",
    "Meter Fail", "Sampler Fail", "Sample Rate Setpoint",
    // Measurement types
    "Temperature", "Differential Pressure", "Display",
    "Spare", "Unclassified",
];

const ABBREVIATIONS: &[(&str, &str)] = &[
    ("SEP", "Separator"),
    ("SEPERATOR", "Separator"),
    ("VESS", "Vessel"),
    ("TNK", "Tank"),
    ("PMP", "Pump"),
    ("PMPS", "Pumps"),
    ("VLV", "Valve"),
    ("VLVS", "Valves"),
    ("DISC", "Discharge"),
    ("SUCT", "Suction"),
    ("LP", "Low Pressure"),
    ("HP", "High Pressure"),
    ("MP", "Medium Pressure"),
    ("XMTR", "Transmitter"),
    ("XDUCER", "Transducer"),
    ("INDIC", "Indication"),
    ("CTRL", "Control"),
    ("SIG", "Signal"),
    ("SP", "Setpoint"),
    ("LVL", "Level"),
    ("TEMP", "Temperature"),
    ("PRESS", "Pressure"),
    ("WTR", "Water"),
    ("WW", "Waste Water"),
    ("NORM", "Normal"),
    ("EMERG", "Emergency"),
    ("STDBY", "Standby"),
    ("INTERF", "Interface"),
    ("OVER-ALL", "Overall"),
    ("MANU", "Manual"),
    ("AUTO", "Automatic"),
    ("ALM", "Alarm"),
    ("SHUT", "Shutdown"),
    ("START", "Startup"),
    ("OPER", "Operation"),
    ("PRI", "Primary"),
    ("SEC", "Secondary"),
    ("AUX", "Auxiliary"),
];

const PRESERVED_ACRONYMS: &[&str] = &[
    // ISA tags
    "PIT", "LIT", "TIT", "FIT", "LXIT", "PIC", "LIC", "TIC", "FIC", "LXIC", "PY", "LY", "TY",
    "FY", "LXY",
    // Systems
    "IO", "ID", "PLC", "VFD", "PID", "HMI", "SCADA", "RTU", "AI", "AO", "DI", "DO", "ESD",
    "UPS",
    // Standards
    "API", "ANSI", "ISA", "BS&W",
    // Units
    "Hz", "kW", "MW", "GW", "PSI", "PSIG", "PSIA", "BARG", "BARA", "BBL", "BBLS", "MCF",
    "MCFD", "MMCFD", "GPM", "BPD", "DEGF", "DEGC", "VDC", "VAC", "mA",
    // Electrical
    "AC", "DC", "USB", "CPU", "RAM", "ROM",
];
