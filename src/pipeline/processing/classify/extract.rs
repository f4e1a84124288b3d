//! Tag, alarm level and unit extraction from descriptions and addresses.

use once_cell::sync::Lazy;
use regex::Regex;

use super::patterns::ClassificationTables;
use crate::domain::AlarmLevel;

fn re(pattern: &str) -> Regex {
    Regex::new(pattern).expect("valid regex")
}

// Transmitter tag followed by its own alarm tag: "LIT-3692-LAHH ..."
static TRANSMITTER_WITH_ALARM: Lazy<Regex> = Lazy::new(|| {
    re(concat!(
        r"(?i)^([PLTFAVD])IT[-_]([A-Z]?\d+(?:[-_]\d+)?)",
        r"[-_](?:[PLTFAVD][XID]?(?:A|S)?(?:HH|H|LL|L))\s",
    ))
});
// Alarm or switch tag closing the description: "... V-700 LEVEL LAHH-3692"
static TRAILING_ALARM: Lazy<Regex> = Lazy::new(|| {
    re(r"(?i)(PD|DP|[PLTFAVD])([XID]?)(S)?([AO])?(HH|H|LL|L)-([A-Z]?\d+[A-Z]?(?:[-_]\d+)?)\s*$")
});
// Alarm tag in parentheses before a setpoint word: "(PAH-200 Setpoint)"
static BRACKETED_SETPOINT: Lazy<Regex> = Lazy::new(|| {
    re(concat!(
        r"(?i)\((PD|DP|[PLTFAVD])([XID]?)(S)?([AO])?(HH|H|LL|L)-",
        r"([A-Z]?\d+[A-Z]?(?:[-_][A-Z]?\d+)?)-?\s*(?:setpoint|sp|set[- ]point)\)?",
    ))
});
// Alarm tag in parentheses: "(PSL-702)"
static BRACKETED_ALARM: Lazy<Regex> = Lazy::new(|| {
    re(r"(?i)\((PD|DP|[PLTFAVD])([XID]?)(S)?([AO])?(HH|H|LL|L)-([A-Z]?\d+[A-Z]?(?:[-_]\d+)?)\)")
});
// Alarm or switch tag opening the description: "LSHH-701 V-700 LEVEL"
static LEADING_ALARM_SWITCH: Lazy<Regex> = Lazy::new(|| {
    re(concat!(
        r"(?i)^([DPLTFA][DPXIA]?(?:SHH|SH|SLL|SL|AHH|AH|ALL|AL))",
        r"[-_]?([A-Z]?[-_]?\d+[A-Z]?(?:[-_][A-Z0-9]+)?)\s*",
    ))
});
static LEADING_TAG: Lazy<Regex> = Lazy::new(|| re(r"^([A-Z]{2,6}[-_]\d+[A-Z]?)"));
static LEADING_SEPARATORS: Lazy<Regex> = Lazy::new(|| re(r"^[-_:\s]+"));

static ALARM_TAG: Lazy<Regex> =
    Lazy::new(|| re(r"(?i)^(PD|DP|[PLTFAVD])([XID]?)A(HH|H|LL|L)-(.+)$"));
static SWITCH_TAG: Lazy<Regex> =
    Lazy::new(|| re(r"(?i)^(PD|DP|[PLTFAVD])([XID]?)S(HH|H|LL|L)-(.+)$"));
static TRAILING_LEVEL: Lazy<Regex> = Lazy::new(|| {
    re(r"(?i)(?:PD|DP|[PLTFAVD])[XID]?(S)?A?(HH|H|LL|L)-[A-Z]?\d+[A-Z]?(?:[-_]\d+)?\s*$")
});
static SWITCH_WORD: Lazy<Regex> = Lazy::new(|| re(r"\b(?:SW|SWITCH|SWTICH)\b"));
static HIGH_WORD: Lazy<Regex> = Lazy::new(|| re(r"\bHIGH\b"));
static LOW_WORD: Lazy<Regex> = Lazy::new(|| re(r"\bLOW\b"));
static ALARM_WORD: Lazy<Regex> = Lazy::new(|| {
    re(r"\b(?:ALARM|ALM|SWITCH|SW|SETPOINT|SHUTDOWN|SHUT|TRIP)\b|SET\s*POINT")
});

static ARRAY_ADDRESS: Lazy<Regex> = Lazy::new(|| re(r"([A-Z_]+)\[(\d+)\]"));
static DASHED_ADDRESS: Lazy<Regex> = Lazy::new(|| re(r"([A-Z]+)[-_](\d+)"));
static NUMERIC_PREFIX: Lazy<Regex> = Lazy::new(|| re(r"^\d+:"));
static PLC_SUFFIX: Lazy<Regex> = Lazy::new(|| re(r"\.([A-Za-z0-9_]+)$"));

static ALARM_ADDRESS: Lazy<Regex> = Lazy::new(|| re(r"(?i)^ALARM\[\d+\]"));
static WRITEFLOAT_ADDRESS: Lazy<Regex> = Lazy::new(|| re(r"(?i)^WRITEFLOAT\[\d+\]"));

static DAY0: Lazy<Regex> = Lazy::new(|| re(r"(?i)DAY\s*[_$-]?\s*0"));
static DAY1: Lazy<Regex> = Lazy::new(|| re(r"(?i)DAY\s*[_$-]?\s*1"));
static LAG_N: Lazy<[Regex; 3]> =
    Lazy::new(|| [re(r"LAG\s*1"), re(r"LAG\s*2"), re(r"LAG\s*3")]);
static SETPOINT_WORDS: Lazy<Regex> = Lazy::new(|| re(r"(?i)set\s*point"));

static BRACKETED_UNIT: Lazy<Regex> = Lazy::new(|| {
    re(r"(?i)\((PSIG|PSIA|PSI|MCFD|MCF|BPD|BBLS|GPM|VDC|VAC|mA|Deg\s*[FC]|Inches|IN|%|Hz)\)\s*$")
});
static RANGE_UNIT: Lazy<Regex> = Lazy::new(|| re(r"\([^,()]+,\s*([A-Za-z%]+)\)\s*$"));
static TRAILING_DEGREES: Lazy<Regex> = Lazy::new(|| re(r"(?i)(Deg\s*[FC])\.?\s*$"));
static PERCENT: Lazy<Regex> = Lazy::new(|| re(r"\d+-\d+%|\b\d+%"));
static VOLUME_UNIT: Lazy<Regex> =
    Lazy::new(|| re(r"(?i)\b(MSCFD|MCFD|MSCF|MCF|BPD|BBLS|GPM)\b"));
static PRESSURE_UNIT: Lazy<Regex> = Lazy::new(|| re(r"(?i)\b(PSIG|PSIA|PSI|BARG|BARA)\b"));

static ALARM_DESCRIPTION_TAIL: Lazy<[Regex; 5]> = Lazy::new(|| {
    [
        re(r"(?i)\s+Alarm\s+Set\s*Point\s*$"),
        re(r"(?i)\s+Alarm\s+Setpoint\s*$"),
        re(r"(?i)\s+Set\s*Point\s*$"),
        re(r"(?i)\s+Setpoint\s*$"),
        re(r"(?i)\s+Alarm\s*$"),
    ]
});

/// Tag id built from one of the alarm-description regexes' captures.
///
/// Switches keep their own prefix; alarms name their transmitter.
fn alarm_capture_tag(tables: &ClassificationTables, caps: &regex::Captures<'_>) -> String {
    let measurement = caps[1].to_uppercase();
    let modifier = caps.get(2).map_or("", |m| m.as_str()).to_uppercase();
    let level = caps[5].to_uppercase();
    let number = caps[6].to_uppercase().replace('_', "-");

    let prefix = if caps.get(3).is_some() {
        format!("{measurement}{modifier}S{level}")
    } else {
        tables.transmitter_prefix(&measurement, &modifier)
    };
    format!("{prefix}-{number}")
}

/// Primary tag named by an alarm or setpoint description.
pub fn tag_from_alarm_description(
    tables: &ClassificationTables,
    description: &str,
) -> Option<String> {
    if let Some(caps) = TRANSMITTER_WITH_ALARM.captures(description) {
        let prefix = tables.transmitter_prefix(&caps[1], "");
        return Some(format!("{}-{}", prefix, caps[2].to_uppercase().replace('_', "-")));
    }
    [&*TRAILING_ALARM, &*BRACKETED_SETPOINT, &*BRACKETED_ALARM]
        .into_iter()
        .find_map(|pattern| pattern.captures(description))
        .map(|caps| alarm_capture_tag(tables, &caps))
}

/// Description with the alarm tags recognized above removed.
pub fn strip_alarm_tags(description: &str) -> String {
    let mut text = TRANSMITTER_WITH_ALARM.replace(description, "").into_owned();
    for pattern in [&*TRAILING_ALARM, &*BRACKETED_SETPOINT, &*BRACKETED_ALARM] {
        text = pattern.replace(&text, "").into_owned();
    }
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Alarm or switch tag at the start of the description, and the text after it.
pub fn leading_alarm_switch_tag(description: &str) -> Option<(String, String)> {
    let caps = LEADING_ALARM_SWITCH.captures(description)?;
    let tag = format!(
        "{}-{}",
        caps[1].to_uppercase(),
        caps[2].to_uppercase().replace('_', "-")
    )
    .replace("--", "-");
    let end = caps.get(0).map_or(0, |m| m.end());
    Some((tag, description[end..].trim().to_string()))
}

/// Compiled transmitter-id searches, one pair per configured prefix.
#[derive(Debug, Clone)]
pub struct TransmitterFinder {
    patterns: Vec<Regex>,
}

impl TransmitterFinder {
    pub fn new(prefixes: &[String]) -> Self {
        let patterns = prefixes
            .iter()
            .map(|prefix| re(&format!(r"\b({})[-_\s]?(\d+[A-Z]?)\b", regex::escape(prefix))))
            .collect();
        Self { patterns }
    }

    /// First transmitter id in the description (`PIT 801` -> `PIT-801`) and the
    /// equipment text that goes with it.
    ///
    /// An id opening the description is cut off the equipment text, so `P-101 TRANSFER PUMP`
    /// gives `TRANSFER PUMP`.
    pub fn find(&self, description: &str) -> Option<(String, String)> {
        let upper = description.to_ascii_uppercase();
        let caps = self
            .patterns
            .iter()
            .find_map(|pattern| pattern.captures(&upper))?;
        let tag = format!("{}-{}", &caps[1], &caps[2]);
        let whole = caps.get(0)?;
        let equipment = if whole.start() == 0 {
            LEADING_SEPARATORS
                .replace(description[whole.end()..].trim(), "")
                .into_owned()
        } else {
            strip_leading_tag(description)
        };
        Some((tag, equipment))
    }
}

/// Tag at the very start of the description, and the equipment text after it.
pub fn leading_tag(description: &str) -> Option<(String, String)> {
    let caps = LEADING_TAG.captures(description)?;
    let tag = caps[1].to_string();
    let rest = description[tag.len()..].trim();
    Some((tag, LEADING_SEPARATORS.replace(rest, "").into_owned()))
}

/// Description with any leading tag removed
pub fn strip_leading_tag(description: &str) -> String {
    leading_tag(description)
        .map(|(_, rest)| rest)
        .unwrap_or_else(|| description.to_string())
}

/// Tag id derived from the address itself: `READFLOAT[4]` -> `READFLOAT-4`.
pub fn tag_from_address(address: &str) -> String {
    if let Some(caps) = ARRAY_ADDRESS.captures(address) {
        return format!("{}-{}", &caps[1], &caps[2]);
    }
    if let Some(caps) = DASHED_ADDRESS.captures(address) {
        return format!("{}-{}", &caps[1], &caps[2]);
    }
    address.to_string()
}

/// Drop a controller slot prefix such as `1:`.
pub fn clean_tag_prefix(tag: &str) -> String {
    NUMERIC_PREFIX.replace(tag, "").into_owned()
}

/// Result of folding an alarm tag into its primary tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Remap {
    pub tag: String,
    pub level: Option<AlarmLevel>,
    pub is_switch: bool,
    /// Set when the tag was rewritten
    pub remapped_from: Option<String>,
}

/// `LAHH-3692` -> `LIT-3692` at level HH; switch tags keep their id but report a level.
pub fn remap_alarm_tag(tables: &ClassificationTables, tag: &str) -> Remap {
    if let Some(caps) = SWITCH_TAG.captures(tag) {
        return Remap {
            tag: tag.to_string(),
            level: AlarmLevel::from_code(&caps[3]),
            is_switch: true,
            remapped_from: None,
        };
    }
    if let Some(caps) = ALARM_TAG.captures(tag) {
        let prefix = tables.transmitter_prefix(&caps[1], &caps[2]);
        return Remap {
            tag: format!("{}-{}", prefix, caps[4].to_uppercase()),
            level: AlarmLevel::from_code(&caps[3]),
            is_switch: false,
            remapped_from: Some(tag.to_string()),
        };
    }
    Remap {
        tag: tag.to_string(),
        level: None,
        is_switch: false,
        remapped_from: None,
    }
}

/// Level of an alarm or switch tag closing the description.
pub fn level_from_trailing_tag(description: &str) -> Option<(AlarmLevel, bool)> {
    let caps = TRAILING_LEVEL.captures(description)?;
    AlarmLevel::from_code(&caps[2]).map(|level| (level, caps.get(1).is_some()))
}

/// True when the text talks about an alarm, a switch, a trip or a setpoint.
pub fn mentions_alarm(description: &str) -> bool {
    ALARM_WORD.is_match(&description.to_uppercase())
}

/// Level spelled out in words (`HIGH HIGH`, `LO LO`, ...), and whether it is a switch.
pub fn level_from_keywords(description: &str) -> Option<(AlarmLevel, bool)> {
    let upper = description.to_uppercase();
    let is_switch = SWITCH_WORD.is_match(&upper);
    let level = if upper.contains("HIGH HIGH") || upper.contains("HI HI") {
        AlarmLevel::HighHigh
    } else if upper.contains("LOW LOW") || upper.contains("LO LO") {
        AlarmLevel::LowLow
    } else if HIGH_WORD.is_match(&upper) {
        AlarmLevel::High
    } else if LOW_WORD.is_match(&upper) {
        AlarmLevel::Low
    } else {
        return None;
    };
    Some((level, is_switch))
}

/// Remove trailing `Alarm` / `Setpoint` wording once the level is carried elsewhere.
pub fn clean_alarm_description(text: &str) -> String {
    let mut cleaned = text.to_string();
    for pattern in ALARM_DESCRIPTION_TAIL.iter() {
        cleaned = pattern.replace(&cleaned, "").into_owned();
    }
    cleaned.trim().to_string()
}

pub fn has_setpoint(description: &str) -> bool {
    SETPOINT_WORDS.is_match(description)
}

pub fn is_alarm_address(address: &str) -> bool {
    ALARM_ADDRESS.is_match(address)
}

pub fn is_writefloat_address(address: &str) -> bool {
    WRITEFLOAT_ADDRESS.is_match(address)
}

/// Label implied by a PLC member suffix (`.SP`, `.PV`, ...)
pub fn plc_suffix_label<'t>(tables: &'t ClassificationTables, address: &str) -> Option<&'t str> {
    let caps = PLC_SUFFIX.captures(address)?;
    let suffix = format!(".{}", caps[1].to_uppercase());
    tables.plc_suffixes.get(&suffix).map(String::as_str)
}

pub fn day_volume(address: &str, description: &str) -> Option<&'static str> {
    let desc_upper = description.to_uppercase();
    if desc_upper.contains("YESTERDAY") {
        return Some("Day 1 Volume");
    }
    if desc_upper.contains("TODAY") {
        return Some("Day 0 Volume");
    }
    let addr_upper = address.to_uppercase();
    if addr_upper.contains("FLOW") {
        if addr_upper.contains("DAY0") {
            return Some("Day 0 Volume");
        }
        if addr_upper.contains("DAY1") {
            return Some("Day 1 Volume");
        }
    }
    if DAY0.is_match(description) {
        Some("Day 0 Volume")
    } else if DAY1.is_match(description) {
        Some("Day 1 Volume")
    } else {
        None
    }
}

pub fn is_flow_rate(description: &str) -> bool {
    let upper = description.to_uppercase();
    upper.contains("FLOW RATE") || upper.contains("FLOWRATE")
}

/// Setpoint kind of a `WRITEFLOAT[n]` register, judged from its description.
pub fn writefloat_setpoint(description: &str) -> &'static str {
    let upper = description.to_uppercase();
    let has = |word: &str| upper.contains(word);
    let start_stop = |start: &'static str, stop: &'static str| {
        if has("START") {
            Some(start)
        } else if has("STOP") {
            Some(stop)
        } else {
            None
        }
    };

    let lag_labels = [
        ("Lag1 Start Setpoint", "Lag1 Stop Setpoint"),
        ("Lag2 Start Setpoint", "Lag2 Stop Setpoint"),
        ("Lag3 Start Setpoint", "Lag3 Stop Setpoint"),
    ];
    for (lag, (start, stop)) in LAG_N.iter().zip(lag_labels) {
        if lag.is_match(&upper) {
            if let Some(label) = start_stop(start, stop) {
                return label;
            }
        }
    }
    if has("LEAD") {
        if let Some(label) = start_stop("Lead Start Setpoint", "Lead Stop Setpoint") {
            return label;
        }
    }
    if has("LAG") {
        if let Some(label) = start_stop("Lag Start Setpoint", "Lag Stop Setpoint") {
            return label;
        }
    }
    if has("SETPOINT") {
        if has("START") {
            return "Start Setpoint";
        }
        if has("STOP") {
            return "Stop Setpoint";
        }
    }
    if has("SETPOINT") || has("SET POINT") {
        return setpoint_kind(&upper);
    }
    "Setpoint"
}

/// Alarm setpoint kind (`High High Alarm Setpoint`, ...) or plain `Setpoint`.
pub fn setpoint_kind(description: &str) -> &'static str {
    let upper = description.to_uppercase();
    if upper.contains("HIGH HIGH") || upper.contains("HI HI") {
        "High High Alarm Setpoint"
    } else if upper.contains("LOW LOW") || upper.contains("LO LO") {
        "Low Low Alarm Setpoint"
    } else if HIGH_WORD.is_match(&upper) {
        "High Alarm Setpoint"
    } else if LOW_WORD.is_match(&upper) {
        "Low Alarm Setpoint"
    } else {
        "Setpoint"
    }
}

/// Engineering unit written into the description, lower-cased.
pub fn unit_from_description(description: &str) -> Option<String> {
    let lower = |s: &str| Some(s.to_lowercase());
    if let Some(caps) = BRACKETED_UNIT.captures(description) {
        return lower(&caps[1]);
    }
    if let Some(caps) = RANGE_UNIT.captures(description) {
        return lower(&caps[1]);
    }
    if let Some(caps) = TRAILING_DEGREES.captures(description) {
        return lower(&caps[1]);
    }
    if PERCENT.is_match(description) {
        return Some("%".to_string());
    }
    if let Some(caps) = VOLUME_UNIT.captures(description) {
        return lower(&caps[1]);
    }
    PRESSURE_UNIT
        .captures(description)
        .and_then(|caps| lower(&caps[1]))
}

/// Output spelling of a unit: lower case, except `DEGF`/`DEGC` and `mA`.
pub fn normalize_unit_lowercase(unit: &str) -> String {
    let unit = unit.trim();
    let upper = unit.to_uppercase();
    let compact: String = upper.chars().filter(|c| !c.is_whitespace()).collect();
    match compact.as_str() {
        "" | "M/A" | "N/A" => String::new(),
        "DEGF" | "DEGC" => compact,
        "\"" => "in".to_string(),
        "\"WC" | "INWC" => "in wc".to_string(),
        "MA" => "mA".to_string(),
        _ => unit.to_lowercase(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tables() -> ClassificationTables {
        ClassificationTables::standard()
    }

    #[test]
    fn test_tag_from_alarm_description() {
        let t = tables();
        assert_eq!(
            tag_from_alarm_description(&t, "LIT-3692-LAHH V-700 LEVEL").as_deref(),
            Some("LIT-3692")
        );
        assert_eq!(
            tag_from_alarm_description(&t, "V-700 LEVEL LXAH-301").as_deref(),
            Some("LXIT-301")
        );
        assert_eq!(
            tag_from_alarm_description(&t, "INLET PRESSURE (PAH-200 Setpoint)").as_deref(),
            Some("PIT-200")
        );
        assert_eq!(
            tag_from_alarm_description(&t, "V-700 LOW PRESSURE (PSL-702)").as_deref(),
            Some("PSL-702")
        );
        assert_eq!(
            tag_from_alarm_description(&t, "HEATER DIFF TEMP TDAH-12").as_deref(),
            Some("TDIT-12")
        );
        assert_eq!(tag_from_alarm_description(&t, "V-700 LEVEL"), None);
    }

    #[test]
    fn test_strip_alarm_tags() {
        assert_eq!(strip_alarm_tags("LIT-3692-LAHH V-700 LEVEL"), "V-700 LEVEL");
        assert_eq!(strip_alarm_tags("INLET PRESSURE (PAH-200 Setpoint)"), "INLET PRESSURE");
        assert_eq!(strip_alarm_tags("V-700 LEVEL LSHH-701"), "V-700 LEVEL");
    }

    #[test]
    fn test_leading_alarm_switch_tag() {
        assert_eq!(
            leading_alarm_switch_tag("LSHH_701 V-700 LEVEL SWITCH"),
            Some(("LSHH-701".to_string(), "V-700 LEVEL SWITCH".to_string()))
        );
        assert_eq!(leading_alarm_switch_tag("V-700 LEVEL"), None);
    }

    #[test]
    fn test_transmitter_finder() {
        let finder = TransmitterFinder::new(&tables().transmitter_prefixes);
        let tag = |text| finder.find(text).map(|(tag, _)| tag);
        assert_eq!(tag("Inlet pit 801 pressure").as_deref(), Some("PIT-801"));
        assert_eq!(tag("FIT_220A GAS FLOW").as_deref(), Some("FIT-220A"));
        assert_eq!(tag("SEPARATOR PRESSURE"), None);
        assert_eq!(
            finder.find("P-101 TRANSFER PUMP RUNNING"),
            Some(("P-101".to_string(), "TRANSFER PUMP RUNNING".to_string()))
        );
        assert_eq!(
            finder.find("V-800 inlet PIT-3"),
            Some(("PIT-3".to_string(), "V-800 inlet PIT-3".to_string()))
        );
    }

    #[test]
    fn test_leading_tag_and_address_fallback() {
        assert_eq!(
            leading_tag("PIT-801: SEPARATOR PRESSURE"),
            Some(("PIT-801".to_string(), "SEPARATOR PRESSURE".to_string()))
        );
        assert_eq!(strip_leading_tag("V-800 INLET"), "V-800 INLET");
        assert_eq!(tag_from_address("READFLOAT[4]"), "READFLOAT-4");
        assert_eq!(tag_from_address("ALARM[3].2"), "ALARM-3");
        assert_eq!(tag_from_address("PUMP_7"), "PUMP-7");
        assert_eq!(tag_from_address("Tags.PumpSpeed"), "Tags.PumpSpeed");
        assert_eq!(clean_tag_prefix("1:PIT-801"), "PIT-801");
    }

    #[test]
    fn test_remap_alarm_tag() {
        let t = tables();
        let remap = remap_alarm_tag(&t, "LAHH-3692");
        assert_eq!(remap.tag, "LIT-3692");
        assert_eq!(remap.level, Some(AlarmLevel::HighHigh));
        assert_eq!(remap.remapped_from.as_deref(), Some("LAHH-3692"));

        assert_eq!(remap_alarm_tag(&t, "LXAL-12").tag, "LXIT-12");
        assert_eq!(remap_alarm_tag(&t, "PDAH-5").tag, "PDIT-5");
        assert_eq!(remap_alarm_tag(&t, "TDAH-1").tag, "TDIT-1");
        assert_eq!(remap_alarm_tag(&t, "fdal-7").tag, "FDIT-7");
        assert_eq!(remap_alarm_tag(&t, "TDAH-1").level, Some(AlarmLevel::High));

        let differential = remap_alarm_tag(&t, "TDSHH-4");
        assert!(differential.is_switch);
        assert_eq!(differential.tag, "TDSHH-4");

        let switch = remap_alarm_tag(&t, "PSL-702");
        assert_eq!(switch.tag, "PSL-702");
        assert!(switch.is_switch);
        assert_eq!(switch.level, Some(AlarmLevel::Low));

        assert_eq!(remap_alarm_tag(&t, "PIT-801").level, None);
    }

    #[test]
    fn test_alarm_levels_from_text() {
        assert_eq!(
            level_from_trailing_tag("V-700 LEVEL LSHH-701"),
            Some((AlarmLevel::HighHigh, true))
        );
        assert_eq!(
            level_from_keywords("TANK HI HI LEVEL"),
            Some((AlarmLevel::HighHigh, false))
        );
        assert_eq!(
            level_from_keywords("LOW LEVEL SWITCH"),
            Some((AlarmLevel::Low, true))
        );
        assert_eq!(level_from_keywords("SEPARATOR LEVEL"), None);
        assert!(mentions_alarm("Tank level alarm"));
        assert!(mentions_alarm("HIGH SET POINT"));
        assert!(!mentions_alarm("LOW PRESSURE SEPARATOR LEVEL"));
    }

    #[test]
    fn test_clean_alarm_description() {
        assert_eq!(clean_alarm_description("V-700 Level High Alarm"), "V-700 Level High");
        assert_eq!(clean_alarm_description("V-700 Level Alarm Set Point"), "V-700 Level");
        assert_eq!(clean_alarm_description("V-700 Level"), "V-700 Level");
    }

    #[test]
    fn test_label_helpers() {
        let t = tables();
        assert_eq!(plc_suffix_label(&t, "PIC_101.SP"), Some("Setpoint"));
        assert_eq!(plc_suffix_label(&t, "ALARM[3].2"), None);
        assert_eq!(day_volume("READFLOAT[2]", "Oil Yesterday Total"), Some("Day 1 Volume"));
        assert_eq!(day_volume("FLOW.DAY0", ""), Some("Day 0 Volume"));
        assert_eq!(day_volume("READFLOAT[2]", "Gas day_1 volume"), Some("Day 1 Volume"));
        assert!(is_flow_rate("Gas Flow Rate"));
        assert_eq!(writefloat_setpoint("Pump lag 2 start level"), "Lag2 Start Setpoint");
        assert_eq!(writefloat_setpoint("Lead pump stop"), "Lead Stop Setpoint");
        assert_eq!(writefloat_setpoint("Tank high high setpoint"), "High High Alarm Setpoint");
        assert_eq!(writefloat_setpoint("Flare delay"), "Setpoint");
        assert_eq!(setpoint_kind("LOW SETPOINT"), "Low Alarm Setpoint");
    }

    #[test]
    fn test_units_from_description() {
        assert_eq!(unit_from_description("Inlet pressure (PSIG)").as_deref(), Some("psig"));
        assert_eq!(unit_from_description("Tank level (0-20, FT)").as_deref(), Some("ft"));
        assert_eq!(unit_from_description("Gas temp Deg F").as_deref(), Some("deg f"));
        assert_eq!(unit_from_description("Valve 0-100% open").as_deref(), Some("%"));
        assert_eq!(unit_from_description("Gas MCFD today").as_deref(), Some("mcfd"));
        assert_eq!(unit_from_description("Separator level"), None);
        assert_eq!(normalize_unit_lowercase("PSIG"), "psig");
        assert_eq!(normalize_unit_lowercase("degf"), "DEGF");
        assert_eq!(normalize_unit_lowercase("deg f"), "DEGF");
        assert_eq!(normalize_unit_lowercase("\" WC"), "in wc");
        assert_eq!(normalize_unit_lowercase("MA"), "mA");
    }
}
