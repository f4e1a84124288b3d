//! File name and format constants shared by the CLI, the configuration layer and the pipeline.

pub const DEFAULT_CONFIG_FILE: &str = "mtl.toml";

// Stage artifacts written to the output directory
pub const EXTRACTED_FILE: &str = "01_extracted_ios.json";
pub const ENRICHED_FILE: &str = "02_enriched_ios.json";
pub const MTL_FILE: &str = "03_master_tag_list.json";
pub const REPORT_FILE: &str = "run_report.json";
pub const METRICS_FILE: &str = "metrics.prom";

/// Name suffixes tried, in order, when auto-detecting the IX Developer Tags Export.
pub const TAGS_EXPORT_PATTERNS: &[&str] = &[
    "_tags export.xlsx",
    "_tags_export.xlsx",
    "tagsexport.xlsx",
    "_tags export.xls",
    "_tags_export.xls",
    "tagsexport.xls",
    "_tags export.csv",
    "_tags_export.csv",
    "tagsexport.csv",
];

/// Name suffixes tried, in order, when auto-detecting the IX Developer Alarms Export.
pub const ALARMS_EXPORT_PATTERNS: &[&str] = &[
    "_alarms export.xlsx",
    "_alarms_export.xlsx",
    "alarmsexport.xlsx",
    "_alarms export.xls",
    "_alarms_export.xls",
    "alarmsexport.xls",
    "_alarms export.csv",
    "_alarms_export.csv",
    "alarmsexport.csv",
];

pub const DEFAULT_GRAPHIC_OBJECTS: &[&str] = &[
    "GrAnaNumeric",
    "GrDigSymbol",
    "GrAnaBar",
    "GrMultipleChoice",
    "DigitalProperty",
    "GrDigText",
    "Alarm",
];

pub const DEFAULT_EXCLUDED_SCREENS: &[&str] = &["scrap", "scrap 2"];

// Description provenance labels
pub const PROVENANCE_IONAMING: &str = "IONaming";
pub const PROVENANCE_ALARM: &str = "Alarm";
pub const PROVENANCE_TAGS_EXPORT: &str = "Tags_Export";
pub const PROVENANCE_NONE: &str = "none";

pub const UNCLASSIFIED: &str = "Unclassified";

/// NeoProj tag bindings are written as `Tags.<name>`
pub const NEOPROJ_TAG_PREFIX: &str = "Tags.";
