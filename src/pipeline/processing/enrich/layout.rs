//! Column-role inference for tabular I/O screens.
//!
//! Rack and discrete/analog screens are drawn as tables: one bound value per row, with
//! free-floating text objects around it for the tag, the unit and the description. Where
//! those columns sit differs from project to project, so a [`LayoutProfile`] first
//! works out a [`ColumnLayout`] for each screen, then uses it to read one
//! [`ScreenRow`] per bound value.
//!
//! Roles come from header labels (`TAG`, `UNITS`, `DESCRIPTION`) when the screen has them,
//! otherwise from what the texts in each x-bucket look like. A role that cannot be
//! inferred stays unset and rows fall back to matching on content alone.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, HashSet};

/// A text object with its screen position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedText {
    pub x: i32,
    pub y: i32,
    pub text: String,
}

impl PlacedText {
    pub fn new(x: i32, y: i32, text: impl Into<String>) -> Self {
        Self {
            x,
            y,
            text: text.into(),
        }
    }
}

/// A bound value object, one per table row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor {
    pub x: i32,
    pub y: i32,
    /// Address or tag name the object is bound to
    pub binding: String,
}

impl Anchor {
    pub fn new(x: i32, y: i32, binding: impl Into<String>) -> Self {
        Self {
            x,
            y,
            binding: binding.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenRow {
    pub binding: String,
    pub tag_id: String,
    pub unit: String,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpan {
    pub start: i32,
    pub end: i32,
}

impl ColumnSpan {
    fn around(x: i32, offsets: (i32, i32)) -> Self {
        Self {
            start: x + offsets.0,
            end: x + offsets.1,
        }
    }

    pub fn contains(&self, x: i32) -> bool {
        self.start <= x && x <= self.end
    }
}

/// Column role mapping for one screen
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ColumnLayout {
    pub tag: Option<ColumnSpan>,
    pub unit: Option<ColumnSpan>,
    pub description: Option<ColumnSpan>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Tag,
    Unit,
    Description,
}

fn header_role(upper: &str) -> Option<Role> {
    match upper {
        "TAG" | "TAG ID" | "TAG NAME" | "TAGNAME" => Some(Role::Tag),
        "UNIT" | "UNITS" | "EU" => Some(Role::Unit),
        "DESCRIPTION" | "DESCRIPITION" | "DESC" => Some(Role::Description),
        _ => None,
    }
}

/// Geometry and vocabulary of one family of I/O screens
#[derive(Debug, Clone)]
pub struct LayoutProfile {
    pub bucket_width: i32,
    /// Buckets with fewer texts are not sampled
    pub min_bucket_items: usize,
    pub sample_size: usize,
    /// Max vertical distance between a row's anchor and its texts
    pub row_tolerance: i32,
    /// Plain integers up to this value are channel numbers, not data
    pub small_int_max: Option<u32>,
    pub tag_max_len: usize,
    pub unit_pattern: Regex,
    pub tag_pattern: Regex,
    /// Tags in the tag column are taken as written, without matching `tag_pattern`
    pub trust_tag_column: bool,
    /// Upper-cased labels and headings that are never row data
    pub skip_texts: HashSet<String>,
    /// `None` when the unit column is not located and units are matched anywhere
    pub unit_span: Option<(i32, i32)>,
    pub tag_span: (i32, i32),
    pub description_span: (i32, i32),
    /// Untabulated texts longer than this are taken as the description
    pub min_description_len: usize,
}

/// Fraction of `samples` matching `pred`
fn share<F: Fn(&str) -> bool>(samples: &[&str], pred: F) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().filter(|s| pred(**s)).count() as f64 / samples.len() as f64
}

fn skip_set(items: &[&str]) -> HashSet<String> {
    items.iter().map(|s| s.to_uppercase()).collect()
}

/// CPA `RACK*` screens
pub static RACK: Lazy<LayoutProfile> = Lazy::new(|| LayoutProfile {
    bucket_width: 20,
    min_bucket_items: 3,
    sample_size: 15,
    row_tolerance: 15,
    small_int_max: None,
    tag_max_len: 20,
    unit_pattern: Regex::new(r"(?i)^(PSIG|PSI|%|DEGF|GPM|BPD|MCF|MCFD|BBLS|mA|IN|Hz|VDC)$")
        .expect("valid regex"),
    tag_pattern: Regex::new(r"(?i)^[A-Z]{2,5}[-_]?\d+").expect("valid regex"),
    trust_tag_column: true,
    skip_texts: skip_set(&[
        "TAG", "TAG ID", "TAG NAME", "UNIT", "UNITS", "EU", "DESCRIPTION", "DESCRIPITION", "DESC",
        "PLC TAG", "PLC_TAG",
    ]),
    unit_span: Some((-20, 40)),
    tag_span: (-20, 60),
    description_span: (-20, 200),
    min_description_len: 15,
});

/// CPA `Discrete Input`, `Analog Output`, `DI (...)` screens
pub static DISCRETE_ANALOG: Lazy<LayoutProfile> = Lazy::new(|| LayoutProfile {
    bucket_width: 50,
    min_bucket_items: 2,
    sample_size: 20,
    row_tolerance: 20,
    small_int_max: Some(32),
    tag_max_len: 15,
    unit_pattern: Regex::new(
        r"(?i)^(PSIG|PSI|PSIA|%|DEGF|DEGC|GPM|BPD|MCF|MCFD|MSCF|mA|MA|VDC|VAC|IN|Hz|AMPS|BBLS)$",
    )
    .expect("valid regex"),
    tag_pattern: Regex::new(r"(?i)^[A-Z]{2,5}[-_]?[A-Z]?\d+[A-Z]?$").expect("valid regex"),
    trust_tag_column: false,
    skip_texts: skip_set(&[
        "SPARE", "TAG", "DESCRIPTION", "DESCRIPITION", "PLC_TAG", "PLC TAG", "UNIT",
        "DISCRETE INPUTS", "DISCRETE OUTPUTS", "ANALOG INPUTS", "ANALOG OUTPUTS", "SLOT", "CH",
        "CH.", "CHANNEL", "DISCRETE INPUT", "DISCRETE OUTPUT", "ANALOG INPUT", "ANALOG OUTPUT",
        "MAIN", "NEXT", "PREVIOUS", "M/A", "FAULT", "SCALED", "TEXT",
    ]),
    unit_span: None,
    tag_span: (-30, 80),
    description_span: (-30, 300),
    min_description_len: 15,
});

/// IX Developer `RACK*.xaml` screens
pub static NEOPROJ_RACK: Lazy<LayoutProfile> = Lazy::new(|| LayoutProfile {
    bucket_width: 50,
    min_bucket_items: 2,
    sample_size: 20,
    row_tolerance: 25,
    small_int_max: Some(20),
    tag_max_len: 15,
    unit_pattern: Regex::new(
        r"(?i)^(PSIG|PSI|PSIA|%|DEGF|DEGC|GPM|BPD|MCF|MCFD|MSCF|MA|VDC|VAC|HZ|IN|BBLS)$",
    )
    .expect("valid regex"),
    tag_pattern: Regex::new(r"(?i)^[A-Z]{2,5}[-_]\d+[A-Z]?$").expect("valid regex"),
    trust_tag_column: false,
    skip_texts: skip_set(&[
        "Ch.", "TAG", "DESCRIPTION", "DESCRIPITION", "MAIN", "NEXT", "PREVIOUS", "M/A",
        "ANALOG INPUTS", "DISCRETE INPUTS",
    ]),
    unit_span: None,
    tag_span: (-30, 80),
    description_span: (-30, 300),
    min_description_len: 10,
});

impl LayoutProfile {
    fn is_skip(&self, upper: &str) -> bool {
        self.skip_texts.contains(upper) || header_role(upper).is_some()
    }

    fn is_small_int(&self, text: &str) -> bool {
        match self.small_int_max {
            Some(max) => text.parse::<u32>().map(|n| n <= max).unwrap_or(false),
            None => false,
        }
    }

    fn is_unit(&self, text: &str) -> bool {
        self.unit_pattern.is_match(text)
    }

    fn is_tag(&self, text: &str) -> bool {
        self.tag_pattern.is_match(text) && text.chars().count() <= self.tag_max_len
    }

    fn span(&self, role: Role, x: i32) -> Option<ColumnSpan> {
        match role {
            Role::Tag => Some(ColumnSpan::around(x, self.tag_span)),
            Role::Unit => self.unit_span.map(|offsets| ColumnSpan::around(x, offsets)),
            Role::Description => Some(ColumnSpan::around(x, self.description_span)),
        }
    }

    /// Work out which x ranges hold the tag, unit and description columns.
    pub fn infer(&self, texts: &[PlacedText]) -> ColumnLayout {
        let mut layout = ColumnLayout::default();

        // Header labels, topmost first
        let mut headers: Vec<(&PlacedText, Role)> = texts
            .iter()
            .filter_map(|t| header_role(t.text.trim().to_uppercase().as_str()).map(|r| (t, r)))
            .collect();
        headers.sort_by_key(|(t, _)| (t.y, t.x));
        for (text, role) in headers {
            let slot = match role {
                Role::Tag => &mut layout.tag,
                Role::Unit => &mut layout.unit,
                Role::Description => &mut layout.description,
            };
            if slot.is_none() {
                *slot = self.span(role, text.x);
            }
        }

        // Content sampling for whatever the headers did not settle
        let mut buckets: BTreeMap<i32, Vec<&str>> = BTreeMap::new();
        for t in texts {
            let bucket = t.x.div_euclid(self.bucket_width) * self.bucket_width;
            buckets.entry(bucket).or_default().push(t.text.trim());
        }

        for (bucket, items) in buckets {
            if items.len() < self.min_bucket_items {
                continue;
            }
            let samples: Vec<&str> = items.into_iter().take(self.sample_size).collect();

            if share(&samples, |s| self.is_skip(&s.to_uppercase())) >= 0.5 {
                continue;
            }
            if layout.unit.is_none()
                && self.unit_span.is_some()
                && share(&samples, |s| self.is_unit(s)) >= 0.3
            {
                layout.unit = self.span(Role::Unit, bucket);
                continue;
            }
            if layout.tag.is_none() && share(&samples, |s| self.is_tag(s)) >= 0.3 {
                layout.tag = self.span(Role::Tag, bucket);
                continue;
            }
            if layout.description.is_none()
                && share(&samples, |s| s.chars().count() > self.min_description_len) >= 0.2
            {
                layout.description = self.span(Role::Description, bucket);
            }
        }

        layout
    }

    /// Read one row per anchor from the texts on the same line.
    ///
    /// Spare rows and rows that yield nothing are dropped.
    pub fn extract_rows(
        &self,
        layout: &ColumnLayout,
        anchors: &[Anchor],
        texts: &[PlacedText],
    ) -> Vec<ScreenRow> {
        anchors
            .iter()
            .filter_map(|anchor| self.extract_row(layout, anchor, texts))
            .collect()
    }

    fn extract_row(
        &self,
        layout: &ColumnLayout,
        anchor: &Anchor,
        texts: &[PlacedText],
    ) -> Option<ScreenRow> {
        let mut nearby: Vec<&PlacedText> = texts
            .iter()
            .filter(|t| (t.y - anchor.y).abs() <= self.row_tolerance)
            .collect();
        nearby.sort_by_key(|t| t.x);

        let mut row = ScreenRow {
            binding: anchor.binding.clone(),
            tag_id: String::new(),
            unit: String::new(),
            description: String::new(),
        };
        let mut spare = false;

        for t in nearby {
            let text = t.text.trim();
            let upper = text.to_uppercase();
            if text.is_empty() {
                continue;
            }
            if upper == "SPARE" {
                spare = true;
                continue;
            }
            if self.is_skip(&upper) || self.is_small_int(text) {
                continue;
            }

            if row.unit.is_empty()
                && self.is_unit(text)
                && layout.unit.map_or(true, |span| span.contains(t.x))
            {
                row.unit = text.to_string();
                continue;
            }

            if row.tag_id.is_empty() {
                let take = match layout.tag {
                    Some(span) if span.contains(t.x) => self.trust_tag_column || self.is_tag(text),
                    Some(_) => false,
                    None => self.is_tag(text),
                };
                if take {
                    row.tag_id = text.to_string();
                    continue;
                }
            }

            if layout.description.is_some_and(|span| t.x >= span.start) {
                if row.tag_id.is_empty()
                    && row.description.is_empty()
                    && self.is_tag(text)
                    && text.chars().count() <= 12
                {
                    row.tag_id = text.to_string();
                } else if text.chars().count() > row.description.chars().count() {
                    row.description = text.to_string();
                }
                continue;
            }

            if row.description.is_empty() && text.chars().count() > self.min_description_len {
                row.description = text.to_string();
            }
        }

        if spare || row.description.to_uppercase().starts_with("SPARE") {
            return None;
        }
        if row.tag_id.is_empty() && row.unit.is_empty() && row.description.is_empty() {
            return None;
        }
        Some(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Four-row rack table: tag at x=100, unit at x=300, description at x=400.
    fn rack_texts(with_headers: bool) -> Vec<PlacedText> {
        let mut texts = vec![
            PlacedText::new(100, 100, "PIT-801"),
            PlacedText::new(300, 100, "PSIG"),
            PlacedText::new(400, 100, "V-800 INLET SEPARATOR PRESSURE"),
            PlacedText::new(100, 140, "LIT-802"),
            PlacedText::new(300, 140, "IN"),
            PlacedText::new(400, 140, "V-800 INLET SEPARATOR LEVEL"),
            PlacedText::new(100, 180, "TIT-803"),
            PlacedText::new(300, 180, "DEGF"),
            PlacedText::new(400, 180, "V-800 INLET SEPARATOR TEMP"),
            PlacedText::new(100, 220, "SPARE"),
            PlacedText::new(400, 220, "SPARE"),
        ];
        if with_headers {
            texts.push(PlacedText::new(100, 60, "TAG"));
            texts.push(PlacedText::new(300, 60, "UNITS"));
            texts.push(PlacedText::new(400, 60, "DESCRIPTION"));
        }
        texts
    }

    fn rack_anchors() -> Vec<Anchor> {
        vec![
            Anchor::new(600, 102, "RACK00_SLOT02[1]"),
            Anchor::new(600, 141, "RACK00_SLOT02[2]"),
            Anchor::new(600, 179, "RACK00_SLOT02[3]"),
            Anchor::new(600, 220, "RACK00_SLOT02[4]"),
        ]
    }

    #[test]
    fn test_infer_from_header_labels() {
        let layout = RACK.infer(&rack_texts(true));
        assert_eq!(layout.tag, Some(ColumnSpan { start: 80, end: 160 }));
        assert_eq!(layout.unit, Some(ColumnSpan { start: 280, end: 340 }));
        assert_eq!(layout.description, Some(ColumnSpan { start: 380, end: 600 }));
    }

    #[test]
    fn test_infer_from_content_without_headers() {
        let layout = RACK.infer(&rack_texts(false));
        assert!(layout.tag.unwrap().contains(100));
        assert!(layout.unit.unwrap().contains(300));
        assert!(layout.description.unwrap().contains(400));
    }

    #[test]
    fn test_layouts_at_different_offsets_read_the_same_rows() {
        let shifted: Vec<PlacedText> = rack_texts(false)
            .into_iter()
            .map(|t| PlacedText::new(t.x + 240, t.y, t.text))
            .collect();
        let plain = rack_texts(false);
        let plain_rows = RACK.extract_rows(&RACK.infer(&plain), &rack_anchors(), &plain);
        let shifted_rows = RACK.extract_rows(&RACK.infer(&shifted), &rack_anchors(), &shifted);
        assert_eq!(plain_rows, shifted_rows);
    }

    #[test]
    fn test_extract_rows_reads_each_column_and_drops_spares() {
        let texts = rack_texts(true);
        let layout = RACK.infer(&texts);
        let rows = RACK.extract_rows(&layout, &rack_anchors(), &texts);

        assert_eq!(rows.len(), 3);
        assert_eq!(
            rows[0],
            ScreenRow {
                binding: "RACK00_SLOT02[1]".into(),
                tag_id: "PIT-801".into(),
                unit: "PSIG".into(),
                description: "V-800 INLET SEPARATOR PRESSURE".into(),
            }
        );
        assert_eq!(rows[2].unit, "DEGF");
    }

    #[test]
    fn test_discrete_profile_skips_channel_numbers_and_labels() {
        let texts = vec![
            PlacedText::new(20, 100, "3"),
            PlacedText::new(100, 100, "LSHH-701"),
            PlacedText::new(300, 100, "V-700 LEVEL SWITCH HIGH HIGH"),
            PlacedText::new(20, 140, "4"),
            PlacedText::new(100, 140, "PSL-702"),
            PlacedText::new(300, 140, "V-700 PRESSURE SWITCH LOW"),
            PlacedText::new(100, 20, "DISCRETE INPUTS"),
        ];
        let anchors = vec![Anchor::new(500, 100, "RACK00_SLOT06[3]")];
        let layout = DISCRETE_ANALOG.infer(&texts);
        let rows = DISCRETE_ANALOG.extract_rows(&layout, &anchors, &texts);

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].tag_id, "LSHH-701");
        assert_eq!(rows[0].description, "V-700 LEVEL SWITCH HIGH HIGH");
    }
}
