//! Line-oriented model of a `.cpa` project file.
//!
//! A CPA project is a tree of bracketed headers whose depth is the number of brackets:
//!
//! ```text
//! [[[GraphicBlock]]]
//! Name=RACK 1
//! [[[[GrAnaNumeric]]]]
//! x=120
//! y=340
//! IO=RACK00_SLOT02[1]!RD
//! [[[IONaming]]]
//! IONamingAddress=READFLOAT[4]
//! IONamingComment="TANK 1 LEVEL"
//! ```
//!
//! [`CpaDocument::parse`] walks the lines once and keeps only what the parser and the
//! screen enricher need: screens with their objects, the IONaming and Alarm blocks and
//! the shared text library.

use crate::error::{PipelineError, Result};
use crate::pipeline::processing::text_library::TextLibrary;

/// One graphic object on a screen, attributes in file order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CpaObject {
    pub kind: String,
    pub attributes: Vec<(String, String)>,
}

impl CpaObject {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            attributes: Vec::new(),
        }
    }

    /// First value stored under `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn x(&self) -> Option<i32> {
        self.get("x").and_then(parse_coordinate)
    }

    pub fn y(&self) -> Option<i32> {
        self.get("y").and_then(parse_coordinate)
    }

    /// First non-empty `IO=` binding
    pub fn io(&self) -> Option<&str> {
        self.attributes
            .iter()
            .filter(|(k, _)| k == "IO")
            .map(|(_, v)| v.trim())
            .find(|v| !v.is_empty())
    }
}

fn parse_coordinate(value: &str) -> Option<i32> {
    let value = value.trim();
    value
        .parse::<i32>()
        .ok()
        .or_else(|| value.parse::<f64>().ok().map(|f| f.round() as i32))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CpaScreen {
    pub name: String,
    pub objects: Vec<CpaObject>,
}

/// `[[[IONaming]]]` block: a comment attached to an address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IoNamingEntry {
    pub address: String,
    /// Literal text or an `@N` library reference
    pub comment: String,
}

/// `[[[Alarm]]]` block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlarmEntry {
    pub address: String,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CpaDocument {
    pub screens: Vec<CpaScreen>,
    pub io_naming: Vec<IoNamingEntry>,
    pub alarms: Vec<AlarmEntry>,
    pub library: TextLibrary,
    /// IONaming or Alarm blocks missing a mandatory attribute
    pub malformed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    None,
    GraphicBlock,
    IoNaming,
    Alarm,
    Other,
}

#[derive(Default)]
struct BlockState {
    screen: Option<CpaScreen>,
    object: Option<CpaObject>,
    address: Option<String>,
    text: Option<String>,
}

impl CpaDocument {
    /// Parse project text.
    ///
    /// Fails only when the text cannot be a CPA project at all (empty, or without any
    /// level-3 header). Incomplete blocks are counted in `malformed` and skipped.
    pub fn parse(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Err(PipelineError::container("CPA", "project file is empty"));
        }

        let mut doc = CpaDocument {
            library: TextLibrary::from_text(content),
            ..Default::default()
        };
        let mut section = Section::None;
        let mut state = BlockState::default();
        let mut saw_header = false;

        for line in content.lines() {
            let s = line.trim();

            if let Some(name) = level3_header(s) {
                doc.flush(section, &mut state);
                saw_header = true;
                section = match name {
                    "GraphicBlock" => Section::GraphicBlock,
                    "IONaming" => Section::IoNaming,
                    "Alarm" => Section::Alarm,
                    _ => Section::Other,
                };
                continue;
            }

            match section {
                Section::GraphicBlock => doc.graphic_line(s, &mut state),
                Section::IoNaming => {
                    if let Some(v) = s.strip_prefix("IONamingAddress=") {
                        state.address.get_or_insert_with(|| v.trim().to_string());
                    } else if let Some(v) = s.strip_prefix("IONamingComment=") {
                        state
                            .text
                            .get_or_insert_with(|| v.trim().trim_matches('"').trim().to_string());
                    }
                }
                Section::Alarm => {
                    if let Some((key, value)) = s.split_once('=') {
                        match key.trim() {
                            "IOActive" if state.address.is_none() => {
                                let value = value.trim();
                                if !value.is_empty() {
                                    state.address = Some(value.to_string());
                                }
                            }
                            "Text" if state.text.is_none() => {
                                state.text = Some(value.trim().to_string());
                            }
                            _ => {}
                        }
                    }
                }
                Section::None | Section::Other => {}
            }
        }
        doc.flush(section, &mut state);

        if !saw_header {
            return Err(PipelineError::container(
                "CPA",
                "no block headers found, not a CPA project",
            ));
        }
        Ok(doc)
    }

    fn graphic_line(&mut self, s: &str, state: &mut BlockState) {
        if state.screen.is_none() && state.object.is_none() {
            if let Some(name) = s.strip_prefix("Name=") {
                state.screen = Some(CpaScreen {
                    name: name.trim().to_string(),
                    objects: Vec::new(),
                });
                return;
            }
        }

        if let Some(kind) = object_header(s) {
            self.flush_object(state);
            state.object = Some(CpaObject::new(kind));
            return;
        }

        if let (Some(object), Some((key, value))) = (state.object.as_mut(), s.split_once('=')) {
            object
                .attributes
                .push((key.trim().to_string(), value.trim().to_string()));
        }
    }

    fn flush_object(&mut self, state: &mut BlockState) {
        if let Some(object) = state.object.take() {
            if let Some(screen) = state.screen.as_mut() {
                screen.objects.push(object);
            }
        }
    }

    fn flush(&mut self, section: Section, state: &mut BlockState) {
        match section {
            Section::GraphicBlock => {
                self.flush_object(state);
                if let Some(screen) = state.screen.take() {
                    self.screens.push(screen);
                }
            }
            Section::IoNaming => match (state.address.take(), state.text.take()) {
                (Some(address), Some(comment)) if !address.is_empty() => {
                    self.io_naming.push(IoNamingEntry { address, comment });
                }
                _ => self.malformed += 1,
            },
            Section::Alarm => match state.address.take() {
                Some(address) => self.alarms.push(AlarmEntry {
                    address,
                    text: state.text.take().unwrap_or_default(),
                }),
                None => self.malformed += 1,
            },
            Section::None | Section::Other => {}
        }
        *state = BlockState::default();
    }

    pub fn screen(&self, name: &str) -> Option<&CpaScreen> {
        self.screens.iter().find(|s| s.name == name)
    }
}

/// `[[[Name]]]` but not `[[[[Name]]]]`
fn level3_header(s: &str) -> Option<&str> {
    if s.starts_with("[[[[") {
        return None;
    }
    s.strip_prefix("[[[")
        .and_then(|rest| rest.strip_suffix("]]]"))
        .map(str::trim)
}

/// `[[[[Kind]]]]` or deeper, brackets stripped
fn object_header(s: &str) -> Option<&str> {
    if !s.starts_with("[[[[") || !s.ends_with("]]]]") {
        return None;
    }
    let kind = s.trim_start_matches('[').trim_end_matches(']').trim();
    if kind.is_empty() {
        None
    } else {
        Some(kind)
    }
}
