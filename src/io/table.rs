use calamine::{DataType, Reader as CalamineReader, Xls, Xlsx};
use std::io::Cursor;

use crate::error::{PipelineError, Result};

/// A header row plus string rows, the shape every tabular export is reduced to
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    /// Build from literal rows; the first row is the header.
    pub fn from_rows<R, C>(rows: R) -> Self
    where
        R: IntoIterator<Item = C>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        let mut iter = rows
            .into_iter()
            .map(|r| r.into_iter().map(Into::into).collect::<Vec<String>>());
        let headers = iter.next().unwrap_or_default();
        Self {
            headers,
            rows: iter.collect(),
        }
    }

    /// Read the first worksheet of a spreadsheet, choosing the reader from the file name.
    pub fn from_spreadsheet(file_name: &str, bytes: &[u8]) -> Result<Self> {
        let lower = file_name.to_ascii_lowercase();
        if lower.ends_with(".xlsx") || lower.ends_with(".xlsm") {
            Self::from_xlsx(bytes)
        } else if lower.ends_with(".xls") {
            Self::from_xls(bytes)
        } else if lower.ends_with(".csv") {
            Ok(Self::from_delimited(&String::from_utf8_lossy(bytes), ','))
        } else if lower.ends_with(".txt") || lower.ends_with(".tsv") {
            Ok(Self::from_delimited(&String::from_utf8_lossy(bytes), '\t'))
        } else {
            Err(PipelineError::Spreadsheet(format!(
                "unsupported export format: {}",
                file_name
            )))
        }
    }

    pub fn from_xlsx(bytes: &[u8]) -> Result<Self> {
        let cursor = Cursor::new(bytes);
        let mut workbook = Xlsx::new(cursor).map_err(|err| {
            PipelineError::Spreadsheet(format!("failed to read xlsx workbook: {err}"))
        })?;
        let first = workbook.sheet_names().first().cloned();
        match first {
            Some(name) => match workbook.worksheet_range(&name) {
                Some(Ok(range)) => Ok(Self::from_cells(range.rows())),
                Some(Err(err)) => Err(PipelineError::Spreadsheet(format!(
                    "failed to read sheet '{name}': {err}"
                ))),
                None => Ok(Self::default()),
            },
            None => Ok(Self::default()),
        }
    }

    pub fn from_xls(bytes: &[u8]) -> Result<Self> {
        let cursor = Cursor::new(bytes);
        let mut workbook = Xls::new(cursor).map_err(|err| {
            PipelineError::Spreadsheet(format!("failed to read xls workbook: {err}"))
        })?;
        let first = workbook.sheet_names().first().cloned();
        match first {
            Some(name) => match workbook.worksheet_range(&name) {
                Some(Ok(range)) => Ok(Self::from_cells(range.rows())),
                Some(Err(err)) => Err(PipelineError::Spreadsheet(format!(
                    "failed to read sheet '{name}': {err}"
                ))),
                None => Ok(Self::default()),
            },
            None => Ok(Self::default()),
        }
    }

    fn from_cells<'a>(rows: impl Iterator<Item = &'a [DataType]>) -> Self {
        Self::from_rows(rows.map(|row| row.iter().map(cell_to_string).collect::<Vec<_>>()))
    }

    /// Parse delimited text with double-quote escaping; blank lines are skipped.
    pub fn from_delimited(text: &str, delimiter: char) -> Self {
        Self::from_rows(
            text.lines()
                .filter(|l| !l.trim().is_empty())
                .map(|l| split_delimited(l, delimiter)),
        )
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of the first header matching any alias, compared trimmed and case-insensitively.
    pub fn column(&self, aliases: &[&str]) -> Option<usize> {
        aliases.iter().find_map(|alias| {
            self.headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(alias.trim()))
        })
    }

    /// Cell text, empty when the row is short or the column is absent.
    pub fn cell(row: &[String], column: Option<usize>) -> &str {
        column
            .and_then(|i| row.get(i))
            .map(|s| s.trim())
            .unwrap_or("")
    }
}

fn cell_to_string(cell: &DataType) -> String {
    match cell {
        DataType::String(s) => s.trim().to_string(),
        DataType::Float(v) => {
            if v.fract() == 0.0 && v.abs() < 1e15 {
                format!("{}", *v as i64)
            } else {
                format!("{v}")
            }
        }
        DataType::Int(v) => format!("{v}"),
        DataType::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
        DataType::Error(_) | DataType::Empty => String::new(),
        DataType::DateTime(v) => format!("{v}"),
        DataType::DateTimeIso(s) => s.clone(),
        DataType::Duration(v) => format!("{v}"),
        DataType::DurationIso(s) => s.clone(),
    }
}

/// Split one delimited line. Quoted fields may contain the delimiter; `""` is a literal quote.
pub fn split_delimited(line: &str, delimiter: char) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                field.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            c if c == delimiter && !in_quotes => {
                fields.push(std::mem::take(&mut field));
            }
            c => field.push(c),
        }
    }
    fields.push(field);
    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_delimited_handles_quotes() {
        assert_eq!(
            split_delimited(r#"COMMENT,,"",  "SEP INLET, PRESS","x",Local:1:I.Data"#, ','),
            vec!["COMMENT", "", "", "  SEP INLET, PRESS", "x", "Local:1:I.Data"]
        );
        assert_eq!(split_delimited(r#"a,"say ""hi""",b"#, ','), vec!["a", r#"say "hi""#, "b"]);
    }

    #[test]
    fn test_split_keeps_trailing_empty_field() {
        assert_eq!(split_delimited("a,b,", ','), vec!["a", "b", ""]);
    }

    #[test]
    fn test_column_lookup_by_alias() {
        let table = Table::from_rows(vec![
            vec!["// Name", "DataType", "Address_1", "Description"],
            vec!["PIT_801", "REAL", "READFLOAT[1]", "Inlet pressure"],
        ]);
        let address = table.column(&["Address", "Address_1"]);
        assert_eq!(address, Some(2));
        assert_eq!(Table::cell(&table.rows()[0], address), "READFLOAT[1]");
        assert_eq!(Table::cell(&table.rows()[0], None), "");
        assert_eq!(table.column(&["name", "// name"]), Some(0));
    }

    #[test]
    fn test_from_delimited_skips_blank_lines() {
        let table = Table::from_delimited("Name\tAddress\n\nA\tB\n", '\t');
        assert_eq!(table.headers(), &["Name".to_string(), "Address".to_string()]);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_unknown_spreadsheet_extension_is_rejected() {
        assert!(Table::from_spreadsheet("tags.ods", b"").is_err());
    }

    #[test]
    fn test_float_cells_drop_integral_fraction() {
        assert_eq!(cell_to_string(&DataType::Float(801.0)), "801");
        assert_eq!(cell_to_string(&DataType::Float(2.5)), "2.5");
        assert_eq!(cell_to_string(&DataType::Empty), "");
    }
}
