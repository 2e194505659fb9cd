// src/parse/mod.rs

use csv::{ReaderBuilder, StringRecord};
use serde::Serialize;
use std::{
    collections::{BTreeMap, HashSet},
    fmt,
};
use tracing::{debug, trace};

pub mod value;

pub use value::Value;

/// One parsed data line: column name → typed value.
/// Always holds exactly the header's keys.
pub type Row = BTreeMap<String, Value>;

/// A header-derived column. `title` mirrors `name`; kept separate because
/// the table widget addresses data by `name` and displays `title`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Column {
    pub name: String,
    pub title: String,
}

impl Column {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            title: name.clone(),
            name,
        }
    }
}

/// Header + rows of one successfully parsed CSV file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    pub columns: Vec<Column>,
    pub rows: Vec<Row>,
}

impl Table {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DiagnosticKind {
    MissingHeader,
    EmptyHeaderName,
    DuplicateHeader,
    TooFewFields,
    TooManyFields,
    Malformed,
}

/// A structural problem found while parsing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// 1-based data row number (header excluded), if the problem is row-bound.
    pub row: Option<usize>,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.row {
            Some(row) => write!(f, "row {}: {}", row, self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// The whole file was rejected. `diagnostics` is never empty.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseFailure {
    pub diagnostics: Vec<Diagnostic>,
}

impl fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CSV parse failed with {} diagnostic(s)", self.diagnostics.len())?;
        if let Some(first) = self.diagnostics.first() {
            write!(f, ", first: {}", first)?;
        }
        Ok(())
    }
}

impl std::error::Error for ParseFailure {}

pub type ParseResult = Result<Table, ParseFailure>;

/// Parse raw CSV text (first line = header) into typed rows.
///
/// Every structural problem is collected; if there is at least one, the
/// caller gets the full diagnostic set and no table at all.
pub fn parse(raw: &str) -> ParseResult {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true) // field-count mismatches become diagnostics, not hard errors
        .from_reader(raw.as_bytes());

    let mut diagnostics = Vec::new();
    let mut records = rdr.records();

    // 1) header: first non-blank record
    let header = loop {
        match records.next() {
            Some(Ok(rec)) if is_blank(raw, &rec) => continue,
            Some(Ok(rec)) => break Some(rec),
            Some(Err(e)) => {
                diagnostics.push(Diagnostic {
                    kind: DiagnosticKind::Malformed,
                    row: None,
                    message: format!("unreadable header: {}", e),
                });
                break None;
            }
            None => break None,
        }
    };

    let Some(header) = header else {
        if diagnostics.is_empty() {
            diagnostics.push(Diagnostic {
                kind: DiagnosticKind::MissingHeader,
                row: None,
                message: "no header row".to_string(),
            });
        }
        return Err(ParseFailure { diagnostics });
    };

    let columns = header_columns(&header, &mut diagnostics);
    trace!(columns = columns.len(), "parsed header");

    // 2) data rows
    let mut rows = Vec::new();
    let mut data_row = 0usize;
    for result in records {
        let rec = match result {
            Ok(rec) => rec,
            Err(e) => {
                diagnostics.push(Diagnostic {
                    kind: DiagnosticKind::Malformed,
                    row: Some(data_row + 1),
                    message: e.to_string(),
                });
                break;
            }
        };
        if is_blank(raw, &rec) {
            continue;
        }
        data_row += 1;

        if rec.len() != columns.len() {
            let kind = if rec.len() < columns.len() {
                DiagnosticKind::TooFewFields
            } else {
                DiagnosticKind::TooManyFields
            };
            let line = rec.position().map(|p| p.line()).unwrap_or_default();
            diagnostics.push(Diagnostic {
                kind,
                row: Some(data_row),
                message: format!(
                    "expected {} fields, found {} (line {})",
                    columns.len(),
                    rec.len(),
                    line
                ),
            });
            continue;
        }

        if diagnostics.is_empty() {
            rows.push(build_row(&columns, &rec));
        }
    }

    if !diagnostics.is_empty() {
        debug!(count = diagnostics.len(), "CSV rejected");
        return Err(ParseFailure { diagnostics });
    }

    debug!(columns = columns.len(), rows = rows.len(), "CSV parsed");
    Ok(Table { columns, rows })
}

/// A line holding nothing but whitespace. Decided on the source text, so a
/// quoted empty field (`""`) still counts as a row.
fn is_blank(raw: &str, rec: &StringRecord) -> bool {
    if rec.len() > 1 || rec.iter().any(|f| !f.trim().is_empty()) {
        return false;
    }
    let Some(line) = rec
        .position()
        .and_then(|p| raw.get(p.byte() as usize..))
        .map(|rest| rest.trim_start_matches(['\r', '\n']))
        .and_then(|rest| rest.lines().next())
    else {
        return true;
    };
    !line.contains('"')
}

fn header_columns(header: &StringRecord, diagnostics: &mut Vec<Diagnostic>) -> Vec<Column> {
    let mut seen = HashSet::new();
    let mut columns = Vec::with_capacity(header.len());
    for (idx, raw) in header.iter().enumerate() {
        let name = raw.trim();
        if name.is_empty() {
            diagnostics.push(Diagnostic {
                kind: DiagnosticKind::EmptyHeaderName,
                row: None,
                message: format!("header column {} has no name", idx + 1),
            });
        } else if !seen.insert(name.to_string()) {
            diagnostics.push(Diagnostic {
                kind: DiagnosticKind::DuplicateHeader,
                row: None,
                message: format!("duplicate column name {:?}", name),
            });
        }
        columns.push(Column::new(name));
    }
    columns
}

fn build_row(columns: &[Column], rec: &StringRecord) -> Row {
    columns
        .iter()
        .zip(rec.iter())
        .map(|(col, field)| (col.name.clone(), Value::infer(field)))
        .collect()
}
