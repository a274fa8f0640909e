//! Structured fixture files.
//!
//! A fixture file is a spreadsheet, either a workbook (`.xlsx`, `.xlsm`,
//! `.xls`, `.ods`) or a CSV export. The first row holds column headers and
//! every following row becomes one JSON object. Headers containing dots
//! (`prescriber.name`) build nested objects.

use std::io::Read;
use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use serde_json::{Map, Number, Value};

use crate::error::FixtureError;

const WORKBOOK_EXTENSIONS: [&str; 4] = ["xlsx", "xlsm", "xls", "ods"];

/// Read every data row of the file at `path`. Workbooks are read from
/// their first sheet.
///
/// Header-only files yield an empty vector; blank rows are skipped.
pub fn read_structured_file(path: impl AsRef<Path>) -> Result<Vec<Value>, FixtureError> {
    let path = path.as_ref();
    if is_workbook(path) {
        return read_workbook(path, None);
    }
    let origin = existing(path)?;
    let file = std::fs::File::open(path).map_err(|source| FixtureError::Io {
        path: origin.clone(),
        source,
    })?;
    tracing::info!(path = %origin, "reading fixture file");
    read_structured(&origin, file)
}

/// Read every data row of the sheet named `sheet` in the workbook at `path`.
pub fn read_structured_sheet(path: impl AsRef<Path>, sheet: &str) -> Result<Vec<Value>, FixtureError> {
    read_workbook(path.as_ref(), Some(sheet))
}

/// Read rows from any CSV source. `origin` names the source in errors.
pub fn read_structured<R: Read>(origin: &str, source: R) -> Result<Vec<Value>, FixtureError> {
    let reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(source);
    let records = reader.into_records().map(|record| {
        record
            .map(|r| r.iter().map(str::to_string).collect())
            .map_err(|source| FixtureError::Csv {
                path: origin.to_string(),
                source,
            })
    });
    rows_from_records(origin, records)
}

fn is_workbook(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| WORKBOOK_EXTENSIONS.iter().any(|w| e.eq_ignore_ascii_case(w)))
}

fn existing(path: &Path) -> Result<String, FixtureError> {
    let origin = path.display().to_string();
    if !path.is_file() {
        tracing::error!(path = %origin, "fixture file not found");
        return Err(FixtureError::NotFound { path: origin });
    }
    Ok(origin)
}

fn read_workbook(path: &Path, sheet: Option<&str>) -> Result<Vec<Value>, FixtureError> {
    let origin = existing(path)?;
    let workbook_err = |source: calamine::Error| FixtureError::Workbook {
        path: origin.clone(),
        source,
    };
    let mut workbook = open_workbook_auto(path).map_err(workbook_err)?;
    let names = workbook.sheet_names();
    let name = match sheet {
        Some(wanted) if names.iter().any(|n| n == wanted) => wanted.to_string(),
        Some(wanted) => {
            tracing::error!(path = %origin, sheet = wanted, available = ?names, "sheet not found");
            return Err(FixtureError::MissingSheet {
                path: origin.clone(),
                sheet: wanted.to_string(),
            });
        }
        None => match names.first() {
            Some(first) => first.clone(),
            None => {
                tracing::warn!(path = %origin, "workbook has no sheets");
                return Ok(Vec::new());
            }
        },
    };

    tracing::info!(path = %origin, sheet = %name, "reading fixture workbook");
    let range = workbook.worksheet_range(&name).map_err(workbook_err)?;
    let records = range
        .rows()
        .map(|row| Ok(row.iter().map(cell_text).collect::<Vec<_>>()));
    rows_from_records(&format!("{origin}#{name}"), records)
}

/// Workbook cell as the text a CSV export would carry.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => (*f as i64).to_string(),
        other => other.to_string(),
    }
}

fn rows_from_records<I>(origin: &str, mut records: I) -> Result<Vec<Value>, FixtureError>
where
    I: Iterator<Item = Result<Vec<String>, FixtureError>>,
{
    let Some(header_row) = records.next().transpose()? else {
        tracing::warn!(path = %origin, "fixture file is empty");
        return Ok(Vec::new());
    };

    // Column index for every non-blank header.
    let headers: Vec<(usize, String)> = header_row
        .iter()
        .enumerate()
        .filter(|(_, h)| !h.trim().is_empty())
        .map(|(i, h)| (i, h.trim().to_string()))
        .collect();
    if headers.is_empty() {
        tracing::warn!(path = %origin, "fixture file has no usable header row");
        return Ok(Vec::new());
    }

    let mut rows = Vec::new();
    for (offset, record) in records.enumerate() {
        let record = record?;
        if record.iter().all(|cell| cell.trim().is_empty()) {
            // +2: one-based, after the header.
            tracing::debug!(path = %origin, row = offset + 2, "skipping blank row");
            continue;
        }

        let mut row = Map::new();
        for (index, header) in &headers {
            let value = record.get(*index).map(|c| coerce_cell(c)).unwrap_or(Value::Null);
            insert_dotted(&mut row, header, value);
        }
        rows.push(Value::Object(row));
    }

    tracing::info!(path = %origin, rows = rows.len(), "processed fixture rows");
    Ok(rows)
}

/// Cell text to JSON: blank → null, `true`/`false` (any case) → bool,
/// numeric → number, otherwise the cell text.
pub fn coerce_cell(cell: &str) -> Value {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return Value::Null;
    }
    if trimmed.eq_ignore_ascii_case("true") {
        return Value::Bool(true);
    }
    if trimmed.eq_ignore_ascii_case("false") {
        return Value::Bool(false);
    }
    if let Ok(i) = trimmed.parse::<i64>() {
        return Value::from(i);
    }
    if let Some(n) = trimmed
        .parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .and_then(Number::from_f64)
    {
        return Value::Number(n);
    }
    Value::String(cell.to_string())
}

fn insert_dotted(row: &mut Map<String, Value>, header: &str, value: Value) {
    match header.split_once('.') {
        None => {
            row.insert(header.to_string(), value);
        }
        Some((head, rest)) => {
            let slot = row
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !slot.is_object() {
                *slot = Value::Object(Map::new());
            }
            if let Value::Object(child) = slot {
                insert_dotted(child, rest, value);
            }
        }
    }
}
