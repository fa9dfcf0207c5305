//! Batch input parsing — turns a raw source into pending [`Operation`]s.
//!
//! Two shapes are accepted:
//!
//! - **records**: a JSON array of `{ "id"?, "kind" | "command", "parameters"? }`
//!   objects. Extra top-level keys are folded into the parameters.
//! - **table**: CSV with a header row naming the fields, followed by
//!   one operation per row. Cells may be quoted.
//!
//! Parsing is all-or-nothing. Whether a kind is recognised, or its fields
//! present, is left to the validator.

use serde_json::{Map, Value};
use std::collections::HashSet;
use std::path::Path;

use crate::error::{BatchError, ParseError};
use crate::operation::{Operation, Parameters};

/// Id prefix used when the caller does not name the source.
pub const DEFAULT_PREFIX: &str = "op";

const KIND_FIELDS: [&str; 2] = ["kind", "command"];
const ID_FIELD: &str = "id";
const PARAMETERS_FIELD: &str = "parameters";

/// The raw body of a batch.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchSource {
    /// Structured records (expected to be a JSON array of objects).
    Records(Value),
    /// Header-plus-rows text.
    Table(String),
}

/// A batch source plus the prefix used to generate missing ids.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchInput {
    pub prefix: String,
    pub source: BatchSource,
}

impl BatchInput {
    pub fn records(value: Value) -> Self {
        Self {
            prefix: DEFAULT_PREFIX.into(),
            source: BatchSource::Records(value),
        }
    }

    /// Records from a JSON document.
    pub fn records_json(json: &str) -> Result<Self, BatchError> {
        Ok(Self::records(serde_json::from_str(json)?))
    }

    pub fn table(text: impl Into<String>) -> Self {
        Self {
            prefix: DEFAULT_PREFIX.into(),
            source: BatchSource::Table(text.into()),
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Load a batch file. `.json` files are records, anything else is read
    /// as a table. The file stem becomes the id prefix.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, BatchError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        let input = if is_json {
            Self::records_json(&content)?
        } else {
            Self::table(content)
        };

        let prefix = path
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_PREFIX);
        Ok(input.with_prefix(prefix))
    }
}

/// Parse a batch into pending operations, in submission order.
pub fn parse(input: &BatchInput) -> Result<Vec<Operation>, ParseError> {
    let operations = match &input.source {
        BatchSource::Records(value) => parse_records(value, &input.prefix)?,
        BatchSource::Table(text) => parse_table(text, &input.prefix)?,
    };
    if operations.is_empty() {
        return Err(ParseError::Empty);
    }
    ensure_unique_ids(&operations)?;
    Ok(operations)
}

/// Parse the records shape.
pub fn parse_records(value: &Value, prefix: &str) -> Result<Vec<Operation>, ParseError> {
    let records = value.as_array().ok_or_else(|| ParseError::InvalidRecords {
        reason: "expected a JSON array of operation records".into(),
    })?;

    records
        .iter()
        .enumerate()
        .map(|(i, record)| {
            let index = i + 1;
            let obj = record.as_object().ok_or_else(|| ParseError::InvalidRecords {
                reason: format!("operation {index} is not an object"),
            })?;
            parse_record(obj, index, prefix)
        })
        .collect()
}

fn parse_record(
    obj: &Map<String, Value>,
    index: usize,
    prefix: &str,
) -> Result<Operation, ParseError> {
    let mut kind = None;
    let mut id = None;
    let mut parameters = Parameters::new();
    let mut explicit = Parameters::new();

    for (key, value) in obj {
        let field = normalize_field(key);
        if KIND_FIELDS.contains(&field.as_str()) {
            if kind.is_none() {
                kind = scalar_text(value);
            }
        } else if field == ID_FIELD {
            id = scalar_text(value);
        } else if field == PARAMETERS_FIELD {
            let nested = value.as_object().ok_or_else(|| ParseError::InvalidRecords {
                reason: format!("operation {index}: 'parameters' must be an object"),
            })?;
            for (name, v) in nested {
                explicit.insert(normalize_field(name), v.clone());
            }
        } else if !value.is_null() {
            parameters.insert(field, value.clone());
        }
    }
    // nested `parameters` win over flattened keys
    parameters.extend(explicit);

    let kind = kind.ok_or(ParseError::MissingKind { index })?;
    let id = id.unwrap_or_else(|| generated_id(prefix, index));
    Ok(Operation::new(id, kind, parameters))
}

/// Parse the header-plus-rows shape.
///
/// Cells may be quoted; surrounding whitespace is trimmed and blank lines
/// are skipped. Row numbers count data rows only.
pub fn parse_table(text: &str, prefix: &str) -> Result<Vec<Operation>, ParseError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());
    let mut records = reader
        .records()
        .filter(|record| !matches!(record, Ok(r) if is_blank(r)));

    let header: Vec<String> = match records.next() {
        Some(record) => record
            .map_err(|e| table_error(0, &e))?
            .iter()
            .map(normalize_field)
            .collect(),
        None => return Err(ParseError::MissingRows),
    };

    let mut operations = Vec::new();
    for (i, record) in records.enumerate() {
        let index = i + 1;
        let record = record.map_err(|e| table_error(index, &e))?;
        operations.push(table_row(&header, &record, index, prefix)?);
    }
    if operations.is_empty() {
        return Err(ParseError::MissingRows);
    }
    Ok(operations)
}

fn table_row(
    header: &[String],
    cells: &csv::StringRecord,
    index: usize,
    prefix: &str,
) -> Result<Operation, ParseError> {
    if cells.len() != header.len() {
        return Err(ParseError::FieldCountMismatch {
            row: index,
            expected: header.len(),
            found: cells.len(),
        });
    }

    let mut kind = None;
    let mut id = None;
    let mut parameters = Parameters::new();
    for (field, cell) in header.iter().zip(cells.iter()) {
        if cell.is_empty() {
            continue;
        }
        if KIND_FIELDS.contains(&field.as_str()) {
            kind.get_or_insert_with(|| cell.to_string());
        } else if field == ID_FIELD {
            id = Some(cell.to_string());
        } else {
            parameters.insert(field.clone(), Value::String(cell.to_string()));
        }
    }

    let kind = kind.ok_or(ParseError::MissingKind { index })?;
    let id = id.unwrap_or_else(|| generated_id(prefix, index));
    Ok(Operation::new(id, kind, parameters))
}

/// A whitespace-only line reads back as a single empty field.
fn is_blank(record: &csv::StringRecord) -> bool {
    record.iter().all(str::is_empty) && record.len() <= 1
}

fn table_error(row: usize, err: &csv::Error) -> ParseError {
    ParseError::InvalidTable {
        row,
        reason: err.to_string(),
    }
}

fn generated_id(prefix: &str, index: usize) -> String {
    format!("{prefix}-{index}")
}

/// Non-empty text form of a scalar JSON value.
fn scalar_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

/// Canonical field name: lower-case, words joined by `-`.
///
/// `token_id`, `tokenId`, `TOKEN_ID` and `token-id` all map to `token-id`.
pub fn normalize_field(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 2);
    let mut prev: Option<char> = None;
    for c in name.trim().chars() {
        if c == '_' || c == ' ' {
            out.push('-');
        } else if c.is_ascii_uppercase() {
            if matches!(prev, Some(p) if p.is_ascii_lowercase() || p.is_ascii_digit()) {
                out.push('-');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
        prev = Some(c);
    }
    out
}

fn ensure_unique_ids(operations: &[Operation]) -> Result<(), ParseError> {
    let mut seen = HashSet::with_capacity(operations.len());
    for (i, op) in operations.iter().enumerate() {
        if !seen.insert(op.id.as_str()) {
            return Err(ParseError::DuplicateId {
                id: op.id.clone(),
                index: i + 1,
            });
        }
    }
    Ok(())
}
