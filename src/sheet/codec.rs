//! Conversion between [`WordEntry`] values and spreadsheet rows.
//!
//! Encoding produces exactly `width` cells. Decoding never fails on cell
//! content: unreadable cells fall back to their column default, and only an
//! empty row is treated as "no record".

use serde_json::{Map, Value};

use super::schema::{ColumnKind, COLUMNS};
use crate::models::WordEntry;

/// Encodes an entry as a row of exactly `width` cells.
///
/// Fields outside [`COLUMNS`] (the entry's `extra` map) are dropped.
pub fn encode(entry: &WordEntry, width: usize) -> Vec<String> {
    let fields = match serde_json::to_value(entry) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    };

    let mut row: Vec<String> = COLUMNS
        .iter()
        .map(|column| {
            let value = fields.get(column.name).filter(|v| !v.is_null());
            match (column.kind, value) {
                (_, None) => column.default.to_string(),
                (ColumnKind::Text, Some(Value::String(s))) => s.clone(),
                (ColumnKind::Json, Some(v)) => v.to_string(),
                (ColumnKind::Integer, Some(Value::Number(n))) => n.to_string(),
                (ColumnKind::Boolean, Some(Value::Bool(b))) => b.to_string(),
                (_, Some(_)) => column.default.to_string(),
            }
        })
        .collect();

    row.resize(width, String::new());
    row
}

/// Decodes a row into an entry, or `None` for an empty row.
///
/// Missing trailing cells take their column default, as do JSON cells that
/// are blank, don't look like JSON, fail to parse or have the wrong shape.
pub fn decode(row: &[String]) -> Option<WordEntry> {
    if row.is_empty() {
        return None;
    }

    let mut fields = Map::new();
    for (index, column) in COLUMNS.iter().enumerate() {
        let cell = row.get(index).map(String::as_str).unwrap_or("");
        let value = match column.kind {
            ColumnKind::Text => Value::String(if cell.is_empty() {
                column.default.to_string()
            } else {
                cell.to_string()
            }),
            ColumnKind::Json => parse_json_cell(cell, column.default),
            ColumnKind::Integer => Value::from(parse_int_lenient(cell)),
            ColumnKind::Boolean => Value::Bool(cell.eq_ignore_ascii_case("true")),
        };
        fields.insert(column.name.to_string(), value);
    }

    match serde_json::from_value(Value::Object(fields)) {
        Ok(entry) => Some(entry),
        Err(e) => {
            tracing::warn!(error = %e, "row did not map onto a word entry, keeping key only");
            Some(WordEntry::new(row[0].clone()))
        }
    }
}

/// Parses a JSON cell, falling back to `default` for anything that isn't an
/// array or object literal.
fn parse_json_cell(cell: &str, default: &str) -> Value {
    let fallback = || serde_json::from_str(default).unwrap_or(Value::Null);

    let trimmed = cell.trim();
    if !(trimmed.starts_with('[') || trimmed.starts_with('{')) {
        return fallback();
    }
    serde_json::from_str(trimmed).unwrap_or_else(|_| fallback())
}

/// Reads the leading integer of a cell (`"12abc"` is 12); 0 when there is none.
pub fn parse_int_lenient(cell: &str) -> i64 {
    let trimmed = cell.trim_start();
    let mut end = 0;
    for (i, c) in trimmed.char_indices() {
        if c.is_ascii_digit() || (i == 0 && (c == '-' || c == '+')) {
            end = i + c.len_utf8();
        } else {
            break;
        }
    }
    trimmed[..end].parse().unwrap_or(0)
}
