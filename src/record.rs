//! Decoded task record files
//!
//! The task-presentation software saves one structured record per run. This
//! module holds the decoded form of such a record, the reader seam used by the
//! session loader, and a reader for records exported as JSON.
//!
//! Exported records are messy: scalars arrive wrapped in one or two array
//! layers, and the label arrays mix row wrappers with per-element cell
//! wrappers depending on the exporter version. The accessors here unwrap those
//! layers so callers only ever see plain numbers and strings.

use crate::error::StudyError;
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

/// Field names written by the task software
pub mod fields {
    pub const SCANNER_KEY: &str = "SCANNERKEY";
    pub const RESPONSE_KEYS1: &str = "RESPONSEKEYS1";
    pub const RESPONSE_KEYS2: &str = "RESPONSEKEYS2";
    pub const SEED: &str = "seed";
    pub const START_PULSE_TIME: &str = "STARTPULSETIME";
    pub const STIMULI_TIME: &str = "STIMULITIME";
    pub const RESPONSE_TIME: &str = "RESPONSETIME";
    pub const DATA: &str = "data";
    pub const EMOTIONS: &str = "emotions";
    pub const GENDERS: &str = "genders";
    pub const PICTURES: &str = "pictures";
}

/// Number of columns in the per-trial data table
pub const DATA_COLUMNS: usize = 8;

/// Trait for structured record file readers
pub trait RecordReader {
    /// Decode the record stored at `path`
    fn read(&self, path: &Path) -> Result<RawRecord, StudyError>;

    /// File extension (without the dot) of the records this reader understands
    fn extension(&self) -> &str;
}

/// Reader for records exported to JSON objects keyed by the task field names
#[derive(Debug, Clone)]
pub struct JsonRecordReader {
    extension: String,
}

impl Default for JsonRecordReader {
    fn default() -> Self {
        Self {
            extension: "json".to_string(),
        }
    }
}

impl JsonRecordReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reader that matches record files by a different extension
    pub fn with_extension(extension: impl Into<String>) -> Self {
        let extension = extension.into();
        Self {
            extension: extension.trim_start_matches('.').to_string(),
        }
    }
}

impl RecordReader for JsonRecordReader {
    fn read(&self, path: &Path) -> Result<RawRecord, StudyError> {
        let text = fs::read_to_string(path).map_err(|e| StudyError::io(path, e))?;
        RawRecord::from_json(&text).map_err(|e| match e {
            StudyError::Json(inner) => {
                StudyError::Decode(format!("{}: {}", path.display(), inner))
            }
            other => other,
        })
    }

    fn extension(&self) -> &str {
        &self.extension
    }
}

/// One decoded record: named fields with loosely nested values
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    fields: Map<String, Value>,
}

impl RawRecord {
    pub fn from_json(json: &str) -> Result<Self, StudyError> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, StudyError> {
        match value {
            Value::Object(fields) => Ok(Self { fields }),
            other => Err(StudyError::Decode(format!(
                "record must be an object of named fields, got {}",
                kind_of(&other)
            ))),
        }
    }

    pub fn field(&self, name: &str) -> Result<&Value, StudyError> {
        self.fields
            .get(name)
            .ok_or_else(|| StudyError::MissingField(name.to_string()))
    }

    /// Every element of a (possibly wrapped) row field, as text.
    ///
    /// Row wrappers are stripped until the row itself is reached; a bare scalar
    /// is a row of one.
    pub fn row_text(&self, name: &str) -> Result<Vec<String>, StudyError> {
        row_elements(self.field(name)?, name)?
            .into_iter()
            .map(|(label, value)| value_to_text(value, &label))
            .collect()
    }

    /// Every element of a (possibly wrapped) row field, as numbers
    pub fn row_numbers(&self, name: &str) -> Result<Vec<f64>, StudyError> {
        row_elements(self.field(name)?, name)?
            .into_iter()
            .map(|(label, value)| value_to_number(value, &label))
            .collect()
    }

    /// First element of a (possibly wrapped) field, as text
    pub fn scalar_text(&self, name: &str) -> Result<String, StudyError> {
        let value = first_element(self.field(name)?, name)?;
        value_to_text(value, name)
    }

    /// First element of a (possibly wrapped) field, as a number
    pub fn scalar_number(&self, name: &str) -> Result<f64, StudyError> {
        value_to_number(first_element(self.field(name)?, name)?, name)
    }

    /// The per-trial data table as rows of numbers. `null` cells become NaN.
    pub fn data_table(&self) -> Result<Vec<Vec<f64>>, StudyError> {
        let rows = match self.field(fields::DATA)? {
            Value::Array(rows) => rows,
            other => {
                return Err(StudyError::Decode(format!(
                    "data must be a table, got {}",
                    kind_of(other)
                )))
            }
        };

        // A single-trial table may be exported as a bare row
        if !rows.is_empty() && rows.iter().all(|cell| !cell.is_array()) {
            return Ok(vec![numeric_row(rows, 0)?]);
        }

        rows.iter()
            .enumerate()
            .map(|(i, row)| match row {
                Value::Array(cells) => numeric_row(cells, i),
                other => Err(StudyError::Decode(format!(
                    "data row {} must be an array, got {}",
                    i,
                    kind_of(other)
                ))),
            })
            .collect()
    }

    /// A label array (emotions, genders, pictures) flattened to plain strings
    pub fn labels(&self, name: &str) -> Result<Vec<String>, StudyError> {
        let mut items = match self.field(name)? {
            Value::Array(items) => items,
            other => {
                return Err(StudyError::Decode(format!(
                    "{} must be an array, got {}",
                    name,
                    kind_of(other)
                )))
            }
        };

        // Strip the 1xN row wrapper
        if let [Value::Array(inner)] = items.as_slice() {
            items = inner;
        }

        items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                let label = format!("{}[{}]", name, i);
                let scalar = unwrap_singleton(item, &label)?;
                value_to_text(scalar, &label)
            })
            .collect()
    }
}

fn numeric_row(cells: &[Value], row: usize) -> Result<Vec<f64>, StudyError> {
    cells
        .iter()
        .enumerate()
        .map(|(col, cell)| match cell {
            Value::Number(n) => n.as_f64().ok_or_else(|| {
                StudyError::Decode(format!("data[{}][{}] is not representable as f64", row, col))
            }),
            Value::Null => Ok(f64::NAN),
            other => Err(StudyError::Decode(format!(
                "data[{}][{}] must be numeric, got {}",
                row,
                col,
                kind_of(other)
            ))),
        })
        .collect()
}

/// Follow the first element of nested arrays down to a scalar
fn first_element<'a>(value: &'a Value, name: &str) -> Result<&'a Value, StudyError> {
    let mut current = value;
    while let Value::Array(items) = current {
        current = items
            .first()
            .ok_or_else(|| StudyError::Decode(format!("{} is empty", name)))?;
    }
    Ok(current)
}

/// Strip any number of single-element array layers
fn unwrap_singleton<'a>(value: &'a Value, name: &str) -> Result<&'a Value, StudyError> {
    let mut current = value;
    while let Value::Array(items) = current {
        match items.as_slice() {
            [only] => current = only,
            _ => {
                return Err(StudyError::Decode(format!(
                    "{} holds {} values, expected a single label",
                    name,
                    items.len()
                )))
            }
        }
    }
    Ok(current)
}

/// Strip single-element row wrappers, then unwrap each element of the row
fn row_elements<'a>(value: &'a Value, name: &str) -> Result<Vec<(String, &'a Value)>, StudyError> {
    let mut current = value;
    while let Value::Array(items) = current {
        match items.as_slice() {
            [inner @ Value::Array(_)] => current = inner,
            _ => break,
        }
    }

    match current {
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                let label = format!("{}[{}]", name, i);
                let scalar = unwrap_singleton(item, &label)?;
                Ok((label, scalar))
            })
            .collect(),
        scalar => Ok(vec![(name.to_string(), scalar)]),
    }
}

fn value_to_number(value: &Value, name: &str) -> Result<f64, StudyError> {
    match value {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| StudyError::Decode(format!("{} is not representable as f64", name))),
        other => Err(StudyError::Decode(format!(
            "{} must be numeric, got {}",
            name,
            kind_of(other)
        ))),
    }
}

fn value_to_text(value: &Value, name: &str) -> Result<String, StudyError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(match n.as_f64() {
            Some(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 => {
                format!("{}", f as i64)
            }
            _ => n.to_string(),
        }),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(StudyError::Decode(format!(
            "{} must be text, got {}",
            name,
            kind_of(other)
        ))),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> RawRecord {
        RawRecord::from_value(value).unwrap()
    }

    #[test]
    fn test_scalars_unwrap_nested_layers() {
        let rec = record(json!({
            "SCANNERKEY": [["5"]],
            "seed": [12345],
            "STIMULITIME": 2.5,
            "RESPONSEKEYS1": [1]
        }));

        assert_eq!(rec.scalar_text(fields::SCANNER_KEY).unwrap(), "5");
        assert_eq!(rec.scalar_number(fields::SEED).unwrap(), 12345.0);
        assert_eq!(rec.scalar_number(fields::STIMULI_TIME).unwrap(), 2.5);
        assert_eq!(rec.scalar_text(fields::RESPONSE_KEYS1).unwrap(), "1");
    }

    #[test]
    fn test_rows_keep_every_element() {
        let rec = record(json!({
            "RESPONSEKEYS1": [[30, 89]],
            "RESPONSEKEYS2": ["b"],
            "cells": [[["1"], ["2"], ["3"]]],
            "seed": [[5489, 624, 1]],
            "bare": 7
        }));

        assert_eq!(rec.row_text(fields::RESPONSE_KEYS1).unwrap(), vec!["30", "89"]);
        assert_eq!(rec.row_text(fields::RESPONSE_KEYS2).unwrap(), vec!["b"]);
        assert_eq!(rec.row_text("cells").unwrap(), vec!["1", "2", "3"]);
        assert_eq!(rec.row_numbers(fields::SEED).unwrap(), vec![5489.0, 624.0, 1.0]);
        assert_eq!(rec.row_numbers("bare").unwrap(), vec![7.0]);
        assert!(matches!(
            rec.row_numbers(fields::RESPONSE_KEYS2),
            Err(StudyError::Decode(_))
        ));
    }

    #[test]
    fn test_missing_field() {
        let rec = record(json!({}));
        let err = rec.scalar_text(fields::SCANNER_KEY).unwrap_err();
        assert!(matches!(err, StudyError::MissingField(ref f) if f == "SCANNERKEY"));
    }

    #[test]
    fn test_labels_accept_row_and_cell_wrappers() {
        let rec = record(json!({
            "row": [[["h"], ["n"], ["s"]]],
            "flat": ["h", "n"],
            "cells": [["F"], [["M"]]],
            "single": [["x"]],
            "numeric": [[7], [8.0]]
        }));

        assert_eq!(rec.labels("row").unwrap(), vec!["h", "n", "s"]);
        assert_eq!(rec.labels("flat").unwrap(), vec!["h", "n"]);
        assert_eq!(rec.labels("cells").unwrap(), vec!["F", "M"]);
        assert_eq!(rec.labels("single").unwrap(), vec!["x"]);
        assert_eq!(rec.labels("numeric").unwrap(), vec!["7", "8"]);
    }

    #[test]
    fn test_labels_reject_ambiguous_element() {
        let rec = record(json!({ "emotions": [["h", "n"], ["s"]] }));
        assert!(matches!(
            rec.labels(fields::EMOTIONS),
            Err(StudyError::Decode(_))
        ));
    }

    #[test]
    fn test_data_table_nulls_become_nan() {
        let rec = record(json!({
            "data": [
                [1, 1, 10.0, 0.5, 11.0, 1, 1, 0.8],
                [2, 2, 20.0, 0.5, null, null, null, null]
            ]
        }));

        let table = rec.data_table().unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table[0][2], 10.0);
        assert!(table[1][7].is_nan());
    }

    #[test]
    fn test_data_table_single_bare_row() {
        let rec = record(json!({ "data": [1, 1, 10.0, 0.5, 11.0, 1, 1, 0.8] }));
        let table = rec.data_table().unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table[0].len(), DATA_COLUMNS);
    }

    #[test]
    fn test_non_object_record() {
        assert!(matches!(
            RawRecord::from_json("[1, 2, 3]"),
            Err(StudyError::Decode(_))
        ));
        assert!(matches!(
            RawRecord::from_json("not json"),
            Err(StudyError::Json(_))
        ));
    }

    #[test]
    fn test_reader_extension() {
        assert_eq!(JsonRecordReader::new().extension(), "json");
        assert_eq!(JsonRecordReader::with_extension(".mat").extension(), "mat");
    }
}
