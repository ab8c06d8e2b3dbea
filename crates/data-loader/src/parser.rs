//! Parser for the flat delimited data files.
//!
//! Every source file has a header line and at least the `row` and `col`
//! fields, optionally followed by a numeric `data` field:
//!
//! ```text
//! row,col,data
//! 0,10,1.0
//! 0,11,1.0
//! ```
//!
//! Identifiers are kept as strings so that `"007"` and `"7"` stay distinct.

use crate::error::{DataLoadError, Result};
use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// One line of a source file
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawRecord {
    pub row: String,
    pub col: String,
    #[serde(default)]
    pub data: Option<f64>,
}

impl RawRecord {
    /// The `data` field, or 1.0 for implicit sources
    pub fn value(&self) -> f64 {
        self.data.unwrap_or(1.0)
    }
}

/// Convert a configured delimiter into the single byte the csv reader wants
pub fn delimiter_byte(delimiter: char) -> Result<u8> {
    u8::try_from(delimiter).map_err(|_| DataLoadError::InvalidValue {
        field: "delimiter".to_string(),
        value: delimiter.to_string(),
    })
}

/// Parse a source file
pub fn parse_records(path: &Path, delimiter: u8) -> Result<Vec<RawRecord>> {
    if !path.exists() {
        return Err(DataLoadError::FileNotFound {
            path: path.display().to_string(),
        });
    }
    let file = File::open(path)?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    parse_records_from_reader(file, delimiter, &name)
}

/// Parse records from any reader; `file` is only used in error messages
pub fn parse_records_from_reader<R: Read>(
    reader: R,
    delimiter: u8,
    file: &str,
) -> Result<Vec<RawRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut records = Vec::new();
    for record in reader.deserialize::<RawRecord>() {
        let record = record.map_err(|source| DataLoadError::ParseError {
            file: file.to_string(),
            source,
        })?;
        records.push(record);
    }
    Ok(records)
}
