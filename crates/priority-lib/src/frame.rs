//! In-memory table of ticket rows
//!
//! A [`Frame`] is an ordered list of column names plus rows of [`Cell`]s.
//! It is the shape uploaded CSV files are parsed into, the shape the
//! harmonizer works on, and the shape classifiers receive.

use crate::error::FrameError;
use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::io::Read;

/// A single table value
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Number(f64),
    Text(String),
    Missing,
}

impl Cell {
    /// Read a CSV field as it appears in the file: blanks and `NaN` become
    /// [`Cell::Missing`], everything else is kept verbatim as text.
    pub fn raw(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed == "NaN" {
            Cell::Missing
        } else {
            Cell::Text(raw.to_string())
        }
    }

    /// Parse a field destined for a numeric column: numbers become
    /// [`Cell::Number`], blanks and `NaN` become [`Cell::Missing`], anything
    /// else is kept as text.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Cell::Missing;
        }
        match trimmed.parse::<f64>() {
            Ok(value) if value.is_nan() => Cell::Missing,
            Ok(value) => Cell::Number(value),
            Err(_) => Cell::Text(raw.to_string()),
        }
    }

    pub fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Cell::Missing)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Number(value) => write!(f, "{}", value),
            Cell::Text(value) => f.write_str(value),
            Cell::Missing => Ok(()),
        }
    }
}

impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Cell::Number(value) => serializer.serialize_f64(*value),
            Cell::Text(value) => serializer.serialize_str(value),
            Cell::Missing => serializer.serialize_none(),
        }
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Number(value)
    }
}

impl From<u32> for Cell {
    fn from(value: u32) -> Self {
        Cell::Number(f64::from(value))
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

/// Ordered columns plus rows of cells
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Frame {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Frame {
    /// Create an empty table with the given header
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Build a table whose rows are already known to match the header width
    pub(crate) fn from_parts(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Value at `row` in column `name`
    pub fn get(&self, row: usize, name: &str) -> Option<&Cell> {
        let idx = self.column_index(name)?;
        self.rows.get(row).and_then(|r| r.get(idx))
    }

    /// Append a row, checking it against the header width
    pub fn push_row(&mut self, row: Vec<Cell>) -> Result<(), FrameError> {
        if row.len() != self.columns.len() {
            return Err(FrameError::RowWidth {
                line: self.rows.len() as u64 + 2,
                expected: self.columns.len(),
                found: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    /// Replace column `name`, or append it when absent
    pub fn set_column(&mut self, name: &str, values: Vec<Cell>) -> Result<(), FrameError> {
        if values.len() != self.rows.len() {
            return Err(FrameError::ColumnLength {
                column: name.to_string(),
                expected: self.rows.len(),
                found: values.len(),
            });
        }
        match self.column_index(name) {
            Some(idx) => {
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row[idx] = value;
                }
            }
            None => {
                self.columns.push(name.to_string());
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row.push(value);
                }
            }
        }
        Ok(())
    }

    /// Copy column `from` into a new or existing column `to`.
    /// Returns false when `from` does not exist.
    pub fn copy_column(&mut self, from: &str, to: &str) -> bool {
        let Some(src) = self.column_index(from) else {
            return false;
        };
        let values: Vec<Cell> = self.rows.iter().map(|r| r[src].clone()).collect();
        // lengths always match here
        self.set_column(to, values).is_ok()
    }

    /// First `n` rows
    pub fn head(&self, n: usize) -> Frame {
        Frame {
            columns: self.columns.clone(),
            rows: self.rows.iter().take(n).cloned().collect(),
        }
    }

    /// Parse a CSV document with a header row.
    ///
    /// Duplicate header names are disambiguated as `name.1`, `name.2`, ...
    /// Short rows are padded with missing values; long rows are rejected.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Frame, FrameError> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers = rdr.headers()?.clone();
        if headers.iter().all(|h| h.trim().is_empty()) {
            return Err(FrameError::NoColumns);
        }
        let columns = dedupe_headers(headers.iter());
        let width = columns.len();

        let mut rows = Vec::new();
        for result in rdr.records() {
            let record = result?;
            if record.len() > width {
                return Err(FrameError::RowWidth {
                    line: record.position().map(|p| p.line()).unwrap_or(0),
                    expected: width,
                    found: record.len(),
                });
            }
            let mut row: Vec<Cell> = record.iter().map(Cell::raw).collect();
            row.resize(width, Cell::Missing);
            rows.push(row);
        }

        Ok(Frame { columns, rows })
    }

    /// Parse CSV from an in-memory buffer
    pub fn from_csv_bytes(bytes: &[u8]) -> Result<Frame, FrameError> {
        Self::from_csv_reader(bytes)
    }

    /// Serialize the table as CSV with a header row
    pub fn to_csv_bytes(&self) -> Result<Vec<u8>, FrameError> {
        let mut wtr = csv::Writer::from_writer(Vec::new());
        wtr.write_record(&self.columns)?;
        for row in &self.rows {
            wtr.write_record(row.iter().map(|c| c.to_string()))?;
        }
        wtr.into_inner().map_err(|e| FrameError::Write(e.to_string()))
    }
}

fn dedupe_headers<'a>(headers: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut out = Vec::new();
    for (i, raw) in headers.enumerate() {
        let mut name = raw.to_string();
        if i == 0 {
            name = name.trim_start_matches('\u{feff}').to_string();
        }
        let count = seen.entry(name.clone()).or_insert(0);
        if *count > 0 {
            let renamed = format!("{}.{}", name, count);
            *count += 1;
            out.push(renamed);
        } else {
            *count += 1;
            out.push(name);
        }
    }
    out
}
