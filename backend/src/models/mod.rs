//! Domain models for the expansion pipeline.
//!
//! - [`RawRow`] - cells exactly as read from the spreadsheet
//! - [`Record`] - a parsed row (metadata, counts, coordinates)
//! - [`ExpandedRow`] - one level of a record's threshold expansion
//! - [`Cell`] - a typed output cell, shared by every sink

use serde::{Deserialize, Serialize};
use std::fmt;

/// One spreadsheet row as a sequence of string cells.
pub type RawRow = Vec<String>;

// =============================================================================
// Cell
// =============================================================================

/// A single output cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Text(String),
    Int(i64),
    Number(f64),
    Null,
}

impl Cell {
    /// Value sent to the Sheets API. Null becomes an empty string so the
    /// written cell is blank rather than rejected.
    pub fn to_sheet_value(&self) -> serde_json::Value {
        match self {
            Cell::Null => serde_json::Value::String(String::new()),
            other => serde_json::to_value(other).unwrap_or(serde_json::Value::Null),
        }
    }

    /// JSON value with nulls preserved (ArcGIS attributes).
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Text(s) => write!(f, "{}", s),
            Cell::Int(i) => write!(f, "{}", i),
            Cell::Number(n) => write!(f, "{}", n),
            Cell::Null => Ok(()),
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::Text(value)
    }
}

// =============================================================================
// Record
// =============================================================================

/// A row after parsing. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    row: usize,
    metadata: Vec<String>,
    counts: Vec<i64>,
    coordinates: Vec<String>,
}

impl Record {
    pub fn new(
        row: usize,
        metadata: Vec<String>,
        counts: Vec<i64>,
        coordinates: Vec<String>,
    ) -> Self {
        Self {
            row,
            metadata,
            counts,
            coordinates,
        }
    }

    /// 1-based sheet row the record was parsed from.
    pub fn row(&self) -> usize {
        self.row
    }

    pub fn metadata(&self) -> &[String] {
        &self.metadata
    }

    pub fn counts(&self) -> &[i64] {
        &self.counts
    }

    /// Raw coordinate cells, unconverted.
    pub fn coordinates(&self) -> &[String] {
        &self.coordinates
    }

    /// Highest count, i.e. the number of levels the record expands to.
    pub fn max_level(&self) -> Option<i64> {
        self.counts.iter().copied().max()
    }
}

// =============================================================================
// Expanded Row
// =============================================================================

/// One output row: metadata, the indicator vector for `level`, coordinates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpandedRow {
    /// Sheet row of the source record.
    pub source_row: usize,
    /// Threshold level, starting at 1.
    pub level: i64,
    pub metadata: Vec<String>,
    pub indicators: Vec<u8>,
    pub coordinates: Vec<Cell>,
}

impl ExpandedRow {
    /// Flatten to `metadata ++ indicators ++ coordinates`.
    pub fn to_cells(&self) -> Vec<Cell> {
        let mut cells =
            Vec::with_capacity(self.metadata.len() + self.indicators.len() + self.coordinates.len());
        cells.extend(self.metadata.iter().cloned().map(Cell::Text));
        cells.extend(self.indicators.iter().map(|&bit| Cell::Int(i64::from(bit))));
        cells.extend(self.coordinates.iter().cloned());
        cells
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_serialization() {
        let cells = vec![
            Cell::from("east"),
            Cell::Int(1),
            Cell::Number(40.5),
            Cell::Null,
        ];
        let json = serde_json::to_string(&cells).unwrap();
        assert_eq!(json, r#"["east",1,40.5,null]"#);
    }

    #[test]
    fn test_sheet_value_blanks_null() {
        assert_eq!(Cell::Null.to_sheet_value(), serde_json::json!(""));
        assert_eq!(Cell::Int(0).to_sheet_value(), serde_json::json!(0));
        assert_eq!(Cell::Null.to_json(), serde_json::Value::Null);
    }

    #[test]
    fn test_cell_display() {
        assert_eq!(Cell::Number(-73.9).to_string(), "-73.9");
        assert_eq!(Cell::Int(1).to_string(), "1");
        assert_eq!(Cell::Null.to_string(), "");
    }

    #[test]
    fn test_max_level() {
        let record = Record::new(2, vec![], vec![3, 0, 2], vec![]);
        assert_eq!(record.max_level(), Some(3));

        let empty = Record::new(2, vec![], vec![], vec![]);
        assert_eq!(empty.max_level(), None);
    }

    #[test]
    fn test_expanded_row_flatten() {
        let row = ExpandedRow {
            source_row: 2,
            level: 1,
            metadata: vec!["2024-01-01".into(), "east".into(), "metro".into()],
            indicators: vec![1, 0],
            coordinates: vec![Cell::Number(40.1), Cell::Null],
        };
        assert_eq!(
            row.to_cells(),
            vec![
                Cell::from("2024-01-01"),
                Cell::from("east"),
                Cell::from("metro"),
                Cell::Int(1),
                Cell::Int(0),
                Cell::Number(40.1),
                Cell::Null,
            ]
        );
    }
}
