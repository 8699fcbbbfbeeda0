//! Threshold expander.
//!
//! A record with counts `[3, 0, 2]` expands into one row per level
//! `1..=max(counts)`, each carrying a binary indicator of which counts
//! reach that level:
//!
//! ```text
//! level 1: [1, 0, 1, 0, ...]
//! level 2: [1, 0, 1, 0, ...]
//! level 3: [1, 0, 0, 0, ...]
//! ```
//!
//! The indicator width is fixed by [`TransformConfig::indicator_width`]. Counts
//! beyond the width are ignored and missing counts are padded with 0.

use crate::config::{CoordinatePolicy, TransformConfig};
use crate::models::{Cell, ExpandedRow, Record};
use crate::parser::to_number;

/// Expand a record into one row per level, in ascending level order.
///
/// Records whose highest count is below 1 produce no rows. Levels above
/// [`TransformConfig::max_levels`] are never produced; [`crate::parser::parse`]
/// rejects such records before they get here.
pub fn expand(record: &Record, config: &TransformConfig) -> Vec<ExpandedRow> {
    let limit = i64::try_from(config.max_levels).unwrap_or(i64::MAX);
    let max_level = match record.max_level() {
        Some(level) if level >= 1 => level.min(limit),
        _ => return Vec::new(),
    };

    let coordinates = convert_coordinates(record.coordinates(), config.coordinate_policy);

    (1..=max_level)
        .map(|level| ExpandedRow {
            source_row: record.row(),
            level,
            metadata: record.metadata().to_vec(),
            indicators: indicator_vector(record.counts(), level, config.indicator_width),
            coordinates: coordinates.clone(),
        })
        .collect()
}

/// Indicator bits for one level: `1` where the count reaches `level`.
///
/// Always exactly `width` long.
pub fn indicator_vector(counts: &[i64], level: i64, width: usize) -> Vec<u8> {
    (0..width)
        .map(|c| match counts.get(c) {
            Some(&count) if count >= level => 1,
            _ => 0,
        })
        .collect()
}

/// Convert raw coordinate cells according to `policy`.
pub fn convert_coordinates(raw: &[String], policy: CoordinatePolicy) -> Vec<Cell> {
    match policy {
        CoordinatePolicy::Numeric => raw
            .iter()
            .map(|cell| to_number(cell).map(Cell::Number).unwrap_or(Cell::Null))
            .collect(),
        CoordinatePolicy::Passthrough => raw.iter().cloned().map(Cell::Text).collect(),
    }
}
