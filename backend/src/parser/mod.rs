//! Row parser.
//!
//! Decodes one [`RawRow`] into a typed [`Record`]: a metadata prefix, an
//! integer count body and a coordinate suffix. This is the only place where
//! string cells are interpreted; failures come back as [`ParseError`] values
//! and never abort the surrounding batch.

use crate::config::TransformConfig;
use crate::error::ParseError;
use crate::models::{RawRow, Record};

/// Parse a raw row.
///
/// # Arguments
/// * `raw` - cells as read from the sheet
/// * `row` - 1-based sheet row number, used in diagnostics
/// * `config` - metadata and coordinate widths, level limit
///
/// # Example
/// ```
/// use levelgrid::{parse, TransformConfig};
///
/// let raw: Vec<String> = ["2024-01-01", "east", "metro", "2", "0", "40.1", "-73.9"]
///     .iter()
///     .map(|s| s.to_string())
///     .collect();
/// let record = parse(&raw, 2, &TransformConfig::default()).unwrap();
/// assert_eq!(record.counts(), &[2, 0]);
/// ```
pub fn parse(raw: &[String], row: usize, config: &TransformConfig) -> Result<Record, ParseError> {
    let min = config.min_row_width();
    if raw.len() < min {
        return Err(ParseError::TooShort {
            row,
            len: raw.len(),
            min,
        });
    }

    let body_end = raw.len() - config.coordinate_width;
    let body = &raw[config.metadata_width..body_end];
    if body.is_empty() {
        return Err(ParseError::NoCounts { row });
    }

    let counts = body
        .iter()
        .enumerate()
        .map(|(offset, cell)| {
            parse_count(cell).ok_or_else(|| ParseError::InvalidCount {
                row,
                column: config.metadata_width + offset + 1,
                value: cell.clone(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    if let Some(&level) = counts.iter().max() {
        if usize::try_from(level).map_or(false, |l| l > config.max_levels) {
            return Err(ParseError::TooManyLevels {
                row,
                level,
                max: config.max_levels,
            });
        }
    }

    Ok(Record::new(
        row,
        raw[..config.metadata_width].to_vec(),
        counts,
        raw[body_end..].to_vec(),
    ))
}

/// Parse every data row of a sheet, pairing each result with its sheet row.
///
/// Row 0 is treated as the header and skipped.
pub fn parse_all<'a>(
    rows: &'a [RawRow],
    config: &'a TransformConfig,
) -> impl Iterator<Item = Result<Record, ParseError>> + 'a {
    rows.iter()
        .enumerate()
        .skip(1)
        .map(move |(index, raw)| parse(raw, index + 1, config))
}

/// Parse a count cell as an integer. Surrounding whitespace and a leading
/// sign are accepted.
pub fn parse_count(cell: &str) -> Option<i64> {
    cell.trim().parse::<i64>().ok()
}

/// Convert a coordinate cell to a number, accepting `,` as decimal separator.
///
/// ```
/// use levelgrid::to_number;
///
/// assert_eq!(to_number("3,14"), Some(3.14));
/// assert_eq!(to_number("abc"), None);
/// ```
pub fn to_number(cell: &str) -> Option<f64> {
    cell.trim().replace(',', ".").parse::<f64>().ok()
}
