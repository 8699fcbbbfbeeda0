//! Batch pipeline.
//!
//! [`process_rows`] is the pure core: parse and expand every data row, isolate
//! per-row failures, keep source order. [`run_spreadsheet`] and
//! [`expand_csv_file`] wrap it with the remote and local collaborators.
//!
//! # Example
//!
//! ```rust,ignore
//! use levelgrid::{process_rows, TransformConfig};
//!
//! let batch = process_rows(&rows, &TransformConfig::default());
//! println!("{}", batch.summary());
//! let cells = batch.to_cells(true);
//! ```

use chrono::Local;
use serde::Serialize;
use std::path::Path;

use super::expander::expand;
use crate::config::TransformConfig;
use crate::error::{row_diagnostic, ParseError, PipelineError, PipelineResult};
use crate::gis::{AddSummary, GisClient};
use crate::logs::{
    log, log_error, log_info, log_info_indent, log_success, log_warning, LogEntry,
};
use crate::models::{Cell, ExpandedRow, RawRow};
use crate::parser::parse_all;
use crate::sheets::{a1_range, SheetsClient};
use crate::source::read_csv_rows;

/// A data row that produced no output because it could not be parsed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedRow {
    /// 1-based sheet row (header = 1).
    pub row: usize,
    pub reason: String,
}

impl SkippedRow {
    /// Diagnostic line in the `ROW_NUM:<n>: Error: <detail>` shape.
    pub fn diagnostic(&self) -> String {
        row_diagnostic(self.row, &self.reason)
    }
}

impl From<&ParseError> for SkippedRow {
    fn from(err: &ParseError) -> Self {
        Self {
            row: err.row(),
            reason: err.to_string(),
        }
    }
}

/// Output of one batch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchResult {
    /// Header row of the input, if any.
    pub header: Option<RawRow>,
    /// Expanded rows in source order, levels ascending within each source row.
    pub rows: Vec<ExpandedRow>,
    pub skipped: Vec<SkippedRow>,
    /// Data rows seen (header excluded).
    pub source_rows: usize,
    /// Rows parsed fine but whose highest count was below 1.
    pub dropped_empty: usize,
}

impl BatchResult {
    /// Flatten to cell rows, optionally with the original header first.
    pub fn to_cells(&self, include_header: bool) -> Vec<Vec<Cell>> {
        let header = self
            .header
            .iter()
            .filter(|_| include_header)
            .map(|h| h.iter().cloned().map(Cell::Text).collect::<Vec<_>>());

        header
            .chain(self.rows.iter().map(ExpandedRow::to_cells))
            .collect()
    }

    /// Sheet row numbers of skipped rows.
    pub fn skipped_rows(&self) -> Vec<usize> {
        self.skipped.iter().map(|s| s.row).collect()
    }

    pub fn summary(&self) -> String {
        format!(
            "Expanded {} rows into {} rows, {} skipped, {} empty",
            self.source_rows,
            self.rows.len(),
            self.skipped.len(),
            self.dropped_empty
        )
    }
}

/// Parse and expand every data row. Row 0 is the header.
///
/// A row that fails to parse is written to the log file as
/// `ROW_NUM:<n>: Error: <detail>` and left out; the rest of the batch is
/// unaffected.
pub fn process_rows(rows: &[RawRow], config: &TransformConfig) -> BatchResult {
    let mut result = BatchResult {
        header: rows.first().cloned(),
        ..BatchResult::default()
    };

    if let Some(header) = &result.header {
        check_header_width(header, config);
    }

    for parsed in parse_all(rows, config) {
        result.source_rows += 1;

        match parsed {
            Ok(record) => {
                let expanded = expand(&record, config);
                if expanded.is_empty() {
                    result.dropped_empty += 1;
                }
                result.rows.extend(expanded);
            }
            Err(err) => {
                let skipped = SkippedRow::from(&err);
                log(LogEntry::error(skipped.diagnostic()).silent());
                result.skipped.push(skipped);
            }
        }
    }

    result
}

/// Warn when the header's count columns disagree with the indicator width.
/// Output is still padded or truncated to the configured width.
fn check_header_width(header: &[String], config: &TransformConfig) {
    let declared = header.len().saturating_sub(config.min_row_width());
    if declared != config.indicator_width {
        log_warning(format!(
            "Header declares {} count columns but indicator width is {}; indicators will be {}",
            declared,
            config.indicator_width,
            if declared > config.indicator_width { "truncated" } else { "padded" }
        ));
    }
}

// =============================================================================
// Spreadsheet run
// =============================================================================

/// Options for [`run_spreadsheet`].
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub spreadsheet_id: String,
    /// Source range, e.g. `A:O`.
    pub range: String,
    /// Title of the created spreadsheet; defaults to `New Dataset <timestamp>`.
    pub title: Option<String>,
    /// Stop after the transform and return the cells without writing.
    pub dry_run: bool,
}

/// What a run produced.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub batch: BatchResult,
    /// Id of the created spreadsheet, if creation succeeded.
    pub target_spreadsheet_id: Option<String>,
    /// Whether the values were written to the target.
    pub written: bool,
    pub gis: Option<AddSummary>,
}

/// Default title for the output spreadsheet.
pub fn default_title() -> String {
    format!("New Dataset {}", Local::now().format("%Y-%m-%d %H:%M:%S%.6f"))
}

/// Read a spreadsheet, expand it, write the result to a new spreadsheet and
/// optionally export it to ArcGIS.
///
/// Creation and write failures are logged and do not stop the GIS export.
pub async fn run_spreadsheet(
    sheets: &SheetsClient,
    gis: Option<&GisClient>,
    options: &RunOptions,
    config: &TransformConfig,
) -> PipelineResult<RunReport> {
    log_info(format!("📖 Reading spreadsheet {} ({})", options.spreadsheet_id, options.range));
    let rows = sheets.get_values(&options.spreadsheet_id, &options.range).await?;
    if rows.is_empty() {
        return Err(PipelineError::EmptyInput);
    }
    log_success(format!("Read {} rows", rows.len()));

    let batch = process_rows(&rows, config);
    log_success(batch.summary());
    if !batch.skipped.is_empty() {
        log_warning(format!("Skipped rows: {:?}", batch.skipped_rows()));
    }

    let mut report = RunReport {
        batch,
        target_spreadsheet_id: None,
        written: false,
        gis: None,
    };
    if options.dry_run {
        return Ok(report);
    }

    let title = options.title.clone().unwrap_or_else(default_title);
    match sheets.create_spreadsheet(&title).await {
        Ok(id) => {
            log_success(format!("Created spreadsheet '{}' ({})", title, id));
            let cells = report.batch.to_cells(true);
            let range = a1_range(&cells);
            match sheets.update_values(&id, &range, &cells).await {
                Ok(summary) => {
                    log_info_indent(format!("Wrote {} cells to {}", summary.updated_cells, range), 1);
                    report.written = true;
                }
                Err(e) => log_error(format!("Failed to update data: {}", e)),
            }
            report.target_spreadsheet_id = Some(id);
        }
        Err(e) => log_error(format!("Failed to create spreadsheet: {}", e)),
    }

    if let Some(gis) = gis {
        let summary = gis.export(&report.batch.to_cells(false)).await?;
        if summary.failed > 0 {
            log_warning(format!(
                "ArcGIS accepted {} features, rejected {}",
                summary.added, summary.failed
            ));
        } else {
            log_success(format!("Exported {} features to ArcGIS", summary.added));
        }
        report.gis = Some(summary);
    }

    Ok(report)
}

// =============================================================================
// Local file run
// =============================================================================

/// Local CSV file information
#[derive(Debug, Clone, Serialize)]
pub struct CsvInfo {
    pub encoding: String,
    pub delimiter: char,
    pub row_count: usize,
}

/// Expand a local CSV export of the sheet.
pub fn expand_csv_file(
    path: &Path,
    config: &TransformConfig,
) -> PipelineResult<(BatchResult, CsvInfo)> {
    log_info(format!("📖 Reading {}", path.display()));
    let source = read_csv_rows(path)?;

    let info = CsvInfo {
        encoding: source.encoding,
        delimiter: source.delimiter,
        row_count: source.rows.len(),
    };
    log_success(format!(
        "Detected encoding {} and delimiter '{}'",
        info.encoding,
        format_delimiter(info.delimiter)
    ));

    let batch = process_rows(&source.rows, config);
    log_success(batch.summary());
    Ok((batch, info))
}

pub fn format_delimiter(d: char) -> String {
    match d {
        '\t' => "\\t".to_string(),
        c => c.to_string(),
    }
}
