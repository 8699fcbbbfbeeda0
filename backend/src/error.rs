//! Error types for the levelgrid pipeline.
//!
//! - [`ParseError`] - a single row could not be decoded (recovered per row)
//! - [`SourceError`] - local CSV input/output errors
//! - [`AuthError`] - OAuth token loading and refresh errors
//! - [`SheetsError`] - Google Sheets API errors
//! - [`GisError`] - ArcGIS feature layer errors
//! - [`PipelineError`] - top-level orchestration errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use thiserror::Error;

// =============================================================================
// Row Parsing Errors
// =============================================================================

/// Errors while decoding one raw row into a [`crate::models::Record`].
///
/// Every variant carries the 1-based sheet row number (header = row 1).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    /// Row does not have room for the metadata prefix and coordinate suffix.
    #[error("row has {len} cells, expected at least {min}")]
    TooShort { row: usize, len: usize, min: usize },

    /// Nothing between the metadata prefix and the coordinate suffix.
    #[error("row has no count columns")]
    NoCounts { row: usize },

    /// A count cell is not an integer.
    #[error("invalid count '{value}' in column {column}")]
    InvalidCount {
        row: usize,
        column: usize,
        value: String,
    },

    /// Highest count is above the configured level limit.
    #[error("count {level} exceeds the limit of {max} levels")]
    TooManyLevels { row: usize, level: i64, max: usize },
}

impl ParseError {
    /// Sheet row number the error refers to.
    pub fn row(&self) -> usize {
        match self {
            ParseError::TooShort { row, .. }
            | ParseError::NoCounts { row }
            | ParseError::InvalidCount { row, .. }
            | ParseError::TooManyLevels { row, .. } => *row,
        }
    }
}

/// Format a per-row diagnostic line: `ROW_NUM:<n>: Error: <detail>`.
pub fn row_diagnostic(row: usize, detail: impl std::fmt::Display) -> String {
    format!("ROW_NUM:{}: Error: {}", row, detail)
}

// =============================================================================
// Local CSV Errors
// =============================================================================

/// Errors reading or writing local CSV files.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Failed to read or write a file.
    #[error("Failed to access file: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed CSV.
    #[error("Invalid CSV format: {0}")]
    Csv(#[from] csv::Error),

    /// File contains no rows at all.
    #[error("CSV file is empty")]
    EmptyFile,
}

// =============================================================================
// Credential Errors
// =============================================================================

/// Errors loading or refreshing OAuth credentials.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No access token in the environment and no token file on disk.
    #[error("Credentials not found: {0} does not exist and GOOGLE_ACCESS_TOKEN is not set")]
    MissingToken(String),

    /// Token is expired and cannot be refreshed.
    #[error("Access token expired and no refresh token is available")]
    Expired,

    /// Token endpoint rejected the refresh.
    #[error("Token refresh failed: {0}")]
    RefreshFailed(String),

    /// Token file IO error.
    #[error("Token file IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Token file is not valid JSON.
    #[error("Token file JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// =============================================================================
// Google Sheets Errors
// =============================================================================

/// Errors returned by the Sheets client.
#[derive(Debug, Error)]
pub enum SheetsError {
    /// Transport-level failure.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Non-success response from the API.
    #[error("Sheets API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Response body could not be decoded.
    #[error("Invalid Sheets response: {0}")]
    InvalidResponse(String),
}

// =============================================================================
// ArcGIS Errors
// =============================================================================

/// Errors returned by the ArcGIS client.
#[derive(Debug, Error)]
pub enum GisError {
    /// A required setting is absent.
    #[error("Missing {0} environment variable")]
    MissingConfig(&'static str),

    /// Transport-level failure.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// ArcGIS returned an error payload.
    #[error("ArcGIS error ({code}): {message}")]
    Api { code: i64, message: String },

    /// Response body could not be decoded.
    #[error("Invalid ArcGIS response: {0}")]
    InvalidResponse(String),

    /// A row does not line up with the layer's attribute schema.
    #[error("Row {index} has {width} cells, layer schema expects {expected}")]
    SchemaMismatch {
        index: usize,
        width: usize,
        expected: usize,
    },
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level pipeline orchestration errors.
///
/// Row-level [`ParseError`]s never surface here; they are collected on the
/// batch result instead.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Local CSV error.
    #[error("CSV error: {0}")]
    Source(#[from] SourceError),

    /// Credential error.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Sheets API error.
    #[error("Sheets error: {0}")]
    Sheets(#[from] SheetsError),

    /// ArcGIS error.
    #[error("GIS error: {0}")]
    Gis(#[from] GisError),

    /// No rows were returned by the source.
    #[error("No data found in spreadsheet")]
    EmptyInput,
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for local CSV operations.
pub type SourceResult<T> = Result<T, SourceError>;

/// Result type for credential operations.
pub type AuthResult<T> = Result<T, AuthError>;

/// Result type for Sheets operations.
pub type SheetsResult<T> = Result<T, SheetsError>;

/// Result type for ArcGIS operations.
pub type GisResult<T> = Result<T, GisError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;
