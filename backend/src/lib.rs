//! # Levelgrid - spreadsheet threshold expansion
//!
//! Levelgrid reads rows of per-location counts from a Google Sheet, expands
//! every row into one binary indicator row per count level, and writes the
//! result to a new spreadsheet and, optionally, an ArcGIS feature layer.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ Sheet / CSV │────▶│ Row Parser  │────▶│  Expander   │────▶│ Sheet / GIS │
//! │  (raw rows) │     │  (Record)   │     │ (levels 1..)│     │   / CSV     │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```
//! use levelgrid::{process_rows, TransformConfig};
//!
//! let rows: Vec<Vec<String>> = vec![
//!     vec!["date", "region", "city", "v1", "v2", "long", "lat"],
//!     vec!["2024-01-01", "east", "metro", "2", "1", "40,1", "-73,9"],
//! ]
//! .into_iter()
//! .map(|r| r.into_iter().map(String::from).collect())
//! .collect();
//!
//! let config = TransformConfig::default().with_indicator_width(2);
//! let batch = process_rows(&rows, &config);
//! assert_eq!(batch.rows.len(), 2);
//! assert_eq!(batch.rows[1].indicators, vec![1, 0]);
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`config`] - Transform configuration and environment settings
//! - [`models`] - Raw rows, records, expanded rows, cells
//! - [`parser`] - Row parser
//! - [`transform`] - Threshold expander and batch pipeline
//! - [`source`] - Local CSV input/output
//! - [`auth`] - OAuth token loading and refresh
//! - [`sheets`] - Google Sheets client
//! - [`gis`] - ArcGIS feature export
//! - [`logs`] - Diagnostics

// Core modules
pub mod config;
pub mod error;
pub mod models;

// Parsing
pub mod parser;

// Transformation
pub mod transform;

// Collaborators
pub mod auth;
pub mod gis;
pub mod sheets;
pub mod source;

// Diagnostics
pub mod logs;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    AuthError, GisError, ParseError, PipelineError, SheetsError, SourceError,
};

// =============================================================================
// Re-exports - Configuration
// =============================================================================

pub use config::{CoordinatePolicy, GisSettings, Settings, TransformConfig};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{Cell, ExpandedRow, RawRow, Record};

// =============================================================================
// Re-exports - Parsing
// =============================================================================

pub use parser::{parse, parse_all, parse_count, to_number};

// =============================================================================
// Re-exports - Transform
// =============================================================================

pub use transform::{
    convert_coordinates, expand, expand_csv_file, indicator_vector, process_rows,
    run_spreadsheet, BatchResult, CsvInfo, RunOptions, RunReport, SkippedRow,
};

// =============================================================================
// Re-exports - Collaborators
// =============================================================================

pub use auth::{load_credentials, Credentials, StoredToken};
pub use gis::{check_schema, to_features, AddSummary, Feature, GisClient};
pub use sheets::SheetsClient;
pub use source::{read_csv_rows, write_csv_rows, SourceRows};
