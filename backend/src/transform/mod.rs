//! Transformation module.
//!
//! - Expander: one parsed record to its threshold rows
//! - Pipeline: batch processing with per-row error isolation, plus the
//!   spreadsheet and local-file runs built on it

pub mod expander;
pub mod pipeline;

pub use expander::{convert_coordinates, expand, indicator_vector};
pub use pipeline::*;
