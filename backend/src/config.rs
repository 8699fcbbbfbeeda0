//! Configuration.
//!
//! [`TransformConfig`] shapes the row expansion and is passed explicitly into
//! the parser and expander. [`Settings`] describes the process environment
//! (remote endpoints, tokens) and is loaded from `.env` / environment variables.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Number of indicator columns per expanded row.
pub const DEFAULT_INDICATOR_WIDTH: usize = 10;

/// Leading pass-through cells (date, region, city).
pub const DEFAULT_METADATA_WIDTH: usize = 3;

/// Trailing coordinate cells (long, lat).
pub const DEFAULT_COORDINATE_WIDTH: usize = 2;

/// Upper bound on the levels one row may expand into.
pub const DEFAULT_MAX_LEVELS: usize = 1000;

/// Range read from the source sheet (3 metadata + 10 counts + 2 coordinates).
pub const DEFAULT_SHEET_RANGE: &str = "A:O";

/// Token file written by an external OAuth consent flow.
pub const DEFAULT_TOKEN_FILE: &str = "token.json";

/// ArcGIS Online portal.
pub const DEFAULT_GIS_PORTAL_URL: &str = "https://www.arcgis.com";

/// Diagnostics file.
pub const DEFAULT_LOG_FILE: &str = "app.log";

/// How coordinate cells are carried into expanded rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CoordinatePolicy {
    /// Parse as floating point (`,` accepted as decimal separator); failures become null.
    #[default]
    Numeric,
    /// Keep the raw cell strings.
    Passthrough,
}

/// Shape of the row expansion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformConfig {
    /// Width of every indicator vector, independent of the count column count.
    pub indicator_width: usize,
    /// Leading cells copied as metadata.
    pub metadata_width: usize,
    /// Trailing cells copied as coordinates.
    pub coordinate_width: usize,
    pub coordinate_policy: CoordinatePolicy,
    /// Rows whose highest count exceeds this are rejected.
    pub max_levels: usize,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            indicator_width: DEFAULT_INDICATOR_WIDTH,
            metadata_width: DEFAULT_METADATA_WIDTH,
            coordinate_width: DEFAULT_COORDINATE_WIDTH,
            coordinate_policy: CoordinatePolicy::default(),
            max_levels: DEFAULT_MAX_LEVELS,
        }
    }
}

impl TransformConfig {
    /// Set the indicator width.
    pub fn with_indicator_width(mut self, width: usize) -> Self {
        self.indicator_width = width;
        self
    }

    /// Set the coordinate policy.
    pub fn with_coordinate_policy(mut self, policy: CoordinatePolicy) -> Self {
        self.coordinate_policy = policy;
        self
    }

    pub fn with_max_levels(mut self, max_levels: usize) -> Self {
        self.max_levels = max_levels;
        self
    }

    /// Smallest row that still has a metadata prefix and coordinate suffix.
    pub fn min_row_width(&self) -> usize {
        self.metadata_width + self.coordinate_width
    }

    /// Cells in one flattened expanded row.
    pub fn output_width(&self) -> usize {
        self.metadata_width + self.indicator_width + self.coordinate_width
    }
}

/// ArcGIS export settings.
#[derive(Debug, Clone)]
pub struct GisSettings {
    pub portal_url: String,
    /// Portal item id of the hosted feature layer.
    pub feature_layer_id: String,
    pub api_token: String,
}

/// Process settings loaded from the environment.
#[derive(Debug, Clone)]
pub struct Settings {
    pub sheet_range: String,
    pub token_file: PathBuf,
    /// Bearer token that bypasses the token file when set.
    pub access_token: Option<String>,
    /// `None` unless both `GIS_FEATURE_LAYER_ID` and `GIS_API_TOKEN` are set.
    pub gis: Option<GisSettings>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sheet_range: DEFAULT_SHEET_RANGE.to_string(),
            token_file: PathBuf::from(DEFAULT_TOKEN_FILE),
            access_token: None,
            gis: None,
        }
    }
}

impl Settings {
    /// Load settings from `.env` (if present) and the process environment.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let gis = match (get("GIS_FEATURE_LAYER_ID"), get("GIS_API_TOKEN")) {
            (Some(feature_layer_id), Some(api_token)) => Some(GisSettings {
                portal_url: get("GIS_PORTAL_URL")
                    .unwrap_or_else(|| DEFAULT_GIS_PORTAL_URL.to_string()),
                feature_layer_id,
                api_token,
            }),
            _ => None,
        };

        Self {
            sheet_range: get("SHEET_RANGE").unwrap_or_else(|| DEFAULT_SHEET_RANGE.to_string()),
            token_file: get("GOOGLE_TOKEN_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_TOKEN_FILE)),
            access_token: get("GOOGLE_ACCESS_TOKEN"),
            gis,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_transform_defaults() {
        let config = TransformConfig::default();
        assert_eq!(config.indicator_width, 10);
        assert_eq!(config.min_row_width(), 5);
        assert_eq!(config.output_width(), 15);
        assert_eq!(config.coordinate_policy, CoordinatePolicy::Numeric);
        assert_eq!(config.max_levels, 1000);
    }

    #[test]
    fn test_settings_defaults() {
        let settings = Settings::from_lookup(lookup(&[]));
        assert_eq!(settings.sheet_range, "A:O");
        assert_eq!(settings.token_file, PathBuf::from("token.json"));
        assert!(settings.access_token.is_none());
        assert!(settings.gis.is_none());
    }

    #[test]
    fn test_gis_requires_both_values() {
        let settings = Settings::from_lookup(lookup(&[("GIS_FEATURE_LAYER_ID", "abc123")]));
        assert!(settings.gis.is_none());

        let settings = Settings::from_lookup(lookup(&[
            ("GIS_FEATURE_LAYER_ID", "abc123"),
            ("GIS_API_TOKEN", "secret"),
        ]));
        let gis = settings.gis.unwrap();
        assert_eq!(gis.feature_layer_id, "abc123");
        assert_eq!(gis.portal_url, "https://www.arcgis.com");
    }

    #[test]
    fn test_blank_values_ignored() {
        let settings = Settings::from_lookup(lookup(&[
            ("GOOGLE_ACCESS_TOKEN", "  "),
            ("SHEET_RANGE", "Data!A:O"),
        ]));
        assert!(settings.access_token.is_none());
        assert_eq!(settings.sheet_range, "Data!A:O");
    }
}
