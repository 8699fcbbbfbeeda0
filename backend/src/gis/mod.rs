//! ArcGIS feature layer export.
//!
//! Expanded rows are relabelled with a fixed attribute schema and posted to
//! layer 0 of a hosted feature service. The last two cells of each row become
//! a WGS84 point.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::{GisSettings, Settings};
use crate::error::{GisError, GisResult};
use crate::logs::log_info;
use crate::models::Cell;

/// Attribute names, in flattened row order.
pub const ATTRIBUTE_NAMES: [&str; 15] = [
    "date", "region", "city", "value_1", "value_2", "value_3", "value_4", "value_5", "value_6",
    "value_7", "value_8", "value_9", "value_10", "long", "lat",
];

/// Spatial reference for point geometry (WGS84).
pub const WGS84_WKID: u32 = 4326;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Feature {
    pub attributes: Map<String, Value>,
    pub geometry: Geometry,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Geometry {
    pub x: Value,
    pub y: Value,
    #[serde(rename = "spatialReference")]
    pub spatial_reference: SpatialReference,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SpatialReference {
    pub wkid: u32,
}

/// Map flattened rows onto the attribute schema.
///
/// Cells beyond the schema are dropped. Rows with fewer than two cells get a
/// null geometry.
pub fn to_features(rows: &[Vec<Cell>]) -> Vec<Feature> {
    rows.iter().map(|row| to_feature(row)).collect()
}

fn to_feature(row: &[Cell]) -> Feature {
    let attributes = ATTRIBUTE_NAMES
        .iter()
        .zip(row)
        .map(|(name, cell)| (name.to_string(), cell.to_json()))
        .collect();

    let (x, y) = match row {
        [.., long, lat] => (long.to_json(), lat.to_json()),
        _ => (Value::Null, Value::Null),
    };

    Feature {
        attributes,
        geometry: Geometry {
            x,
            y,
            spatial_reference: SpatialReference { wkid: WGS84_WKID },
        },
    }
}

/// Check that every row has exactly one cell per attribute name.
pub fn check_schema(rows: &[Vec<Cell>]) -> GisResult<()> {
    let expected = ATTRIBUTE_NAMES.len();
    match rows.iter().position(|row| row.len() != expected) {
        Some(index) => Err(GisError::SchemaMismatch {
            index,
            width: rows[index].len(),
            expected,
        }),
        None => Ok(()),
    }
}

/// Outcome of an `addFeatures` call.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AddSummary {
    pub added: usize,
    pub failed: usize,
}

/// Portal item metadata (only the service URL is needed).
#[derive(Debug, Deserialize)]
struct PortalItem {
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AddFeaturesResponse {
    #[serde(default, rename = "addResults")]
    add_results: Vec<EditResult>,
}

#[derive(Debug, Deserialize)]
struct EditResult {
    #[serde(default)]
    success: bool,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

/// ArcGIS REST client for one hosted feature layer.
#[derive(Clone)]
pub struct GisClient {
    http: reqwest::Client,
    settings: GisSettings,
}

impl GisClient {
    pub fn new(settings: GisSettings) -> Self {
        Self {
            http: reqwest::Client::new(),
            settings,
        }
    }

    /// Client for the layer configured in `settings`.
    pub fn from_settings(settings: &Settings) -> GisResult<Self> {
        settings
            .gis
            .clone()
            .map(Self::new)
            .ok_or(GisError::MissingConfig("GIS_FEATURE_LAYER_ID / GIS_API_TOKEN"))
    }

    /// Resolve the portal item to the URL of its first layer.
    pub async fn layer_url(&self) -> GisResult<String> {
        let url = format!(
            "{}/sharing/rest/content/items/{}",
            self.settings.portal_url.trim_end_matches('/'),
            self.settings.feature_layer_id
        );
        let body = self
            .send(self.http.get(&url).query(&[
                ("f", "json"),
                ("token", self.settings.api_token.as_str()),
            ]))
            .await?;

        let item: PortalItem =
            serde_json::from_str(&body).map_err(|e| GisError::InvalidResponse(e.to_string()))?;
        let service = item.url.ok_or_else(|| {
            GisError::InvalidResponse(format!(
                "item {} has no service URL",
                self.settings.feature_layer_id
            ))
        })?;

        Ok(format!("{}/0", service.trim_end_matches('/')))
    }

    /// Add features to `layer_url`.
    pub async fn add_features(&self, layer_url: &str, features: &[Feature]) -> GisResult<AddSummary> {
        let payload =
            serde_json::to_string(features).map_err(|e| GisError::InvalidResponse(e.to_string()))?;
        let body = self
            .send(self.http.post(format!("{}/addFeatures", layer_url)).form(&[
                ("f", "json"),
                ("token", self.settings.api_token.as_str()),
                ("features", payload.as_str()),
            ]))
            .await?;

        summarize_add_response(&body)
    }

    /// Export flattened rows (no header) to the configured layer.
    ///
    /// Rows that do not match [`ATTRIBUTE_NAMES`] are rejected before any
    /// request is made.
    pub async fn export(&self, rows: &[Vec<Cell>]) -> GisResult<AddSummary> {
        if rows.is_empty() {
            return Ok(AddSummary::default());
        }
        check_schema(rows)?;
        let layer_url = self.layer_url().await?;
        log_info(format!("Uploading {} features to {}", rows.len(), layer_url));
        self.add_features(&layer_url, &to_features(rows)).await
    }

    /// Send a request; ArcGIS reports most errors in a 200 body.
    async fn send(&self, request: reqwest::RequestBuilder) -> GisResult<String> {
        let response = request
            .send()
            .await
            .map_err(|e| GisError::Http(e.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GisError::Http(e.to_string()))?;

        if let Some(err) = api_error(&body) {
            return Err(err);
        }
        if !status.is_success() {
            return Err(GisError::Http(format!("HTTP {}: {}", status, body)));
        }
        Ok(body)
    }
}

fn api_error(body: &str) -> Option<GisError> {
    serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .map(|e| GisError::Api {
            code: e.error.code,
            message: e.error.message,
        })
}

fn summarize_add_response(body: &str) -> GisResult<AddSummary> {
    let response: AddFeaturesResponse =
        serde_json::from_str(body).map_err(|e| GisError::InvalidResponse(e.to_string()))?;
    let added = response.add_results.iter().filter(|r| r.success).count();
    Ok(AddSummary {
        added,
        failed: response.add_results.len() - added,
    })
}
