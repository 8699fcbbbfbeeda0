//! Google Sheets v4 REST client.
//!
//! Covers the three calls the pipeline needs: read a value range, create a
//! spreadsheet, and overwrite a value range.
//!
//! ```rust,ignore
//! use levelgrid::sheets::SheetsClient;
//!
//! let client = SheetsClient::new(credentials.access_token());
//! let rows = client.get_values("1AbC...", "A:O").await?;
//! ```

use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{SheetsError, SheetsResult};
use crate::models::{Cell, RawRow};

/// Public API endpoint.
pub const SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// Sheets API client bound to one bearer token.
#[derive(Clone)]
pub struct SheetsClient {
    http: reqwest::Client,
    access_token: String,
    base_url: String,
}

/// `spreadsheets.values.get` response.
#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

/// `spreadsheets.create` response (restricted to the id field).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatedSpreadsheet {
    spreadsheet_id: String,
}

/// `spreadsheets.values.update` request body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ValueRangeBody<'a> {
    range: &'a str,
    major_dimension: &'static str,
    values: Vec<Vec<Value>>,
}

/// `spreadsheets.values.update` response.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSummary {
    #[serde(default)]
    pub updated_range: Option<String>,
    #[serde(default)]
    pub updated_rows: usize,
    #[serde(default)]
    pub updated_columns: usize,
    #[serde(default)]
    pub updated_cells: usize,
}

/// Google API error envelope.
#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

impl SheetsClient {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            access_token: access_token.into(),
            base_url: SHEETS_API_BASE.to_string(),
        }
    }

    /// Point the client at another endpoint (proxies, emulators).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Read `range` from a spreadsheet. Rows come back as strings, header first.
    pub async fn get_values(&self, spreadsheet_id: &str, range: &str) -> SheetsResult<Vec<RawRow>> {
        let url = self.endpoint(&[spreadsheet_id, "values", range])?;
        let response = self
            .http
            .get(url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| SheetsError::Http(e.to_string()))?;

        let body = read_body(response).await?;
        decode_value_range(&body)
    }

    /// Create an empty spreadsheet and return its id.
    pub async fn create_spreadsheet(&self, title: &str) -> SheetsResult<String> {
        let url = self.endpoint(&[])?;
        let response = self
            .http
            .post(url)
            .query(&[("fields", "spreadsheetId")])
            .bearer_auth(&self.access_token)
            .json(&serde_json::json!({ "properties": { "title": title } }))
            .send()
            .await
            .map_err(|e| SheetsError::Http(e.to_string()))?;

        let body = read_body(response).await?;
        let created: CreatedSpreadsheet = serde_json::from_str(&body)
            .map_err(|e| SheetsError::InvalidResponse(e.to_string()))?;
        Ok(created.spreadsheet_id)
    }

    /// Overwrite `range` with `rows`, stored as entered (`RAW`).
    pub async fn update_values(
        &self,
        spreadsheet_id: &str,
        range: &str,
        rows: &[Vec<Cell>],
    ) -> SheetsResult<UpdateSummary> {
        let url = self.endpoint(&[spreadsheet_id, "values", range])?;
        let response = self
            .http
            .put(url)
            .query(&[("valueInputOption", "RAW")])
            .bearer_auth(&self.access_token)
            .json(&value_range_body(range, rows))
            .send()
            .await
            .map_err(|e| SheetsError::Http(e.to_string()))?;

        let body = read_body(response).await?;
        serde_json::from_str(&body).map_err(|e| SheetsError::InvalidResponse(e.to_string()))
    }

    /// Base URL with each segment percent-encoded and appended.
    fn endpoint(&self, segments: &[&str]) -> SheetsResult<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| SheetsError::Http(format!("invalid base URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| SheetsError::Http("base URL cannot have a path".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

/// Return the body of a successful response, or the API error it carries.
async fn read_body(response: reqwest::Response) -> SheetsResult<String> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| SheetsError::Http(e.to_string()))?;

    if !status.is_success() {
        let message = serde_json::from_str::<ApiErrorEnvelope>(&body)
            .map(|e| e.error.message)
            .unwrap_or(body);
        return Err(SheetsError::Api {
            status: status.as_u16(),
            message,
        });
    }

    Ok(body)
}

fn decode_value_range(body: &str) -> SheetsResult<Vec<RawRow>> {
    let range: ValueRange =
        serde_json::from_str(body).map_err(|e| SheetsError::InvalidResponse(e.to_string()))?;

    Ok(range
        .values
        .into_iter()
        .map(|row| row.into_iter().map(value_to_string).collect())
        .collect())
}

fn value_to_string(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn value_range_body<'a>(range: &'a str, rows: &[Vec<Cell>]) -> ValueRangeBody<'a> {
    ValueRangeBody {
        range,
        major_dimension: "ROWS",
        values: rows
            .iter()
            .map(|row| row.iter().map(Cell::to_sheet_value).collect())
            .collect(),
    }
}

/// Spreadsheet column letters for a 1-based index (1 = A, 27 = AA).
pub fn column_letter(mut index: usize) -> String {
    let mut letters = Vec::new();
    while index > 0 {
        let rem = (index - 1) % 26;
        letters.push(b'A' + rem as u8);
        index = (index - 1) / 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// A1 range exactly covering `rows` starting at A1, e.g. `A1:O42`.
pub fn a1_range(rows: &[Vec<Cell>]) -> String {
    let width = rows.iter().map(Vec::len).max().unwrap_or(0).max(1);
    format!("A1:{}{}", column_letter(width), rows.len().max(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_value_range() {
        let body = r#"{
            "range": "Sheet1!A1:O3",
            "majorDimension": "ROWS",
            "values": [
                ["date", "region", "city"],
                ["2024-01-01", "east", "metro", "3"],
                []
            ]
        }"#;
        let rows = decode_value_range(body).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1], vec!["2024-01-01", "east", "metro", "3"]);
        assert!(rows[2].is_empty());
    }

    #[test]
    fn test_decode_empty_sheet() {
        let rows = decode_value_range(r#"{"range": "Sheet1!A1:O1000", "majorDimension": "ROWS"}"#)
            .unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_non_string_values_stringified() {
        let rows = decode_value_range(r#"{"values": [[1, 2.5, true, null]]}"#).unwrap();
        assert_eq!(rows[0], vec!["1", "2.5", "true", ""]);
    }

    #[test]
    fn test_update_body() {
        let rows = vec![vec![Cell::from("east"), Cell::Int(1), Cell::Number(40.1), Cell::Null]];
        let body = serde_json::to_value(value_range_body("A1:D1", &rows)).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "range": "A1:D1",
                "majorDimension": "ROWS",
                "values": [["east", 1, 40.1, ""]]
            })
        );
    }

    #[test]
    fn test_column_letter() {
        assert_eq!(column_letter(1), "A");
        assert_eq!(column_letter(15), "O");
        assert_eq!(column_letter(26), "Z");
        assert_eq!(column_letter(27), "AA");
        assert_eq!(column_letter(52), "AZ");
        assert_eq!(column_letter(703), "AAA");
    }

    #[test]
    fn test_a1_range() {
        let rows = vec![vec![Cell::Null; 15]; 4];
        assert_eq!(a1_range(&rows), "A1:O4");
        assert_eq!(a1_range(&[]), "A1:A1");
    }

    #[test]
    fn test_endpoint_encodes_range() {
        let client = SheetsClient::new("t");
        let url = client.endpoint(&["abc", "values", "My Sheet!A:O"]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://sheets.googleapis.com/v4/spreadsheets/abc/values/My%20Sheet!A:O"
        );
    }

    #[test]
    fn test_endpoint_root() {
        let client = SheetsClient::new("t").with_base_url("http://localhost:8080/v4/spreadsheets/");
        let url = client.endpoint(&[]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/v4/spreadsheets");
    }
}
