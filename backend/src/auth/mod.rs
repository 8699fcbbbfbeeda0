//! OAuth credentials for the Sheets API.
//!
//! The consent flow itself happens elsewhere; this module only consumes its
//! product. Resolution order:
//!
//! 1. `GOOGLE_ACCESS_TOKEN` from the environment, used as-is.
//! 2. The token file (`token.json`), in the layout written by Google's
//!    client libraries. An expired token is renewed with its refresh token
//!    and the file is rewritten.

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

use crate::config::Settings;
use crate::error::{AuthError, AuthResult};
use crate::logs::{log_info, log_success};

/// Default token endpoint when the file does not name one.
pub const GOOGLE_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Scope requested by the consent flow.
pub const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";

/// Tokens this close to expiry are treated as expired.
const EXPIRY_SKEW_SECS: i64 = 225;

/// Bearer credentials ready for use.
#[derive(Clone)]
pub struct Credentials {
    access_token: String,
}

impl Credentials {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
        }
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials").field("access_token", &"***").finish()
    }
}

/// On-disk token file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredToken {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token_uri: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub scopes: Vec<String>,
    /// RFC 3339 timestamp, e.g. `2024-05-01T10:00:00.000000Z`.
    #[serde(default)]
    pub expiry: Option<String>,
    /// Fields we do not interpret, preserved when the file is rewritten.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Token endpoint response.
#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// Token endpoint error response.
#[derive(Debug, Deserialize)]
struct RefreshError {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

impl StoredToken {
    pub fn load(path: &Path) -> AuthResult<Self> {
        if !path.exists() {
            return Err(AuthError::MissingToken(path.display().to_string()));
        }
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, path: &Path) -> AuthResult<()> {
        let content = serde_json::to_string(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn expiry_time(&self) -> Option<DateTime<Utc>> {
        let raw = self.expiry.as_deref()?;
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|t| t.with_timezone(&Utc))
    }

    /// A token without an expiry is assumed valid.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        let has_token = self.token.as_deref().is_some_and(|t| !t.is_empty());
        let fresh = match self.expiry_time() {
            Some(expiry) => now + Duration::seconds(EXPIRY_SKEW_SECS) < expiry,
            None => true,
        };
        has_token && fresh
    }

    pub fn can_refresh(&self) -> bool {
        self.refresh_token.is_some() && self.client_id.is_some() && self.client_secret.is_some()
    }

    /// Store a refreshed access token and its new expiry.
    fn apply_refresh(&mut self, response: RefreshResponse, now: DateTime<Utc>) {
        self.token = Some(response.access_token);
        self.expiry = response
            .expires_in
            .map(|secs| (now + Duration::seconds(secs)).to_rfc3339_opts(SecondsFormat::Micros, true));
    }

    /// Exchange the refresh token for a new access token.
    pub async fn refresh(&mut self, http: &reqwest::Client) -> AuthResult<()> {
        let (Some(refresh_token), Some(client_id), Some(client_secret)) = (
            self.refresh_token.as_deref(),
            self.client_id.as_deref(),
            self.client_secret.as_deref(),
        ) else {
            return Err(AuthError::Expired);
        };
        let token_uri = self.token_uri.as_deref().unwrap_or(GOOGLE_TOKEN_URI);

        let response = http
            .post(token_uri)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
                ("client_id", client_id),
                ("client_secret", client_secret),
            ])
            .send()
            .await
            .map_err(|e| AuthError::RefreshFailed(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AuthError::RefreshFailed(e.to_string()))?;

        if !status.is_success() {
            let message = match serde_json::from_str::<RefreshError>(&body) {
                Ok(err) => match err.error_description {
                    Some(desc) => format!("{}: {}", err.error, desc),
                    None => err.error,
                },
                Err(_) => format!("HTTP {}: {}", status, body),
            };
            return Err(AuthError::RefreshFailed(message));
        }

        let parsed: RefreshResponse = serde_json::from_str(&body)?;
        self.apply_refresh(parsed, Utc::now());
        Ok(())
    }
}

/// Resolve credentials from the environment or the token file.
pub async fn load_credentials(settings: &Settings) -> AuthResult<Credentials> {
    if let Some(token) = &settings.access_token {
        return Ok(Credentials::new(token.clone()));
    }

    let path = settings.token_file.as_path();
    let mut stored = StoredToken::load(path)?;

    if !stored.is_valid_at(Utc::now()) {
        if !stored.can_refresh() {
            return Err(AuthError::Expired);
        }
        log_info("Refreshing access token...");
        stored.refresh(&reqwest::Client::new()).await?;
        stored.save(path)?;
        log_success(format!("Token refreshed, saved to {}", path.display()));
    }

    stored
        .token
        .map(Credentials::new)
        .ok_or(AuthError::Expired)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const TOKEN_JSON: &str = r#"{
        "token": "ya29.abc",
        "refresh_token": "1//refresh",
        "token_uri": "https://oauth2.googleapis.com/token",
        "client_id": "id.apps.googleusercontent.com",
        "client_secret": "shh",
        "scopes": ["https://www.googleapis.com/auth/spreadsheets"],
        "universe_domain": "googleapis.com",
        "expiry": "2024-05-01T10:00:00.000000Z"
    }"#;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, h, m, 0).unwrap()
    }

    #[test]
    fn test_parse_token_file() {
        let token: StoredToken = serde_json::from_str(TOKEN_JSON).unwrap();
        assert_eq!(token.token.as_deref(), Some("ya29.abc"));
        assert_eq!(token.scopes, vec![SHEETS_SCOPE]);
        assert_eq!(token.expiry_time(), Some(at(10, 0)));
        assert!(token.can_refresh());
        assert!(token.extra.contains_key("universe_domain"));
    }

    #[test]
    fn test_expiry_with_skew() {
        let token: StoredToken = serde_json::from_str(TOKEN_JSON).unwrap();
        assert!(token.is_valid_at(at(9, 0)));
        assert!(!token.is_valid_at(at(9, 58)));
        assert!(!token.is_valid_at(at(11, 0)));
    }

    #[test]
    fn test_no_expiry_is_valid() {
        let token: StoredToken = serde_json::from_str(r#"{"token": "t"}"#).unwrap();
        assert!(token.is_valid_at(Utc::now()));
        assert!(!token.can_refresh());

        let empty: StoredToken = serde_json::from_str(r#"{"token": ""}"#).unwrap();
        assert!(!empty.is_valid_at(Utc::now()));
    }

    #[test]
    fn test_apply_refresh() {
        let mut token: StoredToken = serde_json::from_str(TOKEN_JSON).unwrap();
        let response: RefreshResponse =
            serde_json::from_str(r#"{"access_token": "ya29.new", "expires_in": 3600, "token_type": "Bearer"}"#)
                .unwrap();
        token.apply_refresh(response, at(11, 0));

        assert_eq!(token.token.as_deref(), Some("ya29.new"));
        assert_eq!(token.expiry_time(), Some(at(12, 0)));
        assert!(token.is_valid_at(at(11, 30)));
    }

    #[test]
    fn test_save_preserves_unknown_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        fs::write(&path, TOKEN_JSON).unwrap();

        let token = StoredToken::load(&path).unwrap();
        token.save(&path).unwrap();

        let reloaded = StoredToken::load(&path).unwrap();
        assert_eq!(reloaded.extra.get("universe_domain"), Some(&Value::from("googleapis.com")));
        assert_eq!(reloaded.refresh_token.as_deref(), Some("1//refresh"));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = StoredToken::load(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, AuthError::MissingToken(_)));
    }

    #[tokio::test]
    async fn test_env_token_short_circuits() {
        let settings = Settings {
            access_token: Some("env-token".into()),
            token_file: "/nonexistent/token.json".into(),
            ..Settings::default()
        };
        let creds = load_credentials(&settings).await.unwrap();
        assert_eq!(creds.access_token(), "env-token");
    }
}
