//! Google Secret Manager client using the REST API (NOT the gRPC SDK).
//!
//! # Security
//!
//! - **Bearer token only**: credentials come from the environment or the
//!   `gcloud` CLI, which handles the actual authentication
//! - **NO token logging**: the access token is redacted from `Debug` output
//! - **RAM-only operations**: payloads are decoded in memory and never cached
//!
//! # Endpoints Used
//!
//! - `GET /v1/projects/{project}/secrets/{secret}/versions/{version}:access`

use crate::cloud::SecretVersionSource;
use crate::error::FetchError;
use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::blocking::Client;
use reqwest::header::AUTHORIZATION;
use reqwest::StatusCode;
use serde::Deserialize;
use std::env;
use std::fmt;
use std::process::Command;
use std::time::Duration;
use tracing::debug;

pub const SECRET_MANAGER_ENDPOINT: &str = "https://secretmanager.googleapis.com/v1";
const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Connection settings for [`SecretManagerClient`].
#[derive(Clone)]
pub struct ClientConfig {
    /// Base URL of the Secret Manager API, without trailing slash
    pub endpoint: String,
    /// Request timeout applied by the HTTP client
    pub timeout: Duration,
    access_token: String,
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("endpoint", &self.endpoint)
            .field("timeout", &self.timeout)
            .field("access_token", &"<redacted>")
            .finish()
    }
}

impl ClientConfig {
    pub fn new(endpoint: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            access_token: access_token.into(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build the configuration from environment variables.
    ///
    /// # Sources
    ///
    /// - `GSM_LOOKUP_ENDPOINT` (default: public Secret Manager endpoint)
    /// - `GSM_LOOKUP_ACCESS_TOKEN`, then `GOOGLE_OAUTH_ACCESS_TOKEN`, then
    ///   `gcloud auth print-access-token`
    /// - `GSM_LOOKUP_HTTP_TIMEOUT_SECS` (default: 15)
    pub fn from_env() -> Result<Self> {
        let endpoint = env::var("GSM_LOOKUP_ENDPOINT")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| SECRET_MANAGER_ENDPOINT.to_string());

        let access_token = match access_token_from_env() {
            Some(token) => token,
            None => access_token_from_gcloud()?,
        };

        let timeout = parse_timeout(env::var("GSM_LOOKUP_HTTP_TIMEOUT_SECS").ok().as_deref());

        Ok(Self::new(endpoint, access_token).with_timeout(timeout))
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.access_token)
    }
}

/// Read a bearer token from the environment, if one is set.
pub fn access_token_from_env() -> Option<String> {
    env::var("GSM_LOOKUP_ACCESS_TOKEN")
        .or_else(|_| env::var("GOOGLE_OAUTH_ACCESS_TOKEN"))
        .ok()
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

/// Ask the gcloud CLI for an access token and capture it in memory.
fn access_token_from_gcloud() -> Result<String> {
    let output = Command::new("gcloud")
        .arg("auth")
        .arg("print-access-token")
        .output()
        .context(
            "No access token found. Set GSM_LOOKUP_ACCESS_TOKEN or install and authenticate the gcloud CLI",
        )?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!(
            "gcloud auth print-access-token failed: {}",
            if stderr.is_empty() {
                "Unknown error"
            } else {
                stderr.trim()
            }
        );
    }

    let token = String::from_utf8(output.stdout)
        .context("gcloud returned a token that is not valid UTF-8")?
        .trim()
        .to_string();

    if token.is_empty() {
        anyhow::bail!("gcloud auth print-access-token returned an empty token");
    }

    Ok(token)
}

fn parse_timeout(value: Option<&str>) -> Duration {
    value
        .and_then(|value| value.trim().parse::<u64>().ok())
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
        .unwrap_or_else(|| Duration::from_secs(DEFAULT_TIMEOUT_SECS))
}

/// Blocking Secret Manager client. One HTTP request per access, no retries.
pub struct SecretManagerClient {
    config: ClientConfig,
    client: Client,
}

impl SecretManagerClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .context("failed to build HTTP client for Secret Manager")?;

        Ok(Self { config, client })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env()?)
    }

    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }
}

impl SecretVersionSource for SecretManagerClient {
    fn access_secret_version(&self, name: &str) -> Result<Vec<u8>, FetchError> {
        let url = format!("{}/{}:access", self.config.endpoint, name);
        debug!(resource = %name, "accessing secret version");

        let response = self
            .client
            .get(url)
            .header(AUTHORIZATION, self.config.bearer())
            .send()
            .map_err(|err| FetchError::Other(format!("http request failed: {err}")))?;

        let status = response.status();
        if let Some(outcome) = classify_status(status) {
            return Err(outcome);
        }

        let body = response
            .text()
            .map_err(|err| FetchError::Other(format!("failed to read access response: {err}")))?;

        if !status.is_success() {
            return Err(FetchError::Other(format!(
                "access secret version failed: {status} {}",
                body.trim()
            )));
        }

        decode_access_response(&body)
    }
}

/// Outcomes that are subject to policy. Every other status is handled by the caller.
pub(crate) fn classify_status(status: StatusCode) -> Option<FetchError> {
    match status {
        StatusCode::NOT_FOUND => Some(FetchError::NotFound),
        StatusCode::FORBIDDEN => Some(FetchError::PermissionDenied),
        _ => None,
    }
}

fn decode_access_response(body: &str) -> Result<Vec<u8>, FetchError> {
    let parsed: AccessSecretVersionResponse = serde_json::from_str(body).map_err(|err| {
        FetchError::Other(format!("failed to decode access response: {err}"))
    })?;

    let data = parsed
        .payload
        .and_then(|payload| payload.data)
        .ok_or_else(|| FetchError::Other("secret payload missing data".into()))?;

    STANDARD
        .decode(data)
        .map_err(|err| FetchError::Other(format!("base64 decode failed: {err}")))
}

#[derive(Deserialize)]
struct AccessSecretVersionResponse {
    payload: Option<SecretPayload>,
}

#[derive(Deserialize)]
struct SecretPayload {
    data: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_not_found_and_denied() {
        assert_eq!(
            classify_status(StatusCode::NOT_FOUND),
            Some(FetchError::NotFound)
        );
        assert_eq!(
            classify_status(StatusCode::FORBIDDEN),
            Some(FetchError::PermissionDenied)
        );
        assert_eq!(classify_status(StatusCode::OK), None);
        assert_eq!(classify_status(StatusCode::TOO_MANY_REQUESTS), None);
    }

    #[test]
    fn test_decode_access_response() {
        let body = r#"{"name":"projects/p/secrets/s/versions/3","payload":{"data":"aHVudGVyMg=="}}"#;
        assert_eq!(decode_access_response(body).unwrap(), b"hunter2".to_vec());
    }

    #[test]
    fn test_decode_rejects_missing_payload() {
        let err = decode_access_response(r#"{"name":"x"}"#).unwrap_err();
        assert_eq!(err, FetchError::Other("secret payload missing data".into()));
    }

    #[test]
    fn test_decode_rejects_bad_base64() {
        let err = decode_access_response(r#"{"payload":{"data":"***"}}"#).unwrap_err();
        assert!(matches!(err, FetchError::Other(ref m) if m.starts_with("base64 decode failed")));
    }

    #[test]
    fn test_parse_timeout() {
        assert_eq!(parse_timeout(None), Duration::from_secs(15));
        assert_eq!(parse_timeout(Some("0")), Duration::from_secs(15));
        assert_eq!(parse_timeout(Some("abc")), Duration::from_secs(15));
        assert_eq!(parse_timeout(Some(" 30 ")), Duration::from_secs(30));
    }

    #[test]
    fn test_config_debug_redacts_token() {
        let config = ClientConfig::new("http://localhost:9000/v1/", "ya29.secret");
        let debug = format!("{:?}", config);
        assert!(!debug.contains("ya29.secret"));
        assert_eq!(config.endpoint, "http://localhost:9000/v1");
    }
}
