//! OAuth 2.0 token refresh for Google APIs.
//!
//! Access tokens are obtained out of band (the token file); this client only
//! exchanges a refresh token for a fresh access token.

use std::time::Duration;

use serde::Deserialize;
use tracing::info;

use crate::error::{ProviderError, ProviderResult};

use super::config::OAuthCredentials;

const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// OAuth client for refreshing Google access tokens.
#[derive(Debug)]
pub struct OAuthClient {
    credentials: OAuthCredentials,
    http_client: reqwest::Client,
}

/// Response from Google's token endpoint.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

impl OAuthClient {
    pub fn new(credentials: OAuthCredentials, timeout: Duration) -> ProviderResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::internal("failed to create HTTP client").with_source(e))?;

        Ok(Self {
            credentials,
            http_client,
        })
    }

    /// Exchanges a refresh token for a new access token.
    ///
    /// Returns the access token and its lifetime in seconds.
    pub async fn refresh_token(&self, refresh_token: &str) -> ProviderResult<(String, Option<i64>)> {
        let params = [
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];

        let response = self
            .http_client
            .post(GOOGLE_TOKEN_URL)
            .form(&params)
            .send()
            .await
            .map_err(|e| ProviderError::network(format!("token refresh request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::network(format!("failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(ProviderError::authentication(format!(
                "token refresh failed ({}): {}",
                status, body
            )));
        }

        let token = parse_token_response(&body)?;
        info!("refreshed Google access token");
        Ok((token.access_token, token.expires_in))
    }
}

fn parse_token_response(body: &str) -> ProviderResult<TokenResponse> {
    serde_json::from_str(body)
        .map_err(|e| ProviderError::invalid_response(format!("invalid token response: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_refresh_response() {
        let body = r#"{
            "access_token": "ya29.new",
            "expires_in": 3599,
            "scope": "https://www.googleapis.com/auth/calendar",
            "token_type": "Bearer"
        }"#;
        let token = parse_token_response(body).unwrap();
        assert_eq!(token.access_token, "ya29.new");
        assert_eq!(token.expires_in, Some(3599));
    }

    #[test]
    fn rejects_error_body() {
        let err = parse_token_response(r#"{"error": "invalid_grant"}"#).unwrap_err();
        assert_eq!(err.code(), crate::ProviderErrorCode::InvalidResponse);
    }

    #[test]
    fn client_builds() {
        let creds = OAuthCredentials::new("id.apps.googleusercontent.com", "secret");
        assert!(OAuthClient::new(creds, Duration::from_secs(5)).is_ok());
    }
}
