//! OAuth token storage.
//!
//! Two on-disk formats are accepted:
//!
//! - the tool's own format (`access_token`, `refresh_token`, `expires_at`, ...)
//! - Google's "authorized user" `token.json` as written by Google's client
//!   libraries (`token`, `refresh_token`, `expiry`, `client_id`, ...)
//!
//! Refreshed tokens are always written back in the tool's own format.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ProviderError, ProviderResult};

use super::config::{OAuthCredentials, TokenSource};

/// Refresh this long before the reported expiry.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// An OAuth token set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub scopes: Vec<String>,
    /// Client credentials stored alongside the tokens, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
}

/// Google's authorized-user token file.
#[derive(Debug, Deserialize)]
struct AuthorizedUserToken {
    token: String,
    refresh_token: Option<String>,
    expiry: Option<DateTime<Utc>>,
    #[serde(default)]
    scopes: Vec<String>,
    client_id: Option<String>,
    client_secret: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TokenFile {
    Native(TokenInfo),
    AuthorizedUser(AuthorizedUserToken),
}

impl From<AuthorizedUserToken> for TokenInfo {
    fn from(token: AuthorizedUserToken) -> Self {
        Self {
            access_token: token.token,
            refresh_token: token.refresh_token,
            expires_at: token.expiry,
            scopes: token.scopes,
            client_id: token.client_id,
            client_secret: token.client_secret,
        }
    }
}

impl TokenInfo {
    /// Creates a token set from an OAuth response.
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_in_secs: Option<i64>,
        scopes: Vec<String>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token,
            expires_at: expires_in_secs.map(|secs| Utc::now() + Duration::seconds(secs)),
            scopes,
            client_id: None,
            client_secret: None,
        }
    }

    /// Parses either supported token format.
    pub fn from_json(json: &str) -> ProviderResult<Self> {
        let file: TokenFile = serde_json::from_str(json).map_err(|e| {
            ProviderError::configuration(format!("failed to parse token file: {}", e))
        })?;
        Ok(match file {
            TokenFile::Native(info) => info,
            TokenFile::AuthorizedUser(token) => token.into(),
        })
    }

    /// Returns true if the access token is expired or about to expire.
    ///
    /// Tokens without an expiry are assumed valid.
    pub fn is_expired(&self) -> bool {
        self.expires_at
            .is_some_and(|at| Utc::now() + Duration::seconds(EXPIRY_MARGIN_SECS) >= at)
    }

    /// Returns true if every required scope was granted.
    ///
    /// Token files that do not list scopes are not second-guessed.
    pub fn has_scopes(&self, required: &[&str]) -> bool {
        self.scopes.is_empty() || required.iter().all(|s| self.scopes.iter().any(|g| g == s))
    }

    /// Client credentials embedded in the token file.
    pub fn credentials(&self) -> Option<OAuthCredentials> {
        match (&self.client_id, &self.client_secret) {
            (Some(id), Some(secret)) => Some(OAuthCredentials::new(id, secret)),
            _ => None,
        }
    }

    /// Installs a refreshed access token.
    pub fn update_access_token(&mut self, access_token: impl Into<String>, expires_in_secs: Option<i64>) {
        self.access_token = access_token.into();
        self.expires_at = expires_in_secs.map(|secs| Utc::now() + Duration::seconds(secs));
    }
}

/// Token storage with an optional file backend.
#[derive(Debug)]
pub struct TokenStorage {
    /// Token file; `None` when tokens were supplied inline.
    path: Option<PathBuf>,
    tokens: RwLock<Option<TokenInfo>>,
}

impl TokenStorage {
    /// Creates storage for a token source and loads it.
    ///
    /// A missing token file is not an error; the provider reports the
    /// missing authentication on first use.
    pub fn open(source: &TokenSource) -> ProviderResult<Self> {
        match source {
            TokenSource::File(path) => {
                let storage = Self {
                    path: Some(path.clone()),
                    tokens: RwLock::new(None),
                };
                storage.load()?;
                Ok(storage)
            }
            TokenSource::Inline(json) => Ok(Self {
                path: None,
                tokens: RwLock::new(Some(TokenInfo::from_json(json)?)),
            }),
        }
    }

    /// Loads tokens from the file. Returns `Ok(false)` if there is no file.
    pub fn load(&self) -> ProviderResult<bool> {
        let Some(ref path) = self.path else {
            return Ok(self.get().is_some());
        };
        if !path.exists() {
            debug!("no token file at {:?}", path);
            return Ok(false);
        }
        let content = fs::read_to_string(path).map_err(|e| {
            ProviderError::configuration(format!("failed to read token file: {}", e))
        })?;
        let tokens = TokenInfo::from_json(&content)?;
        info!("loaded tokens from {:?}", path);
        *self.tokens.write().unwrap_or_else(PoisonError::into_inner) = Some(tokens);
        Ok(true)
    }

    /// Writes the current tokens to the file, if there is one.
    pub fn save(&self) -> ProviderResult<()> {
        let Some(ref path) = self.path else {
            return Ok(());
        };
        let tokens = self
            .get()
            .ok_or_else(|| ProviderError::internal("no tokens to save"))?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                ProviderError::configuration(format!("failed to create token directory: {}", e))
            })?;
        }

        // Write to a sibling temp file, then rename over the original.
        let temp_path = path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(&tokens)
            .map_err(|e| ProviderError::internal(format!("failed to serialize tokens: {}", e)))?;
        fs::write(&temp_path, &content).map_err(|e| {
            ProviderError::configuration(format!("failed to write token file: {}", e))
        })?;
        fs::rename(&temp_path, path).map_err(|e| {
            ProviderError::configuration(format!("failed to rename token file: {}", e))
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let _ = fs::set_permissions(path, fs::Permissions::from_mode(0o600));
        }

        debug!("saved tokens to {:?}", path);
        Ok(())
    }

    /// Returns a clone of the current tokens, if any.
    pub fn get(&self) -> Option<TokenInfo> {
        self.tokens
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Installs a refreshed access token and persists it.
    pub fn update_access_token(
        &self,
        access_token: impl Into<String>,
        expires_in_secs: Option<i64>,
    ) -> ProviderResult<()> {
        {
            let mut tokens = self.tokens.write().unwrap_or_else(PoisonError::into_inner);
            let current = tokens
                .as_mut()
                .ok_or_else(|| ProviderError::internal("no tokens to update"))?;
            current.update_access_token(access_token, expires_in_secs);
        }
        self.save()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GOOGLE_TOKEN_JSON: &str = r#"{
        "token": "ya29.access",
        "refresh_token": "1//refresh",
        "token_uri": "https://oauth2.googleapis.com/token",
        "client_id": "abc.apps.googleusercontent.com",
        "client_secret": "shh",
        "scopes": ["https://www.googleapis.com/auth/calendar"],
        "universe_domain": "googleapis.com",
        "account": "",
        "expiry": "2025-02-05T10:00:00.123456Z"
    }"#;

    #[test]
    fn parses_google_authorized_user_format() {
        let token = TokenInfo::from_json(GOOGLE_TOKEN_JSON).unwrap();
        assert_eq!(token.access_token, "ya29.access");
        assert_eq!(token.refresh_token.as_deref(), Some("1//refresh"));
        assert!(token.is_expired());
        assert!(token.has_scopes(&["https://www.googleapis.com/auth/calendar"]));
        assert_eq!(
            token.credentials(),
            Some(OAuthCredentials::new("abc.apps.googleusercontent.com", "shh"))
        );
    }

    #[test]
    fn parses_native_format() {
        let token = TokenInfo::new("access", Some("refresh".into()), Some(3600), vec![]);
        let json = serde_json::to_string(&token).unwrap();
        let parsed = TokenInfo::from_json(&json).unwrap();
        assert_eq!(parsed, token);
        assert!(!parsed.is_expired());
        assert!(parsed.credentials().is_none());
    }

    #[test]
    fn rejects_unknown_format() {
        let err = TokenInfo::from_json(r#"{"foo": 1}"#).unwrap_err();
        assert!(err.message().contains("token file"));
    }

    #[test]
    fn tokens_without_expiry_never_expire() {
        let token = TokenInfo::new("access", None, None, vec![]);
        assert!(!token.is_expired());
    }

    #[test]
    fn scope_check() {
        let token = TokenInfo::new("a", None, None, vec!["read".to_string()]);
        assert!(token.has_scopes(&["read"]));
        assert!(!token.has_scopes(&["write"]));
    }

    #[test]
    fn file_storage_refresh_rewrites_native_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        fs::write(&path, GOOGLE_TOKEN_JSON).unwrap();

        let storage = TokenStorage::open(&TokenSource::File(path.clone())).unwrap();
        assert_eq!(storage.get().unwrap().access_token, "ya29.access");

        storage.update_access_token("ya29.fresh", Some(3600)).unwrap();

        let reloaded = TokenInfo::from_json(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(reloaded.access_token, "ya29.fresh");
        assert_eq!(reloaded.refresh_token.as_deref(), Some("1//refresh"));
        assert_eq!(reloaded.client_id.as_deref(), Some("abc.apps.googleusercontent.com"));
        assert!(!reloaded.is_expired());
    }

    #[test]
    fn missing_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let storage = TokenStorage::open(&TokenSource::File(dir.path().join("none.json"))).unwrap();
        assert!(storage.get().is_none());
    }

    #[test]
    fn inline_storage_never_touches_disk() {
        let storage = TokenStorage::open(&TokenSource::Inline(GOOGLE_TOKEN_JSON.to_string())).unwrap();
        assert!(storage.path().is_none());
        storage.update_access_token("ya29.fresh", Some(60)).unwrap();
        assert_eq!(storage.get().unwrap().access_token, "ya29.fresh");
    }
}
