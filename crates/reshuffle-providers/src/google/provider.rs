//! Google Calendar provider implementation.

use reshuffle_core::{CalendarEvent, Slot, TimeWindow};
use tokio::sync::{RwLock as TokioRwLock, RwLockReadGuard};
use tracing::{debug, info};

use crate::error::{ProviderError, ProviderResult};
use crate::provider::{BoxFuture, CalendarInfo, CalendarProvider, FreeBusy};

use super::client::GoogleCalendarClient;
use super::config::GoogleConfig;
use super::oauth::OAuthClient;
use super::tokens::TokenStorage;

const PROVIDER_NAME: &str = "google";

/// Google Calendar provider.
///
/// Reads tokens from the configured token source and refreshes the access
/// token when it expires. Every API failure is tagged with the `google`
/// provider name.
pub struct GoogleProvider {
    config: GoogleConfig,
    token_storage: TokenStorage,
    /// `None` when neither the config nor the token file carries client
    /// credentials; expired tokens then cannot be refreshed.
    oauth_client: Option<OAuthClient>,
    api_client: TokioRwLock<Option<GoogleCalendarClient>>,
}

impl GoogleProvider {
    /// Creates a provider and loads its tokens.
    pub fn new(config: GoogleConfig) -> ProviderResult<Self> {
        config
            .validate()
            .map_err(|e| ProviderError::configuration(e).with_provider(PROVIDER_NAME))?;

        let token_storage = TokenStorage::open(&config.tokens)?;

        if let Some(tokens) = token_storage.get()
            && !tokens.has_scopes(&[GoogleConfig::SCOPE])
        {
            return Err(ProviderError::authorization(format!(
                "token does not grant {}",
                GoogleConfig::SCOPE
            ))
            .with_provider(PROVIDER_NAME));
        }

        let credentials = config
            .credentials
            .clone()
            .or_else(|| token_storage.get().and_then(|t| t.credentials()));
        let oauth_client = credentials
            .map(|c| OAuthClient::new(c, config.timeout))
            .transpose()?;

        let api_client = match token_storage.get() {
            Some(tokens) if !tokens.is_expired() => Some(GoogleCalendarClient::new(
                &tokens.access_token,
                config.timeout,
                &config.user_agent,
            )?),
            _ => None,
        };

        Ok(Self {
            config,
            token_storage,
            oauth_client,
            api_client: TokioRwLock::new(api_client),
        })
    }

    /// The calendar this provider was configured for.
    pub fn calendar_id(&self) -> &str {
        &self.config.calendar_id
    }

    /// Returns true if a usable or refreshable token is available.
    pub fn is_authenticated(&self) -> bool {
        self.token_storage.get().is_some_and(|tokens| {
            !tokens.is_expired() || (tokens.refresh_token.is_some() && self.oauth_client.is_some())
        })
    }

    /// Ensures we have a valid API client, refreshing tokens if needed.
    async fn ensure_client(&self) -> ProviderResult<()> {
        {
            let client = self.api_client.read().await;
            if client.is_some()
                && let Some(tokens) = self.token_storage.get()
                && !tokens.is_expired()
            {
                return Ok(());
            }
        }

        self.ensure_authenticated().await
    }

    async fn ensure_authenticated(&self) -> ProviderResult<()> {
        let tokens = self.token_storage.get().ok_or_else(|| {
            ProviderError::authentication(
                "no Google token found - set google.token_path or google.token_json",
            )
            .with_provider(PROVIDER_NAME)
        })?;

        let access_token = if tokens.is_expired() {
            let refresh_token = tokens.refresh_token.as_ref().ok_or_else(|| {
                ProviderError::authentication("access token expired and no refresh token")
                    .with_provider(PROVIDER_NAME)
            })?;
            let oauth = self.oauth_client.as_ref().ok_or_else(|| {
                ProviderError::configuration(
                    "access token expired and no client credentials to refresh it",
                )
                .with_provider(PROVIDER_NAME)
            })?;

            debug!("refreshing expired access token");
            let (new_access_token, expires_in) = oauth
                .refresh_token(refresh_token)
                .await
                .map_err(|e| e.with_provider(PROVIDER_NAME))?;
            self.token_storage
                .update_access_token(&new_access_token, expires_in)?;
            new_access_token
        } else {
            tokens.access_token
        };

        let mut client = self.api_client.write().await;
        match client.as_mut() {
            Some(c) => c.set_access_token(&access_token),
            None => {
                *client = Some(GoogleCalendarClient::new(
                    &access_token,
                    self.config.timeout,
                    &self.config.user_agent,
                )?);
            }
        }
        Ok(())
    }

    /// Returns a read guard on an authenticated API client.
    async fn client(&self) -> ProviderResult<RwLockReadGuard<'_, Option<GoogleCalendarClient>>> {
        self.ensure_client().await?;
        Ok(self.api_client.read().await)
    }
}

fn unavailable() -> ProviderError {
    ProviderError::internal("API client not available").with_provider(PROVIDER_NAME)
}

fn tagged(error: ProviderError) -> ProviderError {
    error.with_provider(PROVIDER_NAME)
}

impl CalendarProvider for GoogleProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn calendar_info<'a>(&'a self, calendar_id: &'a str) -> BoxFuture<'a, ProviderResult<CalendarInfo>> {
        Box::pin(async move {
            let guard = self.client().await?;
            let client = guard.as_ref().ok_or_else(unavailable)?;
            client.get_calendar(calendar_id).await.map_err(tagged)
        })
    }

    fn list_events<'a>(
        &'a self,
        calendar_id: &'a str,
        window: TimeWindow,
    ) -> BoxFuture<'a, ProviderResult<Vec<CalendarEvent>>> {
        Box::pin(async move {
            let guard = self.client().await?;
            let client = guard.as_ref().ok_or_else(unavailable)?;
            client.list_events(calendar_id, window).await.map_err(tagged)
        })
    }

    fn query_free_busy<'a>(
        &'a self,
        emails: &'a [String],
        window: TimeWindow,
    ) -> BoxFuture<'a, ProviderResult<FreeBusy>> {
        Box::pin(async move {
            let guard = self.client().await?;
            let client = guard.as_ref().ok_or_else(unavailable)?;
            client.query_free_busy(emails, window).await.map_err(tagged)
        })
    }

    fn update_event<'a>(
        &'a self,
        calendar_id: &'a str,
        event_id: &'a str,
        slot: Slot,
    ) -> BoxFuture<'a, ProviderResult<CalendarEvent>> {
        Box::pin(async move {
            let guard = self.client().await?;
            let client = guard.as_ref().ok_or_else(unavailable)?;
            let updated = client
                .patch_event_time(calendar_id, event_id, slot, self.config.send_updates())
                .await
                .map_err(tagged)?;
            info!("moved event {} to {}", event_id, slot);
            Ok(updated)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderErrorCode;
    use crate::google::config::OAuthCredentials;

    const EXPIRED_TOKEN: &str = r#"{
        "token": "ya29.old",
        "refresh_token": "1//refresh",
        "client_id": "abc.apps.googleusercontent.com",
        "client_secret": "shh",
        "scopes": ["https://www.googleapis.com/auth/calendar"],
        "expiry": "2020-01-01T00:00:00Z"
    }"#;

    fn config_without_token() -> (tempfile::TempDir, GoogleConfig) {
        let dir = tempfile::tempdir().unwrap();
        let config = GoogleConfig::new().with_token_path(dir.path().join("missing.json"));
        (dir, config)
    }

    #[test]
    fn provider_without_token_is_not_authenticated() {
        let (_dir, config) = config_without_token();
        let provider = GoogleProvider::new(config).unwrap();
        assert_eq!(provider.name(), "google");
        assert_eq!(provider.calendar_id(), "primary");
        assert!(!provider.is_authenticated());
    }

    #[test]
    fn expired_token_with_embedded_credentials_is_refreshable() {
        let provider = GoogleProvider::new(GoogleConfig::new().with_token_json(EXPIRED_TOKEN)).unwrap();
        assert!(provider.is_authenticated());
    }

    #[test]
    fn expired_token_without_credentials_is_not_refreshable() {
        let json = EXPIRED_TOKEN
            .replace(r#""client_id": "abc.apps.googleusercontent.com","#, "")
            .replace(r#""client_secret": "shh","#, "");
        let provider = GoogleProvider::new(GoogleConfig::new().with_token_json(json)).unwrap();
        assert!(!provider.is_authenticated());

        let with_creds = GoogleConfig::new()
            .with_token_json(EXPIRED_TOKEN)
            .with_credentials(OAuthCredentials::new("x.apps.googleusercontent.com", "y"));
        assert!(GoogleProvider::new(with_creds).unwrap().is_authenticated());
    }

    #[test]
    fn read_only_token_is_rejected() {
        let json = EXPIRED_TOKEN.replace(
            "https://www.googleapis.com/auth/calendar\"",
            "https://www.googleapis.com/auth/calendar.readonly\"",
        );
        let err = GoogleProvider::new(GoogleConfig::new().with_token_json(json))
            .err()
            .unwrap();
        assert_eq!(err.code(), ProviderErrorCode::AuthorizationFailed);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let (_dir, config) = config_without_token();
        let err = GoogleProvider::new(config.with_calendar_id(""))
            .err()
            .unwrap();
        assert_eq!(err.code(), ProviderErrorCode::ConfigurationError);
    }

    #[tokio::test]
    async fn calls_without_token_fail_with_authentication_error() {
        let (_dir, config) = config_without_token();
        let provider = GoogleProvider::new(config).unwrap();
        let err = provider.timezone("primary").await.unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::AuthenticationFailed);
        assert_eq!(err.provider(), Some("google"));
    }
}
