use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use oauth2::{
    basic::{BasicClient, BasicTokenResponse},
    reqwest::async_http_client,
    AuthUrl, ClientId, ClientSecret, RedirectUrl, RefreshToken, TokenResponse, TokenUrl,
};
use tokio::sync::Mutex;

use crate::{
    config::OAuthSettings,
    domain::{models::AccessToken, ports::outbound::CredentialProvider, AuthError},
    login,
    session_store::{SessionStore, StoredToken},
};

pub const SCOPES: [&str; 2] = [
    "https://www.googleapis.com/auth/spreadsheets",
    "https://www.googleapis.com/auth/drive.file",
];

/// Tokens are treated as expired this long before the provider says so.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// Credential provider backed by an OAuth 2.0 authorization-code client.
///
/// The refresh token stored by the session store acts as the device
/// credential; no password is ever kept.
pub struct GoogleCredentialProvider {
    client: BasicClient,
    store: SessionStore,
    callback_port: u16,
    login_timeout: Duration,
    refresh_timeout: Duration,
    interactive: bool,
    cached: Mutex<Option<StoredToken>>,
}

impl GoogleCredentialProvider {
    pub fn new(settings: &OAuthSettings, store: SessionStore) -> anyhow::Result<Self> {
        let client = BasicClient::new(
            ClientId::new(settings.client_id.clone()),
            settings.client_secret.clone().map(ClientSecret::new),
            AuthUrl::new(settings.auth_url.clone()).context("Invalid OAuth auth_url")?,
            Some(TokenUrl::new(settings.token_url.clone()).context("Invalid OAuth token_url")?),
        )
        .set_redirect_uri(
            RedirectUrl::new(login::callback_url(settings.callback_port))
                .context("Invalid OAuth redirect URL")?,
        );

        Ok(Self {
            client,
            store,
            callback_port: settings.callback_port,
            login_timeout: settings.login_timeout(),
            refresh_timeout: settings.refresh_timeout(),
            interactive: settings.interactive,
            cached: Mutex::new(None),
        })
    }

    /// Sign in through the browser, whether or not interactive
    /// re-authentication is enabled for submissions.
    pub async fn sign_in(&self) -> Result<AccessToken, AuthError> {
        let response = match tokio::time::timeout(
            self.login_timeout,
            login::run_browser_login(&self.client, self.callback_port, &SCOPES),
        )
        .await
        {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => return Err(AuthError::reauth_failed(format!("{:#}", e))),
            Err(_) => {
                return Err(AuthError::reauth_failed(format!(
                    "no sign-in within {}s",
                    self.login_timeout.as_secs()
                )))
            }
        };

        self.remember(to_stored(&response, None)).await
    }

    pub async fn sign_out(&self) -> anyhow::Result<()> {
        *self.cached.lock().await = None;
        self.store.clear_token()
    }

    async fn current(&self) -> Option<StoredToken> {
        let mut cached = self.cached.lock().await;
        if cached.is_none() {
            match self.store.load_token() {
                Ok(token) => *cached = token,
                Err(e) => tracing::warn!("Ignoring unreadable token file: {:#}", e),
            }
        }
        cached.clone()
    }

    async fn refresh(&self, refresh_token: &str) -> Result<AccessToken, AuthError> {
        let refresh_token_secret = RefreshToken::new(refresh_token.to_string());
        let exchange = self
            .client
            .exchange_refresh_token(&refresh_token_secret)
            .request_async(async_http_client);

        let response = match tokio::time::timeout(self.refresh_timeout, exchange).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                return Err(AuthError::reauth_failed(format!(
                    "token refresh failed: {}",
                    e
                )))
            }
            Err(_) => {
                return Err(AuthError::reauth_failed(format!(
                    "token endpoint did not answer within {}s",
                    self.refresh_timeout.as_secs()
                )))
            }
        };

        tracing::debug!("Refreshed access token");
        self.remember(to_stored(&response, Some(refresh_token)))
            .await
    }

    async fn remember(&self, token: StoredToken) -> Result<AccessToken, AuthError> {
        if let Err(e) = self.store.save_token(&token) {
            // The token still works for this run even if it can't be kept.
            tracing::warn!("Failed to save access token: {:#}", e);
        }
        let access = AccessToken::new(token.access_token.clone());
        *self.cached.lock().await = Some(token);
        Ok(access)
    }
}

#[async_trait]
impl CredentialProvider for GoogleCredentialProvider {
    async fn cached_token(&self) -> Option<AccessToken> {
        let now = time::OffsetDateTime::now_utc().unix_timestamp();
        self.current()
            .await
            .filter(|token| token.is_fresh(now))
            .map(|token| AccessToken::new(token.access_token))
    }

    async fn reauthenticate(&self) -> Result<AccessToken, AuthError> {
        let mut last_error = AuthError::NoCredential;

        if let Some(refresh_token) = self.current().await.and_then(|t| t.refresh_token) {
            match self.refresh(&refresh_token).await {
                Ok(token) => return Ok(token),
                Err(e) => {
                    tracing::warn!("{}", e);
                    last_error = e;
                }
            }
        }

        if !self.interactive {
            return Err(last_error);
        }

        self.sign_in().await
    }
}

fn to_stored(response: &BasicTokenResponse, previous_refresh: Option<&str>) -> StoredToken {
    let now = time::OffsetDateTime::now_utc().unix_timestamp();
    StoredToken {
        access_token: response.access_token().secret().clone(),
        // Refresh responses usually leave the refresh token out.
        refresh_token: response
            .refresh_token()
            .map(|t| t.secret().clone())
            .or_else(|| previous_refresh.map(str::to_string)),
        expires_at: response
            .expires_in()
            .map(|d| now + d.as_secs() as i64 - EXPIRY_MARGIN_SECS),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::adapters::outbound::pending_queue::InMemoryPendingQueue;
    use crate::domain::{
        models::{Outcome, SheetRow, TimeEntry},
        ports::{
            inbound::SubmissionService,
            outbound::{PendingQueue, SheetTransport},
        },
        services::SubmissionRouter,
        DeliveryError, TransportError,
    };
    use time::macros::{date, time};

    struct AcceptingSheet;

    #[async_trait]
    impl SheetTransport for AcceptingSheet {
        async fn append_row(
            &self,
            _token: &AccessToken,
            _row: &SheetRow,
        ) -> Result<(), TransportError> {
            Ok(())
        }
    }

    fn settings(token_url: &str) -> OAuthSettings {
        OAuthSettings {
            client_id: "client".to_string(),
            client_secret: None,
            auth_url: "https://accounts.example.com/auth".to_string(),
            token_url: token_url.to_string(),
            callback_port: 9876,
            login_timeout_secs: 1,
            refresh_timeout_secs: 1,
            interactive: false,
        }
    }

    fn closed_port_url() -> String {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{}/token", addr)
    }

    #[tokio::test]
    async fn nothing_cached_without_token_file() {
        let dir = tempfile::tempdir().unwrap();
        let provider = GoogleCredentialProvider::new(
            &settings("https://accounts.example.com/token"),
            SessionStore::new(dir.path()),
        )
        .unwrap();

        assert!(provider.cached_token().await.is_none());
        assert_eq!(
            provider.reauthenticate().await.unwrap_err(),
            AuthError::NoCredential
        );
    }

    #[tokio::test]
    async fn fresh_stored_token_is_used() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path());
        store
            .save_token(&StoredToken {
                access_token: "stored".to_string(),
                refresh_token: None,
                expires_at: Some(time::OffsetDateTime::now_utc().unix_timestamp() + 3600),
            })
            .unwrap();

        let provider =
            GoogleCredentialProvider::new(&settings("https://accounts.example.com/token"), store)
                .unwrap();

        assert_eq!(
            provider.cached_token().await,
            Some(AccessToken::new("stored"))
        );
    }

    #[tokio::test]
    async fn expired_token_with_unreachable_refresh_fails_reauth() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path());
        store
            .save_token(&StoredToken {
                access_token: "old".to_string(),
                refresh_token: Some("refresh".to_string()),
                expires_at: Some(0),
            })
            .unwrap();

        let provider = GoogleCredentialProvider::new(&settings(&closed_port_url()), store).unwrap();

        assert!(provider.cached_token().await.is_none());
        assert!(matches!(
            provider.reauthenticate().await.unwrap_err(),
            AuthError::ReauthFailed(_)
        ));
    }

    #[tokio::test]
    async fn sign_out_forgets_tokens() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path());
        store
            .save_token(&StoredToken {
                access_token: "stored".to_string(),
                refresh_token: None,
                expires_at: None,
            })
            .unwrap();
        let provider = GoogleCredentialProvider::new(
            &settings("https://accounts.example.com/token"),
            store.clone(),
        )
        .unwrap();
        assert!(provider.cached_token().await.is_some());

        provider.sign_out().await.unwrap();

        assert!(provider.cached_token().await.is_none());
        assert_eq!(store.load_token().unwrap(), None);
    }

    #[tokio::test]
    async fn silent_token_endpoint_falls_back_to_local_queue() {
        // Accepts connections through the backlog but never answers.
        let silent = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let token_url = format!("http://{}/token", silent.local_addr().unwrap());

        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path());
        store
            .save_token(&StoredToken {
                access_token: "old".to_string(),
                refresh_token: Some("refresh".to_string()),
                expires_at: Some(0),
            })
            .unwrap();
        let provider = GoogleCredentialProvider::new(&settings(&token_url), store).unwrap();

        let queue = Arc::new(InMemoryPendingQueue::new());
        let router = SubmissionRouter::new(
            Arc::new(AcceptingSheet),
            Arc::new(provider),
            queue.clone(),
        )
        .with_delivery_timeout(Duration::from_millis(100));
        let entry = TimeEntry::new(
            "vol-42",
            date!(2024 - 03 - 09),
            time!(14:00),
            time!(16:30),
            "Food Bank",
            "Sorting donations",
        );

        let outcome = tokio::time::timeout(Duration::from_secs(5), router.submit(&entry))
            .await
            .expect("submit finished in time")
            .unwrap();

        assert!(matches!(
            outcome,
            Outcome::QueuedLocally {
                reason: DeliveryError::Auth(AuthError::ReauthFailed(_))
            }
        ));
        assert_eq!(queue.len().await.unwrap(), 1);
        drop(silent);
    }
}
