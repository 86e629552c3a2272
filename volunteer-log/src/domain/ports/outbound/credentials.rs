use async_trait::async_trait;

use crate::domain::{models::AccessToken, AuthError};

/// Outbound port for obtaining bearer tokens.
///
/// Refreshing and interactive sign-in are the provider's business; the
/// submission router only asks for a fresh token when nothing is cached.
#[async_trait]
pub trait CredentialProvider: Send + Sync + 'static {
    /// A token that is still valid, if one is at hand without any network call.
    async fn cached_token(&self) -> Option<AccessToken>;

    /// Obtain a new token, by refresh or by signing in again.
    async fn reauthenticate(&self) -> Result<AccessToken, AuthError>;
}
