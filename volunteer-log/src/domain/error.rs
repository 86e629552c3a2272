use std::time::Duration;

use thiserror::Error;

use crate::domain::models::SheetRow;

/// Rejections raised before any I/O happens.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("organization and description are required")]
    MissingFields,
    #[error("end time must be after start time")]
    InvalidTimeRange,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("no access credential available")]
    NoCredential,
    #[error("re-authentication failed: {0}")]
    ReauthFailed(String),
}

impl AuthError {
    pub fn reauth_failed(msg: impl Into<String>) -> Self {
        Self::ReauthFailed(msg.into())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("network failure: {0}")]
    NetworkFailure(String),
    #[error("remote answered with status {0}")]
    NonSuccessStatus(u16),
    #[error("no answer within {0:?}")]
    Timeout(Duration),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PersistenceError {
    #[error("failed to write pending entries: {0}")]
    WriteFailed(String),
    #[error("stored pending entries are unreadable: {0}")]
    StorageCorruption(String),
}

impl PersistenceError {
    pub fn write_failed(msg: impl Into<String>) -> Self {
        Self::WriteFailed(msg.into())
    }
}

/// Why a row did not reach the spreadsheet.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Delivery failed and the local fallback failed too. The row is handed
    /// back so the caller can keep it.
    #[error("entry was not delivered ({reason}) and could not be saved locally: {source}")]
    Persistence {
        row: SheetRow,
        reason: DeliveryError,
        #[source]
        source: PersistenceError,
    },
}
