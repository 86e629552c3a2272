use async_trait::async_trait;

use crate::domain::{
    models::{Outcome, SheetRow, SyncReport, TimeEntry},
    PersistenceError, SubmitError,
};

/// Inbound port for logging volunteer hours.
///
/// Entries that can't be delivered are kept locally; callers only ever see
/// a hard failure for invalid input or when the local fallback fails too.
#[async_trait]
pub trait SubmissionService: Send + Sync + 'static {
    /// Validate the entry, then deliver it or queue it locally.
    async fn submit(&self, entry: &TimeEntry) -> Result<Outcome, SubmitError>;

    /// Redeliver queued rows in order, stopping at the first failure.
    async fn sync(&self) -> Result<SyncReport, PersistenceError>;

    /// Rows waiting for the next sync, oldest first.
    async fn pending(&self) -> Result<Vec<SheetRow>, PersistenceError>;
}
