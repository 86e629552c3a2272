use async_trait::async_trait;

use crate::domain::{models::SheetRow, PersistenceError};

/// Outbound port for the durable queue of rows that failed delivery.
///
/// Rows keep submission order. Nothing leaves the queue except through
/// [`PendingQueue::drain`], and drained rows stay recoverable until
/// [`PendingQueue::settle`] is called.
#[async_trait]
pub trait PendingQueue: Send + Sync + 'static {
    /// Add a row at the end of the queue.
    async fn append(&self, row: SheetRow) -> Result<(), PersistenceError>;

    /// Every row not yet delivered, oldest first.
    async fn pending(&self) -> Result<Vec<SheetRow>, PersistenceError>;

    /// Take every pending row out of the queue for redelivery.
    ///
    /// The rows are held as in-flight until `settle`; an interrupted process
    /// gets them back on the next open.
    async fn drain(&self) -> Result<Vec<SheetRow>, PersistenceError>;

    /// Finish a drain: `undelivered` goes back to the front of the queue,
    /// ahead of anything appended since the drain.
    async fn settle(&self, undelivered: Vec<SheetRow>) -> Result<(), PersistenceError>;

    async fn len(&self) -> Result<usize, PersistenceError> {
        Ok(self.pending().await?.len())
    }

    async fn is_empty(&self) -> Result<bool, PersistenceError> {
        Ok(self.len().await? == 0)
    }
}
