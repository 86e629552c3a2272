use crate::domain::DeliveryError;

/// What happened to a submitted entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The row reached the spreadsheet. Nothing was kept locally.
    Delivered,
    /// The row is in the pending queue and will go out on the next sync.
    QueuedLocally { reason: DeliveryError },
}

impl Outcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered)
    }
}

/// Result of one pending queue reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub delivered: usize,
    pub remaining: usize,
    /// Why the pass stopped early, if it did.
    pub last_error: Option<DeliveryError>,
}
