use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{
    models::{AccessToken, Outcome, SheetRow, SyncReport, TimeEntry},
    ports::{
        inbound::SubmissionService,
        outbound::{CredentialProvider, PendingQueue, SheetTransport},
    },
    DeliveryError, PersistenceError, SubmitError, TransportError,
};

pub const DEFAULT_DELIVERY_TIMEOUT: Duration = Duration::from_secs(15);

/// Implementation of the SubmissionService inbound port.
///
/// Sends each entry to the spreadsheet and falls back to the pending queue
/// when delivery fails for any reason. A failed delivery is never retried
/// here; queued rows go out again through [`SubmissionService::sync`].
pub struct SubmissionRouter<T, C, Q> {
    transport: Arc<T>,
    credentials: Arc<C>,
    queue: Arc<Q>,
    delivery_timeout: Duration,
    sync_lock: Mutex<()>,
}

impl<T, C, Q> SubmissionRouter<T, C, Q> {
    pub fn new(transport: Arc<T>, credentials: Arc<C>, queue: Arc<Q>) -> Self {
        Self {
            transport,
            credentials,
            queue,
            delivery_timeout: DEFAULT_DELIVERY_TIMEOUT,
            sync_lock: Mutex::new(()),
        }
    }

    pub fn with_delivery_timeout(mut self, timeout: Duration) -> Self {
        self.delivery_timeout = timeout;
        self
    }
}

impl<T, C, Q> SubmissionRouter<T, C, Q>
where
    T: SheetTransport,
    C: CredentialProvider,
    Q: PendingQueue,
{
    async fn access_token(&self) -> Result<AccessToken, DeliveryError> {
        if let Some(token) = self.credentials.cached_token().await {
            return Ok(token);
        }

        tracing::debug!("No cached access token, re-authenticating");
        Ok(self.credentials.reauthenticate().await?)
    }

    async fn deliver(&self, row: &SheetRow) -> Result<(), DeliveryError> {
        let token = self.access_token().await?;

        match tokio::time::timeout(self.delivery_timeout, self.transport.append_row(&token, row))
            .await
        {
            Ok(result) => Ok(result?),
            Err(_) => Err(TransportError::Timeout(self.delivery_timeout).into()),
        }
    }
}

#[async_trait]
impl<T, C, Q> SubmissionService for SubmissionRouter<T, C, Q>
where
    T: SheetTransport,
    C: CredentialProvider,
    Q: PendingQueue,
{
    #[tracing::instrument(skip_all, fields(volunteer = %entry.volunteer_id(), date = %entry.date()))]
    async fn submit(&self, entry: &TimeEntry) -> Result<Outcome, SubmitError> {
        entry.validate()?;

        let row = entry.to_row();

        let reason = match self.deliver(&row).await {
            Ok(()) => {
                tracing::info!("Delivered {:.2} hours", entry.duration_hours());
                return Ok(Outcome::Delivered);
            }
            Err(reason) => reason,
        };

        tracing::warn!("Delivery failed, queueing locally: {}", reason);

        match self.queue.append(row.clone()).await {
            Ok(()) => Ok(Outcome::QueuedLocally { reason }),
            Err(source) => {
                tracing::error!("Failed to queue undelivered entry: {}", source);
                Err(SubmitError::Persistence {
                    row,
                    reason,
                    source,
                })
            }
        }
    }

    #[tracing::instrument(skip_all)]
    async fn sync(&self) -> Result<SyncReport, PersistenceError> {
        let _guard = self.sync_lock.lock().await;

        let rows = self.queue.drain().await?;
        if rows.is_empty() {
            self.queue.settle(Vec::new()).await?;
            return Ok(SyncReport::default());
        }

        let mut report = SyncReport::default();
        for row in &rows {
            match self.deliver(row).await {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    tracing::warn!("Stopping sync after {} rows: {}", report.delivered, e);
                    report.last_error = Some(e);
                    break;
                }
            }
        }

        let undelivered = rows[report.delivered..].to_vec();
        report.remaining = undelivered.len();
        self.queue.settle(undelivered).await?;

        tracing::info!(
            "Sync delivered {} rows, {} still pending",
            report.delivered,
            report.remaining
        );
        Ok(report)
    }

    async fn pending(&self) -> Result<Vec<SheetRow>, PersistenceError> {
        self.queue.pending().await
    }
}
