use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{models::SheetRow, ports::outbound::PendingQueue, PersistenceError};

#[derive(Debug, Default)]
struct QueueState {
    queued: Vec<SheetRow>,
    in_flight: Vec<SheetRow>,
}

/// Pending queue that lives only as long as the process.
#[derive(Debug, Default)]
pub struct InMemoryPendingQueue {
    state: Mutex<QueueState>,
}

impl InMemoryPendingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(rows: Vec<SheetRow>) -> Self {
        Self {
            state: Mutex::new(QueueState {
                queued: rows,
                in_flight: Vec::new(),
            }),
        }
    }
}

#[async_trait]
impl PendingQueue for InMemoryPendingQueue {
    async fn append(&self, row: SheetRow) -> Result<(), PersistenceError> {
        self.state.lock().await.queued.push(row);
        Ok(())
    }

    async fn pending(&self) -> Result<Vec<SheetRow>, PersistenceError> {
        let state = self.state.lock().await;
        Ok(state
            .in_flight
            .iter()
            .chain(state.queued.iter())
            .cloned()
            .collect())
    }

    async fn drain(&self) -> Result<Vec<SheetRow>, PersistenceError> {
        let mut state = self.state.lock().await;
        let queued = std::mem::take(&mut state.queued);
        state.in_flight.extend(queued);
        Ok(state.in_flight.clone())
    }

    async fn settle(&self, mut undelivered: Vec<SheetRow>) -> Result<(), PersistenceError> {
        let mut state = self.state.lock().await;
        state.in_flight.clear();
        undelivered.append(&mut state.queued);
        state.queued = undelivered;
        Ok(())
    }
}
