use async_trait::async_trait;

use crate::domain::{
    models::{AccessToken, SheetRow},
    TransportError,
};

/// Outbound port for appending rows to the shared spreadsheet.
///
/// Implementations send exactly one row per call and must not retry.
#[async_trait]
pub trait SheetTransport: Send + Sync + 'static {
    async fn append_row(&self, token: &AccessToken, row: &SheetRow)
        -> Result<(), TransportError>;
}
