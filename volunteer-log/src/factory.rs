//! Composition root: the only place that picks concrete outbound adapters.

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::{
    adapters::outbound::{
        google_auth::GoogleCredentialProvider, pending_queue::FilePendingQueue,
        sheets::SheetsAdapter,
    },
    config::Settings,
    domain::services::SubmissionRouter,
    session_store::SessionStore,
};

pub type AppRouter = SubmissionRouter<SheetsAdapter, GoogleCredentialProvider, FilePendingQueue>;

pub fn session_store(settings: &Settings) -> Result<SessionStore> {
    Ok(SessionStore::new(settings.data_dir()?))
}

pub fn credential_provider(settings: &Settings) -> Result<GoogleCredentialProvider> {
    GoogleCredentialProvider::new(&settings.oauth, session_store(settings)?)
}

/// Build the submission router from settings: sheet transport, OAuth
/// credentials and the file-backed pending queue in the data directory.
pub async fn submission_router(settings: &Settings) -> Result<AppRouter> {
    if settings.sheets.spreadsheet_id.trim().is_empty() {
        anyhow::bail!("sheets.spreadsheet_id is not configured");
    }

    let transport = SheetsAdapter::new(
        sheets::SheetsClient::new(&settings.sheets.api_url),
        sheets::AppendTarget::new(
            settings.sheets.spreadsheet_id.clone(),
            settings.sheets.sheet_name.clone(),
        ),
    );
    let credentials = credential_provider(settings)?;
    let queue = FilePendingQueue::open(settings.data_dir()?)
        .await
        .context("Failed to open pending queue")?;

    Ok(SubmissionRouter::new(
        Arc::new(transport),
        Arc::new(credentials),
        Arc::new(queue),
    )
    .with_delivery_timeout(settings.sheets.delivery_timeout()))
}
