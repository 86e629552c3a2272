use async_trait::async_trait;

use crate::domain::{
    models::{AccessToken, SheetRow},
    ports::outbound::SheetTransport,
    TransportError,
};

/// Adapter that wraps the sheets client to implement the SheetTransport port.
pub struct SheetsAdapter {
    client: sheets::SheetsClient,
    target: sheets::AppendTarget,
}

impl SheetsAdapter {
    pub fn new(client: sheets::SheetsClient, target: sheets::AppendTarget) -> Self {
        Self { client, target }
    }
}

#[async_trait]
impl SheetTransport for SheetsAdapter {
    async fn append_row(&self, token: &AccessToken, row: &SheetRow) -> Result<(), TransportError> {
        let resp = self
            .client
            .append_row(token.secret(), &self.target, row.fields().to_vec())
            .await
            .map_err(map_sheets_error)?;

        if let Some(range) = resp.updates.and_then(|u| u.updated_range) {
            tracing::debug!("Row written to {}", range);
        }
        Ok(())
    }
}

fn map_sheets_error(e: sheets::SheetsError) -> TransportError {
    match e {
        sheets::SheetsError::Unauthorized => TransportError::NonSuccessStatus(401),
        sheets::SheetsError::Status(code) => TransportError::NonSuccessStatus(code),
        sheets::SheetsError::Network(msg) => TransportError::NetworkFailure(msg),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unreachable_api_is_a_network_failure() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let adapter = SheetsAdapter::new(
            sheets::SheetsClient::new(&format!("http://{}", addr)),
            sheets::AppendTarget::new("doc", "Sheet1"),
        );

        let err = adapter
            .append_row(
                &AccessToken::new("t"),
                &SheetRow::new(vec!["vol".to_string()]),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::NetworkFailure(_)));
    }

    #[test]
    fn auth_rejections_keep_a_status() {
        assert_eq!(
            map_sheets_error(sheets::SheetsError::Unauthorized),
            TransportError::NonSuccessStatus(401)
        );
        assert_eq!(
            map_sheets_error(sheets::SheetsError::Status(429)),
            TransportError::NonSuccessStatus(429)
        );
    }
}
