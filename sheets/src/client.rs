use reqwest::StatusCode;
use thiserror::Error;

use crate::{AppendTarget, AppendValuesResponse, SheetsURL, ValueRange};

pub const DEFAULT_SHEETS_API_URL: &str = "https://sheets.googleapis.com";

#[derive(Debug, Clone)]
pub struct SheetsClient {
    http: reqwest::Client,
    base_url: SheetsURL,
}

impl Default for SheetsClient {
    fn default() -> Self {
        Self::new(DEFAULT_SHEETS_API_URL)
    }
}

impl SheetsClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: SheetsURL::new(base_url),
        }
    }

    /// Append a single row after the last row of the target sheet.
    ///
    /// Values go through `USER_ENTERED` so the sheet parses dates, times and
    /// numbers the same way it would for typed input.
    pub async fn append_row(
        &self,
        access_token: &str,
        target: &AppendTarget,
        row: Vec<String>,
    ) -> Result<AppendValuesResponse, SheetsError> {
        let url = self
            .base_url
            .append_values(&target.spreadsheet_id, &target.sheet_name)
            .with_query("valueInputOption", "USER_ENTERED");

        let resp = self
            .http
            .post(url.as_ref())
            .bearer_auth(access_token)
            .json(&ValueRange::single_row(row))
            .send()
            .await
            .map_err(|e| SheetsError::Network(e.to_string()))?;

        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(SheetsError::Unauthorized);
        }
        if !status.is_success() {
            return Err(SheetsError::Status(status.as_u16()));
        }

        let body = resp
            .bytes()
            .await
            .map_err(|e| SheetsError::Network(e.to_string()))?;

        // The row is already written at this point, a body we can't read
        // must not turn a delivered row into a failure.
        match serde_json::from_slice::<AppendValuesResponse>(&body) {
            Ok(parsed) => Ok(parsed),
            Err(e) => {
                tracing::debug!("Ignoring unparsable append response: {}", e);
                Ok(AppendValuesResponse::default())
            }
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SheetsError {
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Unexpected status: {0}")]
    Status(u16),
    #[error("NetworkError: {0}")]
    Network(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Accept one request, answer with `status` and `body`, hand back the raw request.
    async fn serve_once(status: u16, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut raw = Vec::new();
            let mut buf = [0u8; 4096];

            loop {
                let n = stream.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                raw.extend_from_slice(&buf[..n]);

                let text = String::from_utf8_lossy(&raw);
                if let Some(header_end) = text.find("\r\n\r\n") {
                    let content_length = text[..header_end]
                        .lines()
                        .find_map(|line| {
                            let (name, value) = line.split_once(':')?;
                            name.eq_ignore_ascii_case("content-length")
                                .then(|| value.trim().parse::<usize>().ok())
                                .flatten()
                        })
                        .unwrap_or(0);
                    if raw.len() >= header_end + 4 + content_length {
                        break;
                    }
                }
            }

            let response = format!(
                "HTTP/1.1 {} Test\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            String::from_utf8_lossy(&raw).to_string()
        });

        (format!("http://{}", addr), handle)
    }

    fn target() -> AppendTarget {
        AppendTarget::new("doc-1", "Sheet1")
    }

    fn row() -> Vec<String> {
        vec!["vol-7".to_string(), "2.50".to_string()]
    }

    #[tokio::test]
    async fn append_row_posts_bearer_and_values_envelope() {
        let (base_url, server) = serve_once(
            200,
            r#"{"spreadsheetId":"doc-1","updates":{"updatedRows":1}}"#,
        )
        .await;

        let client = SheetsClient::new(&base_url);
        let resp = client.append_row("token-abc", &target(), row()).await.unwrap();
        assert_eq!(resp.spreadsheet_id.as_deref(), Some("doc-1"));
        assert_eq!(resp.updates.and_then(|u| u.updated_rows), Some(1));

        let request = server.await.unwrap();
        assert!(request.starts_with(
            "POST /v4/spreadsheets/doc-1/values/Sheet1:append?valueInputOption=USER_ENTERED "
        ));
        assert!(request
            .to_ascii_lowercase()
            .contains("authorization: bearer token-abc"));
        assert!(request.ends_with(r#"{"values":[["vol-7","2.50"]]}"#));
    }

    #[tokio::test]
    async fn append_row_accepts_any_success_body() {
        let (base_url, server) = serve_once(201, "not json").await;

        let client = SheetsClient::new(&base_url);
        let resp = client.append_row("t", &target(), row()).await.unwrap();
        assert_eq!(resp, AppendValuesResponse::default());
        server.await.unwrap();
    }

    #[tokio::test]
    async fn append_row_maps_auth_failures() {
        let (base_url, server) = serve_once(401, "{}").await;

        let client = SheetsClient::new(&base_url);
        let err = client.append_row("t", &target(), row()).await.unwrap_err();
        assert_eq!(err, SheetsError::Unauthorized);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn append_row_reports_non_success_status() {
        let (base_url, server) = serve_once(500, "{}").await;

        let client = SheetsClient::new(&base_url);
        let err = client.append_row("t", &target(), row()).await.unwrap_err();
        assert_eq!(err, SheetsError::Status(500));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn append_row_reports_network_failure() {
        // Bind then drop to get a port nobody listens on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = SheetsClient::new(&format!("http://{}", addr));
        let err = client.append_row("t", &target(), row()).await.unwrap_err();
        assert!(matches!(err, SheetsError::Network(_)));
    }
}
