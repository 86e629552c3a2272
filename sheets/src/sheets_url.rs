#[derive(Debug, Clone)]
pub struct SheetsURL(String);

impl AsRef<str> for SheetsURL {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl SheetsURL {
    pub fn new(base_url: &str) -> Self {
        Self(base_url.trim_end_matches('/').to_string())
    }

    /// Append the given path to the URL.
    pub fn append_path(&self, path: &str) -> Self {
        let trimmed_url = self.0.trim_end_matches('/');
        let trimmed_path = path.trim_start_matches('/');
        Self(format!("{}/{}", trimmed_url, trimmed_path))
    }

    /// Append a query parameter, percent-encoding the value.
    pub fn with_query(&self, key: &str, value: &str) -> Self {
        let separator = if self.0.contains('?') { '&' } else { '?' };
        Self(format!(
            "{}{}{}={}",
            self.0,
            separator,
            key,
            urlencoding::encode(value)
        ))
    }

    /// `/v4/spreadsheets/{id}/values/{range}:append`
    pub fn append_values(&self, spreadsheet_id: &str, range: &str) -> Self {
        self.append_path(&format!(
            "/v4/spreadsheets/{}/values/{}:append",
            urlencoding::encode(spreadsheet_id),
            urlencoding::encode(range)
        ))
    }
}
