use serde::{Deserialize, Serialize};

/// One spreadsheet row, in column order: volunteer id, date, start, end,
/// hours, organization, description.
///
/// Serializes as a bare JSON array of strings, which is also what the pending
/// queue stores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SheetRow(Vec<String>);

impl SheetRow {
    pub fn new(fields: Vec<String>) -> Self {
        Self(fields)
    }

    pub fn fields(&self) -> &[String] {
        &self.0
    }

    pub fn into_fields(self) -> Vec<String> {
        self.0
    }

    pub fn volunteer_id(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }
}

impl From<Vec<String>> for SheetRow {
    fn from(fields: Vec<String>) -> Self {
        Self(fields)
    }
}
