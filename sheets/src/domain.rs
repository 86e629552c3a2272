use serde::{Deserialize, Serialize};

/// Request body for the append endpoint: one inner vec per row.
#[derive(Debug, Clone, Serialize)]
pub struct ValueRange {
    pub values: Vec<Vec<String>>,
}

impl ValueRange {
    pub fn single_row(row: Vec<String>) -> Self {
        Self { values: vec![row] }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppendValuesResponse {
    #[serde(default)]
    pub spreadsheet_id: Option<String>,
    #[serde(default)]
    pub table_range: Option<String>,
    #[serde(default)]
    pub updates: Option<UpdateValuesResponse>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateValuesResponse {
    #[serde(default)]
    pub updated_range: Option<String>,
    #[serde(default)]
    pub updated_rows: Option<u32>,
    #[serde(default)]
    pub updated_cells: Option<u32>,
}

/// Where rows get appended: a spreadsheet document and a sheet (tab) name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppendTarget {
    pub spreadsheet_id: String,
    pub sheet_name: String,
}

impl AppendTarget {
    pub fn new(spreadsheet_id: impl Into<String>, sheet_name: impl Into<String>) -> Self {
        Self {
            spreadsheet_id: spreadsheet_id.into(),
            sheet_name: sheet_name.into(),
        }
    }
}
