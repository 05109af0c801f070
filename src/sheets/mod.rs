//! Remote spreadsheet source: Drive file listing and Sheets value reads,
//! authorized by [`auth`].

use std::fmt;

use reqwest::Client;
use serde::Deserialize;
use tracing::info;

use crate::data::Table;
use crate::errors::FetchError;

pub mod auth;

const DRIVE_FILES_URL: &str = "https://www.googleapis.com/drive/v3/files";
const SHEETS_VALUES_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// The default read range. A range without a sheet name resolves to the
/// first worksheet.
const READ_RANGE: &str = "A1:ZZ";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SpreadsheetInfo {
    pub id: String,
    pub name: String,
}

impl fmt::Display for SpreadsheetInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<SpreadsheetInfo>,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

/// An authorized client for the spreadsheet service.
#[derive(Debug, Clone)]
pub struct SheetsClient {
    http: Client,
    access_token: String,
}

impl SheetsClient {
    pub fn new(access_token: impl Into<String>) -> Self {
        SheetsClient {
            http: Client::new(),
            access_token: access_token.into(),
        }
    }

    /// List the spreadsheets visible to the authorized account.
    pub async fn list_spreadsheets(&self) -> Result<Vec<SpreadsheetInfo>, FetchError> {
        let response = self
            .http
            .get(DRIVE_FILES_URL)
            .bearer_auth(&self.access_token)
            .query(&[
                ("q", "mimeType='application/vnd.google-apps.spreadsheet'"),
                ("fields", "files(id,name)"),
                ("pageSize", "100"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status { status, body });
        }

        let list: FileList = response.json().await?;
        info!("Listed {} spreadsheets", list.files.len());
        Ok(list.files)
    }

    /// Fetch the first worksheet of a spreadsheet as a table. The first row
    /// is the header; columns are discovered from it.
    pub async fn fetch_table(&self, spreadsheet_id: &str) -> Result<Table, FetchError> {
        let url = format!("{SHEETS_VALUES_URL}/{spreadsheet_id}/values/{READ_RANGE}");
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.access_token)
            .query(&[("majorDimension", "ROWS")])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status { status, body });
        }

        let range: ValueRange = response.json().await?;
        let table = table_from_values(range.values);
        info!(
            "Fetched sheet {spreadsheet_id}: {} rows, {} columns",
            table.num_rows(),
            table.num_columns()
        );
        Ok(table)
    }
}

/// First row is the header; remaining rows are data. Cell values arrive as
/// arbitrary JSON scalars and are widened to text.
fn table_from_values(values: Vec<Vec<serde_json::Value>>) -> Table {
    let mut iter = values.into_iter();
    let headers: Vec<String> = iter
        .next()
        .map(|row| row.iter().map(stringify_cell).collect())
        .unwrap_or_default();

    let rows = iter
        .map(|row| row.iter().map(stringify_cell).collect())
        .collect();

    Table::new(headers, rows)
}

fn stringify_cell(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn file_list_parses_ids_and_names() {
        let body = r#"{"files": [
            {"id": "abc", "name": "Leads"},
            {"id": "def", "name": "Inventory"}
        ]}"#;
        let list: FileList = serde_json::from_str(body).unwrap();

        assert_eq!(list.files.len(), 2);
        assert_eq!(list.files[0].id, "abc");
        assert_eq!(list.files[0].name, "Leads");
        assert_eq!(list.files[1].to_string(), "Inventory");
    }

    #[test]
    fn empty_file_list() {
        let list: FileList = serde_json::from_str("{}").unwrap();
        assert!(list.files.is_empty());
    }

    #[test]
    fn value_range_becomes_table_with_header_row() {
        let body = r#"{"range": "Sheet1!A1:ZZ", "values": [
            ["Name", "Email"],
            ["Alice", "a@x.com"],
            ["Bob", "b@x.com"]
        ]}"#;
        let range: ValueRange = serde_json::from_str(body).unwrap();
        let table = table_from_values(range.values);

        assert_eq!(table.headers, vec!["Name", "Email"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0], vec!["Alice", "a@x.com"]);
    }

    #[test]
    fn non_string_cells_are_widened_to_text() {
        let values = vec![
            vec!["id".into(), "active".into(), "score".into()],
            vec![
                serde_json::json!(7),
                serde_json::json!(true),
                serde_json::Value::Null,
            ],
        ];
        let table = table_from_values(values);

        assert_eq!(table.rows[0], vec!["7", "true", ""]);
    }

    #[test]
    fn empty_value_range_is_an_empty_table() {
        let table = table_from_values(Vec::new());
        assert!(table.headers.is_empty());
        assert!(table.is_empty());
    }
}
