use std::path::Path;

use crate::errors::ParseError;

use super::Table;

/// Read a local CSV file and parse it into a Table.
pub async fn parse_csv_file(path: impl AsRef<Path>) -> Result<Table, ParseError> {
    let path = path.as_ref();
    let input = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ParseError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    parse_csv(&input)
}

/// Parse CSV text into a Table (testable core). The first record is the
/// header row; columns are discovered from it.
pub fn parse_csv(input: &str) -> Result<Table, ParseError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(input.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();
    if headers.is_empty() {
        return Err(ParseError::MissingHeader);
    }

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        rows.push(record.iter().map(|field| field.to_string()).collect());
    }

    Ok(Table { headers, rows })
}
