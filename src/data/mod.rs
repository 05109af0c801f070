pub mod export;
pub mod parse;

/// An in-memory table: a header row naming the columns and the data rows
/// sharing them. Loaded fully, never mutated after load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Where the table came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    CsvFile,
    Spreadsheet,
}

impl Table {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Table { headers, rows }
    }

    pub fn num_columns(&self) -> usize {
        self.headers.len()
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of a column by header name, if it exists.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Cell value addressed by row index and column name. Short rows read as
    /// empty cells.
    pub fn value(&self, row: usize, column: &str) -> Option<&str> {
        let col = self.column_index(column)?;
        self.rows
            .get(row)
            .map(|r| r.get(col).map(String::as_str).unwrap_or(""))
    }

    /// Indices of all rows whose `column` cell equals `needle` exactly.
    pub fn rows_matching(&self, column: &str, needle: &str) -> Vec<usize> {
        match self.column_index(column) {
            Some(col) => self
                .rows
                .iter()
                .enumerate()
                .filter(|(_, row)| row.get(col).map(String::as_str).unwrap_or("") == needle)
                .map(|(idx, _)| idx)
                .collect(),
            None => Vec::new(),
        }
    }

    /// All values of one column, in row order. Empty when the column does not
    /// exist.
    pub fn column_values(&self, column: &str) -> Vec<String> {
        match self.column_index(column) {
            Some(col) => self
                .rows
                .iter()
                .map(|row| row.get(col).cloned().unwrap_or_default())
                .collect(),
            None => Vec::new(),
        }
    }

    /// Build a table from a sequence of key/value records. Headers are the
    /// union of all keys in order of first appearance; missing keys read as
    /// empty cells.
    pub fn from_records<I, R>(records: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = (String, String)>,
    {
        let records: Vec<Vec<(String, String)>> = records
            .into_iter()
            .map(|record| record.into_iter().collect())
            .collect();

        let mut headers: Vec<String> = Vec::new();
        for record in &records {
            for (key, _) in record {
                if !headers.iter().any(|h| h == key) {
                    headers.push(key.clone());
                }
            }
        }

        let rows = records
            .iter()
            .map(|record| {
                headers
                    .iter()
                    .map(|header| {
                        record
                            .iter()
                            .find(|(key, _)| key == header)
                            .map(|(_, value)| value.clone())
                            .unwrap_or_default()
                    })
                    .collect()
            })
            .collect();

        Table { headers, rows }
    }
}
