use std::path::{Path, PathBuf};

use tracing::info;

use super::Table;

/// Encode a full table (header row included) as CSV text.
pub fn to_csv(table: &Table) -> String {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_writer(Vec::new());

    wtr.write_record(&table.headers)
        .expect("writing to an in-memory buffer cannot fail");
    for row in &table.rows {
        // Pad short rows so every record matches the header width
        let mut record: Vec<&str> = row.iter().map(String::as_str).collect();
        record.resize(table.headers.len().max(record.len()), "");
        wtr.write_record(&record)
            .expect("writing to an in-memory buffer cannot fail");
    }

    wtr.flush().expect("flushing an in-memory buffer cannot fail");
    let bytes = wtr.into_inner().expect("into_inner on an in-memory buffer");
    String::from_utf8(bytes).expect("csv output is valid utf-8")
}

/// Write a table to `file_name` inside `dir` and return the full path.
pub async fn write_csv_download(
    table: &Table,
    dir: impl AsRef<Path>,
    file_name: &str,
) -> std::io::Result<PathBuf> {
    let path = dir.as_ref().join(file_name);
    tokio::fs::write(&path, to_csv(table)).await?;
    info!("Wrote {} rows to {:?}", table.num_rows(), path);
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::parse::parse_csv;
    use pretty_assertions::assert_eq;

    fn people() -> Table {
        Table::new(
            vec!["Name".into(), "Email".into()],
            vec![
                vec!["Alice".into(), "a@x.com".into()],
                vec!["Bob".into(), "b@x.com".into()],
            ],
        )
    }

    #[test]
    fn csv_has_header_and_rows() {
        assert_eq!(to_csv(&people()), "Name,Email\nAlice,a@x.com\nBob,b@x.com\n");
    }

    #[test]
    fn fields_with_commas_are_quoted() {
        let t = Table::new(
            vec!["name".into(), "bio".into()],
            vec![vec!["Alice".into(), "likes cats, dogs".into()]],
        );
        assert_eq!(to_csv(&t), "name,bio\nAlice,\"likes cats, dogs\"\n");
    }

    #[test]
    fn short_rows_are_padded_to_header_width() {
        let t = Table::new(
            vec!["a".into(), "b".into(), "c".into()],
            vec![vec!["1".into()]],
        );
        assert_eq!(to_csv(&t), "a,b,c\n1,,\n");
    }

    #[test]
    fn round_trip_preserves_columns_and_values() {
        let original = people();
        let reparsed = parse_csv(&to_csv(&original)).unwrap();
        assert_eq!(reparsed, original);
    }

    #[test]
    fn round_trip_with_awkward_values() {
        let original = Table::new(
            vec!["k".into(), "v".into()],
            vec![
                vec!["quote".into(), "say \"hi\"".into()],
                vec!["newline".into(), "a\nb".into()],
                vec!["comma".into(), "x,y".into()],
            ],
        );
        let reparsed = parse_csv(&to_csv(&original)).unwrap();
        assert_eq!(reparsed, original);
    }

    #[tokio::test]
    async fn download_writes_the_encoded_table() {
        let dir = std::env::temp_dir();
        let path = write_csv_download(&people(), &dir, "tabscout_export_test.csv")
            .await
            .unwrap();
        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(contents, to_csv(&people()));
        tokio::fs::remove_file(&path).await.ok();
    }
}
