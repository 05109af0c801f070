//! The enrichment loop: one sequential pass over the entity column, a lookup
//! and a search call per entity, paced by [`limiter::IntervalGate`].

use std::future::Future;

use tracing::{debug, warn};

use crate::data::Table;
use crate::errors::SearchError;
use crate::search::{SearchClient, SearchResult};

pub mod limiter;

use limiter::IntervalGate;

/// Marker reported when the requested target column is not a real column.
pub const COLUMN_NOT_FOUND: &str = "Column not found";

/// Marker reported when no row matches the entity value.
pub const ENTITY_NOT_FOUND: &str = "Entity not found";

/// The search query is fixed and independent of the user's own template.
pub fn search_query(entity: &str) -> String {
    format!("Get me the email address of {entity}")
}

/// Explicit query descriptor: the template carries one `{}` placeholder, the
/// target column is named outright instead of being scraped out of the
/// template text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySpec {
    pub template: String,
    pub target_column: String,
}

impl QuerySpec {
    pub fn new(template: impl Into<String>, target_column: impl Into<String>) -> Self {
        QuerySpec {
            template: template.into(),
            target_column: target_column.into(),
        }
    }

    /// Substitute the entity value into the template's placeholder.
    pub fn instantiate(&self, entity: &str) -> String {
        self.template.replacen("{}", entity, 1)
    }
}

/// Outcome of the tabular lookup for one entity. A miss is a normal outcome,
/// not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    Value(String),
    ColumnNotFound,
    EntityNotFound,
}

/// One output record per (entity, search result) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichmentRecord {
    pub entity: String,
    pub target_column: String,
    pub lookup: Lookup,
    pub title: Option<String>,
    pub url: Option<String>,
    pub snippet: Option<String>,
}

/// What a full run produced: the accumulated records plus per-call search
/// warnings and the count of entities visited.
#[derive(Debug, Clone, Default)]
pub struct EnrichmentOutcome {
    pub records: Vec<EnrichmentRecord>,
    pub warnings: Vec<String>,
    pub entities_processed: usize,
}

/// Resolve the target column's value for an entity: first row whose entity
/// column matches exactly wins.
pub fn lookup(table: &Table, entity_column: &str, entity: &str, target_column: &str) -> Lookup {
    let matches = table.rows_matching(entity_column, entity);
    match matches.first() {
        None => Lookup::EntityNotFound,
        Some(&row) => match table.value(row, target_column) {
            Some(value) => Lookup::Value(value.to_string()),
            None => Lookup::ColumnNotFound,
        },
    }
}

/// Combine one entity's lookup outcome with its search results. Zero search
/// results means zero output records, even when the lookup succeeded.
pub fn merge(
    entity: &str,
    target_column: &str,
    lookup: &Lookup,
    results: Vec<SearchResult>,
) -> Vec<EnrichmentRecord> {
    results
        .into_iter()
        .map(|result| EnrichmentRecord {
            entity: entity.to_string(),
            target_column: target_column.to_string(),
            lookup: lookup.clone(),
            title: result.title,
            url: result.link,
            snippet: result.snippet,
        })
        .collect()
}

/// Run the loop with an arbitrary search call, the seam the tests use.
/// Strictly sequential and single-pass: per entity-column row (duplicates
/// each processed independently) do the lookup, one search call, merge, then
/// wait on the gate, unconditionally.
pub async fn run<F, Fut>(
    table: &Table,
    entity_column: &str,
    spec: &QuerySpec,
    gate: &IntervalGate,
    mut search: F,
) -> EnrichmentOutcome
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<Vec<SearchResult>, SearchError>>,
{
    let mut outcome = EnrichmentOutcome::default();

    for entity in table.column_values(entity_column) {
        outcome.entities_processed += 1;

        let instantiated = spec.instantiate(&entity);
        debug!("Processing {entity:?}: {instantiated}");

        let looked_up = lookup(table, entity_column, &entity, &spec.target_column);

        let results = match search(search_query(&entity)).await {
            Ok(results) => results,
            Err(err) => {
                warn!("Search failed for {entity:?}: {err}");
                outcome
                    .warnings
                    .push(format!("Search failed for \"{entity}\": {err}"));
                Vec::new()
            }
        };

        outcome
            .records
            .extend(merge(&entity, &spec.target_column, &looked_up, results));

        gate.pause().await;
    }

    outcome
}

/// Run the loop against the real search provider.
pub async fn run_with_client(
    table: &Table,
    entity_column: &str,
    spec: &QuerySpec,
    gate: &IntervalGate,
    client: &SearchClient,
) -> EnrichmentOutcome {
    run(table, entity_column, spec, gate, |query| {
        let client = client.clone();
        async move { client.search(&query).await }
    })
    .await
}

/// Convert the accumulated records into an exportable table. Headers are the
/// union of the record keys in first-seen order, mirroring how the records
/// themselves are shaped: `Entity`, then the target column for matched
/// entities or `Message` for unmatched ones, then the search fields.
pub fn records_to_table(records: &[EnrichmentRecord]) -> Table {
    Table::from_records(records.iter().map(|record| {
        let mut pairs = vec![("Entity".to_string(), record.entity.clone())];
        match &record.lookup {
            Lookup::Value(value) => {
                pairs.push((record.target_column.clone(), value.clone()));
            }
            Lookup::ColumnNotFound => {
                pairs.push((record.target_column.clone(), COLUMN_NOT_FOUND.to_string()));
            }
            Lookup::EntityNotFound => {
                pairs.push(("Message".to_string(), ENTITY_NOT_FOUND.to_string()));
            }
        }
        pairs.push(("Title".to_string(), record.title.clone().unwrap_or_default()));
        pairs.push(("URL".to_string(), record.url.clone().unwrap_or_default()));
        pairs.push((
            "Snippet".to_string(),
            record.snippet.clone().unwrap_or_default(),
        ));
        pairs
    }))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use pretty_assertions::assert_eq;

    use super::*;

    fn people() -> Table {
        Table::new(
            vec!["Name".into(), "Email".into()],
            vec![
                vec!["Alice".into(), "a@x.com".into()],
                vec!["Bob".into(), "b@x.com".into()],
            ],
        )
    }

    fn one_result() -> SearchResult {
        SearchResult {
            title: Some("T".into()),
            link: Some("U".into()),
            snippet: Some("S".into()),
        }
    }

    fn fast_gate() -> IntervalGate {
        IntervalGate::new(Duration::from_millis(1))
    }

    #[test]
    fn template_instantiation() {
        let spec = QuerySpec::new("Find Email for {}", "Email");
        assert_eq!(spec.instantiate("Alice"), "Find Email for Alice");
    }

    #[test]
    fn lookup_first_match_wins() {
        let table = Table::new(
            vec!["Name".into(), "Email".into()],
            vec![
                vec!["Alice".into(), "first@x.com".into()],
                vec!["Alice".into(), "second@x.com".into()],
            ],
        );
        assert_eq!(
            lookup(&table, "Name", "Alice", "Email"),
            Lookup::Value("first@x.com".into())
        );
    }

    #[test]
    fn lookup_misses() {
        let table = people();
        assert_eq!(
            lookup(&table, "Name", "Carol", "Email"),
            Lookup::EntityNotFound
        );
        assert_eq!(
            lookup(&table, "Name", "Alice", "Phone"),
            Lookup::ColumnNotFound
        );
    }

    #[test]
    fn merge_zero_results_is_zero_records() {
        let records = merge("Alice", "Email", &Lookup::Value("a@x.com".into()), vec![]);
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn every_entity_row_is_visited_once() {
        let table = Table::new(
            vec!["Name".into()],
            vec![
                vec!["Alice".into()],
                vec!["Bob".into()],
                vec!["Alice".into()],
            ],
        );
        let spec = QuerySpec::new("Find Name for {}", "Name");

        let mut queries = Vec::new();
        let outcome = run(&table, "Name", &spec, &fast_gate(), |query| {
            queries.push(query);
            async { Ok(vec![]) }
        })
        .await;

        // Duplicates are processed independently, not deduplicated
        assert_eq!(outcome.entities_processed, 3);
        assert_eq!(
            queries,
            vec![
                "Get me the email address of Alice",
                "Get me the email address of Bob",
                "Get me the email address of Alice",
            ]
        );
    }

    #[tokio::test]
    async fn end_to_end_alice_example() {
        let table = people();
        let spec = QuerySpec::new("Find Email for {}", "Email");

        let outcome = run(&table, "Name", &spec, &fast_gate(), |query| {
            let results = if query.ends_with("Alice") {
                vec![one_result()]
            } else {
                vec![]
            };
            async move { Ok(results) }
        })
        .await;

        // Bob's search returned nothing, so only Alice contributes a record
        assert_eq!(outcome.entities_processed, 2);
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(
            outcome.records[0],
            EnrichmentRecord {
                entity: "Alice".into(),
                target_column: "Email".into(),
                lookup: Lookup::Value("a@x.com".into()),
                title: Some("T".into()),
                url: Some("U".into()),
                snippet: Some("S".into()),
            }
        );

        let result_table = records_to_table(&outcome.records);
        assert_eq!(
            result_table.headers,
            vec!["Entity", "Email", "Title", "URL", "Snippet"]
        );
        assert_eq!(
            result_table.rows[0],
            vec!["Alice", "a@x.com", "T", "U", "S"]
        );
    }

    #[tokio::test]
    async fn missing_target_column_yields_marker_not_failure() {
        let table = people();
        let spec = QuerySpec::new("Find Phone for {}", "Phone");

        let outcome = run(&table, "Name", &spec, &fast_gate(), |_| async {
            Ok(vec![one_result()])
        })
        .await;

        assert_eq!(outcome.records.len(), 2);
        for record in &outcome.records {
            assert_eq!(record.lookup, Lookup::ColumnNotFound);
        }

        let result_table = records_to_table(&outcome.records);
        assert_eq!(result_table.value(0, "Phone"), Some(COLUMN_NOT_FOUND));
    }

    #[test]
    fn unmatched_entity_yields_not_found_records() {
        let table = people();
        let looked_up = lookup(&table, "Name", "Carol", "Email");
        assert_eq!(looked_up, Lookup::EntityNotFound);

        // Merged with however many search results came back
        let records = merge("Carol", "Email", &looked_up, vec![one_result(), one_result()]);
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.lookup == Lookup::EntityNotFound));

        let result_table = records_to_table(&records);
        assert_eq!(
            result_table.headers,
            vec!["Entity", "Message", "Title", "URL", "Snippet"]
        );
        assert_eq!(result_table.value(0, "Message"), Some(ENTITY_NOT_FOUND));

        // And with zero search results, zero exported rows
        let none = merge("Carol", "Email", &looked_up, vec![]);
        assert!(records_to_table(&none).is_empty());
    }

    #[tokio::test]
    async fn search_failure_is_a_warning_and_the_loop_continues() {
        let table = people();
        let spec = QuerySpec::new("Find Email for {}", "Email");

        let mut call = 0usize;
        let outcome = run(&table, "Name", &spec, &fast_gate(), |_| {
            call += 1;
            let fail = call == 1;
            async move {
                if fail {
                    Err(SearchError::Status {
                        status: reqwest::StatusCode::TOO_MANY_REQUESTS,
                        body: "slow down".into(),
                    })
                } else {
                    Ok(vec![one_result()])
                }
            }
        })
        .await;

        assert_eq!(outcome.entities_processed, 2);
        assert_eq!(outcome.warnings.len(), 1);
        assert!(outcome.warnings[0].contains("Alice"));
        // Bob still produced his record
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records[0].entity, "Bob");
    }

    #[tokio::test]
    async fn gate_fires_after_every_entity() {
        let table = Table::new(
            vec!["Name".into()],
            vec![vec!["a".into()], vec!["b".into()], vec!["c".into()]],
        );
        let spec = QuerySpec::new("Find Name for {}", "Name");
        let gate = IntervalGate::new(Duration::from_millis(20));

        let start = std::time::Instant::now();
        let outcome = run(&table, "Name", &spec, &gate, |_| async { Ok(vec![]) }).await;

        assert_eq!(outcome.entities_processed, 3);
        assert!(start.elapsed() >= Duration::from_millis(60));
    }

    #[test]
    fn mixed_lookup_outcomes_union_headers_in_first_seen_order() {
        let records = vec![
            EnrichmentRecord {
                entity: "Alice".into(),
                target_column: "Email".into(),
                lookup: Lookup::Value("a@x.com".into()),
                title: None,
                url: None,
                snippet: None,
            },
            EnrichmentRecord {
                entity: "Carol".into(),
                target_column: "Email".into(),
                lookup: Lookup::EntityNotFound,
                title: Some("T".into()),
                url: None,
                snippet: None,
            },
        ];

        // The first record contributes Title/URL/Snippet before the second
        // introduces Message, so Message unions in last
        let table = records_to_table(&records);
        assert_eq!(
            table.headers,
            vec!["Entity", "Email", "Title", "URL", "Snippet", "Message"]
        );
        assert_eq!(table.value(0, "Message"), Some(""));
        assert_eq!(table.value(1, "Email"), Some(""));
        assert_eq!(table.value(1, "Message"), Some(ENTITY_NOT_FOUND));
    }
}
