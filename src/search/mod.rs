use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::errors::SearchError;

const SEARCH_URL: &str = "https://serpapi.com/search.json";

/// How many ranked results to ask the provider for.
const RESULT_COUNT: u8 = 5;

/// One organic search result. Any field may be absent in the provider's
/// payload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SearchResult {
    pub title: Option<String>,
    pub link: Option<String>,
    pub snippet: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    organic_results: Vec<SearchResult>,
}

/// A keyed client for the web search provider.
#[derive(Debug, Clone)]
pub struct SearchClient {
    http: Client,
    api_key: String,
}

impl SearchClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        SearchClient {
            http: Client::new(),
            api_key: api_key.into(),
        }
    }

    /// Run one free-text query and return its ranked organic results, at most
    /// [`RESULT_COUNT`] of them. Transport and HTTP failures surface as
    /// [`SearchError`]; the caller decides that this means zero results.
    pub async fn search(&self, query: &str) -> Result<Vec<SearchResult>, SearchError> {
        debug!("Searching: {query}");

        let response = self
            .http
            .get(SEARCH_URL)
            .query(&[
                ("q", query),
                ("api_key", self.api_key.as_str()),
                ("num", &RESULT_COUNT.to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::Status { status, body });
        }

        let parsed: SearchResponse = response.json().await?;
        let mut results = parsed.organic_results;
        results.truncate(RESULT_COUNT as usize);
        Ok(results)
    }
}
