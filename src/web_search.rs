use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;

use crate::config::Config;
use crate::data_models::{MAX_RESULTS, SearchResult};
use crate::error::{UpstreamError, ensure_success};

const SERVICE: &str = "google custom search";

#[derive(Debug, Deserialize)]
struct CustomSearchResponse {
    #[serde(default)]
    items: Vec<CustomSearchItem>,
}

#[derive(Debug, Deserialize)]
struct CustomSearchItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    snippet: String,
}

impl From<CustomSearchItem> for SearchResult {
    fn from(item: CustomSearchItem) -> Self {
        SearchResult {
            title: item.title,
            link: item.link,
            snippet: item.snippet,
        }
    }
}

pub struct WebSearchClient {
    http: Client,
    endpoint: String,
    api_key: String,
    engine_id: String,
    timeout: Duration,
}

impl WebSearchClient {
    pub fn new(http: Client, config: &Config) -> Self {
        Self {
            http,
            endpoint: config.google_search_url.clone(),
            api_key: config.google_api_key.clone(),
            engine_id: config.google_cse_id.clone(),
            timeout: config.upstream_timeout,
        }
    }

    /// One GET against the Custom Search JSON API. Never returns more than `count` items.
    pub async fn search(&self, query: &str, count: u32) -> Result<Vec<SearchResult>, UpstreamError> {
        let count = count.clamp(1, MAX_RESULTS);
        let num = count.to_string();

        let response = self
            .http
            .get(&self.endpoint)
            .query(&[
                ("q", query),
                ("key", self.api_key.as_str()),
                ("cx", self.engine_id.as_str()),
                ("num", num.as_str()),
            ])
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| UpstreamError::from_reqwest(SERVICE, self.timeout, e))?;

        let response = ensure_success(SERVICE, response).await?;
        let raw = response
            .text()
            .await
            .map_err(|e| UpstreamError::from_reqwest(SERVICE, self.timeout, e))?;
        let body: CustomSearchResponse =
            serde_json::from_str(&raw).map_err(|e| UpstreamError::Decode {
                service: SERVICE,
                message: e.to_string(),
            })?;

        let results: Vec<SearchResult> = body
            .items
            .into_iter()
            .take(count as usize)
            .map(SearchResult::from)
            .collect();

        tracing::debug!(query, returned = results.len(), "web search completed");
        Ok(results)
    }
}
