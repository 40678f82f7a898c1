//! Hardcover GraphQL search client.
//!
//! Sends a `search` query and flattens `results.hits[].document` into
//! catalog candidates. The API returns `results` either as an object or as a
//! JSON-encoded string, so both are accepted.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use super::{CatalogError, CatalogProvider};
use crate::config::HardcoverSettings;
use crate::domain::CatalogCandidate;

const SEARCH_QUERY: &str = "query Search($query: String!, $page: Int!, $perPage: Int!) { \
     search(query: $query, page: $page, per_page: $perPage) { error results } }";

/// Hardcover API client
pub struct HardcoverClient {
    /// GraphQL endpoint
    api_url: String,
    /// Bearer token
    token: Option<String>,
    /// Results per page
    per_page: u32,
    /// HTTP client (carries the request timeout)
    client: reqwest::Client,
}

/// Search document as returned inside a hit
#[derive(Debug, Deserialize)]
struct HitDocument {
    title: Option<String>,
    author_names: Option<Vec<String>>,
    slug: Option<String>,
    isbns: Option<Vec<String>>,
    release_date: Option<String>,
    has_ebook: Option<bool>,
    has_audiobook: Option<bool>,
    image: Option<HitImage>,
}

#[derive(Debug, Deserialize)]
struct HitImage {
    url: Option<String>,
}

impl From<HitDocument> for CatalogCandidate {
    fn from(doc: HitDocument) -> Self {
        Self {
            title: doc.title.unwrap_or_default(),
            authors: doc.author_names.unwrap_or_default(),
            slug: doc.slug,
            isbns: doc.isbns.unwrap_or_default(),
            release_date: doc.release_date,
            has_ebook: doc.has_ebook,
            has_audiobook: doc.has_audiobook,
            cover_url: doc.image.and_then(|i| i.url),
        }
    }
}

impl HardcoverClient {
    /// Create a client from resolved settings
    pub fn from_settings(settings: &HardcoverSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout())
            .build()
            .context("Failed to build HTTP client")?;

        if settings.token.is_none() {
            tracing::warn!("No Hardcover token configured; requests will likely be rejected");
        }

        Ok(Self {
            api_url: settings.api_url.clone(),
            token: settings.token.clone(),
            per_page: settings.per_page,
            client,
        })
    }

    /// Run one search request, surfacing every failure as an error
    pub async fn try_search(&self, query: &str, page: u32) -> Result<Vec<CatalogCandidate>, CatalogError> {
        let body = serde_json::json!({
            "query": SEARCH_QUERY,
            "variables": {
                "query": query,
                "page": page,
                "perPage": self.per_page,
            },
        });

        let mut request = self.client.post(&self.api_url).json(&body);
        if let Some(ref token) = self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CatalogError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let value: Value = response
            .json()
            .await
            .map_err(|e| CatalogError::Decode(e.to_string()))?;

        parse_search_response(value)
    }
}

#[async_trait]
impl CatalogProvider for HardcoverClient {
    fn name(&self) -> &str {
        "hardcover"
    }

    async fn search(&self, query: &str) -> Vec<CatalogCandidate> {
        match self.try_search(query, 1).await {
            Ok(candidates) => {
                tracing::debug!(count = candidates.len(), "Hardcover search for {:?}", query);
                candidates
            }
            Err(e) => {
                tracing::warn!("Hardcover search for {:?} failed: {}", query, e);
                Vec::new()
            }
        }
    }
}

/// Extract candidates from a GraphQL search response body
pub fn parse_search_response(value: Value) -> Result<Vec<CatalogCandidate>, CatalogError> {
    if let Some(errors) = value.get("errors").and_then(Value::as_array) {
        if !errors.is_empty() {
            let messages: Vec<String> = errors
                .iter()
                .map(|e| {
                    e.get("message")
                        .and_then(Value::as_str)
                        .map(String::from)
                        .unwrap_or_else(|| e.to_string())
                })
                .collect();
            return Err(CatalogError::Api(messages.join("; ")));
        }
    }

    let search = value
        .get("data")
        .and_then(|d| d.get("search"))
        .cloned()
        .unwrap_or(Value::Null);

    match search.get("error") {
        None | Some(Value::Null) => {}
        Some(Value::String(s)) if s.is_empty() => {}
        Some(Value::String(s)) => return Err(CatalogError::Api(s.clone())),
        Some(other) => return Err(CatalogError::Api(other.to_string())),
    }

    let results = match search.get("results") {
        Some(Value::String(raw)) => serde_json::from_str::<Value>(raw)
            .map_err(|e| CatalogError::Decode(format!("results: {}", e)))?,
        Some(value) => value.clone(),
        None => Value::Null,
    };

    let hits = results
        .get("hits")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    let candidates = hits
        .into_iter()
        .filter_map(|hit| {
            let doc = hit.get("document")?.clone();
            match serde_json::from_value::<HitDocument>(doc) {
                Ok(doc) => Some(CatalogCandidate::from(doc)),
                Err(e) => {
                    tracing::debug!("Skipping malformed search hit: {}", e);
                    None
                }
            }
        })
        .collect();

    Ok(candidates)
}
