//! HTTP page sources backed by the catalog read API.

use crate::error::FetchError;
use crate::source::{PageSource, QuerySource};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use shared::config::FeedConfig;
use shared::{MediaFilters, MediaType, Page, SearchResponse};
use std::future::Future;
use std::time::Duration;
use tracing::debug;

type QueryPairs = Vec<(&'static str, String)>;

/// Read API client
#[derive(Debug, Clone)]
pub struct ApiClient {
    /// HTTP client
    client: Client,
    /// Base URL of the read API, without trailing slash
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(concat!("catalog-feed/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(feed: &FeedConfig) -> Result<Self, FetchError> {
        Self::new(feed.base_url.clone())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET `path` and decode the JSON body
    ///
    /// 429 becomes [`FetchError::RateLimited`], any other non-2xx status
    /// [`FetchError::Status`]. No retries: the caller's next trigger is the
    /// retry.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, FetchError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, query = ?query, "Making API request");

        let response = self.client.get(&url).query(query).send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = parse_retry_after(response.headers());
            debug!(url = %url, retry_after = ?retry_after, "Rate limited by read API");
            return Err(FetchError::RateLimited { retry_after });
        }
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Quick search across media, characters and studios
    pub async fn search(&self, text: &str) -> Result<SearchResponse, FetchError> {
        self.get_json("/api/search", &[("q", text.to_string())]).await
    }
}

/// `Retry-After` in delta-seconds form
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

/// Dedup key for an opaque JSON item: its `id`, else the whole document
pub fn json_item_key(item: &Value) -> String {
    match item.get("id") {
        Some(Value::Number(id)) => id.to_string(),
        Some(Value::String(id)) => id.clone(),
        _ => item.to_string(),
    }
}

/// One fixed listing of the read API
pub struct HttpPageSource {
    client: ApiClient,
    path: String,
    params: QueryPairs,
}

impl HttpPageSource {
    pub fn new(client: ApiClient, path: impl Into<String>, params: QueryPairs) -> Self {
        Self {
            client,
            path: path.into(),
            params,
        }
    }

    /// `/api/browse` for one category
    pub fn browse(client: ApiClient, media_type: MediaType, category: &str) -> Self {
        Self::new(
            client,
            "/api/browse",
            vec![
                ("type", media_type.to_string()),
                ("category", category.to_string()),
            ],
        )
    }
}

impl PageSource for HttpPageSource {
    type Item = Value;

    fn fetch_page(&self, page: u32) -> impl Future<Output = Result<Page<Value>, FetchError>> + Send {
        let mut query = self.params.clone();
        query.push(("page", page.to_string()));
        async move { self.client.get_json(&self.path, &query).await }
    }
}

/// `/api/browse?category=filter`, one sequence per filter set
pub struct HttpQuerySource {
    client: ApiClient,
    media_type: MediaType,
}

impl HttpQuerySource {
    pub fn new(client: ApiClient, media_type: MediaType) -> Self {
        Self { client, media_type }
    }
}

impl QuerySource for HttpQuerySource {
    type Query = MediaFilters;
    type Item = Value;

    fn fetch(
        &self,
        filters: &MediaFilters,
        page: u32,
    ) -> impl Future<Output = Result<Page<Value>, FetchError>> + Send {
        let mut query: QueryPairs = vec![
            ("type", self.media_type.to_string()),
            ("category", "filter".to_string()),
        ];
        query.extend(filters.query_pairs());
        query.push(("page", page.to_string()));
        async move { self.client.get_json("/api/browse", &query).await }
    }
}
