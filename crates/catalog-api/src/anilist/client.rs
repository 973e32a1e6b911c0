//! AniList GraphQL client with caching and retry logic.

use super::queries::*;
use super::types::{GraphQlResponse, RawPage};
use crate::cache::ResponseCache;
use crate::catalog::{Catalog, ListQuery, MediaQuery};
use crate::error::UpstreamError;
use anyhow::{Context, Result};
use reqwest::header::RETRY_AFTER;
use reqwest::{Client, StatusCode};
use serde_json::{json, Map, Value};
use shared::config::UpstreamConfig;
use shared::Page;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// AniList GraphQL API client
pub struct AniListClient {
    /// HTTP client
    client: Client,
    /// GraphQL endpoint
    endpoint: String,
    /// Maximum retries for failed requests
    max_retries: u32,
    /// Base delay for retry (exponential backoff)
    retry_delay_ms: u64,
    /// `data` of recent responses, keyed by query and variables
    cache: ResponseCache<Value>,
}

impl AniListClient {
    pub fn new(config: &UpstreamConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("catalog-api/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            max_retries: config.max_retries,
            retry_delay_ms: config.retry_delay_ms,
            cache: ResponseCache::from_config(&config.cache),
        })
    }

    /// Run a query and return its `data`, retrying transient failures
    async fn query(&self, name: &str, document: &str, variables: Value) -> Result<Value, UpstreamError> {
        let cache_key = format!("{}:{}", name, variables);
        if let Some(data) = self.cache.get(&cache_key) {
            return Ok(data);
        }

        let body = json!({ "query": document, "variables": variables });
        let mut attempt = 0;

        let data = loop {
            debug!(query = name, attempt = attempt + 1, "Making GraphQL request");

            let delay = match self.send(&body).await {
                Ok(data) => break data,
                Err((error, _)) if !error.is_retryable() || attempt >= self.max_retries => {
                    warn!(query = name, error = %error, "GraphQL request failed");
                    return Err(error);
                }
                Err((error, retry_after)) => {
                    let backoff = backoff_delay(self.retry_delay_ms, attempt);
                    let delay = retry_after.map_or(backoff, |hint| hint.max(backoff));
                    warn!(
                        query = name,
                        error = %error,
                        delay_ms = delay.as_millis() as u64,
                        "GraphQL request failed, retrying"
                    );
                    delay
                }
            };

            sleep(delay).await;
            attempt += 1;
        };

        self.cache.insert(cache_key, data.clone());
        Ok(data)
    }

    /// One POST; failures carry the server's `Retry-After` hint if any
    async fn send(&self, body: &Value) -> Result<Value, (UpstreamError, Option<Duration>)> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(body)
            .send()
            .await
            .map_err(|e| (UpstreamError::from(e), None))?;

        let status = response.status();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs);

        let text = response
            .text()
            .await
            .map_err(|e| (UpstreamError::from(e), None))?;

        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            return Err((
                UpstreamError::Status {
                    status: status.as_u16(),
                    message: first_error_message(&text).unwrap_or_else(|| truncate(&text)),
                },
                retry_after,
            ));
        }

        let envelope: GraphQlResponse = match serde_json::from_str(&text) {
            Ok(envelope) => envelope,
            Err(_) if !status.is_success() => {
                return Err((
                    UpstreamError::Status {
                        status: status.as_u16(),
                        message: truncate(&text),
                    },
                    None,
                ));
            }
            Err(e) => return Err((UpstreamError::from(e), None)),
        };

        if let Some(error) = envelope.errors.into_iter().next() {
            let status = error
                .status
                .or_else(|| (!status.is_success()).then(|| status.as_u16()));
            return Err((
                UpstreamError::Query {
                    status,
                    message: error.message,
                },
                None,
            ));
        }

        envelope
            .data
            .ok_or((UpstreamError::MissingField("data"), None))
    }

    async fn page(
        &self,
        name: &str,
        document: &str,
        variables: Value,
        list_field: &'static str,
    ) -> Result<Page<Value>, UpstreamError> {
        let data = self.query(name, document, variables).await?;
        let mut raw: RawPage = serde_json::from_value(data)?;

        let results = match raw.page.lists.remove(list_field) {
            Some(Value::Array(items)) => items,
            Some(Value::Null) | None => Vec::new(),
            Some(_) => return Err(UpstreamError::MissingField(list_field)),
        };

        Ok(Page {
            results,
            page_info: raw.page.page_info,
        })
    }
}

/// GraphQL variables for a media listing, omitting unset filters
pub fn media_variables(query: &MediaQuery) -> Value {
    let mut vars = Map::new();
    vars.insert("page".into(), json!(query.page));
    vars.insert("perPage".into(), json!(query.per_page));

    if let Some(media_type) = query.media_type {
        vars.insert("type".into(), json!(media_type.as_str()));
    }
    let optional = [
        ("search", &query.search),
        ("genre", &query.genre),
        ("format", &query.format),
        ("status", &query.status),
    ];
    for (key, value) in optional {
        if let Some(value) = value {
            vars.insert(key.into(), json!(value));
        }
    }
    if let Some(season) = query.season {
        vars.insert("season".into(), json!(season.as_str()));
    }
    if let Some(year) = query.season_year {
        vars.insert("seasonYear".into(), json!(year));
    }
    if !query.sort.is_empty() {
        vars.insert("sort".into(), json!(query.sort));
    }

    Value::Object(vars)
}

fn list_variables(query: &ListQuery) -> Value {
    let mut vars = Map::new();
    vars.insert("page".into(), json!(query.page));
    vars.insert("perPage".into(), json!(query.per_page));
    if let Some(search) = &query.search {
        vars.insert("search".into(), json!(search));
    }
    if let Some(sort) = &query.sort {
        vars.insert("sort".into(), json!([sort]));
    }
    Value::Object(vars)
}

fn first_error_message(text: &str) -> Option<String> {
    serde_json::from_str::<GraphQlResponse>(text)
        .ok()?
        .errors
        .into_iter()
        .next()
        .map(|e| e.message)
}

fn truncate(text: &str) -> String {
    text.chars().take(200).collect()
}

impl Catalog for AniListClient {
    async fn media_page(&self, query: &MediaQuery) -> Result<Page<Value>, UpstreamError> {
        self.page("media_page", MEDIA_PAGE_QUERY, media_variables(query), "media")
            .await
    }

    async fn character_page(&self, query: &ListQuery) -> Result<Page<Value>, UpstreamError> {
        self.page(
            "character_page",
            CHARACTERS_PAGE_QUERY,
            list_variables(query),
            "characters",
        )
        .await
    }

    async fn staff_page(&self, query: &ListQuery) -> Result<Page<Value>, UpstreamError> {
        self.page("staff_page", STAFF_PAGE_QUERY, list_variables(query), "staff")
            .await
    }

    async fn studio_page(&self, query: &ListQuery) -> Result<Page<Value>, UpstreamError> {
        self.page("studio_page", STUDIOS_PAGE_QUERY, list_variables(query), "studios")
            .await
    }

    async fn airing_page(&self, page: u32, per_page: u32) -> Result<Page<Value>, UpstreamError> {
        let variables = json!({
            "page": page,
            "perPage": per_page,
            "airingAtLesser": chrono::Utc::now().timestamp(),
        });
        // airingAtLesser changes every second, so these effectively bypass the cache
        self.page("airing_page", AIRED_EPISODES_QUERY, variables, "airingSchedules")
            .await
    }

    async fn media_by_id(&self, id: i64) -> Result<Value, UpstreamError> {
        let mut data = self
            .query("media", MEDIA_BY_ID_QUERY, json!({ "id": id }))
            .await?;
        match data.get_mut("Media").map(Value::take) {
            Some(media) if !media.is_null() => Ok(media),
            _ => Err(UpstreamError::MissingField("data.Media")),
        }
    }
}

/// `base_ms * 2^attempt`, saturating instead of overflowing
pub fn backoff_delay(base_ms: u64, attempt: u32) -> Duration {
    let factor = 2u64.checked_pow(attempt).unwrap_or(u64::MAX);
    Duration::from_millis(base_ms.saturating_mul(factor))
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{MediaSeason, MediaType};

    #[test]
    fn test_client_creation() {
        let config = shared::Config::default().upstream;
        let client = AniListClient::new(&config);
        assert!(client.is_ok());
    }

    #[test]
    fn test_media_variables_skip_unset() {
        let query = MediaQuery {
            genre: Some("Action".to_string()),
            season: Some(MediaSeason::Spring),
            season_year: Some(2024),
            ..MediaQuery::new(MediaType::Manga, 3, 20).sorted("POPULARITY_DESC")
        };

        let vars = media_variables(&query);
        assert_eq!(
            vars,
            json!({
                "page": 3,
                "perPage": 20,
                "type": "MANGA",
                "genre": "Action",
                "season": "SPRING",
                "seasonYear": 2024,
                "sort": ["POPULARITY_DESC"]
            })
        );
    }

    #[test]
    fn test_list_variables() {
        let query = ListQuery {
            search: Some("Mappa".to_string()),
            sort: Some("SEARCH_MATCH".to_string()),
            page: 1,
            per_page: 3,
        };
        assert_eq!(
            list_variables(&query),
            json!({ "page": 1, "perPage": 3, "search": "Mappa", "sort": ["SEARCH_MATCH"] })
        );

        let unsorted = ListQuery {
            page: 2,
            per_page: 24,
            ..Default::default()
        };
        assert_eq!(list_variables(&unsorted), json!({ "page": 2, "perPage": 24 }));
    }

    #[test]
    fn test_backoff_delay() {
        assert_eq!(backoff_delay(500, 0), Duration::from_millis(500));
        assert_eq!(backoff_delay(500, 2), Duration::from_millis(2000));
        assert_eq!(backoff_delay(500, 70), Duration::from_millis(u64::MAX));
        assert_eq!(backoff_delay(0, 70), Duration::ZERO);
    }

    #[test]
    fn test_first_error_message() {
        let body = r#"{"errors":[{"message":"Too Many Requests.","status":429}],"data":null}"#;
        assert_eq!(first_error_message(body).as_deref(), Some("Too Many Requests."));
        assert_eq!(first_error_message("<html>"), None);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_fails_after_retries() {
        let mut config = shared::Config::default().upstream;
        config.endpoint = "http://127.0.0.1:9/graphql".to_string();
        config.max_retries = 1;
        config.retry_delay_ms = 1;
        let client = AniListClient::new(&config).unwrap();

        let result = client.media_by_id(1).await;
        assert!(matches!(result, Err(UpstreamError::Transport(_))));
    }
}
