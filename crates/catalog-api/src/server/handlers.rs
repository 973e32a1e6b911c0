use super::params::{
    clamp_page, parse_compare_ids, BrowseParams, CompareParams, ListParams, PageParams,
    SearchParams,
};
use super::AppState;
use crate::anilist::{CharacterSummary, MediaSummary, StudioSummary};
use crate::catalog::{Catalog, ListQuery, MediaQuery};
use crate::error::UpstreamError;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use shared::{Page, SearchHit, SearchResponse};
use std::sync::Arc;
use tracing::{debug, warn};

/// Media per kind in a quick search
const SEARCH_MEDIA_LIMIT: u32 = 4;
const SEARCH_CHARACTER_LIMIT: u32 = 3;
const SEARCH_STUDIO_LIMIT: u32 = 3;

/// Route error type
///
/// Failures keep the success body's shape so clients can render them as
/// empty results.
#[derive(Debug)]
pub enum ApiError {
    /// Paged listing failed: `{results: [], pageInfo: {}}`
    Listing(UpstreamError),
    /// Search or compare failed: `{results: []}`
    Results(UpstreamError),
    /// Search text over the length limit
    QueryTooLong,
}

fn upstream_status(error: &UpstreamError) -> StatusCode {
    error
        .status()
        .and_then(|status| StatusCode::from_u16(status).ok())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Listing(e) => {
                let status = upstream_status(&e);
                warn!(error = %e, status = status.as_u16(), "Listing request failed");
                (status, Json(Page::<Value>::empty())).into_response()
            }
            ApiError::Results(e) => {
                let status = upstream_status(&e);
                warn!(error = %e, status = status.as_u16(), "Results request failed");
                (status, Json(json!({ "results": [] }))).into_response()
            }
            ApiError::QueryTooLong => (
                StatusCode::BAD_REQUEST,
                Json(SearchResponse {
                    results: Vec::new(),
                    error: Some("Query too long".to_string()),
                }),
            )
                .into_response(),
        }
    }
}

/// Response for compare endpoint.
#[derive(Debug, Serialize)]
pub struct CompareResponse {
    pub results: Vec<Value>,
}

/// GET /health
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "healthy"
    }))
}

/// GET /api/browse
pub async fn browse<C: Catalog>(
    State(state): State<Arc<AppState<C>>>,
    Query(params): Query<BrowseParams>,
) -> Result<Json<Page<Value>>, ApiError> {
    let query = params.media_query(&state.pagination, chrono::Utc::now().date_naive());
    debug!(category = ?params.category(), page = query.page, "Browse request");

    let page = state
        .catalog
        .media_page(&query)
        .await
        .map_err(ApiError::Listing)?;
    Ok(Json(page))
}

/// GET /api/characters
pub async fn characters<C: Catalog>(
    State(state): State<Arc<AppState<C>>>,
    Query(params): Query<ListParams>,
) -> Result<Json<Page<Value>>, ApiError> {
    let pagination = &state.pagination;
    let query = params.list_query(pagination.max_page, pagination.per_page);

    let page = state
        .catalog
        .character_page(&query)
        .await
        .map_err(ApiError::Listing)?;
    Ok(Json(page))
}

/// GET /api/staff
pub async fn staff<C: Catalog>(
    State(state): State<Arc<AppState<C>>>,
    Query(params): Query<ListParams>,
) -> Result<Json<Page<Value>>, ApiError> {
    let pagination = &state.pagination;
    let query = params.list_query(pagination.max_page, pagination.per_page_staff);

    let page = state
        .catalog
        .staff_page(&query)
        .await
        .map_err(ApiError::Listing)?;
    Ok(Json(page))
}

/// GET /api/studios
pub async fn studios<C: Catalog>(
    State(state): State<Arc<AppState<C>>>,
    Query(params): Query<ListParams>,
) -> Result<Json<Page<Value>>, ApiError> {
    let pagination = &state.pagination;
    let query = params.list_query(pagination.max_page, pagination.per_page);

    let page = state
        .catalog
        .studio_page(&query)
        .await
        .map_err(ApiError::Listing)?;
    Ok(Json(page))
}

/// GET /api/airing
pub async fn airing<C: Catalog>(
    State(state): State<Arc<AppState<C>>>,
    Query(params): Query<PageParams>,
) -> Result<Json<Page<Value>>, ApiError> {
    let pagination = &state.pagination;
    let page = clamp_page(params.page.as_deref(), pagination.max_page);

    let page = state
        .catalog
        .airing_page(page, pagination.per_page)
        .await
        .map_err(ApiError::Listing)?;
    Ok(Json(page))
}

/// GET /api/search
/// Quick search across media, characters and studios.
pub async fn search<C: Catalog>(
    State(state): State<Arc<AppState<C>>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, ApiError> {
    let text = params.q.as_deref().map(str::trim).unwrap_or_default();
    let length = text.chars().count();

    if length < state.pagination.min_query_length {
        return Ok(Json(SearchResponse::default()));
    }
    if length > state.pagination.max_query_length {
        return Err(ApiError::QueryTooLong);
    }

    let media_query = MediaQuery {
        search: Some(text.to_string()),
        page: 1,
        per_page: SEARCH_MEDIA_LIMIT,
        ..Default::default()
    };
    let matching = |per_page| ListQuery {
        search: Some(text.to_string()),
        sort: Some("SEARCH_MATCH".to_string()),
        page: 1,
        per_page,
    };
    let character_query = matching(SEARCH_CHARACTER_LIMIT);
    let studio_query = matching(SEARCH_STUDIO_LIMIT);

    let (media, characters, studios) = tokio::try_join!(
        state.catalog.media_page(&media_query),
        state.catalog.character_page(&character_query),
        state.catalog.studio_page(&studio_query),
    )
    .map_err(ApiError::Results)?;

    let results: Vec<SearchHit> = hits::<MediaSummary>(media.results)
        .chain(hits::<CharacterSummary>(characters.results))
        .chain(hits::<StudioSummary>(studios.results))
        .collect();

    debug!(query = %text, hits = results.len(), "Search complete");
    Ok(Json(SearchResponse {
        results,
        error: None,
    }))
}

/// Items that parse as `T`, converted to search hits
fn hits<T>(items: Vec<Value>) -> impl Iterator<Item = SearchHit>
where
    T: DeserializeOwned + Into<SearchHit>,
{
    items
        .into_iter()
        .filter_map(|item| serde_json::from_value::<T>(item).ok())
        .map(Into::into)
}

/// GET /api/compare
/// Fetch several media by id, in request order.
pub async fn compare<C: Catalog>(
    State(state): State<Arc<AppState<C>>>,
    Query(params): Query<CompareParams>,
) -> Result<Json<CompareResponse>, ApiError> {
    let ids = parse_compare_ids(
        params.ids.as_deref().unwrap_or_default(),
        state.pagination.max_compare_ids,
    );
    if ids.is_empty() {
        return Ok(Json(CompareResponse {
            results: Vec::new(),
        }));
    }

    let results = futures::future::try_join_all(ids.iter().map(|id| state.catalog.media_by_id(*id)))
        .await
        .map_err(ApiError::Results)?;
    Ok(Json(CompareResponse { results }))
}
