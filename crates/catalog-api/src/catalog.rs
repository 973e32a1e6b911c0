//! The catalog the read routes are served from.

use crate::error::UpstreamError;
use serde_json::Value;
use shared::{MediaSeason, MediaType, Page};
use std::future::Future;

/// Media listing request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaQuery {
    pub media_type: Option<MediaType>,
    pub search: Option<String>,
    pub genre: Option<String>,
    pub format: Option<String>,
    pub status: Option<String>,
    pub season: Option<MediaSeason>,
    pub season_year: Option<i32>,
    pub sort: Vec<String>,
    pub page: u32,
    pub per_page: u32,
}

impl MediaQuery {
    pub fn new(media_type: MediaType, page: u32, per_page: u32) -> Self {
        Self {
            media_type: Some(media_type),
            page,
            per_page,
            ..Default::default()
        }
    }

    pub fn sorted(mut self, sort: impl Into<String>) -> Self {
        self.sort = vec![sort.into()];
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }
}

/// Character, staff or studio listing request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListQuery {
    pub search: Option<String>,
    pub sort: Option<String>,
    pub page: u32,
    pub per_page: u32,
}

/// Read access to the media catalog
///
/// Items are passed through as JSON; routes only reshape the search results.
pub trait Catalog: Send + Sync {
    fn media_page(
        &self,
        query: &MediaQuery,
    ) -> impl Future<Output = Result<Page<Value>, UpstreamError>> + Send;

    fn character_page(
        &self,
        query: &ListQuery,
    ) -> impl Future<Output = Result<Page<Value>, UpstreamError>> + Send;

    fn staff_page(
        &self,
        query: &ListQuery,
    ) -> impl Future<Output = Result<Page<Value>, UpstreamError>> + Send;

    fn studio_page(
        &self,
        query: &ListQuery,
    ) -> impl Future<Output = Result<Page<Value>, UpstreamError>> + Send;

    /// Episodes that have already aired, newest first
    fn airing_page(
        &self,
        page: u32,
        per_page: u32,
    ) -> impl Future<Output = Result<Page<Value>, UpstreamError>> + Send;

    fn media_by_id(&self, id: i64) -> impl Future<Output = Result<Value, UpstreamError>> + Send;
}
