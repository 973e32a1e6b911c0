//! Data models shared by the read API and its clients.
//!
//! The wire shape of every listing is `{results, pageInfo}`; items themselves
//! stay opaque to the paging layer.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// One page of a paginated listing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
    #[serde(default)]
    pub page_info: PageInfo,
}

/// Pagination metadata
///
/// Every field is optional on the wire; a missing `hasNextPage` means the
/// listing is finished.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_next_page: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub per_page: Option<u32>,
}

impl<T> Page<T> {
    pub fn new(results: Vec<T>, has_next_page: bool) -> Self {
        Self {
            results,
            page_info: PageInfo {
                has_next_page: Some(has_next_page),
                ..Default::default()
            },
        }
    }

    /// Empty page with empty page info, the body returned on upstream failure
    pub fn empty() -> Self {
        Self {
            results: Vec::new(),
            page_info: PageInfo::default(),
        }
    }

    pub fn with_total(mut self, total: u64) -> Self {
        self.page_info.total = Some(total);
        self
    }

    /// Whether another page follows; fails closed on a missing flag
    pub fn has_next(&self) -> bool {
        self.page_info.has_next_page.unwrap_or(false)
    }

    pub fn total(&self) -> Option<u64> {
        self.page_info.total
    }
}

/// Media type of a listing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MediaType {
    #[default]
    Anime,
    Manga,
}

impl MediaType {
    /// Anything other than `MANGA` selects anime
    pub fn from_param(value: Option<&str>) -> Self {
        match value {
            Some("MANGA") => MediaType::Manga,
            _ => MediaType::Anime,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Anime => "ANIME",
            MediaType::Manga => "MANGA",
        }
    }
}

impl std::fmt::Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Broadcast season
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MediaSeason {
    Winter,
    Spring,
    Summer,
    Fall,
}

impl MediaSeason {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaSeason::Winter => "WINTER",
            MediaSeason::Spring => "SPRING",
            MediaSeason::Summer => "SUMMER",
            MediaSeason::Fall => "FALL",
        }
    }

    /// Season and year containing `date` (quarters, Winter = Jan-Mar)
    pub fn of(date: NaiveDate) -> (Self, i32) {
        let season = match date.month() {
            1..=3 => MediaSeason::Winter,
            4..=6 => MediaSeason::Spring,
            7..=9 => MediaSeason::Summer,
            _ => MediaSeason::Fall,
        };
        (season, date.year())
    }
}

impl std::fmt::Display for MediaSeason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MediaSeason {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "WINTER" => Ok(MediaSeason::Winter),
            "SPRING" => Ok(MediaSeason::Spring),
            "SUMMER" => Ok(MediaSeason::Summer),
            "FALL" => Ok(MediaSeason::Fall),
            _ => Err(anyhow::anyhow!("Invalid season: {}", s)),
        }
    }
}

/// Filter set for the filtered media listing
///
/// Compared by equality only; an all-`None` set is the unfiltered listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MediaFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub season: Option<MediaSeason>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
}

impl MediaFilters {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Query-string pairs for the set fields, in a stable order
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(genre) = &self.genre {
            pairs.push(("genre", genre.clone()));
        }
        if let Some(format) = &self.format {
            pairs.push(("format", format.clone()));
        }
        if let Some(status) = &self.status {
            pairs.push(("status", status.clone()));
        }
        if let Some(season) = self.season {
            pairs.push(("season", season.to_string()));
        }
        if let Some(year) = self.year {
            pairs.push(("year", year.to_string()));
        }
        if let Some(sort) = &self.sort {
            pairs.push(("sort", sort.clone()));
        }
        pairs
    }
}

/// Kind of a quick-search hit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchKind {
    Anime,
    Manga,
    Character,
    Studio,
}

/// Flattened quick-search result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: i64,
    pub kind: SearchKind,
    pub title: String,
    pub cover: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub favourites: Option<i64>,
}

/// Quick-search response body
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub results: Vec<SearchHit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_page_missing_has_next_fails_closed() {
        let page: Page<u32> = serde_json::from_value(json!({
            "results": [1, 2],
            "pageInfo": { "total": 40 }
        }))
        .unwrap();
        assert!(!page.has_next());
        assert_eq!(page.total(), Some(40));

        let bare: Page<u32> = serde_json::from_value(json!({})).unwrap();
        assert!(bare.results.is_empty());
        assert!(!bare.has_next());
    }

    #[test]
    fn test_empty_page_serializes_empty_page_info() {
        let body = serde_json::to_value(Page::<u32>::empty()).unwrap();
        assert_eq!(body, json!({ "results": [], "pageInfo": {} }));
    }

    #[test]
    fn test_page_info_camel_case() {
        let page = Page::new(vec!["a"], true).with_total(7);
        let body = serde_json::to_value(&page).unwrap();
        assert_eq!(body["pageInfo"]["hasNextPage"], json!(true));
        assert_eq!(body["pageInfo"]["total"], json!(7));
    }

    #[test]
    fn test_media_type_from_param() {
        assert_eq!(MediaType::from_param(Some("MANGA")), MediaType::Manga);
        assert_eq!(MediaType::from_param(Some("manga")), MediaType::Anime);
        assert_eq!(MediaType::from_param(None), MediaType::Anime);
    }

    #[test]
    fn test_season_of_date() {
        let date = |m| NaiveDate::from_ymd_opt(2025, m, 15).unwrap();
        assert_eq!(MediaSeason::of(date(1)), (MediaSeason::Winter, 2025));
        assert_eq!(MediaSeason::of(date(4)), (MediaSeason::Spring, 2025));
        assert_eq!(MediaSeason::of(date(9)), (MediaSeason::Summer, 2025));
        assert_eq!(MediaSeason::of(date(12)), (MediaSeason::Fall, 2025));
    }

    #[test]
    fn test_filter_query_pairs() {
        let filters = MediaFilters {
            genre: Some("Action".to_string()),
            season: Some(MediaSeason::Fall),
            year: Some(2024),
            ..Default::default()
        };
        assert_eq!(
            filters.query_pairs(),
            vec![
                ("genre", "Action".to_string()),
                ("season", "FALL".to_string()),
                ("year", "2024".to_string()),
            ]
        );
        assert!(!filters.is_empty());
        assert!(MediaFilters::default().is_empty());
    }
}
