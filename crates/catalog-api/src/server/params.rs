//! Query-string parsing for the read routes.
//!
//! Parameters arrive as raw strings and are never rejected: bad numbers fall
//! back to defaults, unknown categories to trending.

use crate::catalog::{ListQuery, MediaQuery};
use chrono::NaiveDate;
use serde::Deserialize;
use shared::config::PaginationConfig;
use shared::{MediaSeason, MediaType};

#[derive(Debug, Default, Deserialize)]
pub struct BrowseParams {
    #[serde(rename = "type")]
    pub media_type: Option<String>,
    pub category: Option<String>,
    pub page: Option<String>,
    pub genre: Option<String>,
    pub format: Option<String>,
    pub status: Option<String>,
    pub season: Option<String>,
    pub year: Option<String>,
    pub sort: Option<String>,
}

/// `q` + `page`, shared by the character, staff and studio listings
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub q: Option<String>,
    pub page: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CompareParams {
    pub ids: Option<String>,
}

/// Browse listing selected by `category`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowseCategory {
    Trending,
    Top,
    Airing,
    Upcoming,
    Season,
    Filter,
}

impl BrowseCategory {
    pub fn from_param(value: Option<&str>) -> Self {
        match value {
            Some("top") => BrowseCategory::Top,
            Some("airing") => BrowseCategory::Airing,
            Some("upcoming") => BrowseCategory::Upcoming,
            Some("season") => BrowseCategory::Season,
            Some("filter") => BrowseCategory::Filter,
            _ => BrowseCategory::Trending,
        }
    }
}

/// Leading integer of `raw`, ignoring trailing junk ("12abc" -> 12)
///
/// Digit runs too long for `i64` saturate toward their sign.
pub fn parse_int_prefix(raw: &str) -> Option<i64> {
    let raw = raw.trim_start();
    let (negative, digits) = match raw.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, raw.strip_prefix('+').unwrap_or(raw)),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    let digits = &digits[..end];
    if digits.is_empty() {
        return None;
    }

    let saturated = if negative { i64::MIN } else { i64::MAX };
    let value = digits.bytes().try_fold(0i64, |acc, digit| {
        let digit = i64::from(digit - b'0');
        let acc = acc.checked_mul(10)?;
        if negative {
            acc.checked_sub(digit)
        } else {
            acc.checked_add(digit)
        }
    });
    Some(value.unwrap_or(saturated))
}

/// Page number clamped into `[1, max_page]`; anything unparseable is 1
pub fn clamp_page(raw: Option<&str>, max_page: u32) -> u32 {
    let page = raw.and_then(parse_int_prefix).unwrap_or(1);
    page.clamp(1, i64::from(max_page.max(1))) as u32
}

/// Empty strings count as absent
fn present(value: &Option<String>) -> Option<String> {
    value.as_deref().filter(|s| !s.is_empty()).map(str::to_string)
}

impl BrowseParams {
    pub fn category(&self) -> BrowseCategory {
        BrowseCategory::from_param(self.category.as_deref())
    }

    /// Upstream query for this request; `today` picks the current season
    pub fn media_query(&self, pagination: &PaginationConfig, today: NaiveDate) -> MediaQuery {
        let media_type = MediaType::from_param(self.media_type.as_deref());
        let page = clamp_page(self.page.as_deref(), pagination.max_page);
        let base = MediaQuery::new(media_type, page, pagination.per_page);

        match self.category() {
            BrowseCategory::Trending => base.sorted("TRENDING_DESC"),
            BrowseCategory::Top => base.sorted("SCORE_DESC"),
            BrowseCategory::Airing => base.with_status("RELEASING").sorted("TRENDING_DESC"),
            BrowseCategory::Upcoming => base
                .with_status("NOT_YET_RELEASED")
                .sorted("POPULARITY_DESC"),
            BrowseCategory::Season => {
                let (season, year) = MediaSeason::of(today);
                MediaQuery {
                    season: Some(season),
                    season_year: Some(year),
                    ..base.sorted("POPULARITY_DESC")
                }
            }
            BrowseCategory::Filter => {
                let sort = present(&self.sort).unwrap_or_else(|| "POPULARITY_DESC".to_string());
                MediaQuery {
                    genre: present(&self.genre),
                    format: present(&self.format),
                    status: present(&self.status),
                    season: present(&self.season).and_then(|s| s.parse().ok()),
                    season_year: self
                        .year
                        .as_deref()
                        .and_then(parse_int_prefix)
                        .filter(|year| *year != 0)
                        .and_then(|year| i32::try_from(year).ok()),
                    ..base.sorted(sort)
                }
            }
        }
    }
}

impl ListParams {
    /// Listing sorted by relevance when searching, by favourites otherwise
    pub fn list_query(&self, max_page: u32, per_page: u32) -> ListQuery {
        let search = present(&self.q);
        let sort = if search.is_some() {
            "SEARCH_MATCH"
        } else {
            "FAVOURITES_DESC"
        };

        ListQuery {
            search,
            sort: Some(sort.to_string()),
            page: clamp_page(self.page.as_deref(), max_page),
            per_page,
        }
    }
}

/// Positive ids from a comma-separated list, at most `max`
pub fn parse_compare_ids(raw: &str, max: usize) -> Vec<i64> {
    raw.split(',')
        .filter_map(|part| parse_int_prefix(part.trim()))
        .filter(|id| *id > 0)
        .take(max)
        .collect()
}
