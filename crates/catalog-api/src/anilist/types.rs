//! AniList response types.
//!
//! Listings stay untyped JSON; only the envelope and the few fields the
//! quick search flattens are modelled here.

use serde::Deserialize;
use serde_json::{Map, Value};
use shared::{MediaType, PageInfo, SearchHit, SearchKind};

/// GraphQL response envelope
#[derive(Debug, Deserialize)]
pub struct GraphQlResponse {
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub errors: Vec<GraphQlError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphQlError {
    pub message: String,
    #[serde(default)]
    pub status: Option<u16>,
}

/// `data.Page` of a paged query
#[derive(Debug, Deserialize)]
pub struct RawPage {
    #[serde(rename = "Page")]
    pub page: RawPageBody,
}

#[derive(Debug, Deserialize)]
pub struct RawPageBody {
    #[serde(rename = "pageInfo", default)]
    pub page_info: PageInfo,
    /// The list field (`media`, `characters`, ...) next to `pageInfo`
    #[serde(flatten)]
    pub lists: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MediaTitle {
    pub romaji: Option<String>,
    pub english: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Image {
    pub large: Option<String>,
    pub medium: Option<String>,
}

impl Image {
    fn preferred(self) -> Option<String> {
        non_empty(self.medium).or_else(|| non_empty(self.large))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaSummary {
    pub id: i64,
    #[serde(rename = "type")]
    pub media_type: Option<MediaType>,
    #[serde(default)]
    pub title: MediaTitle,
    pub cover_image: Option<Image>,
    pub format: Option<String>,
    pub season_year: Option<i32>,
    pub average_score: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CharacterName {
    pub full: Option<String>,
    pub first: Option<String>,
    pub last: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CharacterSummary {
    pub id: i64,
    #[serde(default)]
    pub name: CharacterName,
    pub image: Option<Image>,
    pub favourites: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StudioSummary {
    pub id: i64,
    pub name: String,
    pub favourites: Option<i64>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

impl From<MediaSummary> for SearchHit {
    fn from(media: MediaSummary) -> Self {
        let kind = match media.media_type {
            Some(MediaType::Manga) => SearchKind::Manga,
            _ => SearchKind::Anime,
        };
        let title = non_empty(media.title.english)
            .or_else(|| non_empty(media.title.romaji))
            .unwrap_or_else(|| "Unknown".to_string());

        SearchHit {
            id: media.id,
            kind,
            title,
            cover: media.cover_image.and_then(Image::preferred),
            format: media.format,
            year: media.season_year,
            score: media.average_score,
            favourites: None,
        }
    }
}

impl From<CharacterSummary> for SearchHit {
    fn from(character: CharacterSummary) -> Self {
        let name = character.name;
        let title = non_empty(name.full).unwrap_or_else(|| {
            let joined = format!(
                "{} {}",
                name.first.unwrap_or_default(),
                name.last.unwrap_or_default()
            );
            let joined = joined.trim();
            if joined.is_empty() {
                "Unknown".to_string()
            } else {
                joined.to_string()
            }
        });

        SearchHit {
            id: character.id,
            kind: SearchKind::Character,
            title,
            cover: character.image.and_then(Image::preferred),
            format: None,
            year: None,
            score: None,
            favourites: character.favourites,
        }
    }
}

impl From<StudioSummary> for SearchHit {
    fn from(studio: StudioSummary) -> Self {
        SearchHit {
            id: studio.id,
            kind: SearchKind::Studio,
            title: studio.name,
            cover: None,
            format: None,
            year: None,
            score: None,
            favourites: studio.favourites,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_raw_page_extracts_list() {
        let raw: RawPage = serde_json::from_value(json!({
            "Page": {
                "pageInfo": { "hasNextPage": true, "total": 5000, "currentPage": 1 },
                "media": [{ "id": 1 }, { "id": 2 }]
            }
        }))
        .unwrap();

        assert_eq!(raw.page.page_info.has_next_page, Some(true));
        assert_eq!(raw.page.lists["media"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_media_hit_title_fallbacks() {
        let media: MediaSummary = serde_json::from_value(json!({
            "id": 21,
            "type": "MANGA",
            "title": { "romaji": "One Piece", "english": "" },
            "coverImage": { "large": "l.jpg", "medium": null },
            "format": "MANGA",
            "seasonYear": null,
            "averageScore": 92
        }))
        .unwrap();

        let hit = SearchHit::from(media);
        assert_eq!(hit.kind, SearchKind::Manga);
        assert_eq!(hit.title, "One Piece");
        assert_eq!(hit.cover.as_deref(), Some("l.jpg"));
        assert_eq!(hit.score, Some(92));
    }

    #[test]
    fn test_character_hit_joins_name_parts() {
        let character: CharacterSummary = serde_json::from_value(json!({
            "id": 40,
            "name": { "full": null, "first": "Monkey D.", "last": "Luffy" },
            "favourites": 90000
        }))
        .unwrap();

        let hit = SearchHit::from(character);
        assert_eq!(hit.title, "Monkey D. Luffy");
        assert_eq!(hit.kind, SearchKind::Character);
        assert_eq!(hit.cover, None);

        let nameless: CharacterSummary = serde_json::from_value(json!({ "id": 1 })).unwrap();
        assert_eq!(SearchHit::from(nameless).title, "Unknown");
    }
}
