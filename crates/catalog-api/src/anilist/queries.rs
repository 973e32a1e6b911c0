//! GraphQL documents sent to AniList.

/// Paged media listing with every filter the browse routes use
pub const MEDIA_PAGE_QUERY: &str = r#"
query ($page: Int, $perPage: Int, $type: MediaType, $search: String, $genre: String,
       $format: MediaFormat, $status: MediaStatus, $season: MediaSeason,
       $seasonYear: Int, $sort: [MediaSort]) {
  Page(page: $page, perPage: $perPage) {
    pageInfo { total currentPage lastPage hasNextPage perPage }
    media(type: $type, search: $search, genre: $genre, format: $format, status: $status,
          season: $season, seasonYear: $seasonYear, sort: $sort) {
      id idMal type format status episodes chapters duration
      title { romaji english native }
      coverImage { extraLarge large medium color }
      bannerImage averageScore meanScore popularity favourites
      season seasonYear genres
      nextAiringEpisode { airingAt timeUntilAiring episode }
    }
  }
}
"#;

pub const MEDIA_BY_ID_QUERY: &str = r#"
query ($id: Int) {
  Media(id: $id) {
    id idMal type format status episodes chapters volumes duration source
    title { romaji english native }
    coverImage { extraLarge large medium color }
    bannerImage description averageScore meanScore popularity favourites
    season seasonYear genres
    startDate { year month day }
    endDate { year month day }
    studios(isMain: true) { nodes { id name } }
    stats { scoreDistribution { score amount } }
    nextAiringEpisode { airingAt timeUntilAiring episode }
  }
}
"#;

pub const CHARACTERS_PAGE_QUERY: &str = r#"
query ($page: Int, $perPage: Int, $search: String, $sort: [CharacterSort]) {
  Page(page: $page, perPage: $perPage) {
    pageInfo { total currentPage lastPage hasNextPage perPage }
    characters(search: $search, sort: $sort) {
      id favourites
      name { full first last native }
      image { large medium }
    }
  }
}
"#;

pub const STAFF_PAGE_QUERY: &str = r#"
query ($page: Int, $perPage: Int, $search: String, $sort: [StaffSort]) {
  Page(page: $page, perPage: $perPage) {
    pageInfo { total currentPage lastPage hasNextPage perPage }
    staff(search: $search, sort: $sort) {
      id favourites primaryOccupations
      name { full native }
      image { large medium }
    }
  }
}
"#;

/// Studios with a preview of their most popular productions
pub const STUDIOS_PAGE_QUERY: &str = r#"
query ($page: Int, $perPage: Int, $search: String, $sort: [StudioSort]) {
  Page(page: $page, perPage: $perPage) {
    pageInfo { total currentPage lastPage hasNextPage perPage }
    studios(search: $search, sort: $sort) {
      id name isAnimationStudio siteUrl favourites
      media(page: 1, perPage: 6, sort: POPULARITY_DESC) {
        pageInfo { hasNextPage }
        nodes { id title { romaji english } type format coverImage { large medium } siteUrl }
      }
    }
  }
}
"#;

/// Episodes aired before `$airingAtLesser`, newest first
pub const AIRED_EPISODES_QUERY: &str = r#"
query ($page: Int, $perPage: Int, $airingAtLesser: Int) {
  Page(page: $page, perPage: $perPage) {
    pageInfo { total currentPage lastPage hasNextPage perPage }
    airingSchedules(airingAt_lesser: $airingAtLesser, sort: [TIME_DESC]) {
      id airingAt episode
      media {
        id type format
        title { romaji english }
        coverImage { large medium }
      }
    }
  }
}
"#;
