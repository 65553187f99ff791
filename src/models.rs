use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Series entry as returned by catalog search
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SeriesSummary {
    pub id: i32,
    pub title: String,
    pub episodes_count: i32,
    pub label: String,
    pub favorite_id: i32,
    pub thumbnail: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Episode {
    pub id: i32,
    /// Fractional because specials use non-integer numbering (e.g. 5.5)
    pub number: f64,
    pub sub: i32,
}

/// Shallow series detail: metadata and episode list, no media sources
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SeriesDetail {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub release_date: String,
    pub trailer: String,
    pub country: String,
    pub status: String,
    pub kind: String,
    pub next_ep_date_id: i32,
    pub episodes: Vec<Episode>,
    pub episodes_count: i32,
    pub label: Option<String>,
    pub favorite_id: i32,
    pub thumbnail: String,
}

/// Deep series detail: episodes carry resolved media sources once the
/// orchestrator has run; until then `source` is empty (media unresolved).
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SeriesDeepDetail {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub release_date: Option<NaiveDateTime>,
    pub trailer: String,
    pub country: String,
    pub status: String,
    pub kind: String,
    pub next_ep_date_id: i32,
    pub episodes: Vec<EpisodeDeep>,
    pub episodes_count: i32,
    pub label: Option<String>,
    pub favorite_id: i32,
    pub thumbnail: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct EpisodeDeep {
    pub id: i32,
    pub series_id: i32,
    pub number: f64,
    pub sub: i32,
    /// Proxy-relative path once resolved, empty while unresolved
    pub source: String,
    pub subtitles: Vec<Subtitle>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Subtitle {
    pub src: String,
    pub label: String,
    pub lang: String,
    pub is_default: bool,
}

// Wire shapes. The catalog API uses camelCase and omits fields freely, so
// everything defaults. Quirks preserved from the live payloads: subtitle
// language is keyed "land" and the default flag is capitalized.

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct SeriesSummaryWire {
    pub id: i32,
    pub title: String,
    #[serde(rename = "episodesCount")]
    pub episodes_count: i32,
    pub label: String,
    #[serde(rename = "favoriteID", alias = "favoriteId")]
    pub favorite_id: i32,
    pub thumbnail: String,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct EpisodeWire {
    pub id: i32,
    pub number: f64,
    pub sub: i32,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct SeriesDetailWire {
    pub id: i32,
    pub title: String,
    pub description: String,
    #[serde(rename = "releaseDate")]
    pub release_date: String,
    pub trailer: String,
    pub country: String,
    pub status: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "nextEpDateID", alias = "nextEpDateId")]
    pub next_ep_date_id: i32,
    pub episodes: Vec<EpisodeWire>,
    #[serde(rename = "episodesCount")]
    pub episodes_count: i32,
    pub label: Option<String>,
    #[serde(rename = "favoriteID", alias = "favoriteId")]
    pub favorite_id: i32,
    pub thumbnail: String,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct EpisodeDeepWire {
    pub id: i32,
    #[serde(rename = "seriesId")]
    pub series_id: i32,
    pub number: f64,
    pub sub: i32,
    #[serde(rename = "src")]
    pub source: String,
    pub subtitles: Vec<SubtitleWire>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct SeriesDeepDetailWire {
    pub id: i32,
    pub title: String,
    pub description: String,
    #[serde(rename = "releaseDate")]
    pub release_date: String,
    pub trailer: String,
    pub country: String,
    pub status: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "nextEpDateID", alias = "nextEpDateId")]
    pub next_ep_date_id: i32,
    pub episodes: Vec<EpisodeDeepWire>,
    #[serde(rename = "episodesCount")]
    pub episodes_count: i32,
    pub label: Option<String>,
    #[serde(rename = "favoriteID", alias = "favoriteId")]
    pub favorite_id: i32,
    pub thumbnail: String,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct SubtitleWire {
    pub src: String,
    pub label: String,
    #[serde(rename = "land")]
    pub lang: String,
    #[serde(rename = "Default")]
    pub is_default: bool,
}
