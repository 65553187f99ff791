use crate::models::{
    Episode, EpisodeDeep, SeriesDeepDetail, SeriesDeepDetailWire, SeriesDetail, SeriesDetailWire,
    SeriesSummary, SeriesSummaryWire, Subtitle, SubtitleWire,
};
use chrono::NaiveDateTime;
use log::warn;

/// Timestamp pattern used by the catalog API (not RFC 3339: no zone suffix)
const RELEASE_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Decode a search payload into summaries, preserving order.
pub fn decode_search(bytes: &[u8]) -> Result<Vec<SeriesSummary>, serde_json::Error> {
    let wire: Vec<SeriesSummaryWire> = serde_json::from_slice(bytes)?;
    Ok(wire
        .into_iter()
        .map(|s| SeriesSummary {
            id: s.id,
            title: s.title,
            episodes_count: s.episodes_count,
            label: s.label,
            favorite_id: s.favorite_id,
            thumbnail: s.thumbnail,
        })
        .collect())
}

/// Decode a shallow detail payload. The release date stays a raw string.
pub fn decode_detail(bytes: &[u8]) -> Result<SeriesDetail, serde_json::Error> {
    let wire: SeriesDetailWire = serde_json::from_slice(bytes)?;
    Ok(SeriesDetail {
        id: wire.id,
        title: wire.title,
        description: wire.description,
        release_date: wire.release_date,
        trailer: wire.trailer,
        country: wire.country,
        status: wire.status,
        kind: wire.kind,
        next_ep_date_id: wire.next_ep_date_id,
        episodes: wire
            .episodes
            .into_iter()
            .map(|ep| Episode {
                id: ep.id,
                number: ep.number,
                sub: ep.sub,
            })
            .collect(),
        episodes_count: wire.episodes_count,
        label: wire.label,
        favorite_id: wire.favorite_id,
        thumbnail: wire.thumbnail,
    })
}

/// Decode a deep detail payload. A bad release date is a soft failure:
/// logged and left unset, never failing the call.
pub fn decode_deep_detail(bytes: &[u8]) -> Result<SeriesDeepDetail, serde_json::Error> {
    let wire: SeriesDeepDetailWire = serde_json::from_slice(bytes)?;

    let release_date = parse_release_date(&wire.release_date);

    let episodes = wire
        .episodes
        .into_iter()
        .map(|ep| EpisodeDeep {
            id: ep.id,
            series_id: ep.series_id,
            number: ep.number,
            sub: ep.sub,
            source: ep.source,
            subtitles: ep.subtitles.into_iter().map(subtitle_from_wire).collect(),
        })
        .collect();

    Ok(SeriesDeepDetail {
        id: wire.id,
        title: wire.title,
        description: wire.description,
        release_date,
        trailer: wire.trailer,
        country: wire.country,
        status: wire.status,
        kind: wire.kind,
        next_ep_date_id: wire.next_ep_date_id,
        episodes,
        episodes_count: wire.episodes_count,
        label: wire.label,
        favorite_id: wire.favorite_id,
        thumbnail: wire.thumbnail,
    })
}

pub fn decode_subtitles(bytes: &[u8]) -> Result<Vec<Subtitle>, serde_json::Error> {
    let wire: Vec<SubtitleWire> = serde_json::from_slice(bytes)?;
    Ok(wire.into_iter().map(subtitle_from_wire).collect())
}

fn subtitle_from_wire(sub: SubtitleWire) -> Subtitle {
    Subtitle {
        src: sub.src,
        label: sub.label,
        lang: sub.lang,
        is_default: sub.is_default,
    }
}

fn parse_release_date(raw: &str) -> Option<NaiveDateTime> {
    if raw.is_empty() {
        return None;
    }
    match NaiveDateTime::parse_from_str(raw, RELEASE_DATE_FORMAT) {
        Ok(dt) => Some(dt),
        Err(e) => {
            warn!("date_parse_failed: {} ({})", raw, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_search_preserves_order_and_fields() {
        let payload = br#"[
            {"id": 11, "title": "First Drama", "episodesCount": 16, "label": "HD", "favoriteID": 7, "thumbnail": "https://img.example/a.jpg"},
            {"id": 22, "title": "Second Drama", "episodesCount": 8, "label": "", "favoriteID": 0, "thumbnail": "https://img.example/b.jpg"}
        ]"#;

        let series = decode_search(payload).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].id, 11);
        assert_eq!(series[0].title, "First Drama");
        assert_eq!(series[0].episodes_count, 16);
        assert_eq!(series[0].favorite_id, 7);
        assert_eq!(series[1].id, 22);
        assert_eq!(series[1].thumbnail, "https://img.example/b.jpg");
    }

    #[test]
    fn test_decode_search_malformed_fails() {
        assert!(decode_search(b"{not json").is_err());
    }

    #[test]
    fn test_decode_detail_episode_list() {
        let payload = br#"{
            "id": 5,
            "title": "X",
            "episodes": [
                {"id": 100, "number": 1.0, "sub": 1},
                {"id": 101, "number": 5.5, "sub": 0}
            ],
            "episodesCount": 2
        }"#;

        let detail = decode_detail(payload).unwrap();
        assert_eq!(detail.id, 5);
        assert_eq!(detail.episodes.len(), 2);
        assert_eq!(detail.episodes[1].number, 5.5);
        assert!(detail.label.is_none());
    }

    #[test]
    fn test_deep_detail_valid_date() {
        let payload = br#"{"id": 5, "title": "X", "releaseDate": "2023-04-01T12:30:00", "episodes": []}"#;
        let detail = decode_deep_detail(payload).unwrap();
        let dt = detail.release_date.unwrap();
        assert_eq!(dt.format("%Y-%m-%d").to_string(), "2023-04-01");
    }

    #[test]
    fn test_deep_detail_bad_date_is_soft() {
        let payload = br#"{"id": 5, "title": "X", "releaseDate": "not-a-date", "episodes": []}"#;
        let detail = decode_deep_detail(payload).unwrap();
        assert!(detail.release_date.is_none());
    }

    #[test]
    fn test_deep_detail_unresolved_source_is_empty() {
        let payload = br#"{
            "id": 5,
            "title": "X",
            "episodes": [{"id": 1, "seriesId": 5, "number": 1.0, "sub": 2}]
        }"#;
        let detail = decode_deep_detail(payload).unwrap();
        assert_eq!(detail.episodes[0].source, "");
        assert!(detail.episodes[0].subtitles.is_empty());
    }

    #[test]
    fn test_subtitle_wire_quirks() {
        // language key is "land" and the default flag is capitalized
        let payload = br#"[
            {"src": "https://cdn.example/en.srt", "label": "English", "land": "en", "Default": true},
            {"src": "https://cdn.example/km.srt", "label": "Khmer", "land": "km", "Default": false}
        ]"#;
        let subs = decode_subtitles(payload).unwrap();
        assert_eq!(subs[0].lang, "en");
        assert!(subs[0].is_default);
        assert_eq!(subs[1].lang, "km");
        assert!(!subs[1].is_default);
    }
}
