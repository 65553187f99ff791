//! Converts recovered origin URLs into proxy-relative paths.
//!
//! The streaming proxy recognizes exactly three shapes:
//! `{proxy_base}/m3u8/{host-and-path}`, `{proxy_base}/mp4?url={encoded}` and
//! `{proxy_base}/subtitle/{host-and-path}`. Raw origin URLs are never
//! persisted; unclassified URLs pass through unchanged.

use crate::helpers::mime_from_url;

/// Classification of a recovered media URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    /// HLS manifest, served through the m3u8 proxy
    Streaming,
    /// Progressive file, served through the mp4 proxy
    Progressive,
    /// Anything else, passed through unrewritten
    Unclassified,
}

/// Classify by extension and guessed content type.
pub fn classify(url: &str) -> MediaKind {
    let mime = mime_from_url(url);
    if url.contains(".m3u8") || mime == "application/vnd.apple.mpegurl" {
        MediaKind::Streaming
    } else if url.contains(".mp4") || mime == "video/mp4" {
        MediaKind::Progressive
    } else {
        MediaKind::Unclassified
    }
}

/// Rewrite a recovered absolute URL into its proxy-relative form.
pub fn rewrite(proxy_base: &str, url: &str, kind: MediaKind) -> String {
    match kind {
        MediaKind::Streaming => format!("{}/m3u8/{}", proxy_base, strip_scheme(url)),
        MediaKind::Progressive => {
            format!("{}/mp4?url={}", proxy_base, urlencoding::encode(url))
        }
        MediaKind::Unclassified => url.to_string(),
    }
}

/// Subtitle URLs always take the subtitle-proxy shape.
pub fn rewrite_subtitle(proxy_base: &str, url: &str) -> String {
    format!("{}/subtitle/{}", proxy_base, strip_scheme(url))
}

fn strip_scheme(url: &str) -> &str {
    url.strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url)
}
