//! Helper functions shared across the resolution pipeline:
//! - Title slugification for episode page URLs
//! - MIME guessing from media URLs
//! - Loose episode-number matching

use regex::Regex;

/// Turn a series title into the slug used by episode page URLs.
/// Spaces and parentheses become dashes, runs of dashes collapse.
pub fn slugify(title: &str) -> String {
    let slug = title
        .trim()
        .replace(' ', "-")
        .replace('(', "-")
        .replace(')', "-");

    let re = Regex::new(r"-+").expect("static regex");
    re.replace_all(&slug, "-").into_owned()
}

/// Guess a media MIME type from a URL, by extension only.
pub fn mime_from_url(url: &str) -> &'static str {
    if url.contains(".m3u8") {
        return "application/vnd.apple.mpegurl";
    }
    if url.contains(".mp4") {
        return "video/mp4";
    }
    ""
}

/// Loose episode-number comparison: both sides are formatted as whole-number
/// strings before comparing, so fractional specials round (5.5 matches 6).
pub fn episode_number_matches(number: f64, requested: i32) -> bool {
    format!("{:.0}", number) == format!("{}", requested)
}
