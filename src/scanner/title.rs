// Filename -> search title normalization
// Pure text transforms, no I/O. Heuristic by nature: the goal is a query string that
// TMDB ranks well, not a perfect title.

use regex::Regex;
use std::sync::LazyLock;

use crate::models::EpisodeMarker;

static RE_SEASON_EP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)s(\d{1,2})e(\d{1,2})").unwrap());
static RE_RESOLUTION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)1080p|720p").unwrap());
static RE_RELEASE_TAGS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:(?:ddp|dd|aac|eac3|ac3|dts)?[257] [01]|2160p|1080p|720p|480p|4k|uhd|x264|x265|h264|h265|hevc|avc|xvid|divx|10bit|hdr|bluray|brrip|bdrip|dvdrip|hdrip|hdtv|webrip|webdl|web dl|remux|proper|repack|rarbg|yts|yify|ettv|eztv|galaxyrg|tigole|qxr|psa|sparks|fgt|evo|ion10|mkvcage|aac2|aac|eac3|ac3|ddp5|ddp|dd5|dts|atmos|mkv|mp4|m4v|avi)\b",
    )
    .unwrap()
});
static RE_TRAILING_YEAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s\d{4}$").unwrap());
static RE_SPACE_COLLAPSE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Result of normalizing a raw filename
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedTitle {
    pub search_title: String,
    pub episode_marker: Option<EpisodeMarker>,
}

/// Extract `SxxEyy` from anywhere in a filename
/// e.g. "Show.Name.S02E05.1080p" -> season 2, episode 5
pub fn extract_season_episode(raw: &str) -> Option<EpisodeMarker> {
    let caps = RE_SEASON_EP.captures(raw)?;
    let season = caps.get(1)?.as_str().parse().ok()?;
    let episode = caps.get(2)?.as_str().parse().ok()?;
    Some(EpisodeMarker { season, episode })
}

/// Turn a raw filename into a search string plus optional episode marker
///
/// "The.Show.S01E02.720p.BluRay-RARBG" -> "the show" (S1E2)
/// "Movie.Name.2020.1080p.BluRay-RARBG.mkv" -> "movie name"
pub fn normalize(raw: &str) -> NormalizedTitle {
    let mut title = raw.to_lowercase();

    let episode_marker = extract_season_episode(&title);
    if let Some(start) = RE_SEASON_EP.find(&title).map(|m| m.start()) {
        title.truncate(start);
    }

    if let Some(start) = RE_RESOLUTION.find(&title).map(|m| m.start()) {
        title.truncate(start);
    }

    let title = title.replace(['.', '{', '}', '-'], " ");
    let title = RE_RELEASE_TAGS.replace_all(&title, "");
    let title = RE_TRAILING_YEAR.replace(title.trim(), "");
    let title = RE_SPACE_COLLAPSE.replace_all(&title, " ");

    NormalizedTitle {
        search_title: title.trim().to_string(),
        episode_marker,
    }
}
