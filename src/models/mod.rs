use serde::{Deserialize, Serialize};

/// A child node returned by a Browse call, classified at the parse boundary
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentNode {
    Folder {
        id: String,
        title: String,
    },
    VideoLeaf {
        id: String,
        title: String,
        media_url: String,
    },
    /// Audio, images, playlists and anything else we do not catalog
    Other {
        id: String,
        title: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeMarker {
    pub season: i32,
    pub episode: i32,
}

/// Movie vs. series, decided by the presence of an episode marker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Movie,
    Series,
}

impl MediaKind {
    /// Path segment used by TMDB endpoints
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Movie => "movie",
            MediaKind::Series => "tv",
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaKind::Movie => write!(f, "movie"),
            MediaKind::Series => write!(f, "series"),
        }
    }
}

/// A flattened video leaf from one harvest
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoRecord {
    pub filename: String,
    pub search_title: String,
    #[serde(skip_serializing)]
    pub episode_marker: Option<EpisodeMarker>,
    pub media_url: String,
}

impl VideoRecord {
    pub fn kind(&self) -> MediaKind {
        if self.episode_marker.is_some() {
            MediaKind::Series
        } else {
            MediaKind::Movie
        }
    }
}

/// A video record merged with its resolved metadata; this is what gets published
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedRecord {
    #[serde(flatten)]
    pub record: VideoRecord,
    pub resolved_title: String,
    pub external_id: String,
    pub season: Option<i32>,
    pub episode: Option<i32>,
}

impl EnrichedRecord {
    pub fn new(record: VideoRecord, resolved_title: String, external_id: String) -> Self {
        let season = record.episode_marker.map(|m| m.season);
        let episode = record.episode_marker.map(|m| m.episode);
        Self {
            record,
            resolved_title,
            external_id,
            season,
            episode,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_follows_episode_marker() {
        let mut record = VideoRecord {
            filename: "Show.S01E02.mkv".to_string(),
            search_title: "show".to_string(),
            episode_marker: None,
            media_url: "http://nas/1".to_string(),
        };
        assert_eq!(record.kind(), MediaKind::Movie);

        record.episode_marker = Some(EpisodeMarker {
            season: 1,
            episode: 2,
        });
        assert_eq!(record.kind(), MediaKind::Series);
        assert_eq!(record.kind().as_str(), "tv");
    }

    #[test]
    fn test_enriched_record_serializes_flat() {
        let record = VideoRecord {
            filename: "Show.S01E02.mkv".to_string(),
            search_title: "show".to_string(),
            episode_marker: Some(EpisodeMarker {
                season: 1,
                episode: 2,
            }),
            media_url: "http://nas/1".to_string(),
        };
        let enriched = EnrichedRecord::new(record, "Show".to_string(), "tt0000001".to_string());
        let json = serde_json::to_value(&enriched).unwrap();

        assert_eq!(json["filename"], "Show.S01E02.mkv");
        assert_eq!(json["searchTitle"], "show");
        assert_eq!(json["mediaUrl"], "http://nas/1");
        assert_eq!(json["resolvedTitle"], "Show");
        assert_eq!(json["externalId"], "tt0000001");
        assert_eq!(json["season"], 1);
        assert_eq!(json["episode"], 2);
        assert!(json.get("episodeMarker").is_none());
    }
}
