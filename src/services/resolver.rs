// Metadata resolution: harvested record -> TMDB match -> IMDB id
// Records are resolved one at a time so the operator log reads in harvest order

use async_trait::async_trait;

use crate::error::ExternalApiError;
use crate::models::{EnrichedRecord, MediaKind, VideoRecord};

/// One search result, reduced to what title selection needs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchHit {
    pub id: i64,
    /// Title in the work's original language
    pub original_title: Option<String>,
    /// Title in the requested language (movies only on TMDB)
    pub localized_title: Option<String>,
    /// Generic display name
    pub name: Option<String>,
}

impl SearchHit {
    /// original language > localized > generic
    pub fn display_title(&self) -> Option<&str> {
        [&self.original_title, &self.localized_title, &self.name]
            .into_iter()
            .filter_map(|t| t.as_deref())
            .map(str::trim)
            .find(|t| !t.is_empty())
    }
}

/// Movie/TV search API
#[async_trait]
pub trait MetadataSearch: Send + Sync {
    /// Ranked results, best first
    async fn search(&self, query: &str, kind: MediaKind) -> Result<Vec<SearchHit>, ExternalApiError>;

    /// IMDB id for a search result, if the provider knows one
    async fn external_id(&self, id: i64, kind: MediaKind) -> Result<Option<String>, ExternalApiError>;
}

#[derive(Debug)]
pub enum Resolution {
    Matched(EnrichedRecord),
    Unmatched(VideoRecord),
}

/// Outcome of resolving a whole harvest
#[derive(Debug, Default)]
pub struct ResolveOutcome {
    pub enriched: Vec<EnrichedRecord>,
    pub unmatched: usize,
    pub failed: usize,
}

/// Resolve a single record. The first search hit is trusted as-is.
pub async fn resolve(
    search: &dyn MetadataSearch,
    record: VideoRecord,
) -> Result<Resolution, ExternalApiError> {
    let kind = record.kind();
    let hits = search.search(&record.search_title, kind).await?;

    let Some(best) = hits.into_iter().next() else {
        return Ok(Resolution::Unmatched(record));
    };

    let Some(external_id) = search.external_id(best.id, kind).await? else {
        tracing::debug!("TMDB {} {} has no IMDB id", kind, best.id);
        return Ok(Resolution::Unmatched(record));
    };

    let resolved_title = best
        .display_title()
        .map(str::to_string)
        .unwrap_or_else(|| record.search_title.clone());

    Ok(Resolution::Matched(EnrichedRecord::new(
        record,
        resolved_title,
        external_id,
    )))
}

/// Resolve every record in order. Unmatched records and per-record API failures are
/// logged and left out of the output.
pub async fn resolve_all(search: &dyn MetadataSearch, records: Vec<VideoRecord>) -> ResolveOutcome {
    let mut outcome = ResolveOutcome::default();

    for record in records {
        let filename = record.filename.clone();
        match resolve(search, record).await {
            Ok(Resolution::Matched(enriched)) => {
                let episode = match (enriched.season, enriched.episode) {
                    (Some(s), Some(e)) => format!(" S{:02}E{:02}", s, e),
                    _ => String::new(),
                };
                tracing::info!(
                    "✓ {} -> {}{} [{}]",
                    filename,
                    enriched.resolved_title,
                    episode,
                    enriched.external_id
                );
                outcome.enriched.push(enriched);
            }
            Ok(Resolution::Unmatched(record)) => {
                tracing::info!(
                    "✗ {} (no {} match for '{}')",
                    filename,
                    record.kind(),
                    record.search_title
                );
                outcome.unmatched += 1;
            }
            Err(e) => {
                tracing::warn!("! {}: {}", filename, e);
                outcome.failed += 1;
            }
        }
    }

    outcome
}
