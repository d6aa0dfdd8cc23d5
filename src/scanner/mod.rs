// Content tree harvester
// Walks a ContentDirectory depth-first and flattens every video leaf into a VideoRecord

pub mod title;

use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;

use crate::error::{DirectoryError, HarvestError};
use crate::models::{ContentNode, VideoRecord};
use crate::services::content_directory::ContentDirectory;

pub use title::{normalize, NormalizedTitle};

/// Default unwanted-content patterns (gambling promos disguised as videos)
pub const DEFAULT_BLOCKED_PATTERNS: &[&str] = &["1xbet"];

/// Case-insensitive substring filter for video titles
#[derive(Debug, Clone)]
pub struct TitleFilter {
    patterns: Vec<String>,
}

impl TitleFilter {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            patterns: patterns
                .into_iter()
                .map(|p| p.as_ref().trim().to_lowercase())
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }

    /// Check if a title matches any unwanted pattern
    pub fn is_blocked(&self, title: &str) -> bool {
        let title_lower = title.to_lowercase();
        self.patterns.iter().any(|p| title_lower.contains(p.as_str()))
    }
}

impl Default for TitleFilter {
    fn default() -> Self {
        Self::new(DEFAULT_BLOCKED_PATTERNS)
    }
}

/// Harvest every video leaf under `root_id`
///
/// A root browse failure is fatal. Failures below the root are logged and the
/// affected folder contributes nothing.
pub async fn harvest(
    directory: &dyn ContentDirectory,
    root_id: &str,
    filter: &TitleFilter,
    cancel: &CancellationToken,
) -> Result<Vec<VideoRecord>, HarvestError> {
    tracing::info!("Harvesting content directory from '{}'", root_id);

    let mut records = Vec::new();
    match harvest_folder(directory, root_id, filter, cancel, &mut records).await {
        Ok(()) => {}
        Err(FolderError::Cancelled) => return Err(HarvestError::Cancelled),
        Err(FolderError::Browse(source)) => {
            return Err(HarvestError::Traversal {
                object_id: root_id.to_string(),
                source,
            })
        }
    }

    tracing::info!("Harvest complete: {} video records", records.len());
    Ok(records)
}

enum FolderError {
    Browse(DirectoryError),
    Cancelled,
}

/// Browse one folder and append its records. Only this folder's own browse failure
/// is returned; subfolder failures are absorbed here.
fn harvest_folder<'a>(
    directory: &'a dyn ContentDirectory,
    object_id: &'a str,
    filter: &'a TitleFilter,
    cancel: &'a CancellationToken,
    records: &'a mut Vec<VideoRecord>,
) -> BoxFuture<'a, Result<(), FolderError>> {
    Box::pin(async move {
        if cancel.is_cancelled() {
            return Err(FolderError::Cancelled);
        }

        let children = directory
            .browse_children(object_id)
            .await
            .map_err(FolderError::Browse)?;

        for child in children {
            match child {
                ContentNode::Folder { id, title } => {
                    match harvest_folder(directory, &id, filter, cancel, records).await {
                        Ok(()) => {}
                        Err(FolderError::Cancelled) => return Err(FolderError::Cancelled),
                        Err(FolderError::Browse(e)) => {
                            tracing::warn!("Skipping folder '{}' ({}): {}", title, id, e);
                        }
                    }
                }
                ContentNode::VideoLeaf {
                    id,
                    title,
                    media_url,
                } => {
                    if filter.is_blocked(&title) {
                        tracing::debug!("Filtered unwanted item '{}' ({})", title, id);
                        continue;
                    }
                    records.push(build_record(title, media_url));
                }
                ContentNode::Other { id, title } => {
                    tracing::trace!("Skipping non-video '{}' ({})", title, id);
                }
            }
        }

        Ok(())
    })
}

fn build_record(filename: String, media_url: String) -> VideoRecord {
    let NormalizedTitle {
        search_title,
        episode_marker,
    } = normalize(&filename);

    VideoRecord {
        filename,
        search_title,
        episode_marker,
        media_url,
    }
}
