// One harvest run: harvest -> change gate -> resolve -> publish
// Everything is awaited sequentially; concurrent runs are not supported

use chrono::Local;
use tokio_util::sync::CancellationToken;

use crate::error::{ConfigError, PipelineError};
use crate::scanner::{self, TitleFilter};
use crate::services::catalog::CatalogSink;
use crate::services::content_directory::ContentDirectory;
use crate::services::fingerprint::{ChangeDetector, FingerprintStore};
use crate::services::resolver::{self, MetadataSearch};

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Skip the change gate and reprocess everything
    pub force: bool,
    /// Resolve metadata but do not publish
    pub dry_run: bool,
}

/// Explicitly constructed collaborators for a run
pub struct Pipeline<'a> {
    pub directory: &'a dyn ContentDirectory,
    pub search: &'a dyn MetadataSearch,
    /// Only required when publishing
    pub catalog: Option<&'a dyn CatalogSink>,
    pub filter: TitleFilter,
    pub root_id: String,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub harvested: usize,
    /// None when the change gate was bypassed
    pub changed: Option<bool>,
    pub matched: usize,
    pub unmatched: usize,
    pub failed: usize,
    pub published: bool,
}

impl Pipeline<'_> {
    pub async fn run(
        &self,
        store: &mut dyn FingerprintStore,
        options: RunOptions,
        cancel: &CancellationToken,
    ) -> Result<RunSummary, PipelineError> {
        let mut summary = RunSummary::default();

        let records = scanner::harvest(self.directory, &self.root_id, &self.filter, cancel).await?;
        summary.harvested = records.len();

        if options.force {
            tracing::info!("Forced run, skipping change detection");
        } else {
            let mut detector = ChangeDetector::new(store);
            // Dry runs never write last_update
            let changed = if options.dry_run {
                detector.peek(&records)
            } else {
                detector.has_changed(&records).await?
            };
            summary.changed = Some(changed);
            if !changed {
                tracing::info!("No changes since last update, nothing to do");
                return Ok(summary);
            }
        }

        tracing::info!(
            "[{}] Fetching metadata for {} records...",
            Local::now().format("%Y-%m-%d %H:%M:%S"),
            records.len()
        );
        let outcome = resolver::resolve_all(self.search, records).await;
        summary.matched = outcome.enriched.len();
        summary.unmatched = outcome.unmatched;
        summary.failed = outcome.failed;

        if options.dry_run {
            tracing::info!(
                "Dry run: not publishing {} enriched records",
                outcome.enriched.len()
            );
            return Ok(summary);
        }

        let catalog = self.catalog.ok_or(ConfigError::Missing("catalog"))?;

        tracing::info!(
            "[{}] Publishing {} records...",
            Local::now().format("%Y-%m-%d %H:%M:%S"),
            outcome.enriched.len()
        );
        catalog.publish(&outcome.enriched).await?;
        summary.published = true;
        tracing::info!("Publish complete");

        Ok(summary)
    }
}
