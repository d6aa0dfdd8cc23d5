// Change detection over harvested file lists
// The fingerprint is a SHA-256 of every filename concatenated in harvest order

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::error::ConfigError;
use crate::models::VideoRecord;

/// Where the last published fingerprint lives
#[async_trait]
pub trait FingerprintStore: Send {
    fn last_update(&self) -> Option<&str>;

    async fn set_last_update(&mut self, fingerprint: &str) -> Result<(), ConfigError>;
}

/// Hex-encoded SHA-256 over the ordered, separator-less concatenation of filenames
pub fn fingerprint(records: &[VideoRecord]) -> String {
    let mut hasher = Sha256::new();
    for record in records {
        hasher.update(record.filename.as_bytes());
    }
    format!("{:x}", hasher.finalize())
}

pub struct ChangeDetector<'a, S: FingerprintStore + ?Sized> {
    store: &'a mut S,
}

impl<'a, S: FingerprintStore + ?Sized> ChangeDetector<'a, S> {
    pub fn new(store: &'a mut S) -> Self {
        Self { store }
    }

    /// Compare against the stored fingerprint without persisting anything
    pub fn peek(&self, records: &[VideoRecord]) -> bool {
        let current = fingerprint(records);
        let changed = self.store.last_update() != Some(current.as_str());
        tracing::debug!("Fingerprint {} (changed: {})", current, changed);
        changed
    }

    /// Compare against the stored fingerprint; on a difference the new one is
    /// persisted before returning true. Not atomic: runs must not overlap.
    pub async fn has_changed(&mut self, records: &[VideoRecord]) -> Result<bool, ConfigError> {
        let current = fingerprint(records);

        if self.store.last_update() == Some(current.as_str()) {
            tracing::debug!("Fingerprint unchanged: {}", current);
            return Ok(false);
        }

        tracing::info!(
            "File list changed ({} -> {})",
            self.store.last_update().unwrap_or("none"),
            current
        );
        self.store.set_last_update(&current).await?;
        Ok(true)
    }
}
