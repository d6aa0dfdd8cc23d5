// Downstream catalog publisher
// POSTs the enriched list as JSON; no retries, any failure is fatal for the run

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;

use crate::error::PublishError;
use crate::models::EnrichedRecord;

#[async_trait]
pub trait CatalogSink: Send + Sync {
    async fn publish(&self, records: &[EnrichedRecord]) -> Result<(), PublishError>;
}

#[derive(Debug, Serialize)]
struct PublishRequest<'a> {
    items: &'a [EnrichedRecord],
}

/// HTTP catalog client
pub struct CatalogClient {
    client: Client,
    url: String,
    api_key: String,
}

impl CatalogClient {
    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl CatalogSink for CatalogClient {
    async fn publish(&self, records: &[EnrichedRecord]) -> Result<(), PublishError> {
        tracing::debug!("Posting {} items to {}", records.len(), self.url);

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&PublishRequest { items: records })
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(PublishError::Unauthorized(status));
        }

        let body = response.text().await.unwrap_or_default();
        Err(PublishError::Status { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::VideoRecord;

    #[test]
    fn test_publish_payload_shape() {
        let records = vec![EnrichedRecord::new(
            VideoRecord {
                filename: "Movie.Name.2020.mkv".to_string(),
                search_title: "movie name".to_string(),
                episode_marker: None,
                media_url: "http://nas/1.mkv".to_string(),
            },
            "Movie Name".to_string(),
            "tt1234567".to_string(),
        )];

        let json = serde_json::to_value(PublishRequest { items: &records }).unwrap();
        let item = &json["items"][0];
        assert_eq!(item["resolvedTitle"], "Movie Name");
        assert_eq!(item["externalId"], "tt1234567");
        assert_eq!(item["mediaUrl"], "http://nas/1.mkv");
        assert!(item["season"].is_null());
        assert!(item["episode"].is_null());
    }
}
