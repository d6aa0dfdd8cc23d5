// Error types for the harvest pipeline
// Each component gets its own enum; main.rs wraps everything in anyhow

use thiserror::Error;

/// Failure of a single Browse call against the content directory
#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error("Directory request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Directory returned HTTP {0}")]
    Status(reqwest::StatusCode),

    #[error("UPnP fault {code}: {description}")]
    Fault { code: String, description: String },

    #[error("Malformed browse response: {0}")]
    Parse(String),
}

#[derive(Error, Debug)]
pub enum HarvestError {
    #[error("Failed to browse root node '{object_id}': {source}")]
    Traversal {
        object_id: String,
        #[source]
        source: DirectoryError,
    },

    #[error("Harvest cancelled")]
    Cancelled,
}

/// Search or external-id lookup failure. Recovered per record.
#[derive(Error, Debug)]
pub enum ExternalApiError {
    #[error("Metadata request failed: {0}")]
    Http(reqwest::Error),

    #[error("Metadata API returned HTTP {0}")]
    Status(reqwest::StatusCode),
}

// TMDB request URLs carry the api_key; never keep them in the error
impl From<reqwest::Error> for ExternalApiError {
    fn from(e: reqwest::Error) -> Self {
        ExternalApiError::Http(e.without_url())
    }
}

#[derive(Error, Debug)]
pub enum PublishError {
    #[error("Catalog request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Catalog rejected credentials (HTTP {0})")]
    Unauthorized(reqwest::StatusCode),

    #[error("Catalog returned HTTP {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to edit config file: {0}")]
    Edit(#[from] toml_edit::TomlError),

    #[error("Missing configuration value: {0}")]
    Missing(&'static str),
}

/// Fatal errors that abort a pipeline run
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Harvest(#[from] HarvestError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Publish(#[from] PublishError),
}
