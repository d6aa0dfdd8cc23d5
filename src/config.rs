// Configuration module for dlna-harvest
// Handles the XDG-compliant config location, the TOML config file and the persisted
// `last_update` fingerprint stored in that same file

use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use toml_edit::DocumentMut;

use crate::error::ConfigError;
use crate::scanner::DEFAULT_BLOCKED_PATTERNS;
use crate::services::fingerprint::FingerprintStore;

const APP_NAME: &str = "dlna-harvest";
const CONFIG_FILENAME: &str = "config.toml";

/// TOML configuration file structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    /// Fingerprint of the last published harvest (written by the change detector)
    pub last_update: Option<String>,

    /// Media server connection
    pub directory: DirectoryConfig,

    /// Metadata provider configuration
    pub metadata: MetadataConfig,

    /// Downstream catalog configuration
    pub catalog: CatalogConfig,

    /// Harvest filtering
    pub scanner: ScannerConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DirectoryConfig {
    /// ContentDirectory control URL, e.g. http://192.168.1.10:8200/ctl/ContentDir
    pub control_url: Option<String>,

    /// Device description URL; used to look up the control URL when none is set
    pub description_url: Option<String>,

    /// Object id to start browsing from (default: "0", the ContentDirectory root)
    pub root_id: String,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            control_url: None,
            description_url: None,
            root_id: "0".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MetadataConfig {
    /// TMDB API key
    pub tmdb_api_key: Option<String>,

    /// TMDB language for localized titles, e.g. "en-US"
    pub language: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Endpoint that receives the enriched list
    pub url: Option<String>,

    /// Bearer token for the catalog
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// Video titles containing any of these (case-insensitive) are skipped
    pub blocked_title_patterns: Vec<String>,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            blocked_title_patterns: DEFAULT_BLOCKED_PATTERNS
                .iter()
                .map(|p| p.to_string())
                .collect(),
        }
    }
}

/// Default config file location
///
/// Priority order:
/// 1. DLNA_HARVEST_CONFIG_DIR environment variable
/// 2. XDG/platform config dir (~/.config/dlna-harvest)
/// 3. Current directory
pub fn default_config_path() -> PathBuf {
    let dir = if let Ok(path) = std::env::var("DLNA_HARVEST_CONFIG_DIR") {
        PathBuf::from(path)
    } else if let Some(dir) = dirs::config_dir() {
        dir.join(APP_NAME)
    } else {
        std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
    };
    dir.join(CONFIG_FILENAME)
}

/// The config document on disk. Saving the fingerprint edits only the `last_update`
/// key of the original text; comments, unknown tables and unset defaults stay as they are.
#[derive(Debug)]
pub struct ConfigStore {
    path: PathBuf,
    document: ConfigFile,
    raw: DocumentMut,
}

impl ConfigStore {
    /// Load the config file; a missing file is treated as an empty document
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();

        let (document, raw) = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => {
                let document = toml::from_str(&contents)?;
                let raw = contents.parse::<DocumentMut>()?;
                tracing::info!("Loaded configuration from {}", path.display());
                (document, raw)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No config file found at {}, using defaults", path.display());
                (ConfigFile::default(), DocumentMut::new())
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path,
            document,
            raw,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn document(&self) -> &ConfigFile {
        &self.document
    }

    async fn save(&self) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(&self.path, self.raw.to_string()).await?;
        Ok(())
    }
}

#[async_trait]
impl FingerprintStore for ConfigStore {
    fn last_update(&self) -> Option<&str> {
        self.document.last_update.as_deref()
    }

    async fn set_last_update(&mut self, fingerprint: &str) -> Result<(), ConfigError> {
        self.raw["last_update"] = toml_edit::value(fingerprint);
        self.save().await?;
        self.document.last_update = Some(fingerprint.to_string());
        tracing::debug!("Saved fingerprint to {}", self.path.display());
        Ok(())
    }
}

/// Runtime configuration - config file values with environment overrides applied
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub control_url: Option<String>,
    pub description_url: Option<String>,
    pub root_id: String,
    pub tmdb_api_key: Option<String>,
    pub tmdb_language: Option<String>,
    pub catalog_url: Option<String>,
    pub catalog_api_key: Option<String>,
    pub blocked_title_patterns: Vec<String>,
}

impl AppConfig {
    /// Build configuration from config file with environment overrides
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables
    /// 2. TOML config file
    /// 3. Default values
    pub fn from_file(file: &ConfigFile) -> Self {
        Self {
            control_url: env_var("DLNA_CONTROL_URL").or_else(|| file.directory.control_url.clone()),
            description_url: env_var("DLNA_DESCRIPTION_URL")
                .or_else(|| file.directory.description_url.clone()),
            root_id: env_var("DLNA_ROOT_ID").unwrap_or_else(|| file.directory.root_id.clone()),
            tmdb_api_key: env_var("TMDB_API_KEY").or_else(|| file.metadata.tmdb_api_key.clone()),
            tmdb_language: env_var("TMDB_LANGUAGE").or_else(|| file.metadata.language.clone()),
            catalog_url: env_var("CATALOG_URL").or_else(|| file.catalog.url.clone()),
            catalog_api_key: env_var("CATALOG_API_KEY").or_else(|| file.catalog.api_key.clone()),
            blocked_title_patterns: file.scanner.blocked_title_patterns.clone(),
        }
    }

    pub fn tmdb_api_key(&self) -> Result<&str, ConfigError> {
        self.tmdb_api_key
            .as_deref()
            .ok_or(ConfigError::Missing("metadata.tmdb_api_key (or TMDB_API_KEY)"))
    }

    pub fn catalog_url(&self) -> Result<&str, ConfigError> {
        self.catalog_url
            .as_deref()
            .ok_or(ConfigError::Missing("catalog.url (or CATALOG_URL)"))
    }

    pub fn catalog_api_key(&self) -> Result<&str, ConfigError> {
        self.catalog_api_key
            .as_deref()
            .ok_or(ConfigError::Missing("catalog.api_key (or CATALOG_API_KEY)"))
    }

    /// Log configuration status
    pub fn log_config(&self) {
        match (&self.control_url, &self.description_url) {
            (Some(url), _) => tracing::info!("Content directory: {}", url),
            (None, Some(url)) => tracing::info!("Content directory via description: {}", url),
            (None, None) => tracing::warn!(
                "No content directory configured; set directory.control_url or DLNA_CONTROL_URL"
            ),
        }
        tracing::info!("Browse root: '{}'", self.root_id);

        if self.tmdb_api_key.is_none() {
            tracing::warn!("Hint: Add tmdb_api_key to config.toml or set TMDB_API_KEY env var");
        }
        if let Some(ref lang) = self.tmdb_language {
            tracing::debug!("TMDB language: {}", lang);
        }
        tracing::debug!(
            "Blocked title patterns: {:?}",
            self.blocked_title_patterns
        );
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}
