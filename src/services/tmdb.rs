// TMDB metadata provider service
// API Documentation: https://developer.themoviedb.org/reference/intro/getting-started

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::ExternalApiError;
use crate::models::MediaKind;
use crate::services::resolver::{MetadataSearch, SearchHit};

const TMDB_API_BASE: &str = "https://api.themoviedb.org/3";

/// TMDB API client
pub struct TmdbClient {
    client: Client,
    api_key: String,
    language: Option<String>,
}

/// Search results for either /search/movie or /search/tv
#[derive(Debug, Deserialize)]
struct SearchResults {
    results: Vec<SearchResult>,
}

/// Movies carry title/original_title, TV shows carry name/original_name
#[derive(Debug, Deserialize)]
struct SearchResult {
    id: i64,
    title: Option<String>,
    original_title: Option<String>,
    name: Option<String>,
    original_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ExternalIds {
    imdb_id: Option<String>,
}

impl From<SearchResult> for SearchHit {
    fn from(result: SearchResult) -> Self {
        SearchHit {
            id: result.id,
            original_title: result.original_title.or(result.original_name),
            localized_title: result.title,
            name: result.name,
        }
    }
}

impl TmdbClient {
    /// Create a new TMDB client
    pub fn new(api_key: String, language: Option<String>) -> Self {
        Self {
            client: Client::new(),
            api_key,
            language,
        }
    }

    fn search_url(&self, query: &str, kind: MediaKind) -> String {
        let mut url = format!(
            "{}/search/{}?api_key={}&query={}&include_adult=false",
            TMDB_API_BASE,
            kind.as_str(),
            self.api_key,
            urlencoding::encode(query)
        );

        if let Some(ref language) = self.language {
            url.push_str(&format!("&language={}", urlencoding::encode(language)));
        }

        url
    }

    fn external_ids_url(&self, tmdb_id: i64, kind: MediaKind) -> String {
        format!(
            "{}/{}/{}/external_ids?api_key={}",
            TMDB_API_BASE,
            kind.as_str(),
            tmdb_id,
            self.api_key
        )
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, ExternalApiError> {
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(ExternalApiError::Status(response.status()));
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl MetadataSearch for TmdbClient {
    async fn search(&self, query: &str, kind: MediaKind) -> Result<Vec<SearchHit>, ExternalApiError> {
        let response: SearchResults = self.get_json(&self.search_url(query, kind)).await?;
        Ok(response.results.into_iter().map(SearchHit::from).collect())
    }

    async fn external_id(
        &self,
        tmdb_id: i64,
        kind: MediaKind,
    ) -> Result<Option<String>, ExternalApiError> {
        let ids: ExternalIds = self.get_json(&self.external_ids_url(tmdb_id, kind)).await?;
        Ok(ids.imdb_id.filter(|id| !id.is_empty()))
    }
}
