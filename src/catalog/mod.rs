// Subtitle catalog access
//
// The catalog is an external collaborator reached through one trait:
// - Query: search URL construction for the REST catalog
// - Opensubtitles: reqwest implementation of search and gzip download

pub mod opensubtitles;
pub mod query;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;
use std::sync::Arc;

pub use opensubtitles::OpenSubtitlesService;
pub use query::SearchQuery;

use crate::config::CatalogConfig;
use crate::error::Result;

/// Metadata for one candidate subtitle as returned by the catalog
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtitleRecord {
    #[serde(rename = "IDSubtitleFile", default)]
    pub file_id: String,
    #[serde(rename = "SubFileName")]
    pub file_name: String,
    /// Format tag such as "srt" or "sub"
    #[serde(rename = "SubFormat")]
    pub format: String,
    /// Link to the gzip-compressed subtitle file
    #[serde(rename = "SubDownloadLink", default)]
    pub download_link: String,
    #[serde(rename = "SubLanguageID", default)]
    pub language_id: String,
    #[serde(rename = "LanguageName", default)]
    pub language_name: String,
    #[serde(rename = "MovieName", default)]
    pub movie_name: String,
    #[serde(rename = "MovieReleaseName", default)]
    pub release_name: String,
    #[serde(rename = "SubDownloadsCnt", default, deserialize_with = "count_from_str")]
    pub downloads: u64,
}

impl SubtitleRecord {
    pub fn new(file_name: impl Into<String>, format: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            format: format.into(),
            ..Default::default()
        }
    }

    pub fn with_download_link(mut self, link: impl Into<String>) -> Self {
        self.download_link = link.into();
        self
    }
}

// The catalog encodes counters as decimal strings
fn count_from_str<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Count {
        Number(u64),
        Text(String),
    }

    Ok(match Count::deserialize(deserializer)? {
        Count::Number(n) => n,
        Count::Text(s) => s.trim().parse().unwrap_or(0),
    })
}

/// Search and download operations offered by a subtitle catalog
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SubtitleService: Send + Sync {
    /// Run one catalog search and return the records in catalog order
    async fn search(&self, query: &SearchQuery) -> Result<Vec<SubtitleRecord>>;

    /// Fetch the subtitle file of `record` and write it to `destination`
    async fn download(&self, record: &SubtitleRecord, destination: &Path) -> Result<()>;
}

/// Factory for creating catalog service instances
pub struct CatalogFactory;

impl CatalogFactory {
    /// Create the default catalog service (OpenSubtitles REST)
    pub fn create_service(config: CatalogConfig) -> Result<Arc<dyn SubtitleService>> {
        Ok(Arc::new(OpenSubtitlesService::new(config)?))
    }
}
