use async_trait::async_trait;
use flate2::read::GzDecoder;
use reqwest::Client;
use std::io::Read;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use super::{SearchQuery, SubtitleRecord, SubtitleService};
use crate::config::CatalogConfig;
use crate::error::{Result, SubpickError};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Client for the OpenSubtitles REST catalog
pub struct OpenSubtitlesService {
    client: Client,
    endpoint: String,
}

impl OpenSubtitlesService {
    pub fn new(config: CatalogConfig) -> Result<Self> {
        let mut builder = Client::builder().user_agent(config.user_agent.clone());
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(SubpickError::Http)?;

        Ok(Self {
            client,
            endpoint: config.endpoint,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl SubtitleService for OpenSubtitlesService {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<SubtitleRecord>> {
        let url = query.to_url(&self.endpoint)?;
        debug!("Searching subtitle catalog: {}", url);

        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(SubpickError::Catalog(format!(
                "Search failed {}: {}",
                status, error_text
            )));
        }

        let body = response.text().await?;
        let records: Vec<SubtitleRecord> = serde_json::from_str(&body)?;

        info!(
            "Catalog returned {} subtitles for '{}'",
            records.len(),
            query.media_name()
        );
        Ok(records)
    }

    async fn download(&self, record: &SubtitleRecord, destination: &Path) -> Result<()> {
        if record.download_link.is_empty() {
            return Err(SubpickError::Download(format!(
                "{} has no download link",
                record.file_name
            )));
        }

        info!("Downloading {} to {}", record.file_name, destination.display());

        let response = self.client.get(&record.download_link).send().await?;

        if !response.status().is_success() {
            return Err(SubpickError::Download(format!(
                "Failed to download {}: HTTP {}",
                record.file_name,
                response.status()
            )));
        }

        let bytes = response.bytes().await?;
        let content = decompress(&bytes)
            .map_err(|e| SubpickError::Download(format!("Failed to decompress {}: {}", record.file_name, e)))?;

        write_file(destination, &content).await?;

        info!("Saved {} ({} bytes)", destination.display(), content.len());
        Ok(())
    }
}

/// Gunzip catalog payloads; anything without the gzip magic is taken verbatim
pub fn decompress(bytes: &[u8]) -> std::io::Result<Vec<u8>> {
    if !bytes.starts_with(&GZIP_MAGIC) {
        return Ok(bytes.to_vec());
    }

    let mut content = Vec::new();
    GzDecoder::new(bytes).read_to_end(&mut content)?;
    Ok(content)
}

// Written next to the destination first so a failed transfer leaves no partial file
async fn write_file(destination: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = destination.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }

    let temp_path = partial_path(destination);
    if let Err(e) = write_and_rename(&temp_path, destination, content).await {
        debug!("Removing {} after failed write", temp_path.display());
        let _ = fs::remove_file(&temp_path).await;
        return Err(e.into());
    }
    Ok(())
}

async fn write_and_rename(temp_path: &Path, destination: &Path, content: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(temp_path).await?;
    file.write_all(content).await?;
    file.flush().await?;
    drop(file);

    fs::rename(temp_path, destination).await
}

fn partial_path(destination: &Path) -> PathBuf {
    let name = destination
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    destination.with_file_name(format!(".{}.part", name))
}
