use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::catalog::{SearchQuery, SubtitleRecord, SubtitleService};
use crate::error::{Result, SubpickError};

/// The only subtitle format offered for selection
pub const SUPPORTED_FORMAT: &str = "srt";

/// Search and download steps behind the subtitle dialog
pub struct SubtitleWorkflow {
    service: Arc<dyn SubtitleService>,
    language: Option<String>,
}

impl SubtitleWorkflow {
    pub fn new(service: Arc<dyn SubtitleService>) -> Self {
        Self {
            service,
            language: None,
        }
    }

    /// Add a sub-language id to every search issued by `search`
    pub fn with_language(mut self, language: Option<String>) -> Self {
        self.language = language;
        self
    }

    /// Search the catalog by media name and keep only supported subtitles
    pub async fn search(&self, media_name: &str) -> Result<Vec<SubtitleRecord>> {
        let mut query = SearchQuery::new(media_name);
        if let Some(language) = &self.language {
            query = query.language(language.clone());
        }
        self.search_with(&query).await
    }

    /// Same as `search` with a fully built query
    pub async fn search_with(&self, query: &SearchQuery) -> Result<Vec<SubtitleRecord>> {
        let records = self.service.search(query).await?;
        let total = records.len();
        let supported = filter_supported(records);

        debug!(
            "Kept {} of {} subtitles in {} format",
            supported.len(),
            total,
            SUPPORTED_FORMAT
        );
        Ok(supported)
    }

    /// Download `record` into `destination_dir` and return the written path
    pub async fn download(&self, record: &SubtitleRecord, destination_dir: &Path) -> Result<PathBuf> {
        let output_path = destination_path(destination_dir, record)?;
        self.service.download(record, &output_path).await?;

        info!("Subtitle written to {}", output_path.display());
        Ok(output_path)
    }

    /// `download` that gives up with `SubpickError::Cancelled` once `cancel` fires
    pub async fn download_until_cancelled(
        &self,
        record: &SubtitleRecord,
        destination_dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<PathBuf> {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("Download of {} cancelled", record.file_name);
                Err(SubpickError::Cancelled)
            }
            result = self.download(record, destination_dir) => result,
        }
    }
}

/// Keep records whose format tag is `srt` in any case, preserving order
pub fn filter_supported(records: Vec<SubtitleRecord>) -> Vec<SubtitleRecord> {
    records
        .into_iter()
        .filter(|record| record.format.eq_ignore_ascii_case(SUPPORTED_FORMAT))
        .collect()
}

/// Join the destination directory with the record's filename.
///
/// Only the last component of the catalog filename is used.
pub fn destination_path(destination_dir: &Path, record: &SubtitleRecord) -> Result<PathBuf> {
    let file_name = Path::new(&record.file_name)
        .file_name()
        .ok_or_else(|| {
            SubpickError::Download(format!("Invalid subtitle filename '{}'", record.file_name))
        })?;

    Ok(destination_dir.join(file_name))
}
