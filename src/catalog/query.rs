use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use std::collections::BTreeMap;
use url::Url;

use crate::error::Result;

// Unreserved characters stay readable inside a path segment
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Search parameters for the REST catalog.
///
/// Each parameter becomes a `key-value` path segment under `/search`, and the
/// catalog requires the segments in key order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
    params: BTreeMap<&'static str, String>,
}

impl SearchQuery {
    /// Query by media name; the name is sent exactly as given
    pub fn new(media_name: impl Into<String>) -> Self {
        let mut params = BTreeMap::new();
        params.insert("query", media_name.into());
        Self { params }
    }

    pub fn season(mut self, season: u32) -> Self {
        self.params.insert("season", season.to_string());
        self
    }

    pub fn episode(mut self, episode: u32) -> Self {
        self.params.insert("episode", episode.to_string());
        self
    }

    /// Restrict results to a sub-language id such as "eng"
    pub fn language(mut self, language_id: impl Into<String>) -> Self {
        self.params.insert("sublanguageid", language_id.into());
        self
    }

    /// Restrict results to an IMDb title, with or without the "tt" prefix
    pub fn imdb_id(mut self, imdb_id: &str) -> Self {
        self.params
            .insert("imdbid", imdb_id.trim_start_matches("tt").to_string());
        self
    }

    pub fn media_name(&self) -> &str {
        self.params.get("query").map(String::as_str).unwrap_or_default()
    }

    /// Path below the endpoint, e.g. `search/query-the%20matrix/season-1`
    pub fn path(&self) -> String {
        let mut path = String::from("search");
        for (key, value) in &self.params {
            path.push('/');
            path.push_str(key);
            path.push('-');
            path.push_str(&utf8_percent_encode(value, SEGMENT).to_string());
        }
        path
    }

    pub fn to_url(&self, endpoint: &str) -> Result<Url> {
        let url = Url::parse(&format!("{}/{}", endpoint.trim_end_matches('/'), self.path()))?;
        Ok(url)
    }
}
