use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::catalog::SearchQuery;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Search the catalog and list the srt subtitles found
    Search {
        /// Media name to search for
        name: String,

        #[command(flatten)]
        filter: SearchFilter,

        /// Print the results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Download one search result without prompting
    Fetch {
        /// Media name to search for
        name: String,

        /// Position of the subtitle in the search listing (1-based)
        #[arg(short, long)]
        index: usize,

        #[command(flatten)]
        filter: SearchFilter,

        /// Directory to write the subtitle to
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Open the selection dialog and download the chosen subtitle
    Pick {
        /// Media name to search for
        name: String,

        /// Directory to write the subtitle to
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Write a configuration file with the default settings
    InitConfig {
        /// Output path
        #[arg(short, long, default_value = "config.toml")]
        output: PathBuf,
    },
}

#[derive(clap::Args, Debug, Default)]
pub struct SearchFilter {
    /// Season number for series
    #[arg(long)]
    pub season: Option<u32>,

    /// Episode number for series
    #[arg(long)]
    pub episode: Option<u32>,

    /// Sub-language id (e.g. eng); overrides the configured language
    #[arg(short, long)]
    pub language: Option<String>,

    /// IMDb id of the title
    #[arg(long)]
    pub imdb: Option<String>,
}

impl SearchFilter {
    /// Build the catalog query, falling back to `default_language`
    pub fn to_query(&self, name: &str, default_language: Option<&str>) -> SearchQuery {
        let mut query = SearchQuery::new(name);
        if let Some(season) = self.season {
            query = query.season(season);
        }
        if let Some(episode) = self.episode {
            query = query.episode(episode);
        }
        if let Some(language) = self.language.as_deref().or(default_language) {
            query = query.language(language);
        }
        if let Some(imdb) = &self.imdb {
            query = query.imdb_id(imdb);
        }
        query
    }
}
