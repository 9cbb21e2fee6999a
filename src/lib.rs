//! Subpick - subtitle search and selection for local media
//!
//! Queries the OpenSubtitles catalog by media name, offers the srt results
//! in a selection dialog and downloads the chosen subtitle file.

pub mod catalog;
pub mod cli;
pub mod config;
pub mod dialog;
pub mod error;
pub mod selection;
pub mod terminal;
pub mod workflow;
