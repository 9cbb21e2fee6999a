//! Subpick - subtitle search and selection for local media
//!
//! Entry point of the `subpick` command line tool.

use anyhow::Result;
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, Level};
use tracing_subscriber::{
    filter::LevelFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
};
use tracing_appender::{non_blocking, rolling};

use subpick::catalog::{CatalogFactory, SubtitleRecord};
use subpick::cli::{Args, Commands};
use subpick::config::Config;
use subpick::dialog::{DialogLoop, DialogOutcome};
use subpick::error::SubpickError;
use subpick::terminal::{spawn_stdin_reader, TerminalPresenter};
use subpick::workflow::SubtitleWorkflow;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Setup logging to both console and file
    let interactive = matches!(args.command, Commands::Pick { .. });
    setup_logging(args.verbose, interactive)?;

    let config = load_config(args.config.as_deref())?;

    match args.command {
        Commands::Search { name, filter, json } => {
            info!("Searching subtitles for '{}'", name);

            let workflow = build_workflow(&config)?;
            let query = filter.to_query(&name, config.catalog.language.as_deref());
            let records = workflow.search_with(&query).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else {
                print_records(&records);
            }
        }
        Commands::Fetch { name, index, filter, output_dir } => {
            info!("Fetching subtitle #{} for '{}'", index, name);

            let workflow = build_workflow(&config)?;
            let query = filter.to_query(&name, config.catalog.language.as_deref());
            let records = workflow.search_with(&query).await?;

            let record = index
                .checked_sub(1)
                .and_then(|i| records.get(i))
                .ok_or(SubpickError::InvalidSelection(index))?;

            let output_dir = config.download.resolve_output_dir(output_dir.as_deref());
            let path = workflow.download(record, &output_dir).await?;
            println!("Saved {}", path.display());
        }
        Commands::Pick { name, output_dir } => {
            let output_dir = config.download.resolve_output_dir(output_dir.as_deref());
            let workflow = Arc::new(build_workflow(&config)?);

            // Ctrl-C tears down the dialog, any pending search and the download
            let cancel = CancellationToken::new();
            let interrupt = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    interrupt.cancel();
                }
            });

            let dialog_loop = DialogLoop::new(cancel.clone());
            spawn_stdin_reader(dialog_loop.sender());

            let mut presenter = TerminalPresenter::new();
            match dialog_loop.run(workflow.clone(), &name, &mut presenter).await? {
                DialogOutcome::Selected(record) => {
                    let path = workflow
                        .download_until_cancelled(&record, &output_dir, &cancel)
                        .await?;
                    println!("Saved {}", path.display());
                }
                DialogOutcome::Cancelled => println!("No subtitle selected"),
            }
        }
        Commands::InitConfig { output } => {
            Config::default().save_to_file(&output)?;
            println!("Wrote default configuration to {}", output.display());
        }
    }

    info!("Subpick completed successfully");
    Ok(())
}

/// Load the config given on the command line, then ./config.toml, then defaults
fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            if Path::new("config.toml").exists() {
                info!("Found config.toml in current directory, loading...");
                Config::from_file("config.toml")?
            } else {
                Config::default()
            }
        }
    };
    Ok(config)
}

fn build_workflow(config: &Config) -> Result<SubtitleWorkflow> {
    let service = CatalogFactory::create_service(config.catalog.clone())?;
    Ok(SubtitleWorkflow::new(service).with_language(config.catalog.language.clone()))
}

fn print_records(records: &[SubtitleRecord]) {
    if records.is_empty() {
        println!("No srt subtitles found.");
        return;
    }

    println!("{:<4} {:<60} {:<6} {:<10}", "#", "File", "Lang", "Downloads");
    println!("{}", "-".repeat(83));
    for (index, record) in records.iter().enumerate() {
        println!(
            "{:<4} {:<60} {:<6} {:<10}",
            index + 1,
            record.file_name,
            record.language_id,
            record.downloads
        );
    }
}

/// Setup logging to both console and file.
///
/// While the interactive dialog draws its spinner on stderr the console only
/// shows warnings unless `verbose` is set; the file keeps the full log.
fn setup_logging(verbose: bool, interactive: bool) -> Result<()> {
    // Create log directory
    let log_dir = std::env::current_dir()?.join(".subpick").join("log");
    std::fs::create_dir_all(&log_dir)?;

    // Set up file appender with daily rotation
    let file_appender = rolling::daily(&log_dir, "subpick.log");
    let (non_blocking_file, guard) = non_blocking(file_appender);
    // Keep the guard alive for the duration of the program
    std::mem::forget(guard);

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };
    let console_level = console_level(verbose, interactive);

    // Console output goes to stderr so listings on stdout stay clean
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_file(true)
        .with_line_number(true)
        .with_filter(console_level);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false); // No ANSI colors in file

    let subscriber = tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer);

    subscriber
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!(
        "Logging initialized - console: {}, file: {}",
        console_level,
        log_dir.join("subpick.log").display()
    );

    Ok(())
}

fn console_level(verbose: bool, interactive: bool) -> LevelFilter {
    match (verbose, interactive) {
        (true, _) => LevelFilter::DEBUG,
        (false, true) => LevelFilter::WARN,
        (false, false) => LevelFilter::INFO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_console_stays_quiet_under_the_dialog() {
        assert_eq!(console_level(false, true), LevelFilter::WARN);
        assert_eq!(console_level(false, false), LevelFilter::INFO);
        assert_eq!(console_level(true, true), LevelFilter::DEBUG);
    }
}
