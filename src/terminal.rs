use indicatif::{ProgressBar, ProgressStyle};
use std::io::BufRead;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::catalog::SubtitleRecord;
use crate::dialog::{DialogEvent, DialogState, Presenter, SubtitlesDialog};
use crate::error::Result;
use crate::selection::SelectionList;

const PROMPT: &str = "Enter a number to select, an empty line to confirm, q to cancel";

/// Terminal rendering of the subtitle dialog
#[derive(Default)]
pub struct TerminalPresenter {
    spinner: Option<ProgressBar>,
}

impl TerminalPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    fn show_spinner(&mut self, media_name: &str) {
        if self.spinner.is_some() {
            return;
        }

        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.set_message(format!("Searching subtitles for '{}'...", media_name));
        spinner.enable_steady_tick(Duration::from_millis(100));
        self.spinner = Some(spinner);
    }

    fn hide_spinner(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }
}

impl Presenter for TerminalPresenter {
    fn render(&mut self, dialog: &SubtitlesDialog) -> Result<()> {
        match dialog.state() {
            DialogState::Loading => self.show_spinner(dialog.media_name()),
            DialogState::Loaded => {
                self.hide_spinner();
                println!("{}", render_list(dialog.media_name(), dialog.subtitles()));
                println!("{}", PROMPT);
            }
            DialogState::Failed(message) => {
                self.hide_spinner();
                eprintln!("Subtitle search failed: {}", message);
                println!("Enter q to close");
            }
            DialogState::Dismissed => self.hide_spinner(),
        }
        Ok(())
    }
}

/// Numbered listing of the dialog entries with their selection marks
pub fn render_list(media_name: &str, subtitles: &SelectionList<SubtitleRecord>) -> String {
    if subtitles.is_empty() {
        return format!("No srt subtitles found for '{}'", media_name);
    }

    let mut out = format!("Subtitles for '{}':", media_name);
    for (index, item) in subtitles.items().iter().enumerate() {
        let mark = if item.selected { "x" } else { " " };
        out.push_str(&format!("\n{:>3}. [{}] {}", index + 1, mark, item.label));

        let record = &item.value;
        if !record.language_id.is_empty() {
            out.push_str(&format!("  ({}, {} downloads)", record.language_id, record.downloads));
        }
    }
    out
}

/// Map one input line to a dialog event; positions are 1-based
pub fn parse_command(line: &str) -> Option<DialogEvent> {
    let line = line.trim();
    match line.to_lowercase().as_str() {
        "" | "y" | "ok" => Some(DialogEvent::Confirm),
        "q" | "quit" | "cancel" => Some(DialogEvent::Dismiss),
        other => match other.parse::<usize>() {
            Ok(position) if position > 0 => Some(DialogEvent::Toggle(position - 1)),
            _ => None,
        },
    }
}

/// Forward commands read from `reader` until it ends or the dialog goes away
pub fn read_commands<R: BufRead>(reader: R, events: mpsc::Sender<DialogEvent>) {
    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!("Failed to read input: {}", e);
                break;
            }
        };

        match parse_command(&line) {
            Some(event) => {
                if events.blocking_send(event).is_err() {
                    break;
                }
            }
            None => warn!("Unrecognized input '{}'", line.trim()),
        }
    }
    debug!("Input reader finished");
}

/// Read stdin on a detached thread so a pending read never holds up exit.
///
/// Commands typed before the list appears are dropped by the dialog, and
/// end of input dismisses it. Piped input therefore cancels unless the
/// search has already finished.
pub fn spawn_stdin_reader(events: mpsc::Sender<DialogEvent>) {
    std::thread::spawn(move || read_commands(std::io::stdin().lock(), events));
}
