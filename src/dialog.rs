//! Subtitle selection dialog.
//!
//! The dialog is a small state machine (`Loading -> Loaded -> Dismissed`,
//! with `Failed` when the search errors) driven by a single event loop.
//! The catalog search runs on the tokio worker pool and hands its result
//! back to the loop over a oneshot channel, so all mutation of the selection
//! list happens on the loop. Input that arrives while the search is still
//! loading is dropped.

use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::catalog::SubtitleRecord;
use crate::error::{Result, SubpickError};
use crate::selection::{SelectionItem, SelectionList};
use crate::workflow::SubtitleWorkflow;

const EVENT_QUEUE_SIZE: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogState {
    /// Spinner visible, list hidden
    Loading,
    /// List visible, spinner hidden
    Loaded,
    /// Search failed; only dismissal is accepted
    Failed(String),
    Dismissed,
}

#[derive(Debug)]
pub enum DialogEvent {
    SearchCompleted(Result<Vec<SubtitleRecord>>),
    /// Toggle the entry at a zero-based position
    Toggle(usize),
    /// Positive button: accept the current selection
    Confirm,
    /// Negative button
    Dismiss,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogOutcome {
    Selected(SubtitleRecord),
    Cancelled,
}

/// Renders dialog state; called on the event loop after every transition
pub trait Presenter: Send {
    fn render(&mut self, dialog: &SubtitlesDialog) -> Result<()>;
}

pub struct SubtitlesDialog {
    media_name: String,
    state: DialogState,
    subtitles: SelectionList<SubtitleRecord>,
}

impl SubtitlesDialog {
    pub fn new(media_name: impl Into<String>) -> Self {
        Self {
            media_name: media_name.into(),
            state: DialogState::Loading,
            subtitles: SelectionList::new(),
        }
    }

    pub fn media_name(&self) -> &str {
        &self.media_name
    }

    pub fn state(&self) -> &DialogState {
        &self.state
    }

    pub fn subtitles(&self) -> &SelectionList<SubtitleRecord> {
        &self.subtitles
    }

    /// Apply one event; returns the outcome once the dialog is dismissed
    pub fn handle(&mut self, event: DialogEvent) -> Option<DialogOutcome> {
        if self.state == DialogState::Dismissed {
            debug!("Dialog already dismissed, dropping {:?}", event);
            return None;
        }

        match event {
            DialogEvent::Dismiss => {
                self.state = DialogState::Dismissed;
                Some(DialogOutcome::Cancelled)
            }
            DialogEvent::SearchCompleted(result) if self.state == DialogState::Loading => {
                match result {
                    Ok(records) => {
                        info!("Loaded {} subtitles for '{}'", records.len(), self.media_name);
                        self.subtitles.configure(
                            records
                                .into_iter()
                                .map(|record| SelectionItem::new(record.file_name.clone(), record))
                                .collect(),
                        );
                        self.state = DialogState::Loaded;
                    }
                    Err(e) => {
                        info!("Subtitle search for '{}' failed: {}", self.media_name, e);
                        self.state = DialogState::Failed(e.to_string());
                    }
                }
                None
            }
            DialogEvent::Toggle(index) if self.state == DialogState::Loaded => {
                self.subtitles.toggle(index);
                None
            }
            DialogEvent::Confirm if self.state == DialogState::Loaded => {
                let record = self.subtitles.selected().map(|item| item.value.clone())?;
                self.state = DialogState::Dismissed;
                Some(DialogOutcome::Selected(record))
            }
            event => {
                debug!("Ignoring {:?} while {:?}", event, self.state);
                None
            }
        }
    }
}

/// Event loop hosting one dialog
pub struct DialogLoop {
    events_tx: mpsc::Sender<DialogEvent>,
    events_rx: mpsc::Receiver<DialogEvent>,
    cancel: CancellationToken,
}

impl DialogLoop {
    /// `cancel` belongs to the enclosing screen; cancelling it tears the dialog down
    pub fn new(cancel: CancellationToken) -> Self {
        let (events_tx, events_rx) = mpsc::channel(EVENT_QUEUE_SIZE);
        Self {
            events_tx,
            events_rx,
            cancel,
        }
    }

    /// Sender for user input events
    pub fn sender(&self) -> mpsc::Sender<DialogEvent> {
        self.events_tx.clone()
    }

    /// Open the dialog for `media_name` and run it until dismissal.
    ///
    /// Closing every input sender counts as a dismissal in any state and
    /// cancels a pending search. Cancelling the enclosing token returns
    /// `SubpickError::Cancelled`.
    pub async fn run<P: Presenter + ?Sized>(
        self,
        workflow: Arc<SubtitleWorkflow>,
        media_name: &str,
        presenter: &mut P,
    ) -> Result<DialogOutcome> {
        let Self {
            events_tx,
            mut events_rx,
            cancel,
        } = self;
        // Only external senders keep the input open
        drop(events_tx);

        let mut dialog = SubtitlesDialog::new(media_name);
        presenter.render(&dialog)?;

        let search_cancel = cancel.child_token();
        let _teardown = search_cancel.clone().drop_guard();
        let mut search_rx = spawn_search(workflow, media_name.to_string(), search_cancel);
        let mut search_pending = true;

        loop {
            let event = tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Subtitle dialog for '{}' cancelled", media_name);
                    return Err(SubpickError::Cancelled);
                }
                result = &mut search_rx, if search_pending => {
                    search_pending = false;
                    match result {
                        Ok(result) => DialogEvent::SearchCompleted(result),
                        Err(_) => DialogEvent::SearchCompleted(Err(SubpickError::Catalog(
                            "search task ended without a result".to_string(),
                        ))),
                    }
                }
                event = events_rx.recv() => match event {
                    Some(event) => event,
                    None => {
                        debug!("Dialog input closed");
                        DialogEvent::Dismiss
                    }
                },
            };

            let outcome = dialog.handle(event);
            presenter.render(&dialog)?;

            if let Some(outcome) = outcome {
                return Ok(outcome);
            }
        }
    }
}

fn spawn_search(
    workflow: Arc<SubtitleWorkflow>,
    media_name: String,
    cancel: CancellationToken,
) -> oneshot::Receiver<Result<Vec<SubtitleRecord>>> {
    let (result_tx, result_rx) = oneshot::channel();
    tokio::spawn(async move {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("Subtitle search for '{}' cancelled", media_name);
            }
            result = workflow.search(&media_name) => {
                // The loop may have closed already
                let _ = result_tx.send(result);
            }
        }
    });
    result_rx
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{MockSubtitleService, SearchQuery, SubtitleService};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::path::Path;

    fn records(formats: &[&str]) -> Vec<SubtitleRecord> {
        formats
            .iter()
            .enumerate()
            .map(|(i, format)| SubtitleRecord::new(format!("movie.{}.{}", i, format), *format))
            .collect()
    }

    fn workflow_returning(result: fn() -> Result<Vec<SubtitleRecord>>) -> Arc<SubtitleWorkflow> {
        let mut service = MockSubtitleService::new();
        service.expect_search().times(1).returning(move |_| result());
        Arc::new(SubtitleWorkflow::new(Arc::new(service)))
    }

    /// Records every rendered state and replays scripted input once the list is up.
    /// The input sender is dropped once the script runs out.
    struct ScriptedPresenter {
        input: Option<mpsc::Sender<DialogEvent>>,
        script: VecDeque<DialogEvent>,
        states: Vec<DialogState>,
        labels: Vec<Vec<String>>,
    }

    impl ScriptedPresenter {
        fn new(input: Option<mpsc::Sender<DialogEvent>>, script: Vec<DialogEvent>) -> Self {
            Self {
                input,
                script: script.into(),
                states: Vec::new(),
                labels: Vec::new(),
            }
        }
    }

    impl Presenter for ScriptedPresenter {
        fn render(&mut self, dialog: &SubtitlesDialog) -> Result<()> {
            self.states.push(dialog.state().clone());
            self.labels.push(
                dialog
                    .subtitles()
                    .items()
                    .iter()
                    .map(|item| item.label.clone())
                    .collect(),
            );

            let interactive = !matches!(dialog.state(), DialogState::Loading | DialogState::Dismissed);
            if interactive {
                match self.script.pop_front() {
                    Some(event) => {
                        if let Some(input) = &self.input {
                            input.try_send(event).unwrap();
                        }
                    }
                    // Script exhausted: close the input
                    None => self.input = None,
                }
            }
            Ok(())
        }
    }

    struct StalledService;

    #[async_trait]
    impl SubtitleService for StalledService {
        async fn search(&self, _query: &SearchQuery) -> Result<Vec<SubtitleRecord>> {
            std::future::pending().await
        }

        async fn download(&self, _record: &SubtitleRecord, _destination: &Path) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_starts_loading_with_hidden_list() {
        let dialog = SubtitlesDialog::new("matrix");
        assert_eq!(dialog.state(), &DialogState::Loading);
        assert!(dialog.subtitles().is_empty());
    }

    #[test]
    fn test_zero_results_go_straight_to_loaded() {
        let mut dialog = SubtitlesDialog::new("matrix");
        assert!(dialog.handle(DialogEvent::SearchCompleted(Ok(Vec::new()))).is_none());
        assert_eq!(dialog.state(), &DialogState::Loaded);
        assert!(dialog.subtitles().is_empty());
    }

    #[test]
    fn test_loaded_items_are_unselected_and_labelled() {
        let mut dialog = SubtitlesDialog::new("matrix");
        dialog.handle(DialogEvent::SearchCompleted(Ok(records(&["srt", "srt"]))));

        let items = dialog.subtitles().items();
        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|item| !item.selected));
        assert_eq!(items[1].label, "movie.1.srt");
    }

    #[test]
    fn test_input_ignored_while_loading() {
        let mut dialog = SubtitlesDialog::new("matrix");
        assert!(dialog.handle(DialogEvent::Toggle(0)).is_none());
        assert!(dialog.handle(DialogEvent::Confirm).is_none());
        assert_eq!(dialog.state(), &DialogState::Loading);
    }

    #[test]
    fn test_confirm_requires_selection() {
        let mut dialog = SubtitlesDialog::new("matrix");
        dialog.handle(DialogEvent::SearchCompleted(Ok(records(&["srt", "srt"]))));

        assert!(dialog.handle(DialogEvent::Confirm).is_none());
        assert_eq!(dialog.state(), &DialogState::Loaded);

        dialog.handle(DialogEvent::Toggle(1));
        let outcome = dialog.handle(DialogEvent::Confirm).unwrap();
        assert_eq!(
            outcome,
            DialogOutcome::Selected(SubtitleRecord::new("movie.1.srt", "srt"))
        );
        assert_eq!(dialog.state(), &DialogState::Dismissed);
    }

    #[test]
    fn test_dismiss_is_terminal() {
        let mut dialog = SubtitlesDialog::new("matrix");
        assert_eq!(dialog.handle(DialogEvent::Dismiss), Some(DialogOutcome::Cancelled));

        assert!(dialog.handle(DialogEvent::SearchCompleted(Ok(records(&["srt"])))).is_none());
        assert_eq!(dialog.state(), &DialogState::Dismissed);
        assert!(dialog.subtitles().is_empty());
    }

    #[test]
    fn test_failed_search_only_accepts_dismiss() {
        let mut dialog = SubtitlesDialog::new("matrix");
        dialog.handle(DialogEvent::SearchCompleted(Err(SubpickError::Catalog("Search failed 503".into()))));
        assert!(matches!(dialog.state(), DialogState::Failed(msg) if msg.contains("503")));

        assert!(dialog.handle(DialogEvent::Toggle(0)).is_none());
        assert_eq!(dialog.handle(DialogEvent::Dismiss), Some(DialogOutcome::Cancelled));
    }

    #[tokio::test]
    async fn test_loop_presents_only_srt_and_returns_choice() {
        let workflow = workflow_returning(|| Ok(records(&["srt", "sub", "SRT", "vtt"])));
        let dialog_loop = DialogLoop::new(CancellationToken::new());
        let mut presenter = ScriptedPresenter::new(
            Some(dialog_loop.sender()),
            vec![DialogEvent::Toggle(1), DialogEvent::Confirm],
        );

        let outcome = dialog_loop.run(workflow, "matrix", &mut presenter).await.unwrap();

        assert_eq!(
            outcome,
            DialogOutcome::Selected(SubtitleRecord::new("movie.2.SRT", "SRT"))
        );
        assert_eq!(
            presenter.states,
            vec![
                DialogState::Loading,
                DialogState::Loaded,
                DialogState::Loaded,
                DialogState::Dismissed,
            ]
        );
        assert_eq!(presenter.labels[1], vec!["movie.0.srt", "movie.2.SRT"]);
    }

    #[tokio::test]
    async fn test_loop_search_error_shows_failure() {
        let workflow = workflow_returning(|| Err(SubpickError::Catalog("Search failed 500".into())));
        let dialog_loop = DialogLoop::new(CancellationToken::new());
        let mut presenter = ScriptedPresenter::new(Some(dialog_loop.sender()), vec![DialogEvent::Dismiss]);

        let outcome = dialog_loop.run(workflow, "matrix", &mut presenter).await.unwrap();

        assert_eq!(outcome, DialogOutcome::Cancelled);
        assert!(matches!(presenter.states[1], DialogState::Failed(_)));
        assert_eq!(presenter.states.last(), Some(&DialogState::Dismissed));
    }

    #[tokio::test]
    async fn test_loop_closed_input_dismisses() {
        let workflow = workflow_returning(|| Ok(Vec::new()));
        let dialog_loop = DialogLoop::new(CancellationToken::new());
        let mut presenter = ScriptedPresenter::new(Some(dialog_loop.sender()), Vec::new());

        let outcome = dialog_loop.run(workflow, "matrix", &mut presenter).await.unwrap();

        assert_eq!(outcome, DialogOutcome::Cancelled);
        assert_eq!(
            presenter.states,
            vec![DialogState::Loading, DialogState::Loaded, DialogState::Dismissed]
        );
    }

    #[tokio::test]
    async fn test_loop_teardown_cancels_pending_search() {
        let workflow = Arc::new(SubtitleWorkflow::new(Arc::new(StalledService)));
        let cancel = CancellationToken::new();
        let dialog_loop = DialogLoop::new(cancel.clone());
        let _input = dialog_loop.sender();
        let mut presenter = ScriptedPresenter::new(None, Vec::new());

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            cancel.cancel();
        });

        let err = dialog_loop.run(workflow, "matrix", &mut presenter).await.unwrap_err();
        canceller.await.unwrap();

        assert!(matches!(err, SubpickError::Cancelled));
        assert_eq!(presenter.states, vec![DialogState::Loading]);
    }

    #[tokio::test]
    async fn test_loop_closed_input_while_loading_dismisses() {
        let workflow = Arc::new(SubtitleWorkflow::new(Arc::new(StalledService)));
        let dialog_loop = DialogLoop::new(CancellationToken::new());
        let mut presenter = ScriptedPresenter::new(None, Vec::new());

        let outcome = tokio::time::timeout(
            std::time::Duration::from_secs(2),
            dialog_loop.run(workflow, "matrix", &mut presenter),
        )
        .await
        .expect("dialog should end once input closes")
        .unwrap();

        assert_eq!(outcome, DialogOutcome::Cancelled);
        assert_eq!(presenter.states, vec![DialogState::Loading, DialogState::Dismissed]);
    }
}
