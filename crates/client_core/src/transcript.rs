use std::{path::Path, sync::Arc};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::{
    api::TranscriptionApi,
    error::ExportError,
    events::{publish, ClientEvent, EventSender},
    notify::{NotificationKind, Notifier},
    selection::{Selection, SelectionObserver},
};

pub const PLACEHOLDER_TEXT: &str = "Select a file to view the transcription.";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TranscriptView {
    #[default]
    Placeholder,
    Loading {
        filename: String,
    },
    Ready {
        filename: String,
        text: String,
    },
    /// The server knows the file but has not finished transcribing it.
    Pending {
        filename: String,
    },
    Unavailable {
        filename: String,
        reason: String,
    },
}

impl TranscriptView {
    pub fn filename(&self) -> Option<&str> {
        match self {
            TranscriptView::Placeholder => None,
            TranscriptView::Loading { filename }
            | TranscriptView::Ready { filename, .. }
            | TranscriptView::Pending { filename }
            | TranscriptView::Unavailable { filename, .. } => Some(filename),
        }
    }
}

/// One fetch, bound to the selection revision that caused it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTarget {
    pub filename: String,
    pub revision: u64,
}

#[derive(Default)]
struct FetcherState {
    target: Option<FetchTarget>,
    latest_revision: u64,
    view: TranscriptView,
}

pub struct TranscriptFetcher {
    api: Arc<dyn TranscriptionApi>,
    notifier: Arc<dyn Notifier>,
    events: EventSender,
    state: Mutex<FetcherState>,
}

impl TranscriptFetcher {
    pub fn new(
        api: Arc<dyn TranscriptionApi>,
        notifier: Arc<dyn Notifier>,
        events: EventSender,
    ) -> Arc<Self> {
        Arc::new(Self {
            api,
            notifier,
            events,
            state: Mutex::new(FetcherState::default()),
        })
    }

    pub async fn view(&self) -> TranscriptView {
        self.state.lock().await.view.clone()
    }

    async fn retarget(&self, selection: &Selection) -> Option<FetchTarget> {
        let mut state = self.state.lock().await;
        if selection.revision <= state.latest_revision {
            return None;
        }
        state.latest_revision = selection.revision;

        match &selection.filename {
            None => {
                state.target = None;
                self.set_view(&mut state, TranscriptView::Placeholder);
                None
            }
            Some(filename) => {
                let target = FetchTarget {
                    filename: filename.clone(),
                    revision: selection.revision,
                };
                state.target = Some(target.clone());
                self.set_view(
                    &mut state,
                    TranscriptView::Loading {
                        filename: filename.clone(),
                    },
                );
                Some(target)
            }
        }
    }

    /// Fetches the transcript for `target` and renders it only if `target` is
    /// still the active selection when the response lands. Returns whether
    /// the result was applied.
    pub async fn fetch(&self, target: FetchTarget) -> bool {
        let result = self.api.transcript(&target.filename).await;

        let mut state = self.state.lock().await;
        if state.target.as_ref() != Some(&target) {
            debug!(
                filename = %target.filename,
                revision = target.revision,
                "discarding stale transcript response"
            );
            return false;
        }

        let view = match result {
            Ok(Some(text)) => TranscriptView::Ready {
                filename: target.filename,
                text,
            },
            Ok(None) => TranscriptView::Pending {
                filename: target.filename,
            },
            Err(err) => {
                warn!(filename = %target.filename, error = %err, "transcript fetch failed");
                self.notifier
                    .notify(NotificationKind::Error, "Error fetching transcription");
                TranscriptView::Unavailable {
                    filename: target.filename,
                    reason: err.to_string(),
                }
            }
        };
        self.set_view(&mut state, view);
        true
    }

    pub async fn export(&self, dest: &Path) -> Result<(), ExportError> {
        let text = match &self.state.lock().await.view {
            TranscriptView::Ready { text, .. } => text.clone(),
            _ => return Err(ExportError::NothingDisplayed),
        };
        tokio::fs::write(dest, text)
            .await
            .map_err(|source| ExportError::Write {
                path: dest.display().to_string(),
                source,
            })
    }

    fn set_view(&self, state: &mut FetcherState, view: TranscriptView) {
        if state.view == view {
            return;
        }
        state.view = view.clone();
        publish(&self.events, ClientEvent::TranscriptViewChanged(view));
    }
}

#[async_trait]
impl SelectionObserver for Arc<TranscriptFetcher> {
    async fn selection_changed(&self, selection: &Selection) {
        let Some(target) = self.retarget(selection).await else {
            return;
        };
        let fetcher = Arc::clone(self);
        tokio::spawn(async move {
            fetcher.fetch(target).await;
        });
    }
}

#[cfg(test)]
#[path = "tests/transcript_tests.rs"]
mod tests;
