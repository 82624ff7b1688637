use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use crate::events::{publish, ClientEvent, EventSender};

/// The "currently viewed file" marker. `revision` increases on every change,
/// so two selections of the same filename are still told apart.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub filename: Option<String>,
    pub revision: u64,
}

/// Notified, in order, while the selection lock is held.
#[async_trait]
pub trait SelectionObserver: Send + Sync {
    async fn selection_changed(&self, selection: &Selection);
}

pub struct SelectionController {
    state: Mutex<Selection>,
    observers: Vec<Arc<dyn SelectionObserver>>,
    events: EventSender,
}

impl SelectionController {
    pub fn new(observers: Vec<Arc<dyn SelectionObserver>>, events: EventSender) -> Self {
        Self {
            state: Mutex::new(Selection::default()),
            observers,
            events,
        }
    }

    pub async fn current(&self) -> Selection {
        self.state.lock().await.clone()
    }

    pub async fn selected_filename(&self) -> Option<String> {
        self.state.lock().await.filename.clone()
    }

    pub async fn is_selected(&self, filename: &str) -> bool {
        self.state.lock().await.filename.as_deref() == Some(filename)
    }

    /// Toggle: selecting the current file deselects it. Returns the new
    /// selection.
    pub async fn select(&self, filename: &str) -> Option<String> {
        let mut state = self.state.lock().await;
        state.filename = if state.filename.as_deref() == Some(filename) {
            None
        } else {
            Some(filename.to_string())
        };
        state.revision += 1;
        self.announce(&state).await;
        state.filename.clone()
    }

    pub async fn on_file_deleted(&self, filename: &str) -> bool {
        self.clear_if(|selected| selected == filename).await
    }

    pub async fn retain_listed(&self, is_listed: impl Fn(&str) -> bool + Send) -> bool {
        self.clear_if(move |selected| !is_listed(selected)).await
    }

    pub async fn clear(&self) -> bool {
        self.clear_if(|_| true).await
    }

    async fn clear_if(&self, predicate: impl Fn(&str) -> bool + Send) -> bool {
        let mut state = self.state.lock().await;
        let Some(selected) = state.filename.as_deref() else {
            return false;
        };
        if !predicate(selected) {
            return false;
        }
        debug!(filename = %selected, "clearing selection");
        state.filename = None;
        state.revision += 1;
        self.announce(&state).await;
        true
    }

    async fn announce(&self, state: &Selection) {
        for observer in &self.observers {
            observer.selection_changed(state).await;
        }
        publish(
            &self.events,
            ClientEvent::SelectionChanged {
                selected: state.filename.clone(),
                revision: state.revision,
            },
        );
    }
}

#[cfg(test)]
#[path = "tests/selection_tests.rs"]
mod tests;
