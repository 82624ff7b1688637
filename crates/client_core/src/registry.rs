use std::{
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use async_trait::async_trait;
use shared::domain::FileRecord;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::{
    api::TranscriptionApi,
    error::ApiError,
    events::{publish, ClientEvent, EventSender},
    notify::{NotificationKind, Notifier},
    selection::SelectionController,
};

#[async_trait]
pub trait RefreshTrigger: Send + Sync {
    async fn request_refresh(&self) -> bool;
}

#[derive(Default)]
struct RegistryState {
    records: Vec<FileRecord>,
    revision: u64,
    applied_ticket: u64,
    /// Confirmed deletions, with the last refresh ticket issued at the time.
    /// A refresh holding one of those tickets may still list the file.
    tombstones: Vec<(String, u64)>,
}

pub struct FileRegistry {
    api: Arc<dyn TranscriptionApi>,
    notifier: Arc<dyn Notifier>,
    selection: Arc<SelectionController>,
    events: EventSender,
    state: RwLock<RegistryState>,
    next_ticket: AtomicU64,
}

impl FileRegistry {
    pub fn new(
        api: Arc<dyn TranscriptionApi>,
        notifier: Arc<dyn Notifier>,
        selection: Arc<SelectionController>,
        events: EventSender,
    ) -> Self {
        Self {
            api,
            notifier,
            selection,
            events,
            state: RwLock::new(RegistryState::default()),
            next_ticket: AtomicU64::new(0),
        }
    }

    pub async fn records(&self) -> Vec<FileRecord> {
        self.state.read().await.records.clone()
    }

    pub async fn get(&self, filename: &str) -> Option<FileRecord> {
        self.state
            .read()
            .await
            .records
            .iter()
            .find(|record| record.filename == filename)
            .cloned()
    }

    pub async fn contains(&self, filename: &str) -> bool {
        self.get(filename).await.is_some()
    }

    pub async fn revision(&self) -> u64 {
        self.state.read().await.revision
    }

    /// Replaces the local list with the server's. Returns whether the result
    /// was applied; a response older than one already applied is dropped.
    pub async fn refresh(&self) -> bool {
        let ticket = self.next_ticket.fetch_add(1, Ordering::SeqCst) + 1;

        let records = match self.api.list_files().await {
            Ok(records) => records,
            Err(err) => {
                warn!(error = %err, "failed to refresh file list");
                self.notifier
                    .notify(NotificationKind::Error, "Error fetching files");
                return false;
            }
        };

        let mut state = self.state.write().await;
        if ticket < state.applied_ticket {
            debug!(ticket, applied = state.applied_ticket, "dropping stale file list");
            return false;
        }

        let records: Vec<FileRecord> = records
            .into_iter()
            .filter(|record| {
                !state
                    .tombstones
                    .iter()
                    .any(|(name, issued)| *name == record.filename && ticket <= *issued)
            })
            .collect();
        state.tombstones.retain(|(_, issued)| *issued > ticket);
        state.applied_ticket = ticket;

        // Selection must drop vanished files before the new list is visible.
        self.selection
            .retain_listed(|name| records.iter().any(|record| record.filename == name))
            .await;

        state.records = records;
        state.revision += 1;
        let revision = state.revision;
        let file_count = state.records.len();
        drop(state);

        debug!(revision, file_count, "file list refreshed");
        publish(
            &self.events,
            ClientEvent::RegistryRefreshed {
                revision,
                file_count,
            },
        );
        true
    }

    /// Deletes `filename` remotely. The local record is removed only once the
    /// server confirms.
    pub async fn delete(&self, filename: &str) -> bool {
        let message = match self.api.delete_file(filename).await {
            Ok(message) => message,
            Err(err) => {
                warn!(%filename, error = %err, "delete failed");
                self.notifier
                    .notify(NotificationKind::Error, "Error deleting file");
                return false;
            }
        };

        let mut state = self.state.write().await;
        self.selection.on_file_deleted(filename).await;
        state.records.retain(|record| record.filename != filename);
        let issued = self.next_ticket.load(Ordering::SeqCst);
        state.tombstones.push((filename.to_string(), issued));
        state.revision += 1;
        let revision = state.revision;
        drop(state);

        info!(%filename, revision, "file deleted");
        publish(
            &self.events,
            ClientEvent::FileRemoved {
                filename: filename.to_string(),
                revision,
            },
        );
        self.notifier.notify(NotificationKind::Success, &message);
        true
    }

    pub async fn download(&self, filename: &str, dest_dir: &Path) -> Result<PathBuf, ApiError> {
        let local_name = Path::new(filename)
            .file_name()
            .ok_or_else(|| ApiError::InvalidUrl(format!("unusable filename '{filename}'")))?;
        let dest = dest_dir.join(local_name);

        let bytes = match self.api.download(filename).await {
            Ok(bytes) => bytes,
            Err(err) => {
                self.notifier
                    .notify(NotificationKind::Error, "Error downloading file");
                return Err(err);
            }
        };
        tokio::fs::write(&dest, bytes)
            .await
            .map_err(|source| ApiError::LocalFile {
                path: dest.display().to_string(),
                source,
            })?;
        info!(%filename, dest = %dest.display(), "file downloaded");
        Ok(dest)
    }
}

#[async_trait]
impl RefreshTrigger for FileRegistry {
    async fn request_refresh(&self) -> bool {
        self.refresh().await
    }
}

#[cfg(test)]
#[path = "tests/registry_tests.rs"]
mod tests;
