use std::{sync::Arc, time::Duration};

use futures::future::{AbortHandle, AbortRegistration, Abortable, Aborted};
use shared::domain::ModelSize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::{
    api::{LocalFile, TranscriptionApi, UploadRequest},
    config::{ClientSettings, ExistenceCheckPolicy},
    error::ApiError,
    events::{publish, ClientEvent, EventSender},
    notify::{NotificationKind, Notifier},
    registry::RefreshTrigger,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStatus {
    Idle,
    CheckingExistence,
    AwaitingConfirmation,
    Uploading,
    Cancelled,
    Succeeded,
    Failed,
}

/// How a `submit_upload` / `resolve_conflict` call settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    Rejected,
    AwaitingConfirmation { filename: String },
    Declined,
    Succeeded { message: String },
    Failed { reason: String },
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CancelReason {
    User,
    TimedOut,
}

impl CancelReason {
    fn message(self) -> &'static str {
        match self {
            CancelReason::User => "Upload canceled",
            CancelReason::TimedOut => "Upload timed out and was canceled",
        }
    }
}

// Consumed when its attempt resolves or is cancelled.
#[derive(Debug)]
pub struct CancellationHandle {
    attempt: u64,
    abort: AbortHandle,
}

impl CancellationHandle {
    fn issue(attempt: u64) -> (Self, AbortRegistration) {
        let (abort, registration) = AbortHandle::new_pair();
        (Self { attempt, abort }, registration)
    }

    pub fn attempt(&self) -> u64 {
        self.attempt
    }

    pub fn is_valid_for(&self, attempt: u64) -> bool {
        self.attempt == attempt && !self.abort.is_aborted()
    }

    fn invalidate(self) {
        self.abort.abort();
    }
}

#[derive(Debug, Clone)]
pub struct UploadOptions {
    pub model_size: ModelSize,
    pub upload_timeout: Option<Duration>,
    pub existence_check_policy: ExistenceCheckPolicy,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self::from(&ClientSettings::default())
    }
}

impl From<&ClientSettings> for UploadOptions {
    fn from(settings: &ClientSettings) -> Self {
        Self {
            model_size: settings.default_model_size,
            upload_timeout: settings.upload_timeout,
            existence_check_policy: settings.existence_check_policy,
        }
    }
}

struct UploadTask {
    pending_file: Option<LocalFile>,
    status: UploadStatus,
    cancellation: Option<CancellationHandle>,
    conflict: Option<String>,
    model_size: ModelSize,
    attempts: u64,
}

pub struct UploadCoordinator {
    api: Arc<dyn TranscriptionApi>,
    notifier: Arc<dyn Notifier>,
    refresh: Arc<dyn RefreshTrigger>,
    events: EventSender,
    upload_timeout: Option<Duration>,
    existence_check_policy: ExistenceCheckPolicy,
    task: Mutex<UploadTask>,
}

impl UploadCoordinator {
    pub fn new(
        api: Arc<dyn TranscriptionApi>,
        notifier: Arc<dyn Notifier>,
        refresh: Arc<dyn RefreshTrigger>,
        events: EventSender,
        options: UploadOptions,
    ) -> Self {
        Self {
            api,
            notifier,
            refresh,
            events,
            upload_timeout: options.upload_timeout,
            existence_check_policy: options.existence_check_policy,
            task: Mutex::new(UploadTask {
                pending_file: None,
                status: UploadStatus::Idle,
                cancellation: None,
                conflict: None,
                model_size: options.model_size,
                attempts: 0,
            }),
        }
    }

    pub async fn status(&self) -> UploadStatus {
        self.task.lock().await.status
    }

    pub async fn pending_file_name(&self) -> Option<String> {
        self.task
            .lock()
            .await
            .pending_file
            .as_ref()
            .map(|file| file.name().to_string())
    }

    pub async fn conflicting_filename(&self) -> Option<String> {
        self.task.lock().await.conflict.clone()
    }

    pub async fn model_size(&self) -> ModelSize {
        self.task.lock().await.model_size
    }

    pub async fn set_model_size(&self, model_size: ModelSize) {
        self.task.lock().await.model_size = model_size;
    }

    /// Replaces the pending file and resets to `Idle`. Refused while an
    /// attempt is checking or uploading; abandons a pending conflict.
    pub async fn select_local_file(&self, file: LocalFile) -> bool {
        let mut task = self.task.lock().await;
        if matches!(
            task.status,
            UploadStatus::CheckingExistence | UploadStatus::Uploading
        ) {
            warn!(status = ?task.status, "ignoring file selection while an upload is in progress");
            return false;
        }

        debug!(filename = %file.name(), "local file selected");
        task.pending_file = Some(file);
        task.conflict = None;
        self.transition(&mut task, UploadStatus::Idle);
        true
    }

    pub async fn submit_upload(&self) -> UploadOutcome {
        let file = {
            let mut task = self.task.lock().await;
            if task.status != UploadStatus::Idle {
                debug!(status = ?task.status, "rejecting upload submit");
                return UploadOutcome::Rejected;
            }
            let Some(file) = task.pending_file.clone() else {
                self.notifier
                    .notify(NotificationKind::Warning, "Please select a file to upload");
                return UploadOutcome::Rejected;
            };
            self.transition(&mut task, UploadStatus::CheckingExistence);
            file
        };

        let exists = match self.api.file_exists(file.name()).await {
            Ok(exists) => exists,
            Err(err) => match self.existence_check_policy {
                ExistenceCheckPolicy::FailOpen => {
                    warn!(filename = %file.name(), error = %err, "existence check failed; uploading without overwrite check");
                    self.notifier.notify(
                        NotificationKind::Warning,
                        &format!(
                            "Could not check whether {} already exists; uploading anyway",
                            file.name()
                        ),
                    );
                    false
                }
                ExistenceCheckPolicy::FailClosed => {
                    let mut task = self.task.lock().await;
                    return self.fail(&mut task, format!("existence check failed: {err}"));
                }
            },
        };

        let mut task = self.task.lock().await;
        if exists {
            let filename = file.name().to_string();
            info!(%filename, "upload target already exists; awaiting confirmation");
            task.conflict = Some(filename.clone());
            self.transition(&mut task, UploadStatus::AwaitingConfirmation);
            publish(
                &self.events,
                ClientEvent::ConflictDetected {
                    filename: filename.clone(),
                },
            );
            return UploadOutcome::AwaitingConfirmation { filename };
        }

        let (request, attempt, registration) = self.begin_upload(&mut task, file);
        drop(task);
        self.run_upload(request, attempt, registration).await
    }

    pub async fn resolve_conflict(&self, confirmed: bool) -> UploadOutcome {
        let mut task = self.task.lock().await;
        if task.status != UploadStatus::AwaitingConfirmation {
            return UploadOutcome::Rejected;
        }
        task.conflict = None;

        let file = match task.pending_file.take() {
            Some(file) if confirmed => file,
            _ => {
                info!("overwrite declined");
                self.transition(&mut task, UploadStatus::Idle);
                return UploadOutcome::Declined;
            }
        };

        let (request, attempt, registration) = self.begin_upload(&mut task, file);
        drop(task);
        self.run_upload(request, attempt, registration).await
    }

    pub async fn cancel_upload(&self) -> bool {
        self.cancel(None, CancelReason::User).await
    }

    fn begin_upload(
        &self,
        task: &mut UploadTask,
        file: LocalFile,
    ) -> (UploadRequest, u64, AbortRegistration) {
        task.attempts += 1;
        let attempt = task.attempts;
        let (handle, registration) = CancellationHandle::issue(attempt);
        task.pending_file = Some(file.clone());
        task.cancellation = Some(handle);
        self.transition(task, UploadStatus::Uploading);
        info!(filename = %file.name(), attempt, model_size = %task.model_size, "upload started");

        let request = UploadRequest {
            file,
            model_size: task.model_size,
        };
        (request, attempt, registration)
    }

    async fn run_upload(
        &self,
        request: UploadRequest,
        attempt: u64,
        registration: AbortRegistration,
    ) -> UploadOutcome {
        let upload = Abortable::new(self.api.upload(request), registration);
        let result = match self.upload_timeout {
            Some(limit) => match tokio::time::timeout(limit, upload).await {
                Ok(result) => result,
                Err(_) => {
                    warn!(attempt, ?limit, "upload timed out");
                    self.cancel(Some(attempt), CancelReason::TimedOut).await;
                    return UploadOutcome::Cancelled;
                }
            },
            None => upload.await,
        };

        let message = {
            let mut task = self.task.lock().await;
            let is_current = task
                .cancellation
                .as_ref()
                .is_some_and(|handle| handle.is_valid_for(attempt));
            if !is_current {
                debug!(attempt, "discarding response for cancelled upload attempt");
                return UploadOutcome::Cancelled;
            }
            task.cancellation = None;

            match result {
                Ok(Ok(message)) => {
                    task.pending_file = None;
                    self.transition(&mut task, UploadStatus::Succeeded);
                    self.transition(&mut task, UploadStatus::Idle);
                    message
                }
                Ok(Err(err)) => return self.fail(&mut task, upload_error_reason(&err)),
                Err(Aborted) => {
                    task.pending_file = None;
                    self.transition(&mut task, UploadStatus::Cancelled);
                    self.transition(&mut task, UploadStatus::Idle);
                    return UploadOutcome::Cancelled;
                }
            }
        };

        info!(attempt, "upload succeeded");
        self.notifier.notify(NotificationKind::Success, &message);
        self.refresh.request_refresh().await;
        UploadOutcome::Succeeded { message }
    }

    /// Cancels the live attempt; with `only_attempt` set, only if that
    /// attempt is still the live one.
    async fn cancel(&self, only_attempt: Option<u64>, reason: CancelReason) -> bool {
        let mut task = self.task.lock().await;
        self.cancel_locked(&mut task, only_attempt, reason)
    }

    fn cancel_locked(
        &self,
        task: &mut UploadTask,
        only_attempt: Option<u64>,
        reason: CancelReason,
    ) -> bool {
        if task.status != UploadStatus::Uploading {
            return false;
        }
        let matches = task.cancellation.as_ref().is_some_and(|handle| {
            only_attempt.map_or(true, |attempt| handle.attempt() == attempt)
        });
        if !matches {
            return false;
        }

        if let Some(handle) = task.cancellation.take() {
            info!(attempt = handle.attempt(), ?reason, "upload cancelled");
            handle.invalidate();
        }
        task.pending_file = None;
        self.transition(task, UploadStatus::Cancelled);
        self.transition(task, UploadStatus::Idle);
        self.notifier
            .notify(NotificationKind::Cancelled, reason.message());
        true
    }

    fn fail(&self, task: &mut UploadTask, reason: String) -> UploadOutcome {
        warn!(%reason, "upload failed");
        task.cancellation = None;
        task.pending_file = None;
        self.transition(task, UploadStatus::Failed);
        self.transition(task, UploadStatus::Idle);
        self.notifier
            .notify(NotificationKind::Error, "Error uploading file");
        UploadOutcome::Failed { reason }
    }

    fn transition(&self, task: &mut UploadTask, status: UploadStatus) {
        if task.status == status {
            return;
        }
        debug!(from = ?task.status, to = ?status, "upload status");
        task.status = status;
        debug_assert_eq!(
            task.cancellation.is_some(),
            status == UploadStatus::Uploading
        );
        publish(&self.events, ClientEvent::UploadStatusChanged(status));
    }
}

fn upload_error_reason(err: &ApiError) -> String {
    match err {
        ApiError::Server { message, .. } => message.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
#[path = "tests/upload_tests.rs"]
mod tests;
