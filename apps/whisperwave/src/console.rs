use client_core::{
    transcript::PLACEHOLDER_TEXT, ClientEvent, NotificationKind, Notifier, TranscriptView,
    UploadOutcome, UploadStatus,
};
use shared::domain::{FileRecord, TranscriptionStatus};

pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, kind: NotificationKind, message: &str) {
        let tag = match kind {
            NotificationKind::Success => "ok",
            NotificationKind::Info => "info",
            NotificationKind::Warning => "warn",
            NotificationKind::Error => "error",
            NotificationKind::Cancelled => "cancelled",
        };
        println!("[{tag}] {message}");
    }
}

pub fn file_line(record: &FileRecord, selected: bool) -> String {
    let marker = if selected { '*' } else { ' ' };
    let status = match record.status {
        TranscriptionStatus::Pending => "pending",
        TranscriptionStatus::Completed => "completed",
        TranscriptionStatus::Unknown => "-",
    };
    format!(
        "{marker} {:<40} {}  {status}",
        record.filename,
        record.upload_timestamp.format("%Y-%m-%d %H:%M:%S")
    )
}

pub fn transcript_text(view: &TranscriptView) -> String {
    match view {
        TranscriptView::Placeholder => PLACEHOLDER_TEXT.to_string(),
        TranscriptView::Loading { filename } => format!("Loading transcription for {filename}..."),
        TranscriptView::Ready { filename, text } => format!("== {filename} ==\n{text}"),
        TranscriptView::Pending { filename } => {
            format!("Transcription for {filename} is not ready yet.")
        }
        TranscriptView::Unavailable { filename, reason } => {
            format!("Transcription for {filename} is unavailable: {reason}")
        }
    }
}

pub fn status_label(status: UploadStatus) -> &'static str {
    match status {
        UploadStatus::Idle => "idle",
        UploadStatus::CheckingExistence => "checking whether the file exists",
        UploadStatus::AwaitingConfirmation => "waiting for overwrite confirmation",
        UploadStatus::Uploading => "uploading",
        UploadStatus::Cancelled => "cancelled",
        UploadStatus::Succeeded => "succeeded",
        UploadStatus::Failed => "failed",
    }
}

/// The line to print for an event, if any. Transient terminal statuses are
/// skipped since the notifier already reports them.
pub fn event_line(event: &ClientEvent) -> Option<String> {
    match event {
        ClientEvent::UploadStatusChanged(
            status @ (UploadStatus::CheckingExistence | UploadStatus::Uploading),
        ) => Some(format!("upload: {}", status_label(*status))),
        ClientEvent::UploadStatusChanged(_) => None,
        ClientEvent::ConflictDetected { filename } => Some(format!(
            "A file named '{filename}' already exists. Overwrite? (yes/no)"
        )),
        ClientEvent::RegistryRefreshed { file_count, .. } => {
            Some(format!("file list updated: {file_count} file(s)"))
        }
        ClientEvent::FileRemoved { filename, .. } => Some(format!("removed {filename}")),
        ClientEvent::SelectionChanged { .. } => None,
        ClientEvent::TranscriptViewChanged(view) => Some(transcript_text(view)),
    }
}

pub fn outcome_line(outcome: &UploadOutcome) -> Option<String> {
    match outcome {
        UploadOutcome::Rejected => Some("nothing to do in the current upload state".to_string()),
        UploadOutcome::Declined => Some("upload skipped; existing file kept".to_string()),
        _ => None,
    }
}
