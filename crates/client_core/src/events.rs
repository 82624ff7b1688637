use tokio::sync::broadcast;

use crate::{transcript::TranscriptView, upload::UploadStatus};

pub const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    UploadStatusChanged(UploadStatus),
    /// An upload target already exists remotely; waiting on the user.
    ConflictDetected {
        filename: String,
    },
    RegistryRefreshed {
        revision: u64,
        file_count: usize,
    },
    FileRemoved {
        filename: String,
        revision: u64,
    },
    SelectionChanged {
        selected: Option<String>,
        revision: u64,
    },
    TranscriptViewChanged(TranscriptView),
}

pub type EventSender = broadcast::Sender<ClientEvent>;

pub fn event_channel() -> EventSender {
    let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
    events
}

/// Sending with no subscribers is not an error for us.
pub(crate) fn publish(events: &EventSender, event: ClientEvent) {
    let _ = events.send(event);
}
