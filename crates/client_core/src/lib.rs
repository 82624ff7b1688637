pub mod api;
pub mod config;
pub mod error;
pub mod events;
pub mod notify;
pub mod registry;
pub mod selection;
pub mod session;
pub mod transcript;
pub mod upload;

pub use api::{HttpTranscriptionApi, LocalFile, TranscriptionApi, UploadRequest};
pub use config::{load_settings, ClientSettings, ExistenceCheckPolicy};
pub use error::ApiError;
pub use events::ClientEvent;
pub use notify::{NotificationKind, Notifier, TracingNotifier};
pub use registry::{FileRegistry, RefreshTrigger};
pub use selection::{Selection, SelectionController, SelectionObserver};
pub use session::TranscriptionClient;
pub use transcript::{TranscriptFetcher, TranscriptView};
pub use upload::{UploadCoordinator, UploadOptions, UploadOutcome, UploadStatus};

#[cfg(test)]
#[path = "tests/support.rs"]
pub(crate) mod test_support;
