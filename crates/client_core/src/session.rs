use std::sync::Arc;

use tokio::sync::broadcast;

use crate::{
    api::{HttpTranscriptionApi, TranscriptionApi},
    config::ClientSettings,
    error::ApiError,
    events::{event_channel, ClientEvent, EventSender},
    notify::Notifier,
    registry::{FileRegistry, RefreshTrigger},
    selection::{SelectionController, SelectionObserver},
    transcript::TranscriptFetcher,
    upload::{UploadCoordinator, UploadOptions},
};

/// The four client components wired to one API, one notifier and one event
/// channel.
pub struct TranscriptionClient {
    pub uploads: Arc<UploadCoordinator>,
    pub registry: Arc<FileRegistry>,
    pub selection: Arc<SelectionController>,
    pub transcripts: Arc<TranscriptFetcher>,
    events: EventSender,
}

impl TranscriptionClient {
    pub fn new(
        api: Arc<dyn TranscriptionApi>,
        notifier: Arc<dyn Notifier>,
        options: UploadOptions,
    ) -> Self {
        let events = event_channel();

        let transcripts =
            TranscriptFetcher::new(Arc::clone(&api), Arc::clone(&notifier), events.clone());
        let observer: Arc<dyn SelectionObserver> = Arc::new(Arc::clone(&transcripts));
        let selection = Arc::new(SelectionController::new(vec![observer], events.clone()));
        let registry = Arc::new(FileRegistry::new(
            Arc::clone(&api),
            Arc::clone(&notifier),
            Arc::clone(&selection),
            events.clone(),
        ));
        let refresh: Arc<dyn RefreshTrigger> = registry.clone();
        let uploads = Arc::new(UploadCoordinator::new(
            api,
            notifier,
            refresh,
            events.clone(),
            options,
        ));

        Self {
            uploads,
            registry,
            selection,
            transcripts,
            events,
        }
    }

    pub fn connect(
        settings: &ClientSettings,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, ApiError> {
        let api = HttpTranscriptionApi::new(&settings.api_base_url, settings.request_timeout)?;
        Ok(Self::new(
            Arc::new(api),
            notifier,
            UploadOptions::from(settings),
        ))
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
