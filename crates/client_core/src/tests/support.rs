use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use shared::domain::{FileRecord, ModelSize};
use tokio::sync::{oneshot, Notify};

use crate::{
    api::{TranscriptionApi, UploadRequest},
    error::ApiError,
    notify::{NotificationKind, Notifier},
};

#[derive(Default)]
pub struct RecordingNotifier {
    entries: Mutex<Vec<(NotificationKind, String)>>,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn entries(&self) -> Vec<(NotificationKind, String)> {
        self.entries.lock().expect("notifier lock").clone()
    }

    pub fn count(&self, kind: NotificationKind) -> usize {
        self.entries()
            .iter()
            .filter(|(entry_kind, _)| *entry_kind == kind)
            .count()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, kind: NotificationKind, message: &str) {
        self.entries
            .lock()
            .expect("notifier lock")
            .push((kind, message.to_string()));
    }
}

#[derive(Default)]
struct FakeState {
    files: Vec<FileRecord>,
    transcripts: HashMap<String, Option<String>>,
    uploads: Vec<(String, ModelSize)>,
    existence_checks: Vec<String>,
    deletes: Vec<String>,
    transcript_requests: Vec<String>,
    list_calls: u32,
    fail_existence_check: bool,
    fail_upload: Option<String>,
    fail_list: bool,
    fail_delete: bool,
    failing_transcripts: HashSet<String>,
    upload_gate: Option<oneshot::Receiver<()>>,
    list_gates: Vec<oneshot::Receiver<()>>,
    transcript_gates: HashMap<String, oneshot::Receiver<()>>,
    uploads_completed: i64,
}

#[derive(Default)]
pub struct FakeApi {
    state: Mutex<FakeState>,
    pub upload_started: Notify,
}

pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 10, 15, 10, 0, 0).unwrap()
}

impl FakeApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_files(names: &[&str]) -> Arc<Self> {
        let api = Self::default();
        {
            let mut state = api.state.lock().expect("fake lock");
            state.files = names
                .iter()
                .map(|name| FileRecord::new(*name, base_time()))
                .collect();
        }
        Arc::new(api)
    }

    fn state(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().expect("fake lock")
    }

    pub fn set_transcript(&self, filename: &str, text: Option<&str>) {
        self.state()
            .transcripts
            .insert(filename.to_string(), text.map(str::to_string));
    }

    pub fn remove_remote(&self, filename: &str) {
        self.state().files.retain(|record| record.filename != filename);
    }

    pub fn fail_existence_check(&self, fail: bool) {
        self.state().fail_existence_check = fail;
    }

    pub fn fail_upload(&self, message: Option<&str>) {
        self.state().fail_upload = message.map(str::to_string);
    }

    pub fn fail_list(&self, fail: bool) {
        self.state().fail_list = fail;
    }

    pub fn fail_delete(&self, fail: bool) {
        self.state().fail_delete = fail;
    }

    pub fn fail_transcript(&self, filename: &str) {
        self.state().failing_transcripts.insert(filename.to_string());
    }

    /// The next upload blocks until the returned sender fires or is dropped.
    pub fn hold_next_upload(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.state().upload_gate = Some(rx);
        tx
    }

    /// The next list call blocks until released. Gates are consumed in order.
    pub fn hold_next_list(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.state().list_gates.push(rx);
        tx
    }

    pub fn hold_transcript(&self, filename: &str) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.state()
            .transcript_gates
            .insert(filename.to_string(), rx);
        tx
    }

    pub fn upload_calls(&self) -> Vec<(String, ModelSize)> {
        self.state().uploads.clone()
    }

    pub fn existence_checks(&self) -> Vec<String> {
        self.state().existence_checks.clone()
    }

    pub fn delete_calls(&self) -> Vec<String> {
        self.state().deletes.clone()
    }

    pub fn transcript_requests(&self) -> Vec<String> {
        self.state().transcript_requests.clone()
    }

    pub fn list_calls(&self) -> u32 {
        self.state().list_calls
    }

    pub fn remote_record(&self, filename: &str) -> Option<FileRecord> {
        self.state()
            .files
            .iter()
            .find(|record| record.filename == filename)
            .cloned()
    }
}

fn network_down() -> ApiError {
    ApiError::Network("connection refused".to_string())
}

#[async_trait]
impl TranscriptionApi for FakeApi {
    async fn file_exists(&self, filename: &str) -> Result<bool, ApiError> {
        let mut state = self.state();
        state.existence_checks.push(filename.to_string());
        if state.fail_existence_check {
            return Err(network_down());
        }
        Ok(state.files.iter().any(|record| record.filename == filename))
    }

    async fn upload(&self, request: UploadRequest) -> Result<String, ApiError> {
        let gate = {
            let mut state = self.state();
            state
                .uploads
                .push((request.file.name().to_string(), request.model_size));
            state.upload_gate.take()
        };
        self.upload_started.notify_one();
        if let Some(gate) = gate {
            let _ = gate.await;
        }

        request.file.read().await?;

        let mut state = self.state();
        if let Some(message) = state.fail_upload.clone() {
            return Err(ApiError::Server {
                status: 500,
                message,
            });
        }
        state.uploads_completed += 1;
        let stamp = base_time() + Duration::seconds(state.uploads_completed);
        let filename = request.file.name().to_string();
        state.files.retain(|record| record.filename != filename);
        state.files.push(FileRecord::new(filename, stamp));
        Ok("File uploaded and transcribed successfully".to_string())
    }

    async fn list_files(&self) -> Result<Vec<FileRecord>, ApiError> {
        let (gate, snapshot) = {
            let mut state = self.state();
            state.list_calls += 1;
            let gate = if state.list_gates.is_empty() {
                None
            } else {
                Some(state.list_gates.remove(0))
            };
            let snapshot = if state.fail_list {
                Err(network_down())
            } else {
                Ok(state.files.clone())
            };
            (gate, snapshot)
        };
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        snapshot
    }

    async fn delete_file(&self, filename: &str) -> Result<String, ApiError> {
        let mut state = self.state();
        state.deletes.push(filename.to_string());
        if state.fail_delete {
            return Err(network_down());
        }
        let before = state.files.len();
        state.files.retain(|record| record.filename != filename);
        if state.files.len() == before {
            return Err(ApiError::Server {
                status: 404,
                message: "File not found".to_string(),
            });
        }
        Ok("File deleted successfully".to_string())
    }

    async fn transcript(&self, filename: &str) -> Result<Option<String>, ApiError> {
        let gate = {
            let mut state = self.state();
            state.transcript_requests.push(filename.to_string());
            state.transcript_gates.remove(filename)
        };
        if let Some(gate) = gate {
            let _ = gate.await;
        }

        let state = self.state();
        if state.failing_transcripts.contains(filename) {
            return Err(network_down());
        }
        match state.transcripts.get(filename) {
            Some(text) => Ok(text.clone()),
            None => Err(ApiError::Server {
                status: 404,
                message: "File not found".to_string(),
            }),
        }
    }

    async fn download(&self, filename: &str) -> Result<Vec<u8>, ApiError> {
        let state = self.state();
        if state.files.iter().any(|record| record.filename == filename) {
            Ok(format!("media:{filename}").into_bytes())
        } else {
            Err(ApiError::Server {
                status: 404,
                message: "File not found".to_string(),
            })
        }
    }
}
