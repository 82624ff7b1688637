use serde::{Deserialize, Serialize};

use crate::domain::FileRecord;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileExistsResponse {
    pub exists: bool,
}

/// Body returned by upload and delete.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionResponse {
    #[serde(default)]
    pub transcription_text: Option<String>,
}

pub type FileListResponse = Vec<FileRecord>;

/// Multipart field names understood by the upload endpoint.
pub mod upload_fields {
    pub const FILE: &str = "file";
    pub const MODEL_SIZE: &str = "model_size";
}
