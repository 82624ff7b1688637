use std::{path::PathBuf, sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::{
    multipart::{Form, Part},
    Client, RequestBuilder, Response,
};
use shared::{
    domain::{FileRecord, ModelSize},
    error::ServerErrorBody,
    protocol::{
        upload_fields, FileExistsResponse, FileListResponse, MessageResponse,
        TranscriptionResponse,
    },
};
use tracing::debug;
use url::Url;

use crate::error::{ApiError, LocalFileError};

#[derive(Debug, Clone)]
enum FileSource {
    Path(PathBuf),
    Memory(Arc<[u8]>),
}

/// A user-chosen media file. Contents are read only when the upload is sent.
#[derive(Debug, Clone)]
pub struct LocalFile {
    name: String,
    source: FileSource,
}

impl LocalFile {
    pub fn from_path(path: impl Into<PathBuf>) -> Result<Self, LocalFileError> {
        let path = path.into();
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .filter(|name| !name.is_empty())
            .ok_or_else(|| LocalFileError::MissingFileName(path.display().to_string()))?;
        Ok(Self {
            name,
            source: FileSource::Path(path),
        })
    }

    pub fn in_memory(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            source: FileSource::Memory(Arc::from(bytes.into())),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mime_type(&self) -> String {
        mime_guess::from_path(&self.name)
            .first_or_octet_stream()
            .essence_str()
            .to_string()
    }

    pub async fn read(&self) -> Result<Vec<u8>, ApiError> {
        match &self.source {
            FileSource::Memory(bytes) => Ok(bytes.to_vec()),
            FileSource::Path(path) => {
                tokio::fs::read(path)
                    .await
                    .map_err(|source| ApiError::LocalFile {
                        path: path.display().to_string(),
                        source,
                    })
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub file: LocalFile,
    pub model_size: ModelSize,
}

#[async_trait]
pub trait TranscriptionApi: Send + Sync {
    async fn file_exists(&self, filename: &str) -> Result<bool, ApiError>;
    async fn upload(&self, request: UploadRequest) -> Result<String, ApiError>;
    async fn list_files(&self) -> Result<Vec<FileRecord>, ApiError>;
    async fn delete_file(&self, filename: &str) -> Result<String, ApiError>;
    /// `None` while the server has not produced a transcript yet.
    async fn transcript(&self, filename: &str) -> Result<Option<String>, ApiError>;
    async fn download(&self, filename: &str) -> Result<Vec<u8>, ApiError>;
}

pub struct HttpTranscriptionApi {
    http: Client,
    base_url: Url,
    request_timeout: Duration,
}

impl HttpTranscriptionApi {
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self, ApiError> {
        let base_url = Url::parse(base_url.trim())?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(base_url.to_string()));
        }
        Ok(Self {
            http: Client::builder().build()?,
            base_url,
            request_timeout,
        })
    }

    /// Appends `segments` to the base url, percent-encoding each one so a
    /// filename always stays a single path segment.
    pub(crate) fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = request.send().await?;
        ensure_success(response).await
    }
}

async fn ensure_success(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ServerErrorBody>(&body)
        .map(|body| body.describe())
        .unwrap_or_else(|_| {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        });
    Err(ApiError::Server {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl TranscriptionApi for HttpTranscriptionApi {
    async fn file_exists(&self, filename: &str) -> Result<bool, ApiError> {
        let url = self.endpoint(&["check-file", filename])?;
        let body: FileExistsResponse = self
            .send(self.http.get(url).timeout(self.request_timeout))
            .await?
            .json()
            .await?;
        Ok(body.exists)
    }

    async fn upload(&self, request: UploadRequest) -> Result<String, ApiError> {
        let url = self.endpoint(&["upload"])?;
        let bytes = request.file.read().await?;
        debug!(
            filename = %request.file.name(),
            size_bytes = bytes.len(),
            model_size = %request.model_size,
            "sending upload"
        );
        let part = Part::bytes(bytes)
            .file_name(request.file.name().to_string())
            .mime_str(&request.file.mime_type())?;
        let form = Form::new()
            .part(upload_fields::FILE, part)
            .text(upload_fields::MODEL_SIZE, request.model_size.as_str());

        let body: MessageResponse = self
            .send(self.http.post(url).multipart(form))
            .await?
            .json()
            .await?;
        Ok(body.message)
    }

    async fn list_files(&self) -> Result<Vec<FileRecord>, ApiError> {
        let url = self.endpoint(&["files"])?;
        let body: FileListResponse = self
            .send(self.http.get(url).timeout(self.request_timeout))
            .await?
            .json()
            .await?;
        Ok(body)
    }

    async fn delete_file(&self, filename: &str) -> Result<String, ApiError> {
        let url = self.endpoint(&["delete", filename])?;
        let body: MessageResponse = self
            .send(self.http.delete(url).timeout(self.request_timeout))
            .await?
            .json()
            .await?;
        Ok(body.message)
    }

    async fn transcript(&self, filename: &str) -> Result<Option<String>, ApiError> {
        let url = self.endpoint(&["transcription", filename])?;
        let body: TranscriptionResponse = self
            .send(self.http.get(url).timeout(self.request_timeout))
            .await?
            .json()
            .await?;
        Ok(body.transcription_text)
    }

    async fn download(&self, filename: &str) -> Result<Vec<u8>, ApiError> {
        let url = self.endpoint(&["download", filename])?;
        let bytes = self
            .send(self.http.get(url).timeout(self.request_timeout))
            .await?
            .bytes()
            .await?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
#[path = "tests/api_tests.rs"]
mod tests;
