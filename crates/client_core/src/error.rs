use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("network error: {0}")]
    Network(String),
    #[error("server returned {status}: {message}")]
    Server { status: u16, message: String },
    #[error("malformed server response: {0}")]
    Decode(String),
    #[error("failed to read local file '{path}': {source}")]
    LocalFile {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid request url: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    pub fn is_network(&self) -> bool {
        matches!(self, ApiError::Network(_))
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_decode() {
            ApiError::Decode(value.to_string())
        } else {
            ApiError::Network(value.to_string())
        }
    }
}

impl From<url::ParseError> for ApiError {
    fn from(value: url::ParseError) -> Self {
        ApiError::InvalidUrl(value.to_string())
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse config file '{path}': {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
}

#[derive(Debug, Error)]
pub enum LocalFileError {
    #[error("path '{0}' has no file name")]
    MissingFileName(String),
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("no transcript is currently displayed")]
    NothingDisplayed,
    #[error("failed to write transcript to '{path}': {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },
}
