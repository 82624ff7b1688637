use serde::{Deserialize, Serialize};

/// Error body the server attaches to non-2xx responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerErrorBody {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ServerErrorBody {
    /// Message plus the server-side detail, when present.
    pub fn describe(&self) -> String {
        match &self.error {
            Some(detail) if !detail.is_empty() => format!("{}: {detail}", self.message),
            _ => self.message.clone(),
        }
    }
}
