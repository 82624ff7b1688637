use std::{fs, io::ErrorKind, path::Path, time::Duration};

use shared::domain::ModelSize;
use tracing::warn;

use crate::error::ConfigError;

pub const DEFAULT_CONFIG_FILE: &str = "whisperwave.toml";

/// What to do when the pre-upload existence check itself fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExistenceCheckPolicy {
    #[default]
    FailOpen,
    FailClosed,
}

impl ExistenceCheckPolicy {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "fail_open" | "open" => Some(Self::FailOpen),
            "fail_closed" | "closed" => Some(Self::FailClosed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClientSettings {
    pub api_base_url: String,
    pub default_model_size: ModelSize,
    pub upload_timeout: Option<Duration>,
    pub request_timeout: Duration,
    pub existence_check_policy: ExistenceCheckPolicy,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:9010/api".into(),
            default_model_size: ModelSize::Base,
            upload_timeout: None,
            request_timeout: Duration::from_secs(30),
            existence_check_policy: ExistenceCheckPolicy::FailOpen,
        }
    }
}

/// Defaults, then the config file, then environment variables.
///
/// A missing file is only an error when `path` was given explicitly.
pub fn load_settings(path: Option<&Path>) -> Result<ClientSettings, ConfigError> {
    let mut settings = ClientSettings::default();

    let (path, explicit) = match path {
        Some(path) => (path, true),
        None => (Path::new(DEFAULT_CONFIG_FILE), false),
    };
    match fs::read_to_string(path) {
        Ok(raw) => apply_file(&mut settings, &raw, path)?,
        Err(err) if err.kind() == ErrorKind::NotFound && !explicit => {}
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.display().to_string(),
                source,
            })
        }
    }

    apply_env(&mut settings, |key| std::env::var(key).ok());
    Ok(settings)
}

pub(crate) fn apply_file(
    settings: &mut ClientSettings,
    raw: &str,
    path: &Path,
) -> Result<(), ConfigError> {
    let table: toml::Table = toml::from_str(raw).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })?;

    for (key, value) in &table {
        let text = match value {
            toml::Value::String(v) => v.clone(),
            toml::Value::Integer(v) => v.to_string(),
            other => other.to_string(),
        };
        if !apply_value(settings, key, &text) {
            warn!(%key, value = %text, "ignoring unrecognised or invalid config entry");
        }
    }
    Ok(())
}

pub(crate) fn apply_env(settings: &mut ClientSettings, lookup: impl Fn(&str) -> Option<String>) {
    const ENV_KEYS: [(&str, &str); 6] = [
        ("WHISPERWAVE_API_URL", "api_base_url"),
        ("APP__API_BASE_URL", "api_base_url"),
        ("APP__MODEL_SIZE", "model_size"),
        ("APP__UPLOAD_TIMEOUT_SECONDS", "upload_timeout_seconds"),
        ("APP__REQUEST_TIMEOUT_SECONDS", "request_timeout_seconds"),
        ("APP__EXISTENCE_CHECK", "existence_check"),
    ];

    for (env_key, key) in ENV_KEYS {
        if let Some(v) = lookup(env_key) {
            if !apply_value(settings, key, &v) {
                warn!(env = env_key, value = %v, "ignoring invalid environment override");
            }
        }
    }
}

fn apply_value(settings: &mut ClientSettings, key: &str, value: &str) -> bool {
    match key {
        "api_base_url" => {
            let value = value.trim();
            if value.is_empty() {
                return false;
            }
            settings.api_base_url = value.to_string();
        }
        "model_size" => match value.parse::<ModelSize>() {
            Ok(size) => settings.default_model_size = size,
            Err(_) => return false,
        },
        "upload_timeout_seconds" => match value.trim().parse::<u64>() {
            Ok(0) => settings.upload_timeout = None,
            Ok(secs) => settings.upload_timeout = Some(Duration::from_secs(secs)),
            Err(_) => return false,
        },
        "request_timeout_seconds" => match value.trim().parse::<u64>() {
            Ok(secs) if secs > 0 => settings.request_timeout = Duration::from_secs(secs),
            _ => return false,
        },
        "existence_check" => match ExistenceCheckPolicy::parse(value) {
            Some(policy) => settings.existence_check_policy = policy,
            None => return false,
        },
        _ => return false,
    }
    true
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
