use std::path::PathBuf;

use reqwest::StatusCode;
use thiserror::Error;

/// Failure of a single backend request, before it is folded into view state.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("backend responded with status {0}")]
    Status(StatusCode),
    #[error("failed to read response body: {0}")]
    Body(#[source] reqwest::Error),
    #[error("{0}")]
    Decode(#[from] serde_json::Error),
}

impl RequestError {
    pub fn is_timeout(&self) -> bool {
        match self {
            RequestError::Transport(err) | RequestError::Body(err) => err.is_timeout(),
            _ => false,
        }
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings file '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid settings file '{path}': {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid value for {key}: '{value}'")]
    InvalidValue { key: &'static str, value: String },
    #[error("invalid endpoint url '{value}': {source}")]
    InvalidUrl {
        value: String,
        source: url::ParseError,
    },
    #[error("failed to build http client: {0}")]
    HttpClient(#[source] reqwest::Error),
}
