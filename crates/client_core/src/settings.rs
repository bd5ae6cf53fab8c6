use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use chrono::FixedOffset;
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use crate::{error::SettingsError, view::DateStyle};

pub const DEFAULT_SETTINGS_FILE: &str = "client.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub base_url: String,
    pub health_path: String,
    pub collection_path: String,
    pub conversion_path: String,
    pub audio_mime: String,
    pub request_timeout_secs: Option<u64>,
    pub date_utc_offset_minutes: Option<i32>,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".into(),
            health_path: "/health".into(),
            collection_path: "/api/users".into(),
            conversion_path: "/api/tts".into(),
            audio_mime: "audio/wav".into(),
            request_timeout_secs: None,
            date_utc_offset_minutes: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileSettings {
    base_url: Option<String>,
    health_path: Option<String>,
    collection_path: Option<String>,
    conversion_path: Option<String>,
    audio_mime: Option<String>,
    request_timeout_secs: Option<u64>,
    date_utc_offset_minutes: Option<i32>,
}

/// Absolute endpoint urls resolved against the configured base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub health: Url,
    pub collection: Url,
    pub conversion: Url,
}

impl ClientSettings {
    /// Defaults, then the settings file, then `APP__*` environment variables.
    ///
    /// An explicitly passed path must exist; the implicit `client.toml` is
    /// optional.
    pub fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
        let mut settings = Self::default();

        let (path, required) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_SETTINGS_FILE), false),
        };
        if required || path.exists() {
            settings.apply_file(&path)?;
        }

        settings.apply_env(|key| std::env::var(key).ok())?;
        Ok(settings)
    }

    pub fn apply_file(&mut self, path: &Path) -> Result<(), SettingsError> {
        let raw = fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let file_cfg: FileSettings =
            toml::from_str(&raw).map_err(|source| SettingsError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        if let Some(v) = file_cfg.base_url {
            self.base_url = v;
        }
        if let Some(v) = file_cfg.health_path {
            self.health_path = v;
        }
        if let Some(v) = file_cfg.collection_path {
            self.collection_path = v;
        }
        if let Some(v) = file_cfg.conversion_path {
            self.conversion_path = v;
        }
        if let Some(v) = file_cfg.audio_mime {
            self.audio_mime = v;
        }
        if file_cfg.request_timeout_secs.is_some() {
            self.request_timeout_secs = file_cfg.request_timeout_secs;
        }
        if file_cfg.date_utc_offset_minutes.is_some() {
            self.date_utc_offset_minutes = file_cfg.date_utc_offset_minutes;
        }
        Ok(())
    }

    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("APP__BASE_URL") {
            self.base_url = v;
        }
        if let Some(v) = lookup("APP__HEALTH_PATH") {
            self.health_path = v;
        }
        if let Some(v) = lookup("APP__COLLECTION_PATH") {
            self.collection_path = v;
        }
        if let Some(v) = lookup("APP__CONVERSION_PATH") {
            self.conversion_path = v;
        }
        if let Some(v) = lookup("APP__AUDIO_MIME") {
            self.audio_mime = v;
        }
        if let Some(v) = lookup("APP__REQUEST_TIMEOUT_SECS") {
            let parsed = v
                .trim()
                .parse::<u64>()
                .map_err(|_| SettingsError::InvalidValue {
                    key: "APP__REQUEST_TIMEOUT_SECS",
                    value: v.clone(),
                })?;
            self.request_timeout_secs = Some(parsed);
        }
        if let Some(v) = lookup("APP__DATE_UTC_OFFSET_MINUTES") {
            let parsed = v
                .trim()
                .parse::<i32>()
                .map_err(|_| SettingsError::InvalidValue {
                    key: "APP__DATE_UTC_OFFSET_MINUTES",
                    value: v.clone(),
                })?;
            self.date_utc_offset_minutes = Some(parsed);
        }
        Ok(())
    }

    pub fn endpoints(&self) -> Result<Endpoints, SettingsError> {
        let base = Url::parse(self.base_url.trim()).map_err(|source| SettingsError::InvalidUrl {
            value: self.base_url.clone(),
            source,
        })?;
        let join = |path: &str| {
            base.join(path).map_err(|source| SettingsError::InvalidUrl {
                value: path.to_string(),
                source,
            })
        };

        Ok(Endpoints {
            health: join(&self.health_path)?,
            collection: join(&self.collection_path)?,
            conversion: join(&self.conversion_path)?,
        })
    }

    /// Shared HTTP client. No timeout unless one is configured.
    pub fn http_client(&self) -> Result<Client, SettingsError> {
        let mut builder = Client::builder();
        if let Some(secs) = self.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        builder.build().map_err(SettingsError::HttpClient)
    }

    pub fn date_style(&self) -> Result<DateStyle, SettingsError> {
        match self.date_utc_offset_minutes {
            None => Ok(DateStyle::local()),
            Some(minutes) => minutes
                .checked_mul(60)
                .and_then(FixedOffset::east_opt)
                .map(DateStyle::with_offset)
                .ok_or(SettingsError::InvalidValue {
                    key: "date_utc_offset_minutes",
                    value: minutes.to_string(),
                }),
        }
    }
}

#[cfg(test)]
#[path = "tests/settings_tests.rs"]
mod tests;
