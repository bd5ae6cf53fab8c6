use async_trait::async_trait;
use reqwest::Client;
use shared::domain::Record;
use tracing::{info, warn};
use url::Url;

use crate::{error::RequestError, CollectionSource};

pub const FETCH_FAILED_MESSAGE: &str = "Failed to fetch users";
pub const UNKNOWN_ERROR_MESSAGE: &str = "An unknown error occurred";

pub struct CollectionLoader {
    http: Client,
    url: Url,
}

impl CollectionLoader {
    pub fn new(http: Client, url: Url) -> Self {
        Self { http, url }
    }

    pub async fn fetch(&self) -> Result<Vec<Record>, RequestError> {
        let response = self
            .http
            .get(self.url.clone())
            .send()
            .await
            .map_err(RequestError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(RequestError::Status(status));
        }

        let body = response.bytes().await.map_err(RequestError::Body)?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Fetches the records and folds every failure into a banner message.
    pub async fn load(&self) -> Result<Vec<Record>, String> {
        match self.fetch().await {
            Ok(records) => {
                info!(url = %self.url, count = records.len(), "collection: records loaded");
                Ok(records)
            }
            Err(err) => {
                warn!(url = %self.url, "collection: load failed: {err}");
                Err(user_facing_message(&err))
            }
        }
    }
}

/// Status and transport failures share one generic message; body failures
/// carry the underlying error text.
pub fn user_facing_message(err: &RequestError) -> String {
    let message = match err {
        RequestError::Transport(_) | RequestError::Status(_) => FETCH_FAILED_MESSAGE.to_string(),
        RequestError::Body(source) => source.to_string(),
        RequestError::Decode(source) => source.to_string(),
    };
    non_blank_or_unknown(message)
}

fn non_blank_or_unknown(message: String) -> String {
    if message.trim().is_empty() {
        UNKNOWN_ERROR_MESSAGE.to_string()
    } else {
        message
    }
}

#[async_trait]
impl CollectionSource for CollectionLoader {
    async fn load(&self) -> Result<Vec<Record>, String> {
        CollectionLoader::load(self).await
    }
}

#[cfg(test)]
#[path = "tests/collection_tests.rs"]
mod tests;
