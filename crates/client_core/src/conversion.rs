use async_trait::async_trait;
use reqwest::Client;
use shared::protocol::ConversionRequest;
use tracing::info;
use url::Url;

use crate::{error::RequestError, ConversionBackend};

pub struct ConversionSubmitter {
    http: Client,
    url: Url,
}

impl ConversionSubmitter {
    pub fn new(http: Client, url: Url) -> Self {
        Self { http, url }
    }

    /// Posts `{"text": ...}` and returns the audio body untouched. The body of
    /// a failure response is never read.
    pub async fn convert(&self, text: &str) -> Result<Vec<u8>, RequestError> {
        let response = self
            .http
            .post(self.url.clone())
            .json(&ConversionRequest {
                text: text.to_string(),
            })
            .send()
            .await
            .map_err(RequestError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(RequestError::Status(status));
        }

        let audio = response.bytes().await.map_err(RequestError::Body)?;
        info!(url = %self.url, bytes = audio.len(), "tts: audio received");
        Ok(audio.to_vec())
    }
}

#[async_trait]
impl ConversionBackend for ConversionSubmitter {
    async fn convert(&self, text: &str) -> Result<Vec<u8>, RequestError> {
        ConversionSubmitter::convert(self, text).await
    }
}

#[cfg(test)]
#[path = "tests/conversion_tests.rs"]
mod tests;
