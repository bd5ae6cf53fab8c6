use async_trait::async_trait;
use reqwest::Client;
use shared::domain::HealthStatus;
use tracing::{info, warn};
use url::Url;

use crate::HealthProbe;

pub struct HealthMonitor {
    http: Client,
    url: Url,
}

impl HealthMonitor {
    pub fn new(http: Client, url: Url) -> Self {
        Self { http, url }
    }

    /// Success status means healthy. Any other status and every transport
    /// failure collapse to unhealthy. The body is never read.
    pub async fn probe(&self) -> HealthStatus {
        let response = match self.http.get(self.url.clone()).send().await {
            Ok(response) => response,
            Err(err) => {
                warn!(
                    url = %self.url,
                    timeout = err.is_timeout(),
                    "health: liveness request failed: {err}"
                );
                return HealthStatus::Unhealthy;
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!(url = %self.url, status = status.as_u16(), "health: backend reported failure");
            return HealthStatus::Unhealthy;
        }

        info!(
            url = %self.url,
            status = status.as_u16(),
            "health: backend healthy"
        );
        HealthStatus::Healthy
    }
}

#[async_trait]
impl HealthProbe for HealthMonitor {
    async fn probe(&self) -> HealthStatus {
        HealthMonitor::probe(self).await
    }
}

#[cfg(test)]
#[path = "tests/health_tests.rs"]
mod tests;
