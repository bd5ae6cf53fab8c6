//! Request orchestration and view state for the speech console.
//!
//! Three independent backend interactions (liveness probe, user list,
//! text-to-speech conversion) report into one [`Coordinator`], which owns
//! the [`ViewState`] and republishes a rendered [`View`] after every change.

use async_trait::async_trait;
use shared::domain::{HealthStatus, Record};

pub mod audio;
pub mod collection;
pub mod conversion;
pub mod coordinator;
pub mod error;
pub mod health;
pub mod settings;
pub mod view;

pub use audio::{AudioBlob, AudioHandle, AudioStore};
pub use coordinator::{Coordinator, MountTasks, SubmitOutcome};
pub use error::{RequestError, SettingsError};
pub use settings::{ClientSettings, Endpoints};
pub use view::{render, DateStyle, View, ViewState};

#[async_trait]
pub trait HealthProbe: Send + Sync {
    async fn probe(&self) -> HealthStatus;
}

#[async_trait]
pub trait CollectionSource: Send + Sync {
    /// Records in server order, or the message for the error banner.
    async fn load(&self) -> Result<Vec<Record>, String>;
}

#[async_trait]
pub trait ConversionBackend: Send + Sync {
    async fn convert(&self, text: &str) -> Result<Vec<u8>, RequestError>;
}

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;
