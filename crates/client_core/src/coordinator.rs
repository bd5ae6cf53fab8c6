use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex, MutexGuard, PoisonError,
};

use tokio::{
    sync::broadcast,
    task::{AbortHandle, JoinHandle},
};
use tracing::{error, info, warn};

use crate::{
    audio::AudioStore,
    collection::CollectionLoader,
    conversion::ConversionSubmitter,
    error::SettingsError,
    health::HealthMonitor,
    settings::ClientSettings,
    view::{render, DateStyle, SubmitRejection, View, ViewState},
    CollectionSource, ConversionBackend, HealthProbe,
};

const VIEW_CHANNEL_CAPACITY: usize = 64;
const AUDIO_ORIGIN: &str = "speech-console";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Skipped(SubmitRejection),
    Converted { url: String },
    /// Audio arrived after unmount and was dropped without a handle.
    Discarded,
    Failed,
}

/// The mount-time tasks. Each can be awaited or aborted independently.
pub struct MountTasks {
    pub health: JoinHandle<()>,
    pub collection: JoinHandle<()>,
}

impl MountTasks {
    pub async fn settled(self) {
        let (health, collection) = futures::join!(self.health, self.collection);
        for (task, result) in [("health", health), ("collection", collection)] {
            if let Err(err) = result {
                if !err.is_cancelled() {
                    error!(task, "mount task panicked: {err}");
                }
            }
        }
    }
}

pub struct Coordinator {
    health: Arc<dyn HealthProbe>,
    collection: Arc<dyn CollectionSource>,
    conversion: Arc<dyn ConversionBackend>,
    audio_store: Arc<AudioStore>,
    audio_mime: String,
    dates: DateStyle,
    state: Mutex<ViewState>,
    inflight: Mutex<Vec<AbortHandle>>,
    mounted: AtomicBool,
    views: broadcast::Sender<View>,
}

/// Clears `is_submitting` however the submission ends, cancellation included.
struct SubmittingGuard<'a> {
    coordinator: &'a Coordinator,
}

impl Drop for SubmittingGuard<'_> {
    fn drop(&mut self) {
        self.coordinator.update(ViewState::finish_submit);
    }
}

impl Coordinator {
    pub fn from_settings(settings: &ClientSettings) -> Result<Arc<Self>, SettingsError> {
        let endpoints = settings.endpoints()?;
        let http = settings.http_client()?;
        info!(
            health = %endpoints.health,
            collection = %endpoints.collection,
            conversion = %endpoints.conversion,
            "coordinator: endpoints configured"
        );

        Ok(Self::new_with_dependencies(
            Arc::new(HealthMonitor::new(http.clone(), endpoints.health)),
            Arc::new(CollectionLoader::new(http.clone(), endpoints.collection)),
            Arc::new(ConversionSubmitter::new(http, endpoints.conversion)),
            AudioStore::new(AUDIO_ORIGIN),
            settings.audio_mime.clone(),
            settings.date_style()?,
        ))
    }

    pub fn new_with_dependencies(
        health: Arc<dyn HealthProbe>,
        collection: Arc<dyn CollectionSource>,
        conversion: Arc<dyn ConversionBackend>,
        audio_store: Arc<AudioStore>,
        audio_mime: impl Into<String>,
        dates: DateStyle,
    ) -> Arc<Self> {
        let (views, _) = broadcast::channel(VIEW_CHANNEL_CAPACITY);
        Arc::new(Self {
            health,
            collection,
            conversion,
            audio_store,
            audio_mime: audio_mime.into(),
            dates,
            state: Mutex::new(ViewState::new()),
            inflight: Mutex::new(Vec::new()),
            mounted: AtomicBool::new(false),
            views,
        })
    }

    fn lock_state(&self) -> MutexGuard<'_, ViewState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn track(&self, handle: AbortHandle) {
        let mut inflight = self.inflight.lock().unwrap_or_else(PoisonError::into_inner);
        inflight.retain(|task| !task.is_finished());
        inflight.push(handle);
    }

    /// Applies one transition and publishes the re-rendered view.
    fn update<R>(&self, transition: impl FnOnce(&mut ViewState) -> R) -> R {
        let mut state = self.lock_state();
        let result = transition(&mut state);
        let _ = self.views.send(render(&state, &self.dates));
        result
    }

    pub fn subscribe_views(&self) -> broadcast::Receiver<View> {
        self.views.subscribe()
    }

    pub fn view(&self) -> View {
        render(&self.lock_state(), &self.dates)
    }

    pub fn inspect<R>(&self, read: impl FnOnce(&ViewState) -> R) -> R {
        read(&self.lock_state())
    }

    pub fn audio_store(&self) -> &Arc<AudioStore> {
        &self.audio_store
    }

    /// Starts the health probe and the collection load, once per coordinator.
    /// Returns `None` when already mounted.
    pub fn mount(self: &Arc<Self>) -> Option<MountTasks> {
        if self.mounted.swap(true, Ordering::SeqCst) {
            warn!("coordinator: mount requested twice; ignoring");
            return None;
        }

        let coordinator = Arc::clone(self);
        let health = tokio::spawn(async move {
            let status = coordinator.health.probe().await;
            coordinator.update(|state| state.resolve_health(status));
        });
        self.track(health.abort_handle());

        self.update(ViewState::begin_collection_load);
        let coordinator = Arc::clone(self);
        let collection = tokio::spawn(async move {
            let result = coordinator.collection.load().await;
            coordinator.update(|state| state.finish_collection_load(result));
        });
        self.track(collection.abort_handle());

        Some(MountTasks { health, collection })
    }

    pub fn set_input(&self, text: impl Into<String>) {
        let text = text.into();
        self.update(|state| state.set_input(text));
    }

    /// Runs one conversion for the current input.
    ///
    /// The submission slot is claimed inside the handler, so a trigger that
    /// races a disabled button is skipped rather than sent twice.
    pub async fn submit(&self) -> SubmitOutcome {
        let text = match self.update(ViewState::try_begin_submit) {
            Ok(text) => text,
            Err(rejection) => {
                match rejection {
                    SubmitRejection::Busy => {
                        info!("tts: submission already in flight; ignoring trigger")
                    }
                    SubmitRejection::Unmounted => warn!("tts: submit after unmount; ignoring"),
                    SubmitRejection::EmptyInput => {}
                }
                return SubmitOutcome::Skipped(rejection);
            }
        };
        let _guard = SubmittingGuard { coordinator: self };

        match self.conversion.convert(&text).await {
            Ok(audio) => {
                let url = self.update(|state| {
                    state
                        .replace_audio(|| {
                            self.audio_store.create_object_url(audio, &self.audio_mime)
                        })
                        .map(|handle| handle.url().to_string())
                });
                match url {
                    Some(url) => {
                        info!(url = %url, "tts: audio ready");
                        SubmitOutcome::Converted { url }
                    }
                    None => {
                        info!("tts: audio arrived after unmount; discarded");
                        SubmitOutcome::Discarded
                    }
                }
            }
            Err(err) => {
                error!(timeout = err.is_timeout(), "tts: conversion failed: {err}");
                SubmitOutcome::Failed
            }
        }
    }

    /// Spawns [`Coordinator::submit`] as an abortable task.
    pub fn spawn_submit(self: &Arc<Self>) -> JoinHandle<SubmitOutcome> {
        let coordinator = Arc::clone(self);
        let task = tokio::spawn(async move { coordinator.submit().await });
        self.track(task.abort_handle());
        task
    }

    /// Aborts tracked requests and releases the audio handle. Submissions
    /// awaited directly by the caller still complete, but their audio is
    /// discarded.
    pub fn unmount(&self) {
        self.mounted.store(true, Ordering::SeqCst);
        let inflight = std::mem::take(
            &mut *self.inflight.lock().unwrap_or_else(PoisonError::into_inner),
        );
        for task in inflight {
            task.abort();
        }
        self.update(ViewState::teardown);
        info!("coordinator: unmounted");
    }
}

#[cfg(test)]
#[path = "tests/coordinator_tests.rs"]
mod tests;
