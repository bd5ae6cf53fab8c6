//! Client-side audio object store.
//!
//! Converted audio is kept in memory and addressed through `blob:` urls, the
//! same way a page hands binary data to a media element. Every url is owned
//! by exactly one [`AudioHandle`]; releasing or dropping the handle revokes
//! the url and frees the bytes.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct AudioBlob {
    pub mime: String,
    pub bytes: Arc<[u8]>,
}

#[derive(Debug, Default)]
struct StoreInner {
    entries: HashMap<String, AudioBlob>,
    peak_live: usize,
}

#[derive(Debug)]
pub struct AudioStore {
    origin: String,
    inner: Mutex<StoreInner>,
}

impl AudioStore {
    pub fn new(origin: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            origin: origin.into(),
            inner: Mutex::new(StoreInner::default()),
        })
    }

    fn lock(&self) -> MutexGuard<'_, StoreInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn create_object_url(self: &Arc<Self>, bytes: Vec<u8>, mime: &str) -> AudioHandle {
        let url = format!("blob:{}/{}", self.origin, Uuid::new_v4());
        let len = bytes.len();
        {
            let mut inner = self.lock();
            inner.entries.insert(
                url.clone(),
                AudioBlob {
                    mime: mime.to_string(),
                    bytes: bytes.into(),
                },
            );
            inner.peak_live = inner.peak_live.max(inner.entries.len());
        }
        debug!(url = %url, bytes = len, "audio: object url created");

        AudioHandle {
            url,
            mime: mime.to_string(),
            len,
            store: Arc::clone(self),
            released: false,
        }
    }

    pub fn resolve(&self, url: &str) -> Option<AudioBlob> {
        self.lock().entries.get(url).cloned()
    }

    pub fn live_count(&self) -> usize {
        self.lock().entries.len()
    }

    /// Highest number of simultaneously live urls since the store was created.
    pub fn peak_live_count(&self) -> usize {
        self.lock().peak_live
    }

    fn revoke(&self, url: &str) -> bool {
        let removed = self.lock().entries.remove(url).is_some();
        if removed {
            debug!(url = %url, "audio: object url revoked");
        }
        removed
    }
}

/// Exclusive owner of one live `blob:` url.
#[derive(Debug)]
pub struct AudioHandle {
    url: String,
    mime: String,
    len: usize,
    store: Arc<AudioStore>,
    released: bool,
}

impl AudioHandle {
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn release(mut self) {
        self.revoke_once();
    }

    fn revoke_once(&mut self) {
        if !self.released {
            self.released = true;
            self.store.revoke(&self.url);
        }
    }
}

impl Drop for AudioHandle {
    fn drop(&mut self) {
        self.revoke_once();
    }
}

#[cfg(test)]
#[path = "tests/audio_tests.rs"]
mod tests;
