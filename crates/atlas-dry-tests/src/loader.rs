// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Resource loader doubles.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use atlas_assets::{ResourceLoader, TemplateLoadError};
use futures_util::future::{self, BoxFuture, FutureExt};
use tokio::sync::watch;

#[derive(Default)]
struct MemoryLoaderInner {
    blobs: HashMap<String, Vec<u8>>,
    fetches: HashMap<String, usize>,
    fail_next: HashMap<String, usize>,
}

/// In-memory [`ResourceLoader`] that counts fetches and can fail on demand.
///
/// Clones share state.
#[derive(Clone, Default)]
pub struct MemoryLoader {
    inner: Arc<Mutex<MemoryLoaderInner>>,
}

impl MemoryLoader {
    /// Empty loader (every fetch is `NotFound`).
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryLoaderInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Builder form of [`MemoryLoader::insert`].
    pub fn with(self, name: &str, bytes: impl Into<Vec<u8>>) -> Self {
        self.insert(name, bytes);
        self
    }

    /// Stores `bytes` under `name`.
    pub fn insert(&self, name: &str, bytes: impl Into<Vec<u8>>) {
        self.lock().blobs.insert(name.to_owned(), bytes.into());
    }

    /// Makes the next `times` fetches of `name` fail with a `Fetch` error.
    pub fn fail_next(&self, name: &str, times: usize) {
        self.lock().fail_next.insert(name.to_owned(), times);
    }

    /// Number of fetches of `name` so far.
    pub fn fetch_count(&self, name: &str) -> usize {
        self.lock().fetches.get(name).copied().unwrap_or(0)
    }

    /// Number of fetches across all names.
    pub fn total_fetches(&self) -> usize {
        self.lock().fetches.values().sum()
    }

    fn fetch_now(&self, name: &str) -> Result<Vec<u8>, TemplateLoadError> {
        let mut inner = self.lock();
        *inner.fetches.entry(name.to_owned()).or_default() += 1;
        if let Some(left) = inner.fail_next.get_mut(name).filter(|left| **left > 0) {
            *left -= 1;
            return Err(TemplateLoadError::Fetch {
                name: name.to_owned(),
                reason: "simulated failure".to_owned(),
            });
        }
        inner
            .blobs
            .get(name)
            .cloned()
            .ok_or_else(|| TemplateLoadError::NotFound(name.to_owned()))
    }
}

impl ResourceLoader for MemoryLoader {
    fn fetch(&self, name: &str) -> BoxFuture<'static, Result<Vec<u8>, TemplateLoadError>> {
        future::ready(self.fetch_now(name)).boxed()
    }
}

/// [`MemoryLoader`] whose fetches park until [`GatedLoader::open`] is called.
///
/// A fetch is counted as soon as it starts, so tests can wait for it with
/// [`GatedLoader::wait_for_fetches`] before deciding what to cancel.
#[derive(Clone)]
pub struct GatedLoader {
    inner: MemoryLoader,
    gate: Arc<watch::Sender<bool>>,
}

impl GatedLoader {
    /// Closed gate over `inner`.
    pub fn new(inner: MemoryLoader) -> Self {
        let (gate, _) = watch::channel(false);
        Self {
            inner,
            gate: Arc::new(gate),
        }
    }

    /// Releases every parked and future fetch.
    pub fn open(&self) {
        self.gate.send_replace(true);
    }

    /// The wrapped loader (for counters and failure switches).
    pub fn inner(&self) -> &MemoryLoader {
        &self.inner
    }

    /// Yields until at least `n` fetches have started.
    pub async fn wait_for_fetches(&self, n: usize) {
        while self.inner.total_fetches() < n {
            tokio::task::yield_now().await;
        }
    }
}

impl ResourceLoader for GatedLoader {
    fn fetch(&self, name: &str) -> BoxFuture<'static, Result<Vec<u8>, TemplateLoadError>> {
        let result = self.inner.fetch_now(name);
        let mut gate = self.gate.subscribe();
        async move {
            // A dropped sender means the loader is gone; let the fetch finish.
            let _ = gate.wait_for(|open| *open).await;
            result
        }
        .boxed()
    }
}
