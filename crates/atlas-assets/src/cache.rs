// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Single-flight template cache.
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use atlas_core::{Instantiated, NodeTemplate, World};
use futures_util::future::{BoxFuture, FutureExt, WeakShared};
use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};

use crate::error::TemplateLoadError;
use crate::format::decode_template;
use crate::loader::ResourceLoader;

type LoadResult = Result<Arc<NodeTemplate>, TemplateLoadError>;
type LoadFuture = BoxFuture<'static, LoadResult>;

#[derive(Default)]
struct CacheState {
    loaded: BTreeMap<String, Arc<NodeTemplate>>,
    /// Weak so that the last waiter going away drops the fetch with it. The
    /// number tells flights of the same name apart.
    in_flight: BTreeMap<String, (u64, WeakShared<LoadFuture>)>,
    flights: u64,
}

/// Owned by a fetch future; removes its `in_flight` entry when the fetch
/// finishes or is dropped unfinished.
struct Flight {
    state: Arc<Mutex<CacheState>>,
    name: String,
    number: u64,
}

impl Drop for Flight {
    fn drop(&mut self) {
        let mut state = lock(&self.state);
        if state.in_flight.get(&self.name).is_some_and(|(n, _)| *n == self.number) {
            state.in_flight.remove(&self.name);
        }
    }
}

/// Loads each template once and hands out shared, immutable copies.
///
/// Concurrent `load`s of the same name share one fetch. The cache only keeps a
/// weak handle on that fetch: when every waiter is dropped the fetch is dropped
/// too, and the next `load` starts over. Failures are delivered to every waiter
/// of that fetch and never stored.
#[derive(Clone)]
pub struct TemplateCache {
    loader: Arc<dyn ResourceLoader>,
    permits: Arc<Semaphore>,
    state: Arc<Mutex<CacheState>>,
}

impl std::fmt::Debug for TemplateCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = lock(&self.state);
        f.debug_struct("TemplateCache")
            .field("loaded", &state.loaded.len())
            .field("in_flight", &state.in_flight.len())
            .field("available_permits", &self.permits.available_permits())
            .finish_non_exhaustive()
    }
}

fn lock(state: &Mutex<CacheState>) -> MutexGuard<'_, CacheState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl TemplateCache {
    /// Cache over `loader` running at most `parallelism` fetches at once
    /// (clamped to at least one).
    pub fn new(loader: impl ResourceLoader, parallelism: usize) -> Self {
        Self::from_arc(Arc::new(loader), parallelism)
    }

    /// Like [`TemplateCache::new`] for an already shared loader.
    pub fn from_arc(loader: Arc<dyn ResourceLoader>, parallelism: usize) -> Self {
        Self {
            loader,
            permits: Arc::new(Semaphore::new(parallelism.max(1))),
            state: Arc::new(Mutex::new(CacheState::default())),
        }
    }

    /// Returns the template called `name`, fetching and decoding it if needed.
    ///
    /// Cancel-safe: dropping the returned future never corrupts the cache.
    #[instrument(skip(self))]
    pub async fn load(&self, name: &str) -> LoadResult {
        let shared = {
            let mut state = lock(&self.state);
            if let Some(template) = state.loaded.get(name) {
                return Ok(Arc::clone(template));
            }
            match state.in_flight.get(name).and_then(|(_, weak)| weak.upgrade()) {
                Some(shared) => {
                    debug!("joining in-flight load");
                    shared
                }
                None => {
                    state.flights += 1;
                    let number = state.flights;
                    let shared = self.fetch(name, number).shared();
                    if let Some(weak) = shared.downgrade() {
                        state.in_flight.insert(name.to_owned(), (number, weak));
                    }
                    shared
                }
            }
        };
        shared.await
    }

    /// The fetch-and-decode future behind a single flight.
    fn fetch(&self, name: &str, number: u64) -> LoadFuture {
        let loader = Arc::clone(&self.loader);
        let permits = Arc::clone(&self.permits);
        let state = Arc::clone(&self.state);
        let name = name.to_owned();
        let flight = Flight {
            state: Arc::clone(&state),
            name: name.clone(),
            number,
        };
        async move {
            let _flight = flight;
            let _permit = permits
                .acquire_owned()
                .await
                .map_err(|_| TemplateLoadError::Closed)?;
            let result = match loader.fetch(&name).await {
                Ok(bytes) => decode_template(&name, &bytes).map(Arc::new),
                Err(err) => Err(err),
            };
            let mut state = lock(&state);
            match &result {
                Ok(template) => {
                    info!(template = %name, nodes = template.node_count(), "template loaded");
                    state.loaded.insert(name, Arc::clone(template));
                }
                Err(err) => warn!(template = %name, %err, "template load failed"),
            }
            result
        }
        .boxed()
    }

    /// Already-loaded template, without fetching.
    pub fn get(&self, name: &str) -> Option<Arc<NodeTemplate>> {
        lock(&self.state).loaded.get(name).cloned()
    }

    /// `true` once `name` has loaded successfully.
    pub fn is_loaded(&self, name: &str) -> bool {
        lock(&self.state).loaded.contains_key(name)
    }

    /// Number of loaded templates.
    pub fn len(&self) -> usize {
        lock(&self.state).loaded.len()
    }

    /// Number of fetches currently running or queued for a permit.
    pub fn pending(&self) -> usize {
        lock(&self.state).in_flight.len()
    }

    /// `true` when nothing has loaded yet.
    pub fn is_empty(&self) -> bool {
        lock(&self.state).loaded.is_empty()
    }

    /// Forgets a loaded template; the next `load` fetches it again. Holders of the
    /// old `Arc` keep their copy.
    pub fn evict(&self, name: &str) -> bool {
        lock(&self.state).loaded.remove(name).is_some()
    }

    /// Deep-clones a loaded template into `world`. `None` if `name` is not loaded.
    pub fn instantiate(&self, name: &str, world: &mut World) -> Option<Instantiated> {
        let template = self.get(name)?;
        Some(world.instantiate(&template))
    }

    /// Stops accepting new fetches; queued ones fail with
    /// [`TemplateLoadError::Closed`].
    pub fn close(&self) {
        self.permits.close();
    }
}
