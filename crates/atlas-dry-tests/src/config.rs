// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! [`ConfigStore`] double that keeps blobs in memory and counts traffic.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use atlas_app_core::config::{ConfigError, ConfigStore};

#[derive(Default)]
struct Blobs {
    map: BTreeMap<String, Vec<u8>>,
    loads: usize,
    saves: usize,
    break_loads: bool,
    break_saves: bool,
}

/// Shared in-memory blob map.
///
/// Every clone sees the same blobs and counters: hand one clone to a
/// `ConfigService` and keep another for assertions.
///
/// ```
/// use atlas_app_core::{ConfigService, EngineConfig, ENGINE_CONFIG_KEY};
/// use atlas_dry_tests::InMemoryConfigStore;
///
/// let store = InMemoryConfigStore::new();
/// EngineConfig::default().save(&ConfigService::new(store.clone())).unwrap();
/// assert!(store.contains_key(ENGINE_CONFIG_KEY));
/// assert_eq!((store.load_count(), store.save_count()), (0, 1));
/// ```
#[derive(Clone, Default)]
pub struct InMemoryConfigStore {
    blobs: Arc<Mutex<Blobs>>,
}

impl InMemoryConfigStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with `data` under `key`; seeding does not count as a save.
    pub fn with_blob(key: &str, data: &[u8]) -> Self {
        let store = Self::new();
        store.with(|b| b.map.insert(key.to_owned(), data.to_vec()));
        store
    }

    fn with<R>(&self, f: impl FnOnce(&mut Blobs) -> R) -> R {
        f(&mut self.blobs.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Makes every following `load_raw` fail with [`ConfigError::Other`].
    pub fn set_fail_on_load(&self, fail: bool) {
        self.with(|b| b.break_loads = fail);
    }

    /// Makes every following `save_raw` fail with [`ConfigError::Other`].
    pub fn set_fail_on_save(&self, fail: bool) {
        self.with(|b| b.break_saves = fail);
    }

    /// `load_raw` calls so far, failed ones included.
    pub fn load_count(&self) -> usize {
        self.with(|b| b.loads)
    }

    /// `save_raw` calls so far, failed ones included.
    pub fn save_count(&self) -> usize {
        self.with(|b| b.saves)
    }

    /// Whether `key` holds a blob. Not counted as a load.
    pub fn contains_key(&self, key: &str) -> bool {
        self.with(|b| b.map.contains_key(key))
    }

    /// Copy of the blob under `key`. Not counted as a load.
    pub fn blob(&self, key: &str) -> Option<Vec<u8>> {
        self.with(|b| b.map.get(key).cloned())
    }
}

impl ConfigStore for InMemoryConfigStore {
    fn load_raw(&self, key: &str) -> Result<Vec<u8>, ConfigError> {
        self.with(|b| {
            b.loads += 1;
            if b.break_loads {
                return Err(ConfigError::Other(format!("load of `{key}` refused")));
            }
            b.map.get(key).cloned().ok_or(ConfigError::NotFound)
        })
    }

    fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), ConfigError> {
        self.with(|b| {
            b.saves += 1;
            if b.break_saves {
                return Err(ConfigError::Other(format!("save of `{key}` refused")));
            }
            b.map.insert(key.to_owned(), data.to_vec());
            Ok(())
        })
    }

    fn contains(&self, key: &str) -> Result<bool, ConfigError> {
        Ok(self.contains_key(key))
    }
}
