// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Keyed JSON config blobs behind a storage port.
//!
//! Stores only move bytes; [`ConfigService`] owns key rules and (de)serialization,
//! so every backend reports the same errors for the same mistakes.

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

/// Byte storage for config blobs.
pub trait ConfigStore {
    /// Bytes stored under `key`, or [`ConfigError::NotFound`].
    fn load_raw(&self, key: &str) -> Result<Vec<u8>, ConfigError>;

    /// Replaces whatever is stored under `key`.
    fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), ConfigError>;

    /// Whether `key` has a blob. Backends with a cheaper check should override.
    fn contains(&self, key: &str) -> Result<bool, ConfigError> {
        match self.load_raw(key) {
            Ok(_) => Ok(true),
            Err(ConfigError::NotFound) => Ok(false),
            Err(err) => Err(err),
        }
    }
}

/// Config failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Nothing stored under the key.
    #[error("no stored config")]
    NotFound,
    /// Keys double as file stems, so they are restricted.
    #[error("config key `{0}` must be non-empty ASCII alphanumerics, `-` or `_`")]
    InvalidKey(String),
    /// Backend I/O failure.
    #[error("config i/o: {0}")]
    Io(#[from] std::io::Error),
    /// Stored bytes are not the expected JSON.
    #[error("config `{key}` is not valid: {source}")]
    Decode {
        /// Offending key.
        key: String,
        /// Parser error.
        source: serde_json::Error,
    },
    /// Value could not be turned into JSON.
    #[error("config `{key}` could not be encoded: {source}")]
    Encode {
        /// Key being written.
        key: String,
        /// Serializer error.
        source: serde_json::Error,
    },
    /// Decoded fine but out of range.
    #[error("invalid config: {0}")]
    Invalid(String),
    /// Backend-specific failure.
    #[error("config store: {0}")]
    Other(String),
}

fn check_key(key: &str) -> Result<(), ConfigError> {
    let ok = !key.is_empty()
        && key
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
    if ok {
        Ok(())
    } else {
        Err(ConfigError::InvalidKey(key.to_owned()))
    }
}

/// Typed access to a [`ConfigStore`].
#[derive(Debug, Clone)]
pub struct ConfigService<S> {
    store: S,
}

impl<S> ConfigService<S> {
    /// Wraps `store`.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// The backing store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Unwraps the backing store.
    pub fn into_inner(self) -> S {
        self.store
    }
}

impl<S: ConfigStore> ConfigService<S> {
    /// Whether a blob exists under `key`.
    pub fn exists(&self, key: &str) -> Result<bool, ConfigError> {
        check_key(key)?;
        self.store.contains(key)
    }

    /// Decodes the blob under `key`; `Ok(None)` when nothing (or only
    /// whitespace) is stored.
    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, ConfigError> {
        check_key(key)?;
        let bytes = match self.store.load_raw(key) {
            Ok(bytes) => bytes,
            Err(ConfigError::NotFound) => return Ok(None),
            Err(err) => return Err(err),
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| ConfigError::Decode {
                key: key.to_owned(),
                source,
            })
    }

    /// [`ConfigService::load`], or `T::default()` when unset.
    pub fn load_or_default<T: DeserializeOwned + Default>(
        &self,
        key: &str,
    ) -> Result<T, ConfigError> {
        Ok(self.load(key)?.unwrap_or_default())
    }

    /// Writes `value` as pretty JSON with a trailing newline.
    pub fn save<T: Serialize>(&self, key: &str, value: &T) -> Result<(), ConfigError> {
        check_key(key)?;
        let mut data = serde_json::to_vec_pretty(value).map_err(|source| ConfigError::Encode {
            key: key.to_owned(),
            source,
        })?;
        data.push(b'\n');
        self.store.save_raw(key, &data)
    }
}
