// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Filesystem-backed `ConfigStore` for Atlas tools (uses platform config dir).
#![forbid(unsafe_code)]

use atlas_app_core::config::{ConfigError, ConfigStore};
use directories::ProjectDirs;
use std::fs;
use std::path::{Path, PathBuf};

/// Store configs as JSON files under a base directory.
#[derive(Debug, Clone)]
pub struct FsConfigStore {
    base: PathBuf,
}

impl FsConfigStore {
    /// Create a store rooted at the user config directory (e.g., `~/.config/Atlas`).
    pub fn new() -> Result<Self, ConfigError> {
        let proj = ProjectDirs::from("dev", "flyingrobots", "Atlas")
            .ok_or_else(|| ConfigError::Other("could not resolve config dir".into()))?;
        Self::at(proj.config_dir())
    }

    /// Create a store rooted at `base`, creating the directory if needed.
    pub fn at(base: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let base = base.as_ref().to_path_buf();
        fs::create_dir_all(&base)?;
        Ok(Self { base })
    }

    /// Directory the blobs live in.
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// File backing `key`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.base.join(format!("{key}.json"))
    }
}

impl ConfigStore for FsConfigStore {
    fn load_raw(&self, key: &str) -> Result<Vec<u8>, ConfigError> {
        match fs::read(self.path_for(key)) {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Err(ConfigError::NotFound),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), ConfigError> {
        let path = self.path_for(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, data)?;
        Ok(())
    }

    fn contains(&self, key: &str) -> Result<bool, ConfigError> {
        Ok(self.path_for(key).is_file())
    }
}
