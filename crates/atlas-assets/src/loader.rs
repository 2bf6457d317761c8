// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Resource loader port and the filesystem adapter.
use std::path::{Path, PathBuf};

use futures_util::future::{BoxFuture, FutureExt};

use crate::error::TemplateLoadError;

/// Source of raw template bytes.
///
/// Implementations must be cheap to call concurrently; the cache bounds how many
/// fetches run at once.
pub trait ResourceLoader: Send + Sync + 'static {
    /// Fetches the bytes stored under `name`.
    fn fetch(&self, name: &str) -> BoxFuture<'static, Result<Vec<u8>, TemplateLoadError>>;
}

/// Reads `<root>/<name>.json`.
#[derive(Debug, Clone)]
pub struct FsResourceLoader {
    root: PathBuf,
}

impl FsResourceLoader {
    /// Loader rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory templates are read from.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, name: &str) -> Result<PathBuf, TemplateLoadError> {
        let valid = !name.is_empty()
            && !name.contains(['/', '\\'])
            && name != "."
            && name != "..";
        if !valid {
            return Err(TemplateLoadError::InvalidName(name.to_owned()));
        }
        Ok(self.root.join(format!("{name}.json")))
    }
}

impl ResourceLoader for FsResourceLoader {
    fn fetch(&self, name: &str) -> BoxFuture<'static, Result<Vec<u8>, TemplateLoadError>> {
        let name = name.to_owned();
        let path = self.path_for(&name);
        async move {
            let path = path?;
            match tokio::fs::read(&path).await {
                Ok(bytes) => Ok(bytes),
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                    Err(TemplateLoadError::NotFound(name))
                }
                Err(err) => Err(TemplateLoadError::Fetch {
                    name,
                    reason: err.to_string(),
                }),
            }
        }
        .boxed()
    }
}
