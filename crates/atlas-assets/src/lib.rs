// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! atlas-assets: template loading for modular pieces.
//!
//! Templates are fetched through a [`ResourceLoader`], decoded from JSON, and kept
//! in a [`TemplateCache`] that guarantees at most one fetch per name at a time.
#![forbid(unsafe_code)]

mod cache;
mod error;
mod format;
mod loader;

pub use cache::TemplateCache;
pub use error::TemplateLoadError;
pub use format::decode_template;
pub use loader::{FsResourceLoader, ResourceLoader};
