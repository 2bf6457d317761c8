// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Template loading errors.
use thiserror::Error;

/// Why a template could not be produced.
///
/// `Clone` because one failed fetch is reported to every waiter sharing it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateLoadError {
    /// The loader has no resource under that name.
    #[error("template `{0}` not found")]
    NotFound(String),
    /// Names must be plain identifiers (no path separators, no `..`).
    #[error("invalid template name `{0}`")]
    InvalidName(String),
    /// The loader failed to produce bytes.
    #[error("fetching template `{name}` failed: {reason}")]
    Fetch {
        /// Template name.
        name: String,
        /// Loader-specific description.
        reason: String,
    },
    /// The bytes are not a valid template.
    #[error("decoding template `{name}` failed: {reason}")]
    Decode {
        /// Template name.
        name: String,
        /// Decoder description.
        reason: String,
    },
    /// The cache was shut down while the load was queued.
    #[error("template cache closed")]
    Closed,
}
