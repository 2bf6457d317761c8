// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! atlas-runtime: the single-writer update loop.
//!
//! Provider events arrive on an [`AnchorFeed`]; user mutations arrive through a
//! [`WorldHandle`]. One tokio task owns the [`atlas_core::World`] and applies both
//! in order, preferring anchor events, then publishes fresh read views.
#![forbid(unsafe_code)]

mod feed;
mod handle;
mod update;

pub use feed::{AnchorFeed, OverflowError};
pub use handle::{PublishedViews, RuntimeError, WorldHandle};
pub use update::{LoopReport, UpdateLoop};
