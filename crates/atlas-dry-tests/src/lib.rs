// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Shared test doubles and fixtures for Atlas crates.
//!
//! # Modules
//!
//! - [`config`] - In-memory config store fake for testing without filesystem
//! - [`fixtures`] - Anchor and template fixtures
//! - [`loader`] - Counting, failing and gated resource loaders
#![forbid(unsafe_code)]

pub mod config;
pub mod fixtures;
pub mod loader;

pub use config::InMemoryConfigStore;
pub use fixtures::{
    point, square_room, square_room_at, straight_piece_json, table, STRAIGHT_PIECE,
};
pub use loader::{GatedLoader, MemoryLoader};
