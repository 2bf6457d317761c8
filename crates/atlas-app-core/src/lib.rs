// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Shared application services for Atlas tools (config, engine prefs).
//! Keeps runtime and CLI adapters thin and storage-agnostic.
#![forbid(unsafe_code)]

pub mod config;
pub mod prefs;

pub use config::{ConfigError, ConfigService, ConfigStore};
pub use prefs::{EngineConfig, ENGINE_CONFIG_KEY};
