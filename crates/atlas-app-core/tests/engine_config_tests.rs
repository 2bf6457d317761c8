// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(missing_docs)]
//! EngineConfig persistence through the in-memory store.

use atlas_app_core::{ConfigError, ConfigService, EngineConfig, ENGINE_CONFIG_KEY};
use atlas_dry_tests::InMemoryConfigStore;

#[test]
fn missing_config_loads_defaults() {
    let store = InMemoryConfigStore::new();
    let service = ConfigService::new(store.clone());
    let cfg = EngineConfig::load(&service).unwrap();
    assert_eq!(cfg, EngineConfig::default());
    assert_eq!(store.load_count(), 1);
}

#[test]
fn saved_config_round_trips_under_engine_key() {
    let store = InMemoryConfigStore::new();
    let service = ConfigService::new(store.clone());
    let cfg = EngineConfig {
        template_parallelism: 2,
        placement_padding: 0.1,
        ..EngineConfig::default()
    };
    cfg.save(&service).unwrap();
    assert!(store.contains_key(ENGINE_CONFIG_KEY));
    assert_eq!(EngineConfig::load(&service).unwrap(), cfg);
}

#[test]
fn invalid_config_is_not_saved() {
    let store = InMemoryConfigStore::new();
    let service = ConfigService::new(store.clone());
    let cfg = EngineConfig {
        placement_padding: -1.0,
        ..EngineConfig::default()
    };
    assert!(matches!(cfg.save(&service), Err(ConfigError::Invalid(_))));
    assert_eq!(store.save_count(), 0);
}

#[test]
fn store_failure_propagates() {
    let store = InMemoryConfigStore::new();
    store.set_fail_on_load(true);
    let service = ConfigService::new(store);
    assert!(matches!(
        EngineConfig::load(&service),
        Err(ConfigError::Other(_))
    ));
}
