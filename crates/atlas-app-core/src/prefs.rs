// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Engine tunables persisted through the config service.

use serde::{Deserialize, Serialize};

use crate::config::{ConfigError, ConfigService, ConfigStore};

/// Key under which [`EngineConfig`] is stored.
pub const ENGINE_CONFIG_KEY: &str = "engine";

/// Start-up configuration for the update loop, template cache and CLI.
///
/// Missing fields in a stored blob fall back to their defaults, so older files
/// keep loading as fields are added.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Capacity of the bounded anchor-event feed.
    pub event_queue_capacity: usize,
    /// Capacity of the mutation command queue.
    pub command_queue_capacity: usize,
    /// Maximum concurrent template fetches.
    pub template_parallelism: usize,
    /// Margin kept free around plane placements, metres.
    pub placement_padding: f32,
    /// `tracing` filter directive used when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            event_queue_capacity: 1024,
            command_queue_capacity: 256,
            template_parallelism: 4,
            placement_padding: 0.05,
            log_filter: "info".to_owned(),
        }
    }
}

impl EngineConfig {
    /// Rejects values the runtime cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.event_queue_capacity == 0 {
            return Err(ConfigError::Invalid("event_queue_capacity must be > 0".into()));
        }
        if self.command_queue_capacity == 0 {
            return Err(ConfigError::Invalid("command_queue_capacity must be > 0".into()));
        }
        if self.template_parallelism == 0 {
            return Err(ConfigError::Invalid("template_parallelism must be > 0".into()));
        }
        if !self.placement_padding.is_finite() || self.placement_padding < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "placement_padding must be a non-negative number, got {}",
                self.placement_padding
            )));
        }
        Ok(())
    }

    /// Loads the stored config (defaults when absent) and validates it.
    pub fn load<S: ConfigStore>(service: &ConfigService<S>) -> Result<Self, ConfigError> {
        let cfg: Self = service.load_or_default(ENGINE_CONFIG_KEY)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Validates and persists this config.
    pub fn save<S: ConfigStore>(&self, service: &ConfigService<S>) -> Result<(), ConfigError> {
        self.validate()?;
        service.save(ENGINE_CONFIG_KEY, self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_blob_fills_defaults() {
        let cfg: EngineConfig = serde_json::from_str(r#"{"template_parallelism": 9}"#).unwrap();
        assert_eq!(cfg.template_parallelism, 9);
        assert_eq!(cfg.event_queue_capacity, 1024);
        assert_eq!(cfg.log_filter, "info");
    }

    #[test]
    fn zero_capacity_is_invalid() {
        let cfg = EngineConfig {
            event_queue_capacity: 0,
            ..EngineConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));
    }
}
