//! Engine and rollout configuration.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Per-engine settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Seed of the first episode; later resets continue the episode seed stream.
    pub seed: u64,
    /// Evaluate state-action constraints before every step.
    pub check_constraints: bool,
    /// Replaces the instance horizon when set.
    pub horizon_override: Option<u32>,
    /// Replaces the instance discount when set.
    pub discount_override: Option<f64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            check_constraints: true,
            horizon_override: None,
            discount_override: None,
        }
    }
}

impl EngineConfig {
    /// Validate the configuration.
    ///
    /// This must be called before constructing an engine; constructors call it.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.horizon_override == Some(0) {
            return Err(ConfigError::InvalidField {
                field: "horizon_override".to_string(),
                reason: "must be > 0".to_string(),
            });
        }
        if let Some(d) = self.discount_override {
            if !d.is_finite() || !(0.0..=1.0).contains(&d) {
                return Err(ConfigError::InvalidField {
                    field: "discount_override".to_string(),
                    reason: format!("{d} is outside [0.0, 1.0]"),
                });
            }
        }
        Ok(())
    }

    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    #[must_use]
    pub const fn with_horizon(mut self, horizon: u32) -> Self {
        self.horizon_override = Some(horizon);
        self
    }

    #[must_use]
    pub const fn with_constraint_checks(mut self, enabled: bool) -> Self {
        self.check_constraints = enabled;
        self
    }
}

/// Rollout pool settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolloutConfig {
    /// Number of worker threads.
    pub workers: usize,
    /// Maximum queued episodes.
    pub queue_capacity: usize,
    /// Episode `i` is seeded from `base_seed` and `i`.
    pub base_seed: u64,
}

impl Default for RolloutConfig {
    fn default() -> Self {
        Self {
            workers: 2,
            queue_capacity: 64,
            base_seed: 0,
        }
    }
}

impl RolloutConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::InvalidField {
                field: "workers".to_string(),
                reason: "must be > 0".to_string(),
            });
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::InvalidField {
                field: "queue_capacity".to_string(),
                reason: "must be > 0".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        EngineConfig::default().validate().unwrap();
        RolloutConfig::default().validate().unwrap();
    }

    #[test]
    fn engine_config_rejects_bad_overrides() {
        let c = EngineConfig::default().with_horizon(0);
        assert!(c.validate().is_err());

        let mut c = EngineConfig::default();
        c.discount_override = Some(1.5);
        assert!(c.validate().is_err());

        c.discount_override = Some(f64::NAN);
        assert!(c.validate().is_err());

        c.discount_override = Some(0.9);
        c.validate().unwrap();
    }

    #[test]
    fn rollout_config_rejects_zero_limits() {
        let mut c = RolloutConfig::default();
        c.workers = 0;
        assert!(c.validate().is_err());

        let mut c = RolloutConfig::default();
        c.queue_capacity = 0;
        assert!(c.validate().is_err());
    }

    #[test]
    fn config_roundtrips_through_json() {
        let c = EngineConfig::default().with_seed(42).with_horizon(10);
        let json = serde_json::to_string(&c).unwrap();
        let back: EngineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(c, back);
    }
}
