//! Pool configuration
//!
//! Loaded from TOML or built in code. Every limit must be at least 1 because
//! the free lists are fixed-capacity queues.

use serde::{Deserialize, Serialize};

use crate::errors::{FaultlineError, Result};

pub const DEFAULT_MAX_IDLE_ERRORS: usize = 1024;
pub const DEFAULT_MAX_IDLE_VALIDATIONS: usize = 256;
pub const DEFAULT_MAX_IDLE_FRAMES: usize = 4096;

/// Sizing of an [`ErrorPool`](crate::ErrorPool)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PoolConfig {
    /// Idle error instances kept for reuse
    pub max_idle_errors: usize,
    /// Idle validation error instances kept for reuse
    pub max_idle_validations: usize,
    /// Idle stack frame records kept for reuse
    pub max_idle_frames: usize,
    /// Error instances allocated up front; capped at `max_idle_errors`
    pub prewarm: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_idle_errors: DEFAULT_MAX_IDLE_ERRORS,
            max_idle_validations: DEFAULT_MAX_IDLE_VALIDATIONS,
            max_idle_frames: DEFAULT_MAX_IDLE_FRAMES,
            prewarm: 0,
        }
    }
}

impl PoolConfig {
    /// # Errors
    ///
    /// Returns `InvalidConfig` naming the first limit that is zero or a
    /// prewarm count larger than the idle limit.
    pub fn validate(&self) -> Result<()> {
        let limits = [
            ("max_idle_errors", self.max_idle_errors),
            ("max_idle_validations", self.max_idle_validations),
            ("max_idle_frames", self.max_idle_frames),
        ];
        for (field, value) in limits {
            if value == 0 {
                return Err(FaultlineError::InvalidConfig {
                    field,
                    reason: "must be at least 1".to_string(),
                });
            }
        }
        if self.prewarm > self.max_idle_errors {
            return Err(FaultlineError::InvalidConfig {
                field: "prewarm",
                reason: format!("exceeds max_idle_errors ({})", self.max_idle_errors),
            });
        }
        Ok(())
    }

    /// Parse and validate a TOML document; missing keys take defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigParse` for malformed TOML or unknown keys, and
    /// `InvalidConfig` when validation fails.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: PoolConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(PoolConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = PoolConfig::from_toml_str("max_idle_errors = 8\nprewarm = 4\n").unwrap();
        assert_eq!(config.max_idle_errors, 8);
        assert_eq!(config.prewarm, 4);
        assert_eq!(config.max_idle_frames, DEFAULT_MAX_IDLE_FRAMES);
    }

    #[test]
    fn test_zero_limit_rejected() {
        let err = PoolConfig::from_toml_str("max_idle_frames = 0").unwrap_err();
        assert_eq!(
            err,
            FaultlineError::InvalidConfig {
                field: "max_idle_frames",
                reason: "must be at least 1".to_string(),
            }
        );
    }

    #[test]
    fn test_prewarm_above_limit_rejected() {
        let config = PoolConfig {
            max_idle_errors: 2,
            prewarm: 3,
            ..PoolConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert_eq!(err.code(), "ERR_INVALID_CONFIG");
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = PoolConfig::from_toml_str("max_idle = 3").unwrap_err();
        assert_eq!(err.code(), "ERR_CONFIG_PARSE");
    }
}
