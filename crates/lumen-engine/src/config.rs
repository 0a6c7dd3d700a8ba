//! Driver configuration.
//!
//! [`FrameConfig`] can be built in code or loaded from JSON. Missing fields
//! fall back to their defaults, so `{}` is a valid configuration.

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::EngineError;

/// Default tracing filter used when `RUST_LOG` is not set.
pub const DEFAULT_LOG_FILTER: &str = "warn";

/// Configuration for the [`FrameLoop`](crate::frame::FrameLoop).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameConfig {
    /// Seconds per frame used by [`FrameLoop::tick`](crate::frame::FrameLoop::tick).
    /// Must be positive and finite.
    pub fixed_dt: f64,
    /// `tracing-subscriber` filter directive, e.g. `"lumen_ecs=debug"`.
    pub log_filter: String,
}

impl Default for FrameConfig {
    /// 60 Hz, warnings only.
    fn default() -> Self {
        Self {
            fixed_dt: 1.0 / 60.0,
            log_filter: DEFAULT_LOG_FILTER.to_owned(),
        }
    }
}

impl FrameConfig {
    /// Parse and validate a JSON configuration.
    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        let config: FrameConfig =
            serde_json::from_str(json).context("failed to parse frame config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if !(self.fixed_dt > 0.0 && self.fixed_dt.is_finite()) {
            return Err(EngineError::InvalidConfig {
                reason: format!("fixed_dt must be positive and finite, got {}", self.fixed_dt),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_sixty_hertz() {
        let config = FrameConfig::default();
        assert!((config.fixed_dt - 1.0 / 60.0).abs() < 1e-12);
        assert_eq!(config.log_filter, "warn");
        config.validate().unwrap();
    }

    #[test]
    fn empty_json_uses_defaults() {
        let config = FrameConfig::from_json_str("{}").unwrap();
        assert_eq!(config, FrameConfig::default());
    }

    #[test]
    fn partial_json_overrides_fields() {
        let config =
            FrameConfig::from_json_str(r#"{ "fixed_dt": 0.02, "log_filter": "lumen_ecs=debug" }"#)
                .unwrap();
        assert!((config.fixed_dt - 0.02).abs() < 1e-12);
        assert_eq!(config.log_filter, "lumen_ecs=debug");
    }

    #[test]
    fn rejects_non_positive_step() {
        for json in [r#"{ "fixed_dt": 0.0 }"#, r#"{ "fixed_dt": -1.0 }"#] {
            let err = FrameConfig::from_json_str(json).unwrap_err();
            assert!(err.to_string().contains("fixed_dt"), "got: {err}");
        }
    }

    #[test]
    fn malformed_json_has_context() {
        let err = FrameConfig::from_json_str("{ fixed_dt: ").unwrap_err();
        assert!(err.to_string().contains("failed to parse frame config"));
    }
}
