//! Per-stage configuration and validation.

use std::error::Error;
use std::fmt;

use stagecraft_core::ExtensionFailure;

/// Configuration shared by every stage kind.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StageConfig {
    /// Keep failed extension attempts in the segment list as annotated
    /// failures. Default: `false`.
    pub record_failures: bool,
    /// Reject segments whose cost exceeds this bound. Default: `None`.
    pub cost_limit: Option<f64>,
}

impl StageConfig {
    /// Check structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(limit) = self.cost_limit {
            if !limit.is_finite() || limit < 0.0 {
                return Err(ConfigError::InvalidCostLimit { value: limit });
            }
        }
        Ok(())
    }

    /// Admit a cost reported by an extension.
    ///
    /// Non-finite, negative, and over-limit costs become failures.
    pub fn admit(&self, cost: f64) -> Result<(), ExtensionFailure> {
        if !cost.is_finite() || cost < 0.0 {
            return Err(ExtensionFailure::invalid_cost(cost));
        }
        match self.cost_limit {
            Some(limit) if cost > limit => Err(ExtensionFailure::cost_limit_exceeded(cost, limit)),
            _ => Ok(()),
        }
    }
}

/// Errors detected by [`StageConfig::validate()`].
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigError {
    /// `cost_limit` is NaN, infinite, or negative.
    InvalidCostLimit {
        /// The invalid value.
        value: f64,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCostLimit { value } => {
                write!(f, "cost_limit must be finite and non-negative, got {value}")
            }
        }
    }
}

impl Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert!(StageConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_bad_limits() {
        for value in [f64::NAN, f64::INFINITY, -1.0] {
            let cfg = StageConfig {
                cost_limit: Some(value),
                ..StageConfig::default()
            };
            assert!(matches!(
                cfg.validate(),
                Err(ConfigError::InvalidCostLimit { .. })
            ));
        }
    }

    #[test]
    fn admit_checks_sign_and_limit() {
        let cfg = StageConfig {
            cost_limit: Some(2.0),
            ..StageConfig::default()
        };
        assert!(cfg.admit(0.0).is_ok());
        assert!(cfg.admit(2.0).is_ok());
        assert!(cfg.admit(2.5).is_err());
        assert!(cfg.admit(-0.1).is_err());
        assert!(StageConfig::default().admit(f64::NAN).is_err());
        assert!(StageConfig::default().admit(1e9).is_ok());
    }
}
