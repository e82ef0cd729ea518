//! Per-stage work counters.
//!
//! [`StageMetrics`] lets a driver see how much work each stage did and
//! how often its extension failed, without parsing log output.

/// Cumulative counters maintained by every stage.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StageMetrics {
    /// Number of `compute()` calls.
    pub compute_calls: u64,
    /// Extension invocations (one per forward, backward, bridge or generate attempt).
    pub attempts: u64,
    /// Attempts that produced a segment.
    pub successes: u64,
    /// Attempts absorbed as extension failures.
    pub extension_failures: u64,
    /// States pushed into neighbor queues.
    pub states_emitted: u64,
}

impl StageMetrics {
    /// Fraction of attempts that failed. Zero before the first attempt.
    pub fn failure_rate(&self) -> f64 {
        if self.attempts == 0 {
            0.0
        } else {
            self.extension_failures as f64 / self.attempts as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_metrics_are_zero() {
        let m = StageMetrics::default();
        assert_eq!(m.compute_calls, 0);
        assert_eq!(m.attempts, 0);
        assert_eq!(m.failure_rate(), 0.0);
    }

    #[test]
    fn failure_rate_divides_by_attempts() {
        let m = StageMetrics {
            attempts: 4,
            extension_failures: 1,
            ..StageMetrics::default()
        };
        assert_eq!(m.failure_rate(), 0.25);
    }
}
