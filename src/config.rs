//! MockConfig - Engine Configuration
//!
//! TigerStyle: explicit seed, explicit knobs, nothing read lazily.
//!
//! Run with an explicit seed to reproduce a synthesized fault sequence:
//! ```bash
//! CLOUDMOCK_SEED=12345 cargo test
//! ```

use crate::constants::{PROGRESS_INCOMPLETE_DEFAULT, QUERY_RESULTS_COUNT_MAX, SEED_ENV_VAR};

/// Configuration for a [`crate::MockContainer`].
#[derive(Debug, Clone, PartialEq)]
pub struct MockConfig {
    /// Seed for synthesized per-record fault codes
    pub seed: u64,
    /// Progress value reported for failing items (strictly between 0 and 1)
    pub incomplete_progress: f64,
    /// Most matches a query delivers; automatic and oversized limits clamp to it
    pub results_limit_max: usize,
}

impl MockConfig {
    /// Create a configuration with a fixed seed.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed,
            incomplete_progress: PROGRESS_INCOMPLETE_DEFAULT,
            results_limit_max: QUERY_RESULTS_COUNT_MAX,
        }
    }

    /// Create a configuration from `CLOUDMOCK_SEED`, or a random seed when unset.
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidSeed`] if the variable is set but not a `u64`.
    pub fn from_env() -> Result<Self, ConfigError> {
        match std::env::var(SEED_ENV_VAR) {
            Ok(raw) => {
                let seed = raw
                    .trim()
                    .parse::<u64>()
                    .map_err(|_| ConfigError::InvalidSeed { value: raw.clone() })?;
                tracing::info!(seed, "using seed from {}", SEED_ENV_VAR);
                Ok(Self::with_seed(seed))
            }
            Err(_) => {
                let seed = rand::random::<u64>();
                tracing::info!(seed, "no {} set, using random seed", SEED_ENV_VAR);
                Ok(Self::with_seed(seed))
            }
        }
    }

    /// Set the progress value reported for failing items.
    ///
    /// # Panics
    /// Panics unless `0.0 < progress < 1.0`.
    #[must_use]
    pub fn with_incomplete_progress(mut self, progress: f64) -> Self {
        assert!(
            progress > 0.0 && progress < 1.0,
            "incomplete progress must be in (0, 1), got {}",
            progress
        );
        self.incomplete_progress = progress;
        self
    }

    /// Lower the query results ceiling.
    ///
    /// # Panics
    /// Panics unless `1 <= max <= QUERY_RESULTS_COUNT_MAX`.
    #[must_use]
    pub fn with_results_limit_max(mut self, max: usize) -> Self {
        assert!(
            (1..=QUERY_RESULTS_COUNT_MAX).contains(&max),
            "results limit max must be in 1..={}, got {}",
            QUERY_RESULTS_COUNT_MAX,
            max
        );
        self.results_limit_max = max;
        self
    }
}

impl Default for MockConfig {
    /// Seed from the environment, falling back to a random seed if the
    /// variable is malformed.
    fn default() -> Self {
        Self::from_env().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "ignoring malformed seed");
            Self::with_seed(rand::random::<u64>())
        })
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid seed in {}: {value:?}", SEED_ENV_VAR)]
    InvalidSeed { value: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_seed() {
        let config = MockConfig::with_seed(42);
        assert_eq!(config.seed, 42);
        assert_eq!(config.incomplete_progress, PROGRESS_INCOMPLETE_DEFAULT);
        assert_eq!(config.results_limit_max, QUERY_RESULTS_COUNT_MAX);
    }

    #[test]
    fn test_with_incomplete_progress() {
        let config = MockConfig::with_seed(1).with_incomplete_progress(0.25);
        assert_eq!(config.incomplete_progress, 0.25);
    }

    #[test]
    #[should_panic(expected = "incomplete progress")]
    fn test_incomplete_progress_must_be_fractional() {
        let _ = MockConfig::with_seed(1).with_incomplete_progress(1.0);
    }

    #[test]
    fn test_with_results_limit_max() {
        let config = MockConfig::with_seed(1).with_results_limit_max(5);
        assert_eq!(config.results_limit_max, 5);
    }

    #[test]
    #[should_panic(expected = "results limit max")]
    fn test_results_limit_max_above_service_cap() {
        let _ = MockConfig::with_seed(1).with_results_limit_max(QUERY_RESULTS_COUNT_MAX + 1);
    }

    #[test]
    #[should_panic(expected = "results limit max")]
    fn test_results_limit_max_zero() {
        let _ = MockConfig::with_seed(1).with_results_limit_max(0);
    }

    #[test]
    fn test_invalid_seed_message() {
        let err = ConfigError::InvalidSeed {
            value: "abc".to_string(),
        };
        assert!(err.to_string().contains("CLOUDMOCK_SEED"));
    }
}
