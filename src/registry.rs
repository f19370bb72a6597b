//! FaultRegistry - Fault injection consulted at execution time
//!
//! TigerStyle: faults are explicit state, set before submit and cleared by
//! reset. Nothing clears them behind the caller's back.
//!
//! ```text
//! configure → submit → (inspect callbacks) → reset
//! ```

use std::collections::BTreeSet;

use crate::config::MockConfig;
use crate::fault::{CloudError, FaultCode};
use crate::record::RecordId;
use crate::rng::DeterministicRng;

/// Fault configuration shared by every scope of one container.
#[derive(Debug, Clone)]
pub struct FaultRegistry {
    /// Error reported as the terminal outcome of the next operations
    pub whole_operation_error: Option<CloudError>,
    /// Records that fail individually in Modify and Fetch operations
    pub failing_record_ids: Option<BTreeSet<RecordId>>,
    incomplete_progress: f64,
    results_limit_max: usize,
    rng: DeterministicRng,
}

impl FaultRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new(config: &MockConfig) -> Self {
        Self {
            whole_operation_error: None,
            failing_record_ids: None,
            incomplete_progress: config.incomplete_progress,
            results_limit_max: config.results_limit_max,
            rng: DeterministicRng::new(config.seed),
        }
    }

    /// Make every operation fail with `code`.
    pub fn fail_operation(&mut self, code: FaultCode) {
        self.whole_operation_error = Some(CloudError::for_code(code));
    }

    /// Make the given records fail individually.
    pub fn fail_records<I, T>(&mut self, ids: I)
    where
        I: IntoIterator<Item = T>,
        T: Into<RecordId>,
    {
        self.failing_record_ids = Some(ids.into_iter().map(Into::into).collect());
    }

    /// Failing records, with `None` and an empty set read the same way.
    #[must_use]
    pub fn failing(&self) -> BTreeSet<RecordId> {
        self.failing_record_ids.clone().unwrap_or_default()
    }

    #[must_use]
    pub fn is_failing(&self, id: &RecordId) -> bool {
        self.failing_record_ids
            .as_ref()
            .is_some_and(|ids| ids.contains(id))
    }

    /// Progress value reported for failing items.
    #[must_use]
    pub fn incomplete_progress(&self) -> f64 {
        self.incomplete_progress
    }

    /// Query results ceiling from the container's configuration.
    #[must_use]
    pub fn results_limit_max(&self) -> usize {
        self.results_limit_max
    }

    /// Synthesize a per-record fault from the seeded RNG.
    pub fn synthesize_fault(&mut self) -> CloudError {
        CloudError::synthesize(&mut self.rng)
    }

    #[must_use]
    pub fn seed(&self) -> u64 {
        self.rng.seed()
    }

    /// Restart the fault sequence from a new seed.
    pub fn reseed(&mut self, seed: u64) {
        tracing::info!(seed, "reseeding fault registry");
        self.rng = DeterministicRng::new(seed);
    }

    /// Clear both fault slots.
    pub fn reset(&mut self) {
        tracing::info!("resetting fault registry");
        self.whole_operation_error = None;
        self.failing_record_ids = None;
    }
}

impl Default for FaultRegistry {
    fn default() -> Self {
        Self::new(&MockConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> FaultRegistry {
        FaultRegistry::new(&MockConfig::with_seed(42))
    }

    #[test]
    fn test_starts_empty() {
        let registry = registry();
        assert!(registry.whole_operation_error.is_none());
        assert!(registry.failing_record_ids.is_none());
        assert!(registry.failing().is_empty());
        assert_eq!(registry.seed(), 42);
        assert_eq!(registry.results_limit_max(), crate::constants::QUERY_RESULTS_COUNT_MAX);
    }

    #[test]
    fn test_fail_records() {
        let mut registry = registry();
        registry.fail_records(["r1", "r2"]);

        assert!(registry.is_failing(&RecordId::named("r1")));
        assert!(!registry.is_failing(&RecordId::named("r3")));
        assert_eq!(registry.failing().len(), 2);
    }

    #[test]
    fn test_reset_clears_both_slots() {
        let mut registry = registry();
        registry.fail_records(["r1"]);
        registry.fail_operation(FaultCode::NetworkFailure);

        registry.reset();

        assert!(registry.whole_operation_error.is_none());
        assert!(registry.failing_record_ids.is_none());
    }

    #[test]
    fn test_reseed_repeats_sequence() {
        let mut registry = registry();
        let first: Vec<FaultCode> = (0..8).map(|_| registry.synthesize_fault().code()).collect();

        registry.reseed(42);
        let second: Vec<FaultCode> = (0..8).map(|_| registry.synthesize_fault().code()).collect();

        assert_eq!(first, second);
    }
}
