//! Constants - Named Limits and Well-Known Keys
//!
//! TigerStyle: every limit has a name, a unit, and a single definition.

// =============================================================================
// Query Limits
// =============================================================================

/// Upper bound on records delivered by a single query.
///
/// The real service decides its limit dynamically; the mock pins it.
pub const QUERY_RESULTS_COUNT_MAX: usize = 50;

/// Results limit meaning "use the service maximum".
pub const QUERY_RESULTS_LIMIT_AUTOMATIC: usize = 0;

// =============================================================================
// Progress
// =============================================================================

/// Progress reported for an item that finished successfully.
pub const PROGRESS_COMPLETE: f64 = 1.0;

/// Default progress reported for an item that failed mid-transfer.
pub const PROGRESS_INCOMPLETE_DEFAULT: f64 = 0.5;

// =============================================================================
// Errors
// =============================================================================

/// Domain tag carried by every wrapped service error.
pub const ERROR_DOMAIN: &str = "CKErrorDomain";

/// Metadata key holding the per-item fault map of a partial failure.
pub const PARTIAL_ERRORS_BY_ITEM_ID_KEY: &str = "CKPartialErrorsByItemIDKey";

/// Metadata key holding a retry hint in seconds.
pub const RETRY_AFTER_KEY: &str = "CKErrorRetryAfterKey";

/// Metadata key holding a human-readable description.
pub const LOCALIZED_DESCRIPTION_KEY: &str = "NSLocalizedDescription";

/// Retry hint attached to synthesized throttling faults.
pub const RETRY_AFTER_SECS_DEFAULT: f64 = 3.0;

// =============================================================================
// Records
// =============================================================================

/// Zone used when a record ID names none.
pub const DEFAULT_ZONE_NAME: &str = "_defaultZone";

/// Maximum record name length in bytes.
pub const RECORD_NAME_BYTES_MAX: usize = 255;

// =============================================================================
// Configuration
// =============================================================================

/// Environment variable holding a fixed RNG seed.
pub const SEED_ENV_VAR: &str = "CLOUDMOCK_SEED";
