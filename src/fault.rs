//! Fault - Error codes, categories, and the wrapped service error
//!
//! TigerStyle: a closed taxonomy; every code maps to exactly one category.
//!
//! # Error Shape
//!
//! ```text
//! CloudError
//! ├── domain    "CKErrorDomain"
//! ├── code      FaultCode (raw integer on the wire)
//! └── metadata  key → MetadataValue
//!               └── "CKPartialErrorsByItemIDKey" → { record_name → CloudError }
//! ```

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::{
    ERROR_DOMAIN, LOCALIZED_DESCRIPTION_KEY, PARTIAL_ERRORS_BY_ITEM_ID_KEY, RETRY_AFTER_KEY,
    RETRY_AFTER_SECS_DEFAULT,
};
use crate::rng::DeterministicRng;

// =============================================================================
// Fault Category
// =============================================================================

/// Coarse grouping of fault codes, as an application would handle them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultCategory {
    /// The request can never succeed as issued
    Fatal,
    /// Connectivity problems; retry later
    Network,
    /// Account missing, unavailable, or not permitted
    Account,
    /// Throttled by the service
    RateLimited,
    /// Out of storage
    QuotaExceeded,
    /// Zone-level problems
    Zone,
    /// Some items of a batch failed
    PartialFailure,
    /// Anything outside the taxonomy
    Other,
}

impl FaultCategory {
    /// Get string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fatal => "fatal",
            Self::Network => "network",
            Self::Account => "account",
            Self::RateLimited => "rate",
            Self::QuotaExceeded => "quota",
            Self::Zone => "zone",
            Self::PartialFailure => "partial",
            Self::Other => "other",
        }
    }

    /// Human-readable explanation for this category.
    #[must_use]
    pub fn message(&self) -> &'static str {
        match self {
            Self::Fatal => "A non-recoverable error occurred; the request cannot succeed as issued.",
            Self::Network => "The service could not be reached. Try again when the network is available.",
            Self::Account => "The account is unavailable or not permitted to perform this request.",
            Self::RateLimited => "Too many requests were sent; retry after the suggested delay.",
            Self::QuotaExceeded => "The storage quota for this account has been exceeded.",
            Self::Zone => "The record zone is busy, missing, or was deleted by the user.",
            Self::PartialFailure => "Some items in the request failed; inspect the per-item errors.",
            Self::Other => "The service reported an unclassified error.",
        }
    }
}

impl fmt::Display for FaultCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Fault Code
// =============================================================================

/// Service error codes, with their raw integer values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(i64)]
pub enum FaultCode {
    InternalError = 1,
    PartialFailure = 2,
    NetworkUnavailable = 3,
    NetworkFailure = 4,
    BadContainer = 5,
    ServiceUnavailable = 6,
    RequestRateLimited = 7,
    NotAuthenticated = 9,
    PermissionFailure = 10,
    UnknownItem = 11,
    InvalidArguments = 12,
    OperationCancelled = 20,
    ZoneBusy = 23,
    BadDatabase = 24,
    QuotaExceeded = 25,
    ZoneNotFound = 26,
    UserDeletedZone = 28,
    ServerResponseLost = 34,
    AccountTemporarilyUnavailable = 36,
}

impl FaultCode {
    /// Codes a synthesized per-record fault is drawn from.
    pub const INJECTABLE: [FaultCode; 17] = [
        Self::InternalError,
        Self::BadContainer,
        Self::BadDatabase,
        Self::InvalidArguments,
        Self::OperationCancelled,
        Self::NetworkFailure,
        Self::NetworkUnavailable,
        Self::ServerResponseLost,
        Self::ServiceUnavailable,
        Self::NotAuthenticated,
        Self::AccountTemporarilyUnavailable,
        Self::PermissionFailure,
        Self::RequestRateLimited,
        Self::QuotaExceeded,
        Self::ZoneBusy,
        Self::ZoneNotFound,
        Self::UserDeletedZone,
    ];

    /// Raw integer code.
    #[must_use]
    pub fn raw(self) -> i64 {
        self as i64
    }

    /// Parse a raw integer code.
    #[must_use]
    pub fn from_raw(raw: i64) -> Option<Self> {
        let code = match raw {
            1 => Self::InternalError,
            2 => Self::PartialFailure,
            3 => Self::NetworkUnavailable,
            4 => Self::NetworkFailure,
            5 => Self::BadContainer,
            6 => Self::ServiceUnavailable,
            7 => Self::RequestRateLimited,
            9 => Self::NotAuthenticated,
            10 => Self::PermissionFailure,
            11 => Self::UnknownItem,
            12 => Self::InvalidArguments,
            20 => Self::OperationCancelled,
            23 => Self::ZoneBusy,
            24 => Self::BadDatabase,
            25 => Self::QuotaExceeded,
            26 => Self::ZoneNotFound,
            28 => Self::UserDeletedZone,
            34 => Self::ServerResponseLost,
            36 => Self::AccountTemporarilyUnavailable,
            _ => return None,
        };
        Some(code)
    }

    /// Category this code belongs to.
    #[must_use]
    pub fn category(self) -> FaultCategory {
        match self {
            Self::InternalError
            | Self::BadContainer
            | Self::BadDatabase
            | Self::InvalidArguments
            | Self::OperationCancelled => FaultCategory::Fatal,
            Self::NetworkFailure
            | Self::NetworkUnavailable
            | Self::ServerResponseLost
            | Self::ServiceUnavailable => FaultCategory::Network,
            Self::NotAuthenticated
            | Self::AccountTemporarilyUnavailable
            | Self::PermissionFailure => FaultCategory::Account,
            Self::RequestRateLimited => FaultCategory::RateLimited,
            Self::QuotaExceeded => FaultCategory::QuotaExceeded,
            Self::ZoneBusy | Self::ZoneNotFound | Self::UserDeletedZone => FaultCategory::Zone,
            Self::PartialFailure => FaultCategory::PartialFailure,
            Self::UnknownItem => FaultCategory::Other,
        }
    }

    /// Short description of the code itself.
    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            Self::InternalError => "internal error",
            Self::PartialFailure => "partial failure",
            Self::NetworkUnavailable => "network unavailable",
            Self::NetworkFailure => "network failure",
            Self::BadContainer => "bad container",
            Self::ServiceUnavailable => "service unavailable",
            Self::RequestRateLimited => "request rate limited",
            Self::NotAuthenticated => "not authenticated",
            Self::PermissionFailure => "permission failure",
            Self::UnknownItem => "unknown item",
            Self::InvalidArguments => "invalid arguments",
            Self::OperationCancelled => "operation cancelled",
            Self::ZoneBusy => "zone busy",
            Self::BadDatabase => "bad database",
            Self::QuotaExceeded => "quota exceeded",
            Self::ZoneNotFound => "zone not found",
            Self::UserDeletedZone => "user deleted zone",
            Self::ServerResponseLost => "server response lost",
            Self::AccountTemporarilyUnavailable => "account temporarily unavailable",
        }
    }

    /// Whether the service attaches a retry hint to this code.
    #[must_use]
    pub fn carries_retry_hint(self) -> bool {
        matches!(
            self,
            Self::RequestRateLimited | Self::ServiceUnavailable | Self::ZoneBusy
        )
    }

    /// Pick a random injectable code.
    pub fn synthesize(rng: &mut DeterministicRng) -> Self {
        *rng.choose(&Self::INJECTABLE)
    }
}

impl fmt::Display for FaultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.description(), self.raw())
    }
}

// =============================================================================
// Metadata
// =============================================================================

/// A value in an error's metadata map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Text(String),
    Number(f64),
    PartialErrors(BTreeMap<String, CloudError>),
}

/// An error's metadata map.
pub type ErrorMetadata = BTreeMap<String, MetadataValue>;

// =============================================================================
// Cloud Error
// =============================================================================

/// The wrapped service error delivered to callbacks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[error("{}: {code}", ERROR_DOMAIN)]
pub struct CloudError {
    code: FaultCode,
    #[serde(default)]
    metadata: ErrorMetadata,
}

impl CloudError {
    /// Wrap a code and metadata.
    #[must_use]
    pub fn wrap(code: FaultCode, metadata: ErrorMetadata) -> Self {
        Self { code, metadata }
    }

    /// Wrap a code with only a localized description.
    #[must_use]
    pub fn new(code: FaultCode) -> Self {
        let mut metadata = ErrorMetadata::new();
        metadata.insert(
            LOCALIZED_DESCRIPTION_KEY.to_string(),
            MetadataValue::Text(code.category().message().to_string()),
        );
        Self::wrap(code, metadata)
    }

    /// Build a fault the way the service reports it for one item,
    /// including a retry hint for throttling codes.
    #[must_use]
    pub fn for_code(code: FaultCode) -> Self {
        let mut error = Self::new(code);
        if code.carries_retry_hint() {
            error.metadata.insert(
                RETRY_AFTER_KEY.to_string(),
                MetadataValue::Number(RETRY_AFTER_SECS_DEFAULT),
            );
        }
        error
    }

    /// Synthesize a random per-record fault.
    pub fn synthesize(rng: &mut DeterministicRng) -> Self {
        let code = FaultCode::synthesize(rng);
        tracing::debug!(code = code.raw(), category = %code.category(), "synthesized fault");
        Self::for_code(code)
    }

    /// Build a partial failure carrying per-item faults.
    #[must_use]
    pub fn partial_failure(errors: BTreeMap<String, CloudError>) -> Self {
        let mut error = Self::new(FaultCode::PartialFailure);
        error.metadata.insert(
            PARTIAL_ERRORS_BY_ITEM_ID_KEY.to_string(),
            MetadataValue::PartialErrors(errors),
        );
        error
    }

    /// Rebuild an error from its native parts.
    ///
    /// # Errors
    /// Fails if the domain is foreign or the code is outside the taxonomy.
    pub fn from_parts(
        domain: &str,
        raw_code: i64,
        metadata: ErrorMetadata,
    ) -> Result<Self, FaultMapError> {
        if domain != ERROR_DOMAIN {
            return Err(FaultMapError::ForeignDomain {
                domain: domain.to_string(),
            });
        }
        let code = FaultCode::from_raw(raw_code).ok_or(FaultMapError::UnknownCode(raw_code))?;
        Ok(Self::wrap(code, metadata))
    }

    /// Split into code and metadata.
    #[must_use]
    pub fn into_parts(self) -> (FaultCode, ErrorMetadata) {
        (self.code, self.metadata)
    }

    /// Error domain tag.
    #[must_use]
    pub fn domain(&self) -> &'static str {
        ERROR_DOMAIN
    }

    #[must_use]
    pub fn code(&self) -> FaultCode {
        self.code
    }

    #[must_use]
    pub fn category(&self) -> FaultCategory {
        self.code.category()
    }

    #[must_use]
    pub fn metadata(&self) -> &ErrorMetadata {
        &self.metadata
    }

    /// Human-readable message for the error's category.
    #[must_use]
    pub fn message(&self) -> &'static str {
        self.category().message()
    }

    #[must_use]
    pub fn is_partial_failure(&self) -> bool {
        self.code == FaultCode::PartialFailure
    }

    /// Per-item faults of a partial failure, keyed by record name.
    #[must_use]
    pub fn partial_errors(&self) -> Option<&BTreeMap<String, CloudError>> {
        match self.metadata.get(PARTIAL_ERRORS_BY_ITEM_ID_KEY) {
            Some(MetadataValue::PartialErrors(errors)) => Some(errors),
            _ => None,
        }
    }

    /// Suggested retry delay, if the service sent one.
    #[must_use]
    pub fn retry_after_seconds(&self) -> Option<f64> {
        match self.metadata.get(RETRY_AFTER_KEY) {
            Some(MetadataValue::Number(secs)) => Some(*secs),
            _ => None,
        }
    }
}

impl From<FaultCode> for CloudError {
    fn from(code: FaultCode) -> Self {
        Self::for_code(code)
    }
}

/// Errors turning a native error back into a [`CloudError`].
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FaultMapError {
    #[error("error domain {domain:?} is not {}", ERROR_DOMAIN)]
    ForeignDomain { domain: String },

    #[error("unknown error code: {0}")]
    UnknownCode(i64),
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_codes_roundtrip() {
        for code in FaultCode::INJECTABLE {
            assert_eq!(FaultCode::from_raw(code.raw()), Some(code));
        }
        assert_eq!(FaultCode::from_raw(2), Some(FaultCode::PartialFailure));
        assert_eq!(FaultCode::from_raw(11), Some(FaultCode::UnknownItem));
        assert_eq!(FaultCode::from_raw(999), None);
    }

    #[test]
    fn test_categories() {
        assert_eq!(FaultCode::InternalError.category(), FaultCategory::Fatal);
        assert_eq!(FaultCode::OperationCancelled.category(), FaultCategory::Fatal);
        assert_eq!(FaultCode::ServerResponseLost.category(), FaultCategory::Network);
        assert_eq!(FaultCode::ServiceUnavailable.category(), FaultCategory::Network);
        assert_eq!(FaultCode::PermissionFailure.category(), FaultCategory::Account);
        assert_eq!(FaultCode::RequestRateLimited.category(), FaultCategory::RateLimited);
        assert_eq!(FaultCode::QuotaExceeded.category(), FaultCategory::QuotaExceeded);
        assert_eq!(FaultCode::UserDeletedZone.category(), FaultCategory::Zone);
        assert_eq!(FaultCode::PartialFailure.category(), FaultCategory::PartialFailure);
    }

    #[test]
    fn test_injectable_excludes_partial_failure() {
        assert!(!FaultCode::INJECTABLE.contains(&FaultCode::PartialFailure));
        assert!(!FaultCode::INJECTABLE.contains(&FaultCode::UnknownItem));
    }

    #[test]
    fn test_synthesize_is_seeded() {
        let mut a = DeterministicRng::new(99);
        let mut b = DeterministicRng::new(99);
        let xs: Vec<FaultCode> = (0..20).map(|_| FaultCode::synthesize(&mut a)).collect();
        let ys: Vec<FaultCode> = (0..20).map(|_| FaultCode::synthesize(&mut b)).collect();
        assert_eq!(xs, ys);
        assert!(xs.iter().all(|c| FaultCode::INJECTABLE.contains(c)));
    }

    #[test]
    fn test_wrap_and_unwrap() {
        let mut metadata = ErrorMetadata::new();
        metadata.insert("reason".to_string(), MetadataValue::Text("test".to_string()));

        let error = CloudError::wrap(FaultCode::QuotaExceeded, metadata.clone());
        assert_eq!(error.domain(), ERROR_DOMAIN);
        assert_eq!(error.category(), FaultCategory::QuotaExceeded);

        let (code, parts) = error.into_parts();
        assert_eq!(code, FaultCode::QuotaExceeded);
        assert_eq!(parts, metadata);
    }

    #[test]
    fn test_from_parts() {
        let error = CloudError::from_parts(ERROR_DOMAIN, 26, ErrorMetadata::new()).unwrap();
        assert_eq!(error.code(), FaultCode::ZoneNotFound);

        assert_eq!(
            CloudError::from_parts("NSURLErrorDomain", 4, ErrorMetadata::new()),
            Err(FaultMapError::ForeignDomain {
                domain: "NSURLErrorDomain".to_string()
            })
        );
        assert_eq!(
            CloudError::from_parts(ERROR_DOMAIN, 8, ErrorMetadata::new()),
            Err(FaultMapError::UnknownCode(8))
        );
    }

    #[test]
    fn test_partial_failure_payload() {
        let mut errors = BTreeMap::new();
        errors.insert("r1".to_string(), CloudError::new(FaultCode::ZoneBusy));

        let error = CloudError::partial_failure(errors);

        assert!(error.is_partial_failure());
        assert_eq!(error.category(), FaultCategory::PartialFailure);
        let partial = error.partial_errors().unwrap();
        assert_eq!(partial["r1"].code(), FaultCode::ZoneBusy);
        assert!(CloudError::new(FaultCode::InternalError).partial_errors().is_none());
    }

    #[test]
    fn test_retry_hint() {
        assert_eq!(
            CloudError::for_code(FaultCode::RequestRateLimited).retry_after_seconds(),
            Some(RETRY_AFTER_SECS_DEFAULT)
        );
        assert_eq!(
            CloudError::for_code(FaultCode::NotAuthenticated).retry_after_seconds(),
            None
        );
    }

    #[test]
    fn test_display() {
        let error = CloudError::new(FaultCode::NetworkFailure);
        assert_eq!(error.to_string(), "CKErrorDomain: network failure (4)");
        assert_eq!(error.message(), FaultCategory::Network.message());
    }
}
