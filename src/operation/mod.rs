//! Operations - What a test submits to a database
//!
//! TigerStyle: a closed set of operation kinds, each owning its callbacks.
//!
//! # Callback Order
//!
//! ```text
//! Modify: (progress, per-save)*  per-delete*  modify-result  completion
//! Fetch:  (progress, per-record)*             fetch-result   completion
//! Query:  record-matched*                     query-result   completion
//! ```
//!
//! Operations are consumed on submit and cannot be submitted twice.

mod fetch;
mod modify;
mod query;

use std::collections::BTreeSet;

pub use fetch::FetchRecordsOperation;
pub use modify::{ModifyRecordsOperation, SavePolicy};
pub use query::{Query, QueryCursor, QueryOperation};

use crate::fault::CloudError;
use crate::record::{Record, RecordId};

// =============================================================================
// Callback Types
// =============================================================================

/// Per-item progress in `0.0..=1.0`.
pub type ProgressCallback = Box<dyn FnMut(&RecordId, f64)>;

/// Per-item outcome carrying the (projected) record.
pub type RecordResultCallback = Box<dyn FnMut(&RecordId, Result<Record, CloudError>)>;

/// Per-item outcome of a delete.
pub type DeleteResultCallback = Box<dyn FnMut(&RecordId, Result<(), CloudError>)>;

/// Terminal outcome of a Modify or Fetch.
pub type OperationResultCallback = Box<dyn FnOnce(Result<(), CloudError>)>;

/// Terminal outcome of a Query. The cursor is always `None`, see [`QueryCursor`].
pub type QueryResultCallback = Box<dyn FnOnce(Result<Option<QueryCursor>, CloudError>)>;

/// Runs last, whatever the outcome.
pub type CompletionCallback = Box<dyn FnOnce()>;

// =============================================================================
// Database Operation
// =============================================================================

/// Any operation a database can execute.
pub enum DatabaseOperation {
    Modify(ModifyRecordsOperation),
    Fetch(FetchRecordsOperation),
    Query(QueryOperation),
}

impl DatabaseOperation {
    #[must_use]
    pub fn kind(&self) -> OperationKind {
        match self {
            Self::Modify(_) => OperationKind::Modify,
            Self::Fetch(_) => OperationKind::Fetch,
            Self::Query(_) => OperationKind::Query,
        }
    }

    /// Description kept by a store for later inspection.
    #[must_use]
    pub fn summary(&self) -> OperationSummary {
        match self {
            Self::Modify(op) => op.summary(),
            Self::Fetch(op) => op.summary(),
            Self::Query(op) => op.summary(),
        }
    }
}

impl std::fmt::Debug for DatabaseOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("DatabaseOperation")
            .field(&self.summary())
            .finish()
    }
}

impl From<ModifyRecordsOperation> for DatabaseOperation {
    fn from(op: ModifyRecordsOperation) -> Self {
        Self::Modify(op)
    }
}

impl From<FetchRecordsOperation> for DatabaseOperation {
    fn from(op: FetchRecordsOperation) -> Self {
        Self::Fetch(op)
    }
}

impl From<QueryOperation> for DatabaseOperation {
    fn from(op: QueryOperation) -> Self {
        Self::Query(op)
    }
}

// =============================================================================
// Summary
// =============================================================================

/// Operation kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Modify,
    Fetch,
    Query,
}

impl OperationKind {
    /// Get string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Modify => "modify",
            Self::Fetch => "fetch",
            Self::Query => "query",
        }
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Callback-free description of an executed operation.
#[derive(Debug, Clone, PartialEq)]
pub enum OperationSummary {
    Modify {
        saved: Vec<RecordId>,
        deleted: Vec<RecordId>,
        save_policy: SavePolicy,
    },
    Fetch {
        record_ids: Vec<RecordId>,
        desired_keys: Option<BTreeSet<String>>,
    },
    Query {
        record_type: String,
        results_limit: usize,
        desired_keys: Option<BTreeSet<String>>,
    },
}

impl OperationSummary {
    #[must_use]
    pub fn kind(&self) -> OperationKind {
        match self {
            Self::Modify { .. } => OperationKind::Modify,
            Self::Fetch { .. } => OperationKind::Fetch,
            Self::Query { .. } => OperationKind::Query,
        }
    }
}

pub(crate) fn key_set<I, S>(keys: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    keys.into_iter().map(Into::into).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicate::Predicate;

    #[test]
    fn test_kind_and_summary() {
        let modify: DatabaseOperation =
            ModifyRecordsOperation::new(vec![], vec![RecordId::named("gone")]).into();
        assert_eq!(modify.kind(), OperationKind::Modify);
        assert!(matches!(
            modify.summary(),
            OperationSummary::Modify { ref deleted, .. } if deleted == &[RecordId::named("gone")]
        ));

        let fetch: DatabaseOperation = FetchRecordsOperation::new(vec![RecordId::named("a")])
            .with_desired_keys(["name"])
            .into();
        assert_eq!(fetch.summary().kind(), OperationKind::Fetch);

        let query: DatabaseOperation =
            QueryOperation::new(Query::new("Person", Predicate::True)).into();
        assert_eq!(query.kind().to_string(), "query");
    }

    #[test]
    fn test_debug_shows_summary() {
        let op: DatabaseOperation = FetchRecordsOperation::new(vec![RecordId::named("a")]).into();
        assert!(format!("{op:?}").contains("Fetch"));
    }
}
