//! QueryOperation - Find records of a type matching a predicate

use std::collections::BTreeSet;

use super::{key_set, CompletionCallback, OperationSummary, QueryResultCallback, RecordResultCallback};
use crate::constants::QUERY_RESULTS_LIMIT_AUTOMATIC;
use crate::fault::CloudError;
use crate::predicate::Predicate;
use crate::record::{Record, RecordId};

/// A record type plus a filter over its fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub record_type: String,
    pub predicate: Predicate,
}

impl Query {
    /// # Panics
    /// Panics if `record_type` is empty.
    #[must_use]
    pub fn new(record_type: impl Into<String>, predicate: Predicate) -> Self {
        let record_type = record_type.into();
        assert!(!record_type.is_empty(), "query record type cannot be empty");
        Self {
            record_type,
            predicate,
        }
    }

    /// Whether a record is of the right type and passes the filter.
    #[must_use]
    pub fn matches(&self, record: &Record) -> bool {
        record.record_type == self.record_type && self.predicate.matches(record)
    }
}

/// Continuation point of a truncated query.
///
/// The mock never hands one out: a query that hits its results limit
/// still completes with `Ok(None)`. Callers relying on pagination cannot
/// be exercised against the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryCursor {
    _private: (),
}

/// Runs a [`Query`] against a database.
pub struct QueryOperation {
    pub(crate) query: Query,
    pub(crate) results_limit: usize,
    pub(crate) desired_keys: Option<BTreeSet<String>>,
    record_matched: Option<RecordResultCallback>,
    query_result: Option<QueryResultCallback>,
    completion: Option<CompletionCallback>,
}

impl QueryOperation {
    #[must_use]
    pub fn new(query: Query) -> Self {
        Self {
            query,
            results_limit: QUERY_RESULTS_LIMIT_AUTOMATIC,
            desired_keys: None,
            record_matched: None,
            query_result: None,
            completion: None,
        }
    }

    /// Maximum matches to deliver; 0 means the service maximum.
    #[must_use]
    pub fn with_results_limit(mut self, limit: usize) -> Self {
        self.results_limit = limit;
        self
    }

    /// Report only these fields of each match.
    #[must_use]
    pub fn with_desired_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.desired_keys = Some(key_set(keys));
        self
    }

    #[must_use]
    pub fn on_record_matched(
        mut self,
        f: impl FnMut(&RecordId, Result<Record, CloudError>) + 'static,
    ) -> Self {
        self.record_matched = Some(Box::new(f));
        self
    }

    /// Register the terminal callback; its cursor is always `None`.
    #[must_use]
    pub fn on_query_result(
        mut self,
        f: impl FnOnce(Result<Option<QueryCursor>, CloudError>) + 'static,
    ) -> Self {
        self.query_result = Some(Box::new(f));
        self
    }

    #[must_use]
    pub fn on_completion(mut self, f: impl FnOnce() + 'static) -> Self {
        self.completion = Some(Box::new(f));
        self
    }

    #[must_use]
    pub fn query(&self) -> &Query {
        &self.query
    }

    #[must_use]
    pub fn results_limit(&self) -> usize {
        self.results_limit
    }

    #[must_use]
    pub fn summary(&self) -> OperationSummary {
        OperationSummary::Query {
            record_type: self.query.record_type.clone(),
            results_limit: self.results_limit,
            desired_keys: self.desired_keys.clone(),
        }
    }

    pub(crate) fn report_match(&mut self, id: &RecordId, result: Result<Record, CloudError>) {
        if let Some(f) = self.record_matched.as_mut() {
            f(id, result);
        }
    }

    pub(crate) fn finish(mut self, result: Result<Option<QueryCursor>, CloudError>) {
        if let Some(f) = self.query_result.take() {
            f(result);
        }
        if let Some(f) = self.completion.take() {
            f();
        }
    }
}
