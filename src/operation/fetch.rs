//! FetchRecordsOperation - Look records up by ID

use std::collections::BTreeSet;

use super::{
    key_set, CompletionCallback, OperationResultCallback, OperationSummary, ProgressCallback,
    RecordResultCallback,
};
use crate::fault::CloudError;
use crate::record::{Record, RecordId};

/// Fetches `record_ids`, optionally limited to `desired_keys`.
///
/// IDs with no stored record produce no per-record callback.
pub struct FetchRecordsOperation {
    pub(crate) record_ids: Vec<RecordId>,
    pub(crate) desired_keys: Option<BTreeSet<String>>,
    per_record_progress: Option<ProgressCallback>,
    per_record_result: Option<RecordResultCallback>,
    fetch_records_result: Option<OperationResultCallback>,
    completion: Option<CompletionCallback>,
}

impl FetchRecordsOperation {
    #[must_use]
    pub fn new(record_ids: Vec<RecordId>) -> Self {
        Self {
            record_ids,
            desired_keys: None,
            per_record_progress: None,
            per_record_result: None,
            fetch_records_result: None,
            completion: None,
        }
    }

    /// Report only these fields of each record.
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
    pub fn on_per_record_progress(mut self, f: impl FnMut(&RecordId, f64) + 'static) -> Self {
        self.per_record_progress = Some(Box::new(f));
        self
    }

    #[must_use]
    pub fn on_per_record_result(
        mut self,
        f: impl FnMut(&RecordId, Result<Record, CloudError>) + 'static,
    ) -> Self {
        self.per_record_result = Some(Box::new(f));
        self
    }

    #[must_use]
    pub fn on_fetch_records_result(
        mut self,
        f: impl FnOnce(Result<(), CloudError>) + 'static,
    ) -> Self {
        self.fetch_records_result = Some(Box::new(f));
        self
    }

    #[must_use]
    pub fn on_completion(mut self, f: impl FnOnce() + 'static) -> Self {
        self.completion = Some(Box::new(f));
        self
    }

    #[must_use]
    pub fn record_ids(&self) -> &[RecordId] {
        &self.record_ids
    }

    #[must_use]
    pub fn desired_keys(&self) -> Option<&BTreeSet<String>> {
        self.desired_keys.as_ref()
    }

    #[must_use]
    pub fn summary(&self) -> OperationSummary {
        OperationSummary::Fetch {
            record_ids: self.record_ids.clone(),
            desired_keys: self.desired_keys.clone(),
        }
    }

    pub(crate) fn report_progress(&mut self, id: &RecordId, progress: f64) {
        if let Some(f) = self.per_record_progress.as_mut() {
            f(id, progress);
        }
    }

    pub(crate) fn report_result(&mut self, id: &RecordId, result: Result<Record, CloudError>) {
        if let Some(f) = self.per_record_result.as_mut() {
            f(id, result);
        }
    }

    pub(crate) fn finish(mut self, result: Result<(), CloudError>) {
        if let Some(f) = self.fetch_records_result.take() {
            f(result);
        }
        if let Some(f) = self.completion.take() {
            f();
        }
    }
}
