//! ModifyRecordsOperation - Save and delete records in one batch

use super::{
    CompletionCallback, DeleteResultCallback, OperationResultCallback, OperationSummary,
    ProgressCallback, RecordResultCallback,
};
use crate::fault::CloudError;
use crate::record::{Record, RecordId};

/// How the service reconciles a save with the server copy.
///
/// The mock records the policy but always overwrites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SavePolicy {
    #[default]
    IfServerRecordUnchanged,
    ChangedKeys,
    AllKeys,
}

/// Saves `records_to_save` and deletes `record_ids_to_delete`.
pub struct ModifyRecordsOperation {
    pub(crate) records_to_save: Vec<Record>,
    pub(crate) record_ids_to_delete: Vec<RecordId>,
    pub(crate) save_policy: SavePolicy,
    per_record_progress: Option<ProgressCallback>,
    per_record_save: Option<RecordResultCallback>,
    per_record_delete: Option<DeleteResultCallback>,
    modify_records_result: Option<OperationResultCallback>,
    completion: Option<CompletionCallback>,
}

impl ModifyRecordsOperation {
    /// Create an operation with no callbacks registered.
    #[must_use]
    pub fn new(records_to_save: Vec<Record>, record_ids_to_delete: Vec<RecordId>) -> Self {
        Self {
            records_to_save,
            record_ids_to_delete,
            save_policy: SavePolicy::default(),
            per_record_progress: None,
            per_record_save: None,
            per_record_delete: None,
            modify_records_result: None,
            completion: None,
        }
    }

    #[must_use]
    pub fn with_save_policy(mut self, policy: SavePolicy) -> Self {
        self.save_policy = policy;
        self
    }

    #[must_use]
    pub fn on_per_record_progress(mut self, f: impl FnMut(&RecordId, f64) + 'static) -> Self {
        self.per_record_progress = Some(Box::new(f));
        self
    }

    #[must_use]
    pub fn on_per_record_save(
        mut self,
        f: impl FnMut(&RecordId, Result<Record, CloudError>) + 'static,
    ) -> Self {
        self.per_record_save = Some(Box::new(f));
        self
    }

    #[must_use]
    pub fn on_per_record_delete(
        mut self,
        f: impl FnMut(&RecordId, Result<(), CloudError>) + 'static,
    ) -> Self {
        self.per_record_delete = Some(Box::new(f));
        self
    }

    #[must_use]
    pub fn on_modify_records_result(
        mut self,
        f: impl FnOnce(Result<(), CloudError>) + 'static,
    ) -> Self {
        self.modify_records_result = Some(Box::new(f));
        self
    }

    #[must_use]
    pub fn on_completion(mut self, f: impl FnOnce() + 'static) -> Self {
        self.completion = Some(Box::new(f));
        self
    }

    #[must_use]
    pub fn records_to_save(&self) -> &[Record] {
        &self.records_to_save
    }

    #[must_use]
    pub fn record_ids_to_delete(&self) -> &[RecordId] {
        &self.record_ids_to_delete
    }

    #[must_use]
    pub fn summary(&self) -> OperationSummary {
        OperationSummary::Modify {
            saved: self.records_to_save.iter().map(|r| r.id.clone()).collect(),
            deleted: self.record_ids_to_delete.clone(),
            save_policy: self.save_policy,
        }
    }

    pub(crate) fn report_progress(&mut self, id: &RecordId, progress: f64) {
        if let Some(f) = self.per_record_progress.as_mut() {
            f(id, progress);
        }
    }

    pub(crate) fn report_save(&mut self, id: &RecordId, result: Result<Record, CloudError>) {
        if let Some(f) = self.per_record_save.as_mut() {
            f(id, result);
        }
    }

    pub(crate) fn report_delete(&mut self, id: &RecordId, result: Result<(), CloudError>) {
        if let Some(f) = self.per_record_delete.as_mut() {
            f(id, result);
        }
    }

    pub(crate) fn finish(mut self, result: Result<(), CloudError>) {
        if let Some(f) = self.modify_records_result.take() {
            f(result);
        }
        if let Some(f) = self.completion.take() {
            f();
        }
    }
}
