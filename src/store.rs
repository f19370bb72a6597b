//! RecordStore - In-memory records for one database scope
//!
//! TigerStyle: pure CRUD. Store methods never fire callbacks; only the
//! engine does.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::operation::OperationSummary;
use crate::predicate::Predicate;
use crate::record::{Record, RecordId, Value};

// =============================================================================
// Database Scope
// =============================================================================

/// Which of a container's independent databases to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatabaseScope {
    Public,
    Private,
    Shared,
}

impl DatabaseScope {
    /// Get string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Private => "private",
            Self::Shared => "shared",
        }
    }

    /// All scopes in order.
    #[must_use]
    pub fn all() -> &'static [DatabaseScope] {
        &[Self::Public, Self::Private, Self::Shared]
    }
}

impl fmt::Display for DatabaseScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Record Store
// =============================================================================

/// Records of one scope, iterated in [`RecordId`] order.
#[derive(Debug, Clone)]
pub struct RecordStore {
    scope: DatabaseScope,
    records: BTreeMap<RecordId, Record>,
    last_operation: Option<OperationSummary>,
}

impl RecordStore {
    /// Create an empty store.
    #[must_use]
    pub fn new(scope: DatabaseScope) -> Self {
        Self {
            scope,
            records: BTreeMap::new(),
            last_operation: None,
        }
    }

    #[must_use]
    pub fn scope(&self) -> DatabaseScope {
        self.scope
    }

    /// Upsert records; a later record replaces an earlier one with the same ID.
    pub fn add<I>(&mut self, records: I)
    where
        I: IntoIterator<Item = Record>,
    {
        for record in records {
            self.records.insert(record.id.clone(), record);
        }
    }

    /// All records.
    #[must_use]
    pub fn get(&self) -> Vec<Record> {
        self.records.values().cloned().collect()
    }

    /// Records whose ID is listed; unknown IDs are skipped.
    #[must_use]
    pub fn get_matching_ids(&self, ids: &[RecordId]) -> Vec<Record> {
        self.records
            .iter()
            .filter(|(id, _)| ids.contains(id))
            .map(|(_, record)| record.clone())
            .collect()
    }

    /// Records the predicate accepts.
    #[must_use]
    pub fn get_matching_predicate(&self, predicate: &Predicate) -> Vec<Record> {
        self.records
            .values()
            .filter(|record| predicate.matches(record))
            .cloned()
            .collect()
    }

    /// Look one record up.
    #[must_use]
    pub fn record(&self, id: &RecordId) -> Option<&Record> {
        self.records.get(id)
    }

    #[must_use]
    pub fn contains(&self, id: &RecordId) -> bool {
        self.records.contains_key(id)
    }

    /// Delete records; unknown IDs are ignored.
    pub fn remove(&mut self, ids: &[RecordId]) {
        for id in ids {
            self.records.remove(id);
        }
    }

    /// Remove every record and forget the last operation.
    pub fn reset(&mut self) {
        tracing::info!(scope = %self.scope, count = self.records.len(), "resetting store");
        self.records.clear();
        self.last_operation = None;

        // Postcondition
        assert!(self.records.is_empty(), "store must be empty after reset");
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Record> {
        self.records.values()
    }

    /// The last operation executed against this store.
    #[must_use]
    pub fn last_operation(&self) -> Option<&OperationSummary> {
        self.last_operation.as_ref()
    }

    pub(crate) fn set_last_operation(&mut self, summary: OperationSummary) {
        self.last_operation = Some(summary);
    }

    // =========================================================================
    // Fixtures
    // =========================================================================

    /// Add records from a JSON array of serialized records.
    ///
    /// # Errors
    /// Returns [`FixtureError`] if the JSON is not an array of records.
    pub fn load_json(&mut self, json: &str) -> Result<usize, FixtureError> {
        let records: Vec<Record> = serde_json::from_str(json)?;
        let count = records.len();
        self.add(records);
        tracing::debug!(scope = %self.scope, count, "loaded fixture records");
        Ok(count)
    }

    /// Add records of one type from plain JSON keyed by record name:
    /// `{"r1": {"name": "Alice", "age": 30}}`.
    ///
    /// # Errors
    /// Returns [`FixtureError`] if the JSON is malformed, is not an object of
    /// objects, or holds a field value with no record counterpart.
    pub fn load_plain_json(&mut self, record_type: &str, json: &str) -> Result<usize, FixtureError> {
        let parsed: serde_json::Value = serde_json::from_str(json)?;
        let serde_json::Value::Object(entries) = parsed else {
            return Err(FixtureError::Shape {
                reason: "top level must be an object of records".to_string(),
            });
        };

        let mut records = Vec::with_capacity(entries.len());
        for (name, fields) in &entries {
            let serde_json::Value::Object(fields) = fields else {
                return Err(FixtureError::Shape {
                    reason: format!("record {name} must be an object of fields"),
                });
            };
            let mut builder = Record::builder(record_type, RecordId::named(name.as_str()));
            for (key, raw) in fields {
                let value = Value::from_json(raw).ok_or_else(|| FixtureError::UnsupportedValue {
                    record: name.clone(),
                    field: key.clone(),
                })?;
                builder = builder.field(key.as_str(), value);
            }
            records.push(builder.build());
        }

        let count = records.len();
        self.add(records);
        tracing::debug!(scope = %self.scope, record_type, count, "loaded plain fixture records");
        Ok(count)
    }

    /// Serialize every record as a JSON array.
    ///
    /// # Errors
    /// Returns [`FixtureError`] if a record cannot be serialized.
    pub fn to_json(&self) -> Result<serde_json::Value, FixtureError> {
        Ok(serde_json::to_value(self.get())?)
    }
}

/// Errors loading or dumping fixtures.
#[derive(Debug, thiserror::Error)]
pub enum FixtureError {
    #[error("invalid fixture json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid fixture shape: {reason}")]
    Shape { reason: String },

    #[error("field {field} of record {record} has no record value counterpart")]
    UnsupportedValue { record: String, field: String },
}

// =============================================================================
// Tests
// =============================================================================
