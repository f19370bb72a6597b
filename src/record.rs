//! Record - Typed field maps keyed by RecordId
//!
//! TigerStyle: Explicit types, validation, builder pattern.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_ZONE_NAME, RECORD_NAME_BYTES_MAX};

// =============================================================================
// Record ID
// =============================================================================

/// Identifier of a record within a database scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordId {
    /// Unique name within the zone
    pub record_name: String,
    /// Zone the record lives in
    #[serde(default = "default_zone_name")]
    pub zone_name: String,
}

fn default_zone_name() -> String {
    DEFAULT_ZONE_NAME.to_string()
}

impl RecordId {
    /// Create a record ID with a random (UUID v4) name in the default zone.
    #[must_use]
    pub fn new() -> Self {
        Self::named(uuid::Uuid::new_v4().to_string())
    }

    /// Create a record ID with an explicit name in the default zone.
    ///
    /// # Panics
    /// Panics if the name is empty or exceeds `RECORD_NAME_BYTES_MAX`.
    #[must_use]
    pub fn named(record_name: impl Into<String>) -> Self {
        Self::in_zone(record_name, DEFAULT_ZONE_NAME)
    }

    /// Create a record ID in a specific zone.
    ///
    /// # Panics
    /// Panics if the name is empty or exceeds `RECORD_NAME_BYTES_MAX`.
    #[must_use]
    pub fn in_zone(record_name: impl Into<String>, zone_name: impl Into<String>) -> Self {
        let record_name = record_name.into();
        assert!(!record_name.is_empty(), "record name cannot be empty");
        assert!(
            record_name.len() <= RECORD_NAME_BYTES_MAX,
            "record name {} bytes exceeds max {}",
            record_name.len(),
            RECORD_NAME_BYTES_MAX
        );

        Self {
            record_name,
            zone_name: zone_name.into(),
        }
    }

    /// Key used for this record in a partial-failure map.
    ///
    /// Zone-qualified outside the default zone, so equal names in different
    /// zones keep separate entries.
    #[must_use]
    pub fn partial_key(&self) -> String {
        self.to_string()
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.zone_name == DEFAULT_ZONE_NAME {
            write!(f, "{}", self.record_name)
        } else {
            write!(f, "{}:{}", self.zone_name, self.record_name)
        }
    }
}

impl From<&str> for RecordId {
    fn from(name: &str) -> Self {
        Self::named(name)
    }
}

// =============================================================================
// Value
// =============================================================================

/// A field value stored on a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    String(String),
    Int64(i64),
    Double(f64),
    Bool(bool),
    Date(DateTime<Utc>),
    Bytes(Vec<u8>),
    Reference(RecordId),
    List(Vec<Value>),
}

impl Value {
    /// Name of the value's kind, for logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::String(_) => "string",
            Self::Int64(_) => "int64",
            Self::Double(_) => "double",
            Self::Bool(_) => "bool",
            Self::Date(_) => "date",
            Self::Bytes(_) => "bytes",
            Self::Reference(_) => "reference",
            Self::List(_) => "list",
        }
    }

    /// Convert plain JSON into a value. `null` and objects have no
    /// counterpart and yield `None`.
    #[must_use]
    pub fn from_json(json: &serde_json::Value) -> Option<Self> {
        match json {
            serde_json::Value::Bool(b) => Some(Self::Bool(*b)),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(Self::Int64)
                .or_else(|| n.as_f64().map(Self::Double)),
            serde_json::Value::String(s) => Some(Self::String(s.clone())),
            serde_json::Value::Array(items) => items
                .iter()
                .map(Self::from_json)
                .collect::<Option<Vec<_>>>()
                .map(Self::List),
            serde_json::Value::Null | serde_json::Value::Object(_) => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Int64(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Double(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(d: DateTime<Utc>) -> Self {
        Self::Date(d)
    }
}

impl From<RecordId> for Value {
    fn from(id: RecordId) -> Self {
        Self::Reference(id)
    }
}

// =============================================================================
// Record
// =============================================================================

/// A typed record: a field map identified by a [`RecordId`].
///
/// Every field is optional; a missing key reads as nil.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Identifier, unique within a database scope
    pub id: RecordId,
    /// Record type (the service's "table")
    pub record_type: String,
    /// Field values by name
    #[serde(default)]
    pub fields: BTreeMap<String, Value>,
    /// Creation timestamp
    pub creation_date: DateTime<Utc>,
    /// Last modification timestamp
    pub modification_date: DateTime<Utc>,
}

impl Record {
    /// Create an empty record of the given type.
    ///
    /// # Panics
    /// Panics if `record_type` is empty.
    #[must_use]
    pub fn new(record_type: impl Into<String>, id: RecordId) -> Self {
        Self::builder(record_type, id).build()
    }

    /// Create a builder for a record with fields.
    #[must_use]
    pub fn builder(record_type: impl Into<String>, id: RecordId) -> RecordBuilder {
        RecordBuilder::new(record_type.into(), id)
    }

    /// Get a field value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Set a field value and bump the modification date.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(key.into(), value.into());
        self.modification_date = Utc::now();
    }

    /// Remove a field (set it to nil) and bump the modification date.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let removed = self.fields.remove(key);
        if removed.is_some() {
            self.modification_date = Utc::now();
        }
        removed
    }

    /// Names of the fields currently set.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Copy of this record keeping only the desired keys.
    ///
    /// The source record is left untouched; identity and timestamps carry over.
    #[must_use]
    pub fn project(&self, desired_keys: &BTreeSet<String>) -> Self {
        let fields = self
            .fields
            .iter()
            .filter(|(key, _)| desired_keys.contains(*key))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        Self {
            id: self.id.clone(),
            record_type: self.record_type.clone(),
            fields,
            creation_date: self.creation_date,
            modification_date: self.modification_date,
        }
    }

    /// Project when a desired-key filter is present, else clone.
    #[must_use]
    pub fn visible(&self, desired_keys: Option<&BTreeSet<String>>) -> Self {
        match desired_keys {
            Some(keys) => self.project(keys),
            None => self.clone(),
        }
    }
}

// =============================================================================
// Record Builder
// =============================================================================

/// Builder for [`Record`] with fluent API.
#[derive(Debug)]
pub struct RecordBuilder {
    record_type: String,
    id: RecordId,
    fields: BTreeMap<String, Value>,
    creation_date: Option<DateTime<Utc>>,
    modification_date: Option<DateTime<Utc>>,
}

impl RecordBuilder {
    /// Create a new builder.
    #[must_use]
    pub fn new(record_type: String, id: RecordId) -> Self {
        Self {
            record_type,
            id,
            fields: BTreeMap::new(),
            creation_date: None,
            modification_date: None,
        }
    }

    /// Set a field.
    #[must_use]
    pub fn field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Set creation date (for deterministic fixtures).
    #[must_use]
    pub fn with_creation_date(mut self, date: DateTime<Utc>) -> Self {
        self.creation_date = Some(date);
        self
    }

    /// Set modification date (for deterministic fixtures).
    #[must_use]
    pub fn with_modification_date(mut self, date: DateTime<Utc>) -> Self {
        self.modification_date = Some(date);
        self
    }

    /// Build the record.
    ///
    /// # Panics
    /// Panics if the record type is empty.
    #[must_use]
    pub fn build(self) -> Record {
        assert!(!self.record_type.is_empty(), "record type cannot be empty");

        let now = Utc::now();
        let creation_date = self.creation_date.unwrap_or(now);
        Record {
            id: self.id,
            record_type: self.record_type,
            fields: self.fields,
            creation_date,
            modification_date: self.modification_date.unwrap_or(creation_date),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
