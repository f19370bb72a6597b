//! Predicate - Query filters over record fields
//!
//! TigerStyle: a small closed grammar, evaluated purely.
//!
//! Evaluation never fails: a comparison that is not defined for the
//! values involved simply does not match.

use std::cmp::Ordering;
use std::ops::{BitAnd, BitOr, Not};

use crate::record::{Record, Value};

// =============================================================================
// Compare Operators
// =============================================================================

/// Comparison operator applied to a single field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
    /// Field value is one of the listed values
    In,
    /// Field list holds the value, or field string holds the substring
    Contains,
    /// Field string starts with the value
    BeginsWith,
}

impl CompareOp {
    /// Operator symbol, for logs.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::In => "IN",
            Self::Contains => "CONTAINS",
            Self::BeginsWith => "BEGINSWITH",
        }
    }
}

// =============================================================================
// Predicate
// =============================================================================

/// A boolean filter over a record's fields.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    True,
    False,
    Compare {
        field: String,
        op: CompareOp,
        value: Value,
    },
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Not(Box<Predicate>),
}

impl Predicate {
    /// Build a comparison.
    #[must_use]
    pub fn compare(field: impl Into<String>, op: CompareOp, value: impl Into<Value>) -> Self {
        Self::Compare {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    #[must_use]
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Eq, value)
    }

    #[must_use]
    pub fn ne(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Ne, value)
    }

    #[must_use]
    pub fn lt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Lt, value)
    }

    #[must_use]
    pub fn lte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Lte, value)
    }

    #[must_use]
    pub fn gt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Gt, value)
    }

    #[must_use]
    pub fn gte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Gte, value)
    }

    #[must_use]
    pub fn in_(field: impl Into<String>, values: Vec<Value>) -> Self {
        Self::compare(field, CompareOp::In, Value::List(values))
    }

    #[must_use]
    pub fn contains(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Contains, value)
    }

    #[must_use]
    pub fn begins_with(field: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self::compare(field, CompareOp::BeginsWith, Value::String(prefix.into()))
    }

    /// Evaluate against a record.
    #[must_use]
    pub fn matches(&self, record: &Record) -> bool {
        evaluate(self, record)
    }
}

impl BitAnd for Predicate {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self::Output {
        Self::And(vec![self, rhs])
    }
}

impl BitOr for Predicate {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self::Or(vec![self, rhs])
    }
}

impl Not for Predicate {
    type Output = Self;

    fn not(self) -> Self::Output {
        Self::Not(Box::new(self))
    }
}

// =============================================================================
// Evaluation
// =============================================================================

/// Evaluate a predicate against a record.
///
/// A comparison against a missing field is false, except `Ne`, which
/// treats nil as different from every value.
#[must_use]
pub fn evaluate(predicate: &Predicate, record: &Record) -> bool {
    match predicate {
        Predicate::True => true,
        Predicate::False => false,
        Predicate::And(children) => children.iter().all(|child| evaluate(child, record)),
        Predicate::Or(children) => children.iter().any(|child| evaluate(child, record)),
        Predicate::Not(inner) => !evaluate(inner, record),
        Predicate::Compare { field, op, value } => match record.get(field) {
            Some(actual) => eval_compare(actual, *op, value),
            None => *op == CompareOp::Ne,
        },
    }
}

fn eval_compare(actual: &Value, op: CompareOp, expected: &Value) -> bool {
    match op {
        CompareOp::Eq => values_equal(actual, expected),
        CompareOp::Ne => !values_equal(actual, expected),
        CompareOp::Lt => compare_order(actual, expected) == Some(Ordering::Less),
        CompareOp::Lte => matches!(
            compare_order(actual, expected),
            Some(Ordering::Less | Ordering::Equal)
        ),
        CompareOp::Gt => compare_order(actual, expected) == Some(Ordering::Greater),
        CompareOp::Gte => matches!(
            compare_order(actual, expected),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        CompareOp::In => match expected {
            Value::List(candidates) => candidates.iter().any(|c| values_equal(actual, c)),
            _ => false,
        },
        CompareOp::Contains => match (actual, expected) {
            (Value::List(items), _) => items.iter().any(|item| values_equal(item, expected)),
            (Value::String(haystack), Value::String(needle)) => haystack.contains(needle.as_str()),
            _ => false,
        },
        CompareOp::BeginsWith => match (actual, expected) {
            (Value::String(s), Value::String(prefix)) => s.starts_with(prefix.as_str()),
            _ => false,
        },
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::List(xs), Value::List(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| values_equal(x, y))
        }
        _ => compare_order(a, b) == Some(Ordering::Equal),
    }
}

// Ordering is only defined between values of the same kind; integers
// and doubles compare numerically.
#[allow(clippy::cast_precision_loss)]
fn compare_order(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Int64(x), Value::Int64(y)) => Some(x.cmp(y)),
        (Value::Double(x), Value::Double(y)) => x.partial_cmp(y),
        (Value::Int64(x), Value::Double(y)) => (*x as f64).partial_cmp(y),
        (Value::Double(x), Value::Int64(y)) => x.partial_cmp(&(*y as f64)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Date(x), Value::Date(y)) => Some(x.cmp(y)),
        (Value::Bytes(x), Value::Bytes(y)) => Some(x.cmp(y)),
        (Value::Reference(x), Value::Reference(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

// =============================================================================
// Tests
// =============================================================================
