//! cloudmock - Deterministic Record Database Mock
//!
//! TigerStyle in-memory stand-in for a remote, callback-driven record
//! database, so application code can be tested without a network and with
//! fully controlled outcomes.
//!
//! # Philosophy
//!
//! > "If you're not testing with fault injection, you're not testing."
//!
//! 1. Every outcome the service can produce can be forced from a test
//! 2. Callbacks fire in the service's order, synchronously
//! 3. Synthesized faults come from a logged seed
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │               MockContainer                  │
//! ├─────────────────────────────────────────────┤
//! │  RecordStore ×3        │ public/private/shared│
//! │  FaultRegistry         │ whole-op + per-record│
//! ├─────────────────────────────────────────────┤
//! │  Engine                │ Modify/Fetch/Query   │
//! │  Fault taxonomy        │ codes → categories   │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! use cloudmock::{DatabaseScope, FetchRecordsOperation, MockContainer, Record, RecordId};
//!
//! let mut container = MockContainer::with_seed(42);
//! container
//!     .database_mut(DatabaseScope::Private)
//!     .add(vec![Record::builder("Person", RecordId::named("r1")).field("name", "Alice").build()]);
//! container.faults_mut().fail_records(["r1"]);
//!
//! let failed = Rc::new(RefCell::new(false));
//! let f = failed.clone();
//! container.submit(
//!     DatabaseScope::Private,
//!     FetchRecordsOperation::new(vec![RecordId::named("r1")])
//!         .on_fetch_records_result(move |r| *f.borrow_mut() = r.is_err_and(|e| e.is_partial_failure())),
//! );
//!
//! assert!(*failed.borrow());
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod constants;
pub mod container;
pub mod engine;
pub mod fault;
pub mod operation;
pub mod predicate;
pub mod record;
pub mod registry;
pub mod rng;
pub mod store;

// Re-export common types
pub use config::{ConfigError, MockConfig};
pub use constants::*;
pub use container::MockContainer;
pub use engine::{effective_results_limit, execute};
pub use fault::{CloudError, ErrorMetadata, FaultCategory, FaultCode, FaultMapError, MetadataValue};
pub use operation::{
    DatabaseOperation, FetchRecordsOperation, ModifyRecordsOperation, OperationKind,
    OperationSummary, Query, QueryCursor, QueryOperation, SavePolicy,
};
pub use predicate::{evaluate, CompareOp, Predicate};
pub use record::{Record, RecordBuilder, RecordId, Value};
pub use registry::FaultRegistry;
pub use rng::DeterministicRng;
pub use store::{DatabaseScope, FixtureError, RecordStore};
