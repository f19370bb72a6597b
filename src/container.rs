//! MockContainer - Three scoped databases and one fault registry
//!
//! TigerStyle: each test builds its own container; faults set on it are
//! visible to every scope of that container and to nothing else.
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                 MockContainer                 │
//! ├──────────────────────────────────────────────┤
//! │  public  RecordStore  │                       │
//! │  private RecordStore  │  FaultRegistry        │
//! │  shared  RecordStore  │  (one, all scopes)    │
//! └──────────────────────────────────────────────┘
//! ```

use std::sync::Mutex;

use once_cell::sync::Lazy;

use crate::config::MockConfig;
use crate::engine;
use crate::operation::DatabaseOperation;
use crate::registry::FaultRegistry;
use crate::store::{DatabaseScope, RecordStore};

// =============================================================================
// Global State
// =============================================================================

/// Process-wide container, for callers that want one set of databases for
/// the whole process. Tests sharing it serialize on the lock.
static SHARED_CONTAINER: Lazy<Mutex<MockContainer>> =
    Lazy::new(|| Mutex::new(MockContainer::new(MockConfig::default())));

// =============================================================================
// MockContainer
// =============================================================================

/// Owner of the public, private and shared databases.
#[derive(Debug, Clone)]
pub struct MockContainer {
    public: RecordStore,
    private: RecordStore,
    shared: RecordStore,
    faults: FaultRegistry,
}

impl MockContainer {
    /// Create a container with empty databases and no faults.
    #[must_use]
    pub fn new(config: MockConfig) -> Self {
        tracing::info!(seed = config.seed, "creating mock container");
        Self {
            public: RecordStore::new(DatabaseScope::Public),
            private: RecordStore::new(DatabaseScope::Private),
            shared: RecordStore::new(DatabaseScope::Shared),
            faults: FaultRegistry::new(&config),
        }
    }

    /// Create a container with a fixed seed.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self::new(MockConfig::with_seed(seed))
    }

    /// The process-wide container.
    #[must_use]
    pub fn shared() -> &'static Mutex<MockContainer> {
        &SHARED_CONTAINER
    }

    /// Database for a scope.
    #[must_use]
    pub fn database(&self, scope: DatabaseScope) -> &RecordStore {
        match scope {
            DatabaseScope::Public => &self.public,
            DatabaseScope::Private => &self.private,
            DatabaseScope::Shared => &self.shared,
        }
    }

    /// Mutable database for a scope (for seeding records).
    pub fn database_mut(&mut self, scope: DatabaseScope) -> &mut RecordStore {
        match scope {
            DatabaseScope::Public => &mut self.public,
            DatabaseScope::Private => &mut self.private,
            DatabaseScope::Shared => &mut self.shared,
        }
    }

    #[must_use]
    pub fn public_database(&self) -> &RecordStore {
        &self.public
    }

    #[must_use]
    pub fn private_database(&self) -> &RecordStore {
        &self.private
    }

    #[must_use]
    pub fn shared_database(&self) -> &RecordStore {
        &self.shared
    }

    #[must_use]
    pub fn faults(&self) -> &FaultRegistry {
        &self.faults
    }

    pub fn faults_mut(&mut self) -> &mut FaultRegistry {
        &mut self.faults
    }

    /// Execute an operation against a scope's database.
    ///
    /// All callbacks have run when this returns.
    pub fn submit(&mut self, scope: DatabaseScope, operation: impl Into<DatabaseOperation>) {
        let store = match scope {
            DatabaseScope::Public => &mut self.public,
            DatabaseScope::Private => &mut self.private,
            DatabaseScope::Shared => &mut self.shared,
        };
        engine::execute(operation.into(), store, &mut self.faults);
    }

    /// Clear faults and every database.
    pub fn reset_all(&mut self) {
        tracing::info!("resetting mock container");
        self.faults.reset();
        for scope in DatabaseScope::all() {
            self.database_mut(*scope).reset();
        }
    }
}

impl Default for MockContainer {
    fn default() -> Self {
        Self::new(MockConfig::default())
    }
}

// =============================================================================
// Tests
// =============================================================================
