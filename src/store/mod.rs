pub mod memory;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::Result;

pub use memory::InMemoryEntityStore;

/// kinds of entity the engine reads or writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Loan,
    Accrual,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Loan => f.write_str("Loan"),
            EntityKind::Accrual => f.write_str("Accrual"),
        }
    }
}

/// optimistic concurrency token; bumped on every successful write
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VersionToken(pub u64);

impl VersionToken {
    pub const INITIAL: VersionToken = VersionToken(1);

    pub fn next(self) -> VersionToken {
        VersionToken(self.0 + 1)
    }
}

impl fmt::Display for VersionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// a persisted record the store can look up by business key
pub trait Entity: Serialize + DeserializeOwned + Clone {
    const KIND: EntityKind;

    fn business_key(&self) -> &str;
}

/// an entity together with its store metadata
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned<E> {
    pub entity: E,
    pub version: VersionToken,
    /// last transition applied by the store, None right after create
    pub transition: Option<String>,
}

/// external store for loans and accruals.
///
/// Entities never hold live references to each other; every back-reference
/// is a business key resolved through this lookup.
pub trait EntityStore {
    fn find_by_business_key<E: Entity>(&self, key: &str) -> Result<Option<Versioned<E>>>;

    /// insert a new record; a duplicate business key is a persistence failure
    fn create<E: Entity>(&self, entity: E) -> Result<Versioned<E>>;

    /// replace a record if it is still at `expected_version`
    fn update<E: Entity>(
        &self,
        key: &str,
        entity: E,
        expected_version: VersionToken,
        transition: &str,
    ) -> Result<Versioned<E>>;
}
