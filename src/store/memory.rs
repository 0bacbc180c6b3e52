use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use serde_json::Value;
use tracing::debug;

use super::{Entity, EntityKind, EntityStore, VersionToken, Versioned};
use crate::errors::{AccrualError, Result};

#[derive(Debug, Clone)]
struct Record {
    document: Value,
    version: VersionToken,
    transition: Option<String>,
}

/// entity store backed by a map of JSON documents.
///
/// Everything read back has gone through the same serialized form an
/// external store would hand over. Thread-safe through an `RwLock`.
#[derive(Debug, Default)]
pub struct InMemoryEntityStore {
    records: RwLock<HashMap<(EntityKind, String), Record>>,
    fail_next_create: AtomicBool,
    fail_next_update: AtomicBool,
}

impl InMemoryEntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// make the next `create` call fail with a persistence failure
    pub fn fail_next_create(&self) {
        self.fail_next_create.store(true, Ordering::SeqCst);
    }

    /// make the next `update` call fail with a persistence failure
    pub fn fail_next_update(&self) {
        self.fail_next_update.store(true, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// number of stored records of one kind
    pub fn count(&self, kind: EntityKind) -> usize {
        self.records
            .read()
            .map(|r| r.keys().filter(|(k, _)| *k == kind).count())
            .unwrap_or(0)
    }

    fn decode<E: Entity>(record: &Record) -> Result<Versioned<E>> {
        let entity = serde_json::from_value(record.document.clone()).map_err(|e| {
            AccrualError::PersistenceFailure {
                message: format!("cannot decode {}: {}", E::KIND, e),
            }
        })?;
        Ok(Versioned {
            entity,
            version: record.version,
            transition: record.transition.clone(),
        })
    }

    fn encode<E: Entity>(entity: &E) -> Result<Value> {
        serde_json::to_value(entity).map_err(|e| AccrualError::PersistenceFailure {
            message: format!("cannot encode {}: {}", E::KIND, e),
        })
    }

    fn injected_failure(flag: &AtomicBool, operation: &str) -> Result<()> {
        if flag.swap(false, Ordering::SeqCst) {
            return Err(AccrualError::PersistenceFailure {
                message: format!("injected {} failure", operation),
            });
        }
        Ok(())
    }
}

fn lock_error(e: impl std::fmt::Display) -> AccrualError {
    AccrualError::PersistenceFailure {
        message: format!("lock error: {}", e),
    }
}

impl EntityStore for InMemoryEntityStore {
    fn find_by_business_key<E: Entity>(&self, key: &str) -> Result<Option<Versioned<E>>> {
        let records = self.records.read().map_err(lock_error)?;
        records
            .get(&(E::KIND, key.to_string()))
            .map(Self::decode::<E>)
            .transpose()
    }

    fn create<E: Entity>(&self, entity: E) -> Result<Versioned<E>> {
        Self::injected_failure(&self.fail_next_create, "create")?;

        let key = entity.business_key().to_string();
        let document = Self::encode(&entity)?;
        let mut records = self.records.write().map_err(lock_error)?;
        if records.contains_key(&(E::KIND, key.clone())) {
            return Err(AccrualError::PersistenceFailure {
                message: format!("{} {} already exists", E::KIND, key),
            });
        }

        let record = Record {
            document,
            version: VersionToken::INITIAL,
            transition: None,
        };
        let created = Self::decode(&record)?;
        records.insert((E::KIND, key.clone()), record);
        debug!(kind = %E::KIND, key = %key, "entity created");
        Ok(created)
    }

    fn update<E: Entity>(
        &self,
        key: &str,
        entity: E,
        expected_version: VersionToken,
        transition: &str,
    ) -> Result<Versioned<E>> {
        if entity.business_key() != key {
            return Err(AccrualError::InvariantViolation {
                message: format!(
                    "{} {} cannot be written under key {}",
                    E::KIND,
                    entity.business_key(),
                    key
                ),
            });
        }
        Self::injected_failure(&self.fail_next_update, "update")?;

        let document = Self::encode(&entity)?;
        let mut records = self.records.write().map_err(lock_error)?;
        let record = records
            .get_mut(&(E::KIND, key.to_string()))
            .ok_or_else(|| AccrualError::ReferenceNotFound {
                kind: E::KIND,
                key: key.to_string(),
            })?;

        if record.version != expected_version {
            return Err(AccrualError::ConcurrentModification {
                kind: E::KIND,
                key: key.to_string(),
                expected: expected_version,
                actual: record.version,
            });
        }

        record.document = document;
        record.version = record.version.next();
        record.transition = Some(transition.to_string());
        debug!(
            kind = %E::KIND,
            key = %key,
            version = %record.version,
            transition,
            "entity updated"
        );
        Self::decode(record)
    }
}
