// src/core/store.rs

//! Keyed storage for scan records.
//!
//! The orchestrator only ever talks to the [`ScanStore`] trait, so tests and
//! alternative backends can swap the in-memory map out. Writers go through
//! [`ScanStore::update`], which holds the record exclusively for the duration
//! of the closure; two collectors of the same scan can therefore never race
//! on `modules_executed` or on the terminal transition.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use crate::core::error::ScanError;
use crate::core::models::{ScanId, ScanRecord};

/// A mutation applied under exclusive access to one record.
pub type RecordMutation<'a> = &'a mut dyn FnMut(&mut ScanRecord) -> Result<(), ScanError>;

/// Keyed, mutable storage for scan records.
///
/// Implementations must give [`ScanStore::update`] exclusive access to the
/// record it touches; reads may run concurrently with writes to other
/// records. `get` and `update` return `ScanError::NotFound` for an unknown id.
pub trait ScanStore: Send + Sync {
    /// Stores a freshly created record. Fails if the id is already taken.
    fn insert(&self, record: ScanRecord) -> Result<(), ScanError>;

    /// Returns a snapshot of the record.
    fn get(&self, scan_id: &ScanId) -> Result<ScanRecord, ScanError>;

    /// Applies `mutation` while holding the record exclusively and returns the
    /// resulting snapshot. If the mutation fails the record keeps whatever
    /// state the mutation left it in; mutations are written to fail before
    /// touching anything.
    fn update(&self, scan_id: &ScanId, mutation: RecordMutation<'_>) -> Result<ScanRecord, ScanError>;
}

/// Process-local store: a read-mostly index of per-record mutexes. The outer
/// lock is only taken for writing on insert.
#[derive(Default)]
pub struct InMemoryScanStore {
    records: RwLock<HashMap<ScanId, Arc<Mutex<ScanRecord>>>>,
}

impl InMemoryScanStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, scan_id: &ScanId) -> Result<Arc<Mutex<ScanRecord>>, ScanError> {
        let records = self
            .records
            .read()
            .map_err(|_| ScanError::Store("scan index lock poisoned".into()))?;
        records
            .get(scan_id)
            .cloned()
            .ok_or_else(|| ScanError::NotFound(scan_id.clone()))
    }
}

impl ScanStore for InMemoryScanStore {
    fn insert(&self, record: ScanRecord) -> Result<(), ScanError> {
        let mut records = self
            .records
            .write()
            .map_err(|_| ScanError::Store("scan index lock poisoned".into()))?;
        if records.contains_key(&record.scan_id) {
            return Err(ScanError::Store(format!("duplicate scan id {}", record.scan_id)));
        }
        records.insert(record.scan_id.clone(), Arc::new(Mutex::new(record)));
        Ok(())
    }

    fn get(&self, scan_id: &ScanId) -> Result<ScanRecord, ScanError> {
        let slot = self.slot(scan_id)?;
        let record = slot
            .lock()
            .map_err(|_| ScanError::Store(format!("record {} lock poisoned", scan_id)))?;
        Ok(record.clone())
    }

    fn update(&self, scan_id: &ScanId, mutation: RecordMutation<'_>) -> Result<ScanRecord, ScanError> {
        let slot = self.slot(scan_id)?;
        let mut record = slot
            .lock()
            .map_err(|_| ScanError::Store(format!("record {} lock poisoned", scan_id)))?;
        mutation(&mut *record)?;
        Ok(record.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::{ScanCategory, ScanRequest, ScanStatus};

    fn record(id: &str) -> ScanRecord {
        ScanRecord::new(ScanId::from(id), &ScanRequest::new("example.com", ScanCategory::Domain))
    }

    #[test]
    fn unknown_ids_are_not_found() {
        let store = InMemoryScanStore::new();
        let missing = ScanId::from("missing");
        assert_eq!(store.get(&missing), Err(ScanError::NotFound(missing.clone())));
        let result = store.update(&missing, &mut |_| Ok(()));
        assert!(matches!(result, Err(ScanError::NotFound(_))));
    }

    #[test]
    fn duplicate_inserts_are_rejected() {
        let store = InMemoryScanStore::new();
        store.insert(record("a")).unwrap();
        assert!(matches!(store.insert(record("a")), Err(ScanError::Store(_))));
    }

    #[test]
    fn update_returns_the_mutated_snapshot() {
        let store = InMemoryScanStore::new();
        store.insert(record("b")).unwrap();
        let updated = store.update(&ScanId::from("b"), &mut |r| r.start(3)).unwrap();
        assert_eq!(updated.status, ScanStatus::Running);
        assert_eq!(store.get(&ScanId::from("b")).unwrap().collectors_dispatched, 3);
    }

    #[test]
    fn concurrent_updates_are_not_lost() {
        let store = Arc::new(InMemoryScanStore::new());
        store.insert(record("c")).unwrap();
        let id = ScanId::from("c");

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                let id = id.clone();
                std::thread::spawn(move || {
                    store
                        .update(&id, &mut |r| {
                            r.modules_executed.push(format!("m{i}"));
                            Ok(())
                        })
                        .unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.get(&id).unwrap().modules_executed.len(), 8);
    }
}
