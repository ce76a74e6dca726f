//! In-Memory JSON Record Store
//!
//! This module implements the resource store behind `/data`. Records are JSON
//! objects keyed by an integer ID that the store assigns itself.
//!
//! ## ID Allocation
//!
//! ```text
//! create({"a":1})  ──>  id 1   records: {1}
//! create({"b":2})  ──>  id 2   records: {1, 2}
//! delete(1)                    records: {2}
//! create({"c":3})  ──>  id 3   records: {2, 3}     (1 is never reused)
//! ```
//!
//! The counter read, the insert and the counter increment happen under one
//! write lock, and no `.await` can occur while the lock is held, so two
//! concurrent creations can never observe the same counter value.
//!
//! ## Ordering
//!
//! Records live in a `BTreeMap`, so listing yields ascending IDs, which is
//! also insertion order because IDs only grow.

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// The field stamped into every stored record.
pub const ID_FIELD: &str = "id";

/// The field that wraps a non-object payload.
pub const VALUE_FIELD: &str = "value";

#[derive(Debug)]
struct Records {
    /// Stored records by ID
    by_id: BTreeMap<u64, Value>,
    /// The ID the next creation receives
    next_id: u64,
}

/// The process-lifetime record store.
///
/// Wrap it in an `Arc` and share it across connection tasks.
///
/// # Example
///
/// ```
/// use jsonstore::storage::DataStore;
/// use serde_json::json;
///
/// let store = DataStore::new();
///
/// let id = store.create(json!({"name": "Ariz"}));
/// assert_eq!(id, 1);
/// assert_eq!(store.get(id), Some(json!({"name": "Ariz", "id": 1})));
///
/// assert!(store.delete(id).is_some());
/// assert_eq!(store.create(json!({})), 2);
/// ```
#[derive(Debug)]
pub struct DataStore {
    records: RwLock<Records>,

    /// Statistics: successful creations
    created_count: AtomicU64,

    /// Statistics: lookups by ID
    lookup_count: AtomicU64,

    /// Statistics: successful deletions
    deleted_count: AtomicU64,
}

impl Default for DataStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DataStore {
    /// Creates an empty store whose first ID is 1.
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Records {
                by_id: BTreeMap::new(),
                next_id: 1,
            }),
            created_count: AtomicU64::new(0),
            lookup_count: AtomicU64::new(0),
            deleted_count: AtomicU64::new(0),
        }
    }

    // Poisoning is ignored: each mutation is a single insert or remove
    fn read(&self) -> RwLockReadGuard<'_, Records> {
        self.records.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Records> {
        self.records.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stores a record and returns its new ID.
    ///
    /// The ID is written into the record as `"id"`. An object keeps its other
    /// fields (an existing `"id"` is overwritten); any other JSON value is
    /// wrapped as `{"value": <payload>, "id": <id>}`.
    pub fn create(&self, record: Value) -> u64 {
        let mut records = self.write();

        let id = records.next_id;
        records.by_id.insert(id, stamp_id(record, id));
        records.next_id = id + 1;

        self.created_count.fetch_add(1, Ordering::Relaxed);
        id
    }

    /// Returns a copy of the record with the given ID.
    pub fn get(&self, id: u64) -> Option<Value> {
        self.lookup_count.fetch_add(1, Ordering::Relaxed);
        self.read().by_id.get(&id).cloned()
    }

    /// Returns every record in ascending ID order.
    pub fn list(&self) -> Vec<Value> {
        self.read().by_id.values().cloned().collect()
    }

    /// Removes a record, returning it if it existed.
    pub fn delete(&self, id: u64) -> Option<Value> {
        let removed = self.write().by_id.remove(&id);
        if removed.is_some() {
            self.deleted_count.fetch_add(1, Ordering::Relaxed);
        }
        removed
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.read().by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The ID the next successful creation will receive.
    pub fn next_id(&self) -> u64 {
        self.read().next_id
    }

    /// Returns store statistics.
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            records: self.len() as u64,
            created: self.created_count.load(Ordering::Relaxed),
            lookups: self.lookup_count.load(Ordering::Relaxed),
            deleted: self.deleted_count.load(Ordering::Relaxed),
        }
    }
}

/// Writes `"id": id` into a record.
fn stamp_id(record: Value, id: u64) -> Value {
    let mut object = match record {
        Value::Object(object) => object,
        other => {
            let mut object = Map::new();
            object.insert(VALUE_FIELD.to_string(), other);
            object
        }
    };
    object.insert(ID_FIELD.to_string(), Value::from(id));
    Value::Object(object)
}

/// Store statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreStats {
    /// Records currently stored
    pub records: u64,
    /// Total successful creations
    pub created: u64,
    /// Total lookups by ID
    pub lookups: u64,
    /// Total successful deletions
    pub deleted: u64,
}
