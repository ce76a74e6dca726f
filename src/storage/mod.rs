//! Storage Module
//!
//! This module provides the in-memory record store behind the `/data`
//! endpoints. The store lives for the lifetime of the process and is never
//! persisted.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        DataStore                            │
//! │                                                             │
//! │   RwLock ┌──────────────────────────┬──────────────┐        │
//! │          │ BTreeMap<u64, Value>     │ next_id: u64 │        │
//! │          └──────────────────────────┴──────────────┘        │
//! │                                                             │
//! │   create / get / list / delete   +   atomic statistics      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use jsonstore::storage::DataStore;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! let store = Arc::new(DataStore::new());
//!
//! let id = store.create(json!({"a": 1}));
//! assert_eq!(store.list(), vec![json!({"a": 1, "id": id})]);
//! ```

pub mod store;

// Re-export commonly used types
pub use store::{DataStore, StoreStats, ID_FIELD};
