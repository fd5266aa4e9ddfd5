//! Persistent key-value storage.
//!
//! This module provides:
//! - `KeyValueStore`: the string-keyed get/set/remove contract the session
//!   store is written against
//! - `FileStore`: one JSON file per key inside a data directory
//! - `MemoryStore`: a `HashMap`-backed store for tests and ephemeral use
//!
//! Reads of JSON records go through [`read_json`], which reports an explicit
//! [`StoredValue`] outcome instead of folding failures into `None`.

pub mod file;
pub mod memory;

use std::future::Future;

use serde::de::DeserializeOwned;

use crate::error::StorageError;

pub use file::FileStore;
pub use memory::MemoryStore;

/// String-keyed storage of string values.
///
/// Removing an absent key is not an error.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>, StorageError>> + Send;

    fn set(&self, key: &str, value: &str) -> impl Future<Output = Result<(), StorageError>> + Send;

    fn remove(&self, key: &str) -> impl Future<Output = Result<(), StorageError>> + Send;

    /// Write several pairs, stopping at the first failure.
    fn multi_set(
        &self,
        pairs: &[(&str, String)],
    ) -> impl Future<Output = Result<(), StorageError>> + Send;

    /// Remove every key, reporting the first failure after all were attempted.
    fn multi_remove(&self, keys: &[&str]) -> impl Future<Output = Result<(), StorageError>> + Send;
}

/// Outcome of reading a JSON record from the store
#[derive(Debug)]
pub enum StoredValue<T> {
    Found(T),
    Absent,
    /// Key held data that did not decode
    Malformed(serde_json::Error),
    /// The store itself failed the read
    Unavailable(StorageError),
}

impl<T> StoredValue<T> {
    /// Collapse to the decoded value, treating every failure as absent
    pub fn found(self) -> Option<T> {
        match self {
            StoredValue::Found(value) => Some(value),
            _ => None,
        }
    }
}

pub async fn read_json<S, T>(store: &S, key: &str) -> StoredValue<T>
where
    S: KeyValueStore,
    T: DeserializeOwned,
{
    match store.get(key).await {
        Ok(Some(raw)) => match serde_json::from_str(&raw) {
            Ok(value) => StoredValue::Found(value),
            Err(e) => StoredValue::Malformed(e),
        },
        Ok(None) => StoredValue::Absent,
        Err(e) => StoredValue::Unavailable(e),
    }
}
