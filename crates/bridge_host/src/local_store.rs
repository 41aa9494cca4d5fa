//! Namespaced JSON mappings over a [`KeyValueStore`].
//!
//! Each storage key holds one JSON object. Every read parses the stored text and every write
//! serializes the whole object again; a missing or corrupt entry reads as an empty mapping.

use std::rc::Rc;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};

use crate::{error::BridgeError, store::KeyValueStore};

/// Full key-value mapping of one namespace.
pub type Snapshot = Map<String, Value>;

/// Local persistence used in standalone mode.
#[derive(Clone)]
pub struct LocalStore {
    store: Rc<dyn KeyValueStore>,
}

impl LocalStore {
    /// Wraps a raw key-value store.
    pub fn new(store: Rc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Returns the underlying raw store.
    pub fn raw(&self) -> &Rc<dyn KeyValueStore> {
        &self.store
    }

    /// Reads the mapping stored under `storage_key`. Never fails.
    pub fn read_mapping(&self, storage_key: &str) -> Snapshot {
        let raw = match self.store.get_item(storage_key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Snapshot::new(),
            Err(err) => {
                tracing::warn!(storage_key, "storage read failed: {err}");
                return Snapshot::new();
            }
        };
        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(mapping)) => mapping,
            Ok(other) => {
                tracing::warn!(storage_key, "stored entry is not an object: {other}");
                Snapshot::new()
            }
            Err(err) => {
                tracing::warn!(storage_key, "stored entry is corrupt: {err}");
                Snapshot::new()
            }
        }
    }

    /// Replaces the mapping stored under `storage_key`.
    ///
    /// # Errors
    ///
    /// Returns an error when encoding or the store write fails.
    pub fn write_mapping(
        &self,
        storage_key: &str,
        mapping: &Snapshot,
    ) -> Result<(), BridgeError> {
        let raw = serde_json::to_string(mapping)?;
        self.store
            .set_item(storage_key, &raw)
            .map_err(BridgeError::Storage)
    }

    /// Reads and deserializes a typed record from a fixed slot.
    ///
    /// Returns `None` when the slot is absent, unreadable or does not match `T`.
    pub fn load_typed<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.store.get_item(key).ok().flatten()?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::warn!(key, "stored record is corrupt: {err}");
                None
            }
        }
    }

    /// Serializes and writes a typed record to a fixed slot.
    ///
    /// # Errors
    ///
    /// Returns an error when encoding or the store write fails.
    pub fn save_typed<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
    ) -> Result<(), BridgeError> {
        let raw = serde_json::to_string(value)?;
        self.store.set_item(key, &raw).map_err(BridgeError::Storage)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::store::MemoryKeyValueStore;

    fn local() -> (MemoryKeyValueStore, LocalStore) {
        let raw = MemoryKeyValueStore::default();
        (raw.clone(), LocalStore::new(Rc::new(raw)))
    }

    #[test]
    fn missing_entry_reads_as_empty() {
        let (_, store) = local();
        assert!(store.read_mapping("nothing").is_empty());
    }

    #[test]
    fn corrupt_or_non_object_entries_read_as_empty() {
        let (raw, store) = local();
        raw.set_item("broken", "{not json").expect("set");
        raw.set_item("array", "[1,2,3]").expect("set");

        assert!(store.read_mapping("broken").is_empty());
        assert!(store.read_mapping("array").is_empty());
    }

    #[test]
    fn mappings_round_trip_through_text() {
        let (raw, store) = local();
        let mapping = json!({"level": 3, "nested": {"a": [1, 2]}})
            .as_object()
            .cloned()
            .expect("object");

        store.write_mapping("game", &mapping).expect("write");
        assert!(raw.get_item("game").expect("get").is_some());
        assert_eq!(store.read_mapping("game"), mapping);
    }

    #[test]
    fn typed_records_round_trip_and_tolerate_corruption() {
        let (raw, store) = local();
        store.save_typed("lang", "de").expect("save");
        assert_eq!(store.load_typed::<String>("lang"), Some("de".to_string()));

        raw.set_item("lang", "{oops").expect("set");
        assert_eq!(store.load_typed::<String>("lang"), None);
    }
}
