use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::errors::StoreError;
use crate::storage::area::{PreferenceStore, StorageArea};

/// In‑memory preference store (no persistence). Used for tests and throwaway sessions.
#[derive(Default)]
pub struct InMemoryPreferenceStore {
    areas: Mutex<HashMap<String, Arc<dyn StorageArea>>>,
}

impl InMemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for InMemoryPreferenceStore {
    fn area(&self, namespace: &str) -> Result<Arc<dyn StorageArea>, StoreError> {
        let mut guard = self.areas.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(guard
            .entry(namespace.to_string())
            .or_insert_with(|| Arc::new(InMemoryArea::default()) as Arc<dyn StorageArea>)
            .clone())
    }
}

/// A single in-memory area. Keys are kept sorted.
#[derive(Default)]
pub struct InMemoryArea {
    map: Mutex<BTreeMap<String, String>>,
}

impl InMemoryArea {
    fn map(&self) -> MutexGuard<'_, BTreeMap<String, String>> {
        self.map.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl StorageArea for InMemoryArea {
    fn get_item(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.map().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.map().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StoreError> {
        self.map().remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        self.map().clear();
        Ok(())
    }

    fn len(&self) -> usize {
        self.map().len()
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.map().keys().cloned().collect())
    }

    fn items_with_prefix(&self, prefix: &str) -> Result<Vec<(String, String)>, StoreError> {
        Ok(self
            .map()
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}
