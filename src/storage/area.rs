use std::sync::Arc;

use crate::errors::StoreError;

/// Object-safe key/value storage area.
pub trait StorageArea: Send + Sync {
    /// Retrieves the value associated with the given key, or `None` if not found.
    fn get_item(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Sets the value for the given key, overwriting any existing value.
    fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Removes the item with the given key. Removing a missing key is not an error.
    fn remove_item(&self, key: &str) -> Result<(), StoreError>;

    /// Clears all items in the storage area.
    fn clear(&self) -> Result<(), StoreError>;

    /// Returns the number of items in the storage area.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns all keys, sorted.
    fn keys(&self) -> Result<Vec<String>, StoreError>;

    /// Returns every `(key, value)` whose key starts with `prefix`.
    fn items_with_prefix(&self, prefix: &str) -> Result<Vec<(String, String)>, StoreError> {
        let mut items = Vec::new();
        for key in self.keys()?.into_iter().filter(|k| k.starts_with(prefix)) {
            if let Some(value) = self.get_item(&key)? {
                items.push((key, value));
            }
        }
        Ok(items)
    }
}

/// Hands out storage areas by namespace.
pub trait PreferenceStore: Send + Sync {
    /// Retrieves the area for `namespace`. The same namespace always maps to the same data.
    fn area(&self, namespace: &str) -> Result<Arc<dyn StorageArea>, StoreError>;
}
