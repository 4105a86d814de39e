//! Typed application preferences.
//!
//! [`Settings`] stores simple values (strings, flags, numbers, small JSON
//! documents) in a [`StorageArea`] under a key prefix. Values are kept as their
//! string form; a typed getter returns `None` when the key is missing or the
//! stored text does not parse as the requested type.
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::errors::StoreError;
use crate::storage::StorageArea;

pub const DEFAULT_SETTINGS_PREFIX: &str = "pref:";

#[derive(Clone)]
pub struct Settings {
    area: Arc<dyn StorageArea>,
    prefix: String,
}

impl Settings {
    pub fn new(area: Arc<dyn StorageArea>) -> Self {
        Self::with_prefix(area, DEFAULT_SETTINGS_PREFIX)
    }

    pub fn with_prefix(area: Arc<dyn StorageArea>, prefix: impl Into<String>) -> Self {
        Self {
            area,
            prefix: prefix.into(),
        }
    }

    fn key(&self, name: &str) -> String {
        format!("{}{}", self.prefix, name)
    }

    pub fn get_string(&self, name: &str) -> Result<Option<String>, StoreError> {
        self.area.get_item(&self.key(name))
    }

    pub fn set_string(&self, name: &str, value: &str) -> Result<(), StoreError> {
        self.area.set_item(&self.key(name), value)
    }

    pub fn get_bool(&self, name: &str) -> Result<Option<bool>, StoreError> {
        Ok(self.get_string(name)?.and_then(|v| v.parse().ok()))
    }

    pub fn set_bool(&self, name: &str, value: bool) -> Result<(), StoreError> {
        self.set_string(name, if value { "true" } else { "false" })
    }

    pub fn get_i64(&self, name: &str) -> Result<Option<i64>, StoreError> {
        Ok(self.get_string(name)?.and_then(|v| v.parse().ok()))
    }

    pub fn set_i64(&self, name: &str, value: i64) -> Result<(), StoreError> {
        self.set_string(name, &value.to_string())
    }

    pub fn get_json<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, StoreError> {
        let Some(raw) = self.get_string(name)? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                log::warn!("Ignoring unreadable setting {:?}: {}", name, e);
                Ok(None)
            }
        }
    }

    pub fn set_json<T: Serialize>(&self, name: &str, value: &T) -> Result<(), StoreError> {
        self.set_string(name, &serde_json::to_string(value)?)
    }

    pub fn remove(&self, name: &str) -> Result<(), StoreError> {
        self.area.remove_item(&self.key(name))
    }

    /// Setting names (without prefix), sorted.
    pub fn keys(&self) -> Result<Vec<String>, StoreError> {
        Ok(self
            .area
            .items_with_prefix(&self.prefix)?
            .into_iter()
            .map(|(k, _)| k[self.prefix.len()..].to_string())
            .collect())
    }

    /// Removes every setting, leaving other entries in the area untouched.
    pub fn clear(&self) -> Result<(), StoreError> {
        for (key, _) in self.area.items_with_prefix(&self.prefix)? {
            self.area.remove_item(&key)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryArea;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Account {
        username: String,
        user_id: u64,
    }

    #[test]
    fn typed_values() {
        let settings = Settings::new(Arc::new(InMemoryArea::default()));

        assert_eq!(settings.get_bool("dark_mode").unwrap(), None);
        settings.set_bool("dark_mode", true).unwrap();
        assert_eq!(settings.get_bool("dark_mode").unwrap(), Some(true));

        settings.set_i64("page_size", 25).unwrap();
        assert_eq!(settings.get_i64("page_size").unwrap(), Some(25));

        settings.set_string("base_url", "https://forum.test").unwrap();
        assert_eq!(settings.get_i64("base_url").unwrap(), None);

        let account = Account {
            username: "alice".into(),
            user_id: 7,
        };
        settings.set_json("account", &account).unwrap();
        assert_eq!(settings.get_json::<Account>("account").unwrap(), Some(account));
        assert_eq!(settings.get_json::<Account>("base_url").unwrap(), None);
    }

    #[test]
    fn clear_only_touches_settings() {
        let area = Arc::new(InMemoryArea::default());
        area.set_item("cookie:sid||", "abc||0|0||RAW|").unwrap();

        let settings = Settings::new(area.clone());
        settings.set_bool("a", true).unwrap();
        settings.set_bool("b", false).unwrap();
        assert_eq!(settings.keys().unwrap(), vec!["a".to_string(), "b".to_string()]);

        settings.remove("a").unwrap();
        assert_eq!(settings.keys().unwrap(), vec!["b".to_string()]);

        settings.clear().unwrap();
        assert!(settings.keys().unwrap().is_empty());
        assert_eq!(area.len(), 1);
    }
}
