//! Store configuration and backend selection.
//!
//! The host application builds one [`StoreConfig`] at start-up (defaults, or
//! loaded from a JSON file), opens the stores once with [`open_cookie_store`] and
//! [`open_settings`], and hands the handles to whoever needs them.
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::clock::ClockHandle;
use crate::cookies::{CookieStoreHandle, JsonCookieStore, KeyValueCookieStore};
use crate::errors::StoreError;
use crate::storage::{InMemoryArea, InMemoryPreferenceStore, PreferenceStore, Settings};

pub const DEFAULT_USER_AGENT: &str = "ForumClient/1.0 (X11; Linux x86_64)";

/// Namespace used for cookie entries in a shared preference database.
pub const COOKIE_NAMESPACE: &str = "cookies";
/// Namespace used for settings entries in a shared preference database.
pub const SETTINGS_NAMESPACE: &str = "settings";

/// Where cookies are kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackendConfig {
    /// Nothing survives the process.
    InMemory,
    /// One JSON file holding every cookie.
    JsonFile {
        path: PathBuf,
        #[serde(default)]
        pretty: bool,
    },
    /// Key-per-cookie entries in a SQLite preference database.
    Sqlite { path: PathBuf },
}

/// Configuration for the persistence layer of the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Cookie jar backend
    pub cookies: BackendConfig,
    /// SQLite database for settings. `None` keeps settings in memory.
    pub settings_path: Option<PathBuf>,
    /// User agent string for HTTP requests
    pub user_agent: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            cookies: BackendConfig::JsonFile {
                path: PathBuf::from("cookies.json"),
                pretty: false,
            },
            settings_path: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl StoreConfig {
    /// Reads a configuration file. Missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let contents = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }
}

/// Builds the cookie store selected by `backend`.
///
/// Nothing is opened yet; each store opens its medium on first use.
pub fn open_cookie_store(backend: &BackendConfig, clock: ClockHandle) -> Result<CookieStoreHandle, StoreError> {
    let store: CookieStoreHandle = match backend {
        BackendConfig::InMemory => KeyValueCookieStore::new(Arc::new(InMemoryArea::default()), clock),
        BackendConfig::JsonFile { path, pretty } => JsonCookieStore::with_options(path.clone(), *pretty, clock),
        BackendConfig::Sqlite { path } => sqlite_cookie_store(path.clone(), clock)?,
    };

    log::debug!("Cookie store configured: {:?}", backend);
    Ok(store)
}

#[cfg(feature = "sqlite_store")]
fn sqlite_cookie_store(path: PathBuf, clock: ClockHandle) -> Result<CookieStoreHandle, StoreError> {
    use crate::storage::SqlitePreferenceStore;

    let label = path.display().to_string();
    Ok(KeyValueCookieStore::lazy(label, clock, move || {
        SqlitePreferenceStore::new(&path)?.area(COOKIE_NAMESPACE)
    }))
}

#[cfg(not(feature = "sqlite_store"))]
fn sqlite_cookie_store(path: PathBuf, _clock: ClockHandle) -> Result<CookieStoreHandle, StoreError> {
    Err(StoreError::Unavailable(format!(
        "{} needs the sqlite_store feature",
        path.display()
    )))
}

/// Opens the settings area described by `config`.
pub fn open_settings(config: &StoreConfig) -> Result<Settings, StoreError> {
    let area = match &config.settings_path {
        None => InMemoryPreferenceStore::new().area(SETTINGS_NAMESPACE)?,
        Some(path) => settings_area(path)?,
    };
    Ok(Settings::new(area))
}

#[cfg(feature = "sqlite_store")]
fn settings_area(path: &Path) -> Result<Arc<dyn crate::storage::StorageArea>, StoreError> {
    crate::storage::SqlitePreferenceStore::new(path)?.area(SETTINGS_NAMESPACE)
}

#[cfg(not(feature = "sqlite_store"))]
fn settings_area(path: &Path) -> Result<Arc<dyn crate::storage::StorageArea>, StoreError> {
    Err(StoreError::Unavailable(format!(
        "{} needs the sqlite_store feature",
        path.display()
    )))
}
