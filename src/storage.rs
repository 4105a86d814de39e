//! Key/value storage areas.
//!
//! A [`StorageArea`] is a flat string map, the lowest common denominator of
//! the places a client can keep small durable state: a platform preference
//! store, browser local storage, a SQLite table. Two things live on top of it:
//!
//! - the key-per-cookie jar, [`KeyValueCookieStore`](crate::cookies::KeyValueCookieStore)
//! - typed application preferences, [`Settings`]
//!
//! A [`PreferenceStore`] hands out areas by namespace so cookies and settings
//! can be kept apart in one database.
//!
//! # Choosing a backend
//!
//! - For persistent areas, use [`SqlitePreferenceStore`] (feature `sqlite_store`).
//! - For tests or throwaway sessions, use [`InMemoryPreferenceStore`].
//!
//! # Example
//!
//! ```no_run
//! use forum_store::storage::{PreferenceStore, Settings, SqlitePreferenceStore};
//!
//! let prefs = SqlitePreferenceStore::new("forum.db").unwrap();
//! let settings = Settings::new(prefs.area("settings").unwrap());
//! settings.set_bool("dark_mode", true).unwrap();
//! ```

/// Storage area module, defining the key/value storage interface.
pub mod area;
/// In-memory areas.
pub mod in_memory;
/// Typed preferences on top of an area.
pub mod settings;
/// SQLite-backed areas.
#[cfg(feature = "sqlite_store")]
pub mod sqlite_store;

pub use area::{PreferenceStore, StorageArea};
pub use in_memory::{InMemoryArea, InMemoryPreferenceStore};
pub use settings::Settings;
#[cfg(feature = "sqlite_store")]
pub use sqlite_store::SqlitePreferenceStore;
