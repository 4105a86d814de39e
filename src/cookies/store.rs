//! Cookie store infrastructure.
//!
//! A **cookie store** is the durable cookie jar the HTTP pipeline talks to. It
//! is split in two layers:
//! - [`CookieStore`]: the async capability interface the pipeline consumes
//!   (`add_cookie`, `get_cookies`, `close`, ...). Handles are passed around as
//!   [`CookieStoreHandle`].
//! - [`CookieMedium`]: a synchronous backing medium (a JSON file, a key/value
//!   area, ...) that knows how to load and persist records.
//!
//! [`PersistentCookieStore`] glues the two together and owns the invariants:
//! identity replacement, expiry eviction on read, and a single lock per store
//! instance that serializes every operation.
//!
//! This module exports two reference implementations:
//! - [`JsonCookieStore`]: file-backed JSON array (the reference backend).
//! - [`KeyValueCookieStore`]: key-per-cookie over any [`StorageArea`](crate::storage::StorageArea).
//!
//! ## Concurrency
//! The lock is a `tokio::sync::Mutex` (FIFO). Once acquired, the owned guard is
//! moved into a `spawn_blocking` task together with the medium work, so a caller
//! cancelled mid-operation cannot leave the lock released before the durable
//! write finished.
//!
//! ## Failure policy
//! Storage errors never reach the request pipeline. Helpers return
//! `Result<_, StoreError>`; the trait methods log and carry on. The only error
//! `add_cookie` returns is a validation failure.
//!
//! ## Example
//! ```rust,no_run
//! # async fn demo() {
//! use std::sync::Arc;
//! use forum_store::clock::SystemClock;
//! use forum_store::cookies::{Cookie, CookieStore, JsonCookieStore};
//!
//! let store = JsonCookieStore::new("cookies.json".into(), Arc::new(SystemClock));
//! store.add_cookie(Cookie::new("sid", "abc").with_domain("forum.test")).await.unwrap();
//!
//! let url = "https://forum.test/home".parse().unwrap();
//! let cookies = store.get_cookies(&url).await;
//! # }
//! ```
mod json;
mod key_value;

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use url::Url;

use crate::clock::ClockHandle;
use crate::cookies::Cookie;
use crate::errors::StoreError;

pub use json::{decode_cookies, encode_cookies, JsonCookieStore, JsonFileMedium};
pub use key_value::{KeyValueCookieStore, KeyValueMedium};

/// A durable cookie jar.
///
/// Implementations must be `Send + Sync` and internally synchronized; all
/// methods take `&self` and may be called concurrently from many requests.
#[async_trait]
pub trait CookieStore: Send + Sync {
    /// Stores `cookie`, replacing any record with the same `(name, domain, path)`.
    /// An empty domain or path is stored as absent.
    ///
    /// The write is persisted before this returns. Fails only when the cookie
    /// itself is invalid (see [`Cookie::validate`]).
    async fn add_cookie(&self, cookie: Cookie) -> Result<(), StoreError>;

    /// Returns the non-expired cookies matching `url`, in no particular order.
    ///
    /// Expired records found on the way are evicted from the medium.
    async fn get_cookies(&self, url: &Url) -> Vec<Cookie>;

    /// Returns every non-expired cookie, evicting expired ones.
    async fn all_cookies(&self) -> Vec<Cookie>;

    /// Removes the cookie with the given identity. Returns `true` if one was removed.
    async fn remove_cookie(&self, name: &str, domain: Option<&str>, path: Option<&str>) -> bool;

    /// Removes all cookies.
    async fn clear(&self);

    /// Flushes pending writes and releases the medium. A later call reopens it.
    async fn close(&self);
}

/// Shared, type-erased handle to a cookie store.
pub type CookieStoreHandle = Arc<dyn CookieStore>;

/// A backing medium for [`PersistentCookieStore`].
///
/// All methods run on the blocking pool while the store lock is held, so
/// implementations may do plain blocking I/O and need no locking of their own.
/// `snapshot` is always the complete collection *after* the change.
pub trait CookieMedium: Send + 'static {
    /// Loads the full collection. Malformed records are dropped individually.
    fn load(&mut self) -> Result<Vec<Cookie>, StoreError>;

    /// Persists the insertion (or replacement) of `cookie`.
    fn put(&mut self, snapshot: &[Cookie], cookie: &Cookie) -> Result<(), StoreError>;

    /// Persists the removal of `removed`.
    fn remove(&mut self, snapshot: &[Cookie], removed: &[Cookie]) -> Result<(), StoreError>;

    /// Flushes buffered writes. Media that persist on every call have nothing to do.
    fn flush(&mut self) -> Result<(), StoreError> {
        Ok(())
    }
}

type Opener<M> = dyn Fn() -> Result<M, StoreError> + Send + Sync;

/// A [`CookieStore`] over any [`CookieMedium`].
///
/// The medium is opened lazily on first use, under the store lock, so the
/// first caller opens it and every later caller reuses the same handle.
pub struct PersistentCookieStore<M: CookieMedium> {
    /// Label used in log lines.
    label: String,
    /// The opened medium (`None` until first use or after `close`).
    medium: Arc<Mutex<Option<M>>>,
    /// Opens the medium.
    opener: Arc<Opener<M>>,
    /// Time source for expiry checks.
    clock: ClockHandle,
}

impl<M: CookieMedium> PersistentCookieStore<M> {
    /// Creates a store whose medium is produced by `opener` on first access.
    pub fn with_opener<F>(label: impl Into<String>, clock: ClockHandle, opener: F) -> Self
    where
        F: Fn() -> Result<M, StoreError> + Send + Sync + 'static,
    {
        Self {
            label: label.into(),
            medium: Arc::new(Mutex::new(None)),
            opener: Arc::new(opener),
            clock,
        }
    }

    /// Runs `op` against the medium with the store lock held.
    ///
    /// The guard travels into the blocking task and is dropped only when `op`
    /// is done, whether or not the awaiting caller is still around.
    async fn run<T, F>(&self, op: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut M, i64) -> Result<T, StoreError> + Send + 'static,
    {
        let mut guard = self.medium.clone().lock_owned().await;
        let opener = self.opener.clone();
        let clock = self.clock.clone();
        let label = self.label.clone();

        tokio::task::spawn_blocking(move || {
            if guard.is_none() {
                log::debug!("Opening cookie medium for {}", label);
                *guard = Some(opener()?);
            }

            match guard.as_mut() {
                Some(medium) => op(medium, clock.now_millis()),
                None => Err(StoreError::Unavailable(label)),
            }
        })
        .await?
    }

    fn log_failure(&self, op: &str, err: &StoreError) {
        log::warn!("Cookie store {}: {} failed: {}", self.label, op, err);
    }
}

/// Loads the collection and evicts everything expired at `now`.
///
/// A failed eviction write is logged; the valid records are still returned.
fn load_valid<M: CookieMedium>(medium: &mut M, now: i64) -> Result<Vec<Cookie>, StoreError> {
    let (expired, valid): (Vec<Cookie>, Vec<Cookie>) =
        medium.load()?.into_iter().partition(|c| c.is_expired(now));

    if !expired.is_empty() {
        log::debug!("Evicting {} expired cookie(s)", expired.len());
        if let Err(e) = medium.remove(&valid, &expired) {
            log::warn!("Could not persist cookie eviction: {}", e);
        }
    }

    Ok(valid)
}

#[async_trait]
impl<M: CookieMedium> CookieStore for PersistentCookieStore<M> {
    async fn add_cookie(&self, cookie: Cookie) -> Result<(), StoreError> {
        let cookie = cookie.normalized();
        cookie.validate()?;

        let result = self
            .run(move |medium, _now| {
                let mut all = medium.load()?;
                all.retain(|c| !c.same_identity(&cookie));
                all.push(cookie.clone());
                medium.put(&all, &cookie)
            })
            .await;

        if let Err(e) = result {
            self.log_failure("add_cookie", &e);
        }
        Ok(())
    }

    async fn get_cookies(&self, url: &Url) -> Vec<Cookie> {
        match self.run(load_valid).await {
            Ok(valid) => valid.into_iter().filter(|c| c.matches_url(url)).collect(),
            Err(e) => {
                self.log_failure("get_cookies", &e);
                Vec::new()
            }
        }
    }

    async fn all_cookies(&self) -> Vec<Cookie> {
        self.run(load_valid).await.unwrap_or_else(|e| {
            self.log_failure("all_cookies", &e);
            Vec::new()
        })
    }

    async fn remove_cookie(&self, name: &str, domain: Option<&str>, path: Option<&str>) -> bool {
        let target = Cookie {
            domain: domain.map(str::to_string),
            path: path.map(str::to_string),
            ..Cookie::new(name, "")
        }
        .normalized();

        let result = self
            .run(move |medium, _now| {
                let mut all = medium.load()?;
                let Some(pos) = all.iter().position(|c| c.same_identity(&target)) else {
                    return Ok(false);
                };
                let removed = all.remove(pos);
                medium.remove(&all, std::slice::from_ref(&removed))?;
                Ok(true)
            })
            .await;

        result.unwrap_or_else(|e| {
            self.log_failure("remove_cookie", &e);
            false
        })
    }

    async fn clear(&self) {
        let result = self
            .run(|medium, _now| {
                let all = medium.load()?;
                if all.is_empty() {
                    return Ok(());
                }
                medium.remove(&[], &all)
            })
            .await;

        if let Err(e) = result {
            self.log_failure("clear", &e);
        }
    }

    async fn close(&self) {
        let mut guard = self.medium.clone().lock_owned().await;
        let result = tokio::task::spawn_blocking(move || match guard.take() {
            Some(mut medium) => medium.flush(),
            None => Ok(()),
        })
        .await
        .map_err(StoreError::from)
        .and_then(|r| r);

        if let Err(e) = result {
            self.log_failure("close", &e);
        }
    }
}
