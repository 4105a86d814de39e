//! JSON-backed cookie store.
//!
//! [`JsonFileMedium`] keeps **all** cookies in one file holding a JSON array of
//! [`Cookie`] records. [`JsonCookieStore`] is a [`PersistentCookieStore`] over it.
//!
//! ### Design
//! - A missing file is an empty collection; it is created on the first write.
//! - Writes go to a temporary file in the same directory, are synced, and then
//!   renamed over the target, so a crash leaves either the old or the new file.
//! - The decoded collection is cached and only replaced after a successful
//!   write, so the cache never runs ahead of the disk.
//! - A malformed record is dropped on its own; the rest of the file survives.
//!   A file that is not a JSON array at all is treated as empty.
//!
//! ### Example
//! ```rust,no_run
//! # fn demo() -> Result<(), reqwest::Error> {
//! use std::sync::Arc;
//! use forum_store::clock::SystemClock;
//! use forum_store::config::DEFAULT_USER_AGENT;
//! use forum_store::cookies::JsonCookieStore;
//! use forum_store::net::CookieClient;
//!
//! let store = JsonCookieStore::new("cookies.json".into(), Arc::new(SystemClock));
//! let client = CookieClient::new(store, Arc::new(SystemClock), DEFAULT_USER_AGENT)?;
//! # Ok(())
//! # }
//! ```
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::NamedTempFile;

use crate::clock::ClockHandle;
use crate::cookies::store::{CookieMedium, PersistentCookieStore};
use crate::cookies::Cookie;
use crate::errors::StoreError;

/// File-backed JSON cookie store.
pub type JsonCookieStore = PersistentCookieStore<JsonFileMedium>;

impl JsonCookieStore {
    /// Creates a store persisting to `path`. Nothing is read until first use.
    pub fn new(path: PathBuf, clock: ClockHandle) -> Arc<Self> {
        Self::with_options(path, false, clock)
    }

    /// Like [`new`](Self::new), optionally pretty-printing the file.
    pub fn with_options(path: PathBuf, pretty: bool, clock: ClockHandle) -> Arc<Self> {
        let label = path.display().to_string();
        Arc::new(Self::with_opener(label, clock, move || {
            Ok(JsonFileMedium::new(path.clone(), pretty))
        }))
    }
}

/// A single JSON file holding the whole cookie collection.
#[derive(Debug)]
pub struct JsonFileMedium {
    /// Path to the JSON file where cookies are stored.
    path: PathBuf,
    /// Pretty-print on write.
    pretty: bool,
    /// Last collection known to be on disk.
    cache: Option<Vec<Cookie>>,
}

impl JsonFileMedium {
    pub fn new(path: PathBuf, pretty: bool) -> Self {
        Self {
            path,
            pretty,
            cache: None,
        }
    }

    fn read_file(&self) -> Result<Vec<Cookie>, StoreError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        match decode_cookies(&contents) {
            Ok(cookies) => Ok(cookies),
            Err(e) => {
                log::error!("Cookie file {} is unreadable, starting empty: {}", self.path.display(), e);
                Ok(Vec::new())
            }
        }
    }

    /// Replaces the file atomically with `cookies`.
    fn write_file(&mut self, cookies: &[Cookie]) -> Result<(), StoreError> {
        let contents = if self.pretty {
            serde_json::to_string_pretty(cookies)?
        } else {
            encode_cookies(cookies)?
        };

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;

        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(contents.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;

        self.cache = Some(cookies.to_vec());
        Ok(())
    }
}

impl CookieMedium for JsonFileMedium {
    fn load(&mut self) -> Result<Vec<Cookie>, StoreError> {
        if let Some(cached) = &self.cache {
            return Ok(cached.clone());
        }

        let cookies = self.read_file()?;
        self.cache = Some(cookies.clone());
        Ok(cookies)
    }

    fn put(&mut self, snapshot: &[Cookie], _cookie: &Cookie) -> Result<(), StoreError> {
        self.write_file(snapshot)
    }

    fn remove(&mut self, snapshot: &[Cookie], _removed: &[Cookie]) -> Result<(), StoreError> {
        self.write_file(snapshot)
    }

    fn flush(&mut self) -> Result<(), StoreError> {
        self.cache = None;
        Ok(())
    }
}

/// Encodes a collection the way [`JsonFileMedium`] writes it.
pub fn encode_cookies(cookies: &[Cookie]) -> Result<String, StoreError> {
    Ok(serde_json::to_string(cookies)?)
}

/// Decodes a JSON array of cookies.
///
/// Elements that do not decode, or carry an invalid name, are skipped with a
/// warning. When two elements share an identity the later one wins. Fails only
/// if the input is not a JSON array.
pub fn decode_cookies(input: &str) -> Result<Vec<Cookie>, StoreError> {
    let records: Vec<serde_json::Value> = serde_json::from_str(input)?;

    let mut cookies: Vec<Cookie> = Vec::with_capacity(records.len());
    for (idx, record) in records.into_iter().enumerate() {
        let cookie = match serde_json::from_value::<Cookie>(record) {
            Ok(cookie) => cookie.normalized(),
            Err(e) => {
                log::warn!("Dropping malformed cookie record #{}: {}", idx, e);
                continue;
            }
        };
        if let Err(e) = cookie.validate() {
            log::warn!("Dropping cookie record #{}: {}", idx, e);
            continue;
        }

        cookies.retain(|c| !c.same_identity(&cookie));
        cookies.push(cookie);
    }

    Ok(cookies)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::cookies::{CookieEncoding, CookieStore};
    use url::Url;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    fn full_cookie() -> Cookie {
        let mut c = Cookie::new("sid", "a|b,c=d%")
            .with_domain("forum.test")
            .with_path("/")
            .with_expires_at(5_000);
        c.max_age_seconds = Some(5);
        c.secure = true;
        c.http_only = true;
        c.encoding = CookieEncoding::UriEncoding;
        c.extensions.insert("SameSite".into(), Some("Strict".into()));
        c.extensions.insert("Partitioned".into(), None);
        c
    }

    #[test]
    fn encode_decode_round_trip() {
        let collection = vec![full_cookie(), Cookie::new("plain", "")];
        let encoded = encode_cookies(&collection).unwrap();

        let decoded = decode_cookies(&encoded).unwrap();
        assert_eq!(decoded, collection);
        assert_eq!(encode_cookies(&decoded).unwrap(), encoded);
    }

    #[test]
    fn malformed_records_are_dropped_individually() {
        let input = r#"[
            {"name": "good", "value": "1"},
            {"name": 42},
            "not a cookie",
            {"name": "", "value": "empty name"},
            {"name": "also_good", "value": "2", "domain": "forum.test"}
        ]"#;

        let names: Vec<String> = decode_cookies(input).unwrap().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["good", "also_good"]);
    }

    #[test]
    fn duplicate_identities_keep_the_last() {
        let input = r#"[{"name": "a", "value": "1"}, {"name": "a", "value": "2"}]"#;
        let cookies = decode_cookies(input).unwrap();
        assert_eq!(cookies.len(), 1);
        assert_eq!(cookies[0].value, "2");
    }

    #[test]
    fn non_array_input_is_an_error() {
        assert!(decode_cookies("{\"zones\": {}}").is_err());
    }

    #[tokio::test]
    async fn scenario_replacement_not_duplication() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonCookieStore::new(dir.path().join("cookies.json"), ManualClock::new(0));

        store
            .add_cookie(Cookie::new("sid", "abc").with_domain("forum.test").with_path("/"))
            .await
            .unwrap();
        let got = store.get_cookies(&url("https://forum.test/home")).await;
        let pairs: Vec<String> = got.iter().map(Cookie::pair).collect();
        assert_eq!(pairs, vec!["sid=abc"]);

        store
            .add_cookie(Cookie::new("sid", "xyz").with_domain("forum.test").with_path("/"))
            .await
            .unwrap();
        let got = store.get_cookies(&url("https://forum.test/home")).await;
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].value, "xyz");
    }

    #[tokio::test]
    async fn uniqueness_keeps_most_recent_per_identity() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonCookieStore::new(dir.path().join("cookies.json"), ManualClock::new(0));

        for (name, domain, value) in [
            ("a", Some("x.test"), "1"),
            ("a", None, "2"),
            ("a", Some("x.test"), "3"),
            ("b", Some("x.test"), "4"),
            ("a", None, "5"),
        ] {
            let mut c = Cookie::new(name, value);
            c.domain = domain.map(str::to_string);
            store.add_cookie(c).await.unwrap();
        }

        let mut all: Vec<(String, Option<String>, String)> = store
            .all_cookies()
            .await
            .into_iter()
            .map(|c| (c.name, c.domain, c.value))
            .collect();
        all.sort();

        assert_eq!(
            all,
            vec![
                ("a".into(), None, "5".into()),
                ("a".into(), Some("x.test".into()), "3".into()),
                ("b".into(), Some("x.test".into()), "4".into()),
            ]
        );
    }

    #[tokio::test]
    async fn expired_cookie_is_evicted_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cookies.json");
        let clock = ManualClock::new(1_000);
        let store = JsonCookieStore::new(path.clone(), clock.clone());

        store.add_cookie(Cookie::new("short", "1").with_expires_at(2_000)).await.unwrap();
        store.add_cookie(Cookie::new("session", "2")).await.unwrap();

        clock.set(2_001);
        let names: Vec<String> = store
            .get_cookies(&url("https://forum.test/"))
            .await
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["session"]);

        // a second instance reading the same file no longer sees it, even at an earlier time
        let reader = JsonCookieStore::new(path, ManualClock::new(0));
        let names: Vec<String> = reader.all_cookies().await.into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["session"]);
    }

    #[tokio::test]
    async fn write_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("cookies.json");

        {
            let store = JsonCookieStore::new(path.clone(), ManualClock::new(0));
            store.add_cookie(full_cookie()).await.unwrap();
        }

        let restarted = JsonCookieStore::new(path, ManualClock::new(0));
        assert_eq!(restarted.all_cookies().await, vec![full_cookie()]);
    }

    #[tokio::test]
    async fn concurrent_adds_are_not_lost() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cookies.json");
        let store = JsonCookieStore::new(path.clone(), ManualClock::new(0));

        let adds = (0..32).map(|i| {
            let store = store.clone();
            tokio::spawn(async move { store.add_cookie(Cookie::new(format!("c{i}"), i.to_string())).await })
        });
        for result in futures::future::join_all(adds).await {
            result.unwrap().unwrap();
        }

        let reader = JsonCookieStore::new(path, ManualClock::new(0));
        assert_eq!(reader.all_cookies().await.len(), 32);
    }

    #[tokio::test]
    async fn corrupted_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cookies.json");
        fs::write(&path, "this is not json").unwrap();

        let store = JsonCookieStore::new(path, ManualClock::new(0));
        assert!(store.all_cookies().await.is_empty());

        store.add_cookie(Cookie::new("a", "1")).await.unwrap();
        assert_eq!(store.all_cookies().await.len(), 1);
    }

    #[tokio::test]
    async fn pretty_files_decode_too() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cookies.json");

        let store = JsonCookieStore::with_options(path.clone(), true, ManualClock::new(0));
        store.add_cookie(Cookie::new("a", "1")).await.unwrap();
        store.close().await;

        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.contains('\n'));
        assert_eq!(decode_cookies(&contents).unwrap().len(), 1);
    }
}
