//! Key-per-cookie store over a [`StorageArea`].
//!
//! This is the layout used where the backing medium is a flat string map
//! (browser local storage, a platform preference store, the SQLite area in
//! [`crate::storage`]). Each cookie is one entry:
//!
//! ```text
//! key   = <prefix>name|domain|path
//! value = value|expiresAtMillis|secure|httpOnly|maxAgeSeconds|encoding|extensions
//! ```
//!
//! - absent domain/path/numbers are empty strings, flags are `1`/`0`
//! - `extensions` is `k1=v1,k2=v2`, a bare `k` for a value-less attribute
//! - every free-text field is percent-encoded, so `| , = %` inside a value never
//!   breaks the framing. Names are validated instead (see [`Cookie::validate`]).
//!
//! Entries whose key lacks the prefix are not cookies and are left alone, so a
//! single area can also hold settings.
use std::sync::Arc;

use crate::clock::ClockHandle;
use crate::cookies::store::{CookieMedium, PersistentCookieStore};
use crate::cookies::{Cookie, CookieEncoding};
use crate::errors::StoreError;
use crate::storage::StorageArea;

/// Default key prefix for cookie entries.
pub const COOKIE_KEY_PREFIX: &str = "cookie:";

/// Key-per-cookie store.
pub type KeyValueCookieStore = PersistentCookieStore<KeyValueMedium>;

impl KeyValueCookieStore {
    /// Creates a store over an already opened area.
    pub fn new(area: Arc<dyn StorageArea>, clock: ClockHandle) -> Arc<Self> {
        Arc::new(Self::with_opener("key-value", clock, move || {
            Ok(KeyValueMedium::new(area.clone(), COOKIE_KEY_PREFIX))
        }))
    }

    /// Creates a store that opens its area on first use.
    pub fn lazy<F>(label: impl Into<String>, clock: ClockHandle, open_area: F) -> Arc<Self>
    where
        F: Fn() -> Result<Arc<dyn StorageArea>, StoreError> + Send + Sync + 'static,
    {
        Arc::new(Self::with_opener(label, clock, move || {
            Ok(KeyValueMedium::new(open_area()?, COOKIE_KEY_PREFIX))
        }))
    }
}

pub struct KeyValueMedium {
    area: Arc<dyn StorageArea>,
    prefix: String,
}

impl KeyValueMedium {
    pub fn new(area: Arc<dyn StorageArea>, prefix: impl Into<String>) -> Self {
        Self {
            area,
            prefix: prefix.into(),
        }
    }

    fn key_for(&self, cookie: &Cookie) -> String {
        format!("{}{}", self.prefix, encode_key(cookie))
    }
}

impl CookieMedium for KeyValueMedium {
    fn load(&mut self) -> Result<Vec<Cookie>, StoreError> {
        let entries = self.area.items_with_prefix(&self.prefix)?;

        let mut cookies = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            match decode_entry(&key[self.prefix.len()..], &value) {
                Ok(cookie) => cookies.push(cookie),
                Err(e) => {
                    log::warn!("Dropping malformed cookie entry {:?}: {}", key, e);
                    if let Err(e) = self.area.remove_item(&key) {
                        log::warn!("Could not delete malformed cookie entry {:?}: {}", key, e);
                    }
                }
            }
        }

        Ok(cookies)
    }

    fn put(&mut self, _snapshot: &[Cookie], cookie: &Cookie) -> Result<(), StoreError> {
        self.area.set_item(&self.key_for(cookie), &encode_value(cookie))
    }

    fn remove(&mut self, _snapshot: &[Cookie], removed: &[Cookie]) -> Result<(), StoreError> {
        for cookie in removed {
            self.area.remove_item(&self.key_for(cookie))?;
        }
        Ok(())
    }
}

fn esc(s: &str) -> String {
    urlencoding::encode(s).into_owned()
}

fn unesc(s: &str) -> Result<String, StoreError> {
    urlencoding::decode(s)
        .map(|s| s.into_owned())
        .map_err(|e| StoreError::Decode(format!("bad percent-encoding in {s:?}: {e}")))
}

fn opt(s: &str) -> Result<Option<String>, StoreError> {
    if s.is_empty() {
        Ok(None)
    } else {
        unesc(s).map(Some)
    }
}

fn opt_num(s: &str) -> Result<Option<i64>, StoreError> {
    if s.is_empty() {
        return Ok(None);
    }
    s.parse()
        .map(Some)
        .map_err(|_| StoreError::Decode(format!("bad number {s:?}")))
}

fn flag(s: &str) -> Result<bool, StoreError> {
    match s {
        "1" => Ok(true),
        "0" => Ok(false),
        other => Err(StoreError::Decode(format!("bad flag {other:?}"))),
    }
}

/// `name|domain|path`, without the prefix.
pub fn encode_key(cookie: &Cookie) -> String {
    format!(
        "{}|{}|{}",
        cookie.name,
        cookie.domain.as_deref().map(esc).unwrap_or_default(),
        cookie.path.as_deref().map(esc).unwrap_or_default(),
    )
}

pub fn encode_value(cookie: &Cookie) -> String {
    let extensions = cookie
        .extensions
        .iter()
        .map(|(k, v)| match v {
            Some(v) => format!("{}={}", esc(k), esc(v)),
            None => esc(k),
        })
        .collect::<Vec<_>>()
        .join(",");

    format!(
        "{}|{}|{}|{}|{}|{}|{}",
        esc(&cookie.value),
        cookie.expires_at_millis.map(|n| n.to_string()).unwrap_or_default(),
        if cookie.secure { "1" } else { "0" },
        if cookie.http_only { "1" } else { "0" },
        cookie.max_age_seconds.map(|n| n.to_string()).unwrap_or_default(),
        cookie.encoding,
        extensions,
    )
}

/// Rebuilds a cookie from an entry key (without prefix) and value.
pub fn decode_entry(key: &str, value: &str) -> Result<Cookie, StoreError> {
    let key_parts: Vec<&str> = key.split('|').collect();
    let &[name, domain, path] = key_parts.as_slice() else {
        return Err(StoreError::Decode(format!("expected 3 key fields, got {}", key_parts.len())));
    };

    let value_parts: Vec<&str> = value.split('|').collect();
    let &[val, expires, secure, http_only, max_age, encoding, extensions] = value_parts.as_slice() else {
        return Err(StoreError::Decode(format!(
            "expected 7 value fields, got {}",
            value_parts.len()
        )));
    };

    let mut cookie = Cookie {
        domain: opt(domain)?,
        path: opt(path)?,
        expires_at_millis: opt_num(expires)?,
        max_age_seconds: opt_num(max_age)?,
        secure: flag(secure)?,
        http_only: flag(http_only)?,
        encoding: encoding.parse::<CookieEncoding>()?,
        ..Cookie::new(name, unesc(val)?)
    };

    for ext in extensions.split(',').filter(|e| !e.is_empty()) {
        let (k, v) = match ext.split_once('=') {
            Some((k, v)) => (unesc(k)?, Some(unesc(v)?)),
            None => (unesc(ext)?, None),
        };
        if k.is_empty() {
            return Err(StoreError::Decode("empty extension key".into()));
        }
        cookie.extensions.insert(k, v);
    }

    cookie.validate().map_err(|e| StoreError::Decode(e.to_string()))?;
    Ok(cookie)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::cookies::{CookieStore, CookieStoreHandle, JsonCookieStore};
    use crate::storage::InMemoryArea;
    use url::Url;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn entry_layout() {
        let mut c = Cookie::new("sid", "abc")
            .with_domain("forum.test")
            .with_path("/")
            .with_expires_at(1_700_000_000_000);
        c.secure = true;
        c.extensions.insert("SameSite".into(), Some("Lax".into()));
        c.extensions.insert("Partitioned".into(), None);

        assert_eq!(encode_key(&c), "sid|forum.test|%2F");
        assert_eq!(
            encode_value(&c),
            "abc|1700000000000|1|0||RAW|Partitioned,SameSite=Lax"
        );
        assert_eq!(encode_key(&Cookie::new("x", "")), "x||");
    }

    #[test]
    fn delimiters_in_values_survive() {
        let mut c = Cookie::new("token", "a|b,c=d%e").with_path("/a|b");
        c.extensions.insert("k,=".into(), Some("v|,=".into()));
        c.max_age_seconds = Some(-1);

        let decoded = decode_entry(&encode_key(&c), &encode_value(&c)).unwrap();
        assert_eq!(decoded, c);
    }

    #[test]
    fn malformed_entries_are_rejected() {
        assert!(decode_entry("a|b", "v||0|0||RAW|").is_err());
        assert!(decode_entry("a||", "v||0|0||RAW").is_err());
        assert!(decode_entry("a||", "v|soon|0|0||RAW|").is_err());
        assert!(decode_entry("a||", "v||yes|0||RAW|").is_err());
        assert!(decode_entry("a||", "v||0|0||ROT13|").is_err());
        assert!(decode_entry("||", "v||0|0||RAW|").is_err());
        assert!(decode_entry("a||", "v||0|0||RAW|").is_ok());
    }

    #[tokio::test]
    async fn malformed_entry_is_deleted_and_others_survive() {
        let area = Arc::new(InMemoryArea::default());
        area.set_item("cookie:broken||", "garbage").unwrap();
        area.set_item("pref:theme", "dark").unwrap();

        let store = KeyValueCookieStore::new(area.clone(), ManualClock::new(0));
        store.add_cookie(Cookie::new("ok", "1")).await.unwrap();

        let names: Vec<String> = store.all_cookies().await.into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["ok"]);
        assert_eq!(area.get_item("cookie:broken||").unwrap(), None);
        assert_eq!(area.get_item("pref:theme").unwrap().as_deref(), Some("dark"));
    }

    #[tokio::test]
    async fn empty_domain_is_stored_as_absent_on_every_backend() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cookies.json");
        let area: Arc<dyn StorageArea> = Arc::new(InMemoryArea::default());

        let stores: Vec<CookieStoreHandle> = vec![
            JsonCookieStore::new(path.clone(), ManualClock::new(0)),
            KeyValueCookieStore::new(area.clone(), ManualClock::new(0)),
        ];

        for store in &stores {
            store.add_cookie(Cookie::new("sid", "abc").with_domain("")).await.unwrap();
            store.add_cookie(Cookie::new("sid", "xyz")).await.unwrap();

            let found = store.get_cookies(&url("https://anything.test/")).await;
            assert_eq!(found.len(), 1);
            assert_eq!(found[0].value, "xyz");
            assert_eq!(found[0].domain, None);
            assert!(store.remove_cookie("sid", Some(""), None).await);
        }

        // reloaded from the media, both agree
        let reopened: Vec<CookieStoreHandle> = vec![
            JsonCookieStore::new(path, ManualClock::new(0)),
            KeyValueCookieStore::new(area, ManualClock::new(0)),
        ];
        for store in &reopened {
            assert!(store.all_cookies().await.is_empty());
        }
    }

    #[tokio::test]
    async fn expiry_and_matching_over_shared_area() {
        let area: Arc<dyn StorageArea> = Arc::new(InMemoryArea::default());
        let clock = ManualClock::new(0);
        let store = KeyValueCookieStore::new(area.clone(), clock.clone());

        store
            .add_cookie(Cookie::new("api", "1").with_domain("example.com").with_path("/api").with_expires_at(10))
            .await
            .unwrap();

        assert_eq!(store.get_cookies(&url("https://sub.example.com/api/v1")).await.len(), 1);
        assert!(store.get_cookies(&url("https://other.com/api/v1")).await.is_empty());
        assert!(store.get_cookies(&url("https://sub.example.com/other")).await.is_empty());

        clock.set(11);
        assert!(store.get_cookies(&url("https://sub.example.com/api/v1")).await.is_empty());

        // a second store over the same area sees nothing left
        let other = KeyValueCookieStore::new(area, ManualClock::new(0));
        assert!(other.all_cookies().await.is_empty());
    }
}
