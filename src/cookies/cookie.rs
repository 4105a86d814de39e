//! Cookie core types.
//!
//! [`Cookie`] is the record every store persists. Its identity is the
//! `(name, domain, path)` triple; a store never holds two records with the same
//! identity.
//!
//! ```rust
//! use forum_store::cookies::Cookie;
//!
//! let c = Cookie::new("sid", "abc")
//!     .with_domain("forum.test")
//!     .with_path("/");
//! assert!(c.matches_url(&"https://forum.test/home".parse().unwrap()));
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::errors::StoreError;

/// How the cookie value was encoded on the wire. Carried along, never applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CookieEncoding {
    #[default]
    Raw,
    DQuotes,
    UriEncoding,
    Base64Encoding,
}

impl CookieEncoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            CookieEncoding::Raw => "RAW",
            CookieEncoding::DQuotes => "DQUOTES",
            CookieEncoding::UriEncoding => "URI_ENCODING",
            CookieEncoding::Base64Encoding => "BASE64_ENCODING",
        }
    }
}

impl fmt::Display for CookieEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CookieEncoding {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RAW" => Ok(CookieEncoding::Raw),
            "DQUOTES" => Ok(CookieEncoding::DQuotes),
            "URI_ENCODING" => Ok(CookieEncoding::UriEncoding),
            "BASE64_ENCODING" => Ok(CookieEncoding::Base64Encoding),
            other => Err(StoreError::Decode(format!("unknown cookie encoding {other:?}"))),
        }
    }
}

/// A cookie as stored by the jar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cookie {
    /// Cookie name (case-sensitive). Part of the identity key.
    pub name: String,

    /// Raw cookie value, opaque to the store.
    pub value: String,

    /// Domain scoping. `None` matches any host.
    #[serde(default)]
    pub domain: Option<String>,

    /// Path scoping. `None` matches any path.
    #[serde(default)]
    pub path: Option<String>,

    /// Absolute expiry in epoch milliseconds. `None` is a session cookie and is
    /// never evicted by the store.
    #[serde(default)]
    pub expires_at_millis: Option<i64>,

    /// `Max-Age` as received. Informational; eviction uses `expires_at_millis`.
    #[serde(default)]
    pub max_age_seconds: Option<i64>,

    #[serde(default)]
    pub secure: bool,

    #[serde(default)]
    pub http_only: bool,

    #[serde(default)]
    pub encoding: CookieEncoding,

    /// Any other attributes (`SameSite`, `Priority`, ...), kept verbatim.
    #[serde(default)]
    pub extensions: BTreeMap<String, Option<String>>,
}

impl Cookie {
    /// Creates a session cookie without domain or path restrictions.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: None,
            path: None,
            expires_at_millis: None,
            max_age_seconds: None,
            secure: false,
            http_only: false,
            encoding: CookieEncoding::Raw,
            extensions: BTreeMap::new(),
        }
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_expires_at(mut self, millis: i64) -> Self {
        self.expires_at_millis = Some(millis);
        self
    }

    /// Folds an empty domain or path into `None`, so both spell "unrestricted".
    pub fn normalized(mut self) -> Self {
        if self.domain.as_deref() == Some("") {
            self.domain = None;
        }
        if self.path.as_deref() == Some("") {
            self.path = None;
        }
        self
    }

    /// Same `(name, domain, path)`.
    pub fn same_identity(&self, other: &Cookie) -> bool {
        self.name == other.name && self.domain == other.domain && self.path == other.path
    }

    /// True when the cookie carries an expiry that is at or before `now_millis`.
    pub fn is_expired(&self, now_millis: i64) -> bool {
        matches!(self.expires_at_millis, Some(expires) if expires <= now_millis)
    }

    /// Checks the name against the characters the key encodings use as delimiters.
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.name.is_empty() {
            return Err(StoreError::InvalidCookie("empty cookie name".into()));
        }

        if let Some(bad) = self
            .name
            .chars()
            .find(|c| matches!(c, '|' | ';' | ',' | '=') || c.is_whitespace() || c.is_control())
        {
            return Err(StoreError::InvalidCookie(format!(
                "cookie name {:?} contains forbidden character {:?}",
                self.name, bad
            )));
        }

        Ok(())
    }

    /// Simplified domain/path matcher.
    ///
    /// The domain must equal the host or be a dot-bounded suffix of it (a
    /// leading dot on the cookie domain is ignored). The path is a plain string
    /// prefix with no segment boundary check.
    pub fn matches_url(&self, url: &Url) -> bool {
        let host = url.host_str().unwrap_or_default();

        let domain_ok = match &self.domain {
            None => true,
            Some(domain) => domain_matches(host, domain),
        };

        let path_ok = match &self.path {
            None => true,
            Some(path) => url.path().starts_with(path.as_str()),
        };

        domain_ok && path_ok
    }

    /// `name=value`, as sent in a `Cookie` request header.
    pub fn pair(&self) -> String {
        format!("{}={}", self.name, self.value)
    }
}

/// True when `host` equals `domain` or is a dot-bounded subdomain of it.
/// A leading dot on `domain` is ignored.
pub fn domain_matches(host: &str, domain: &str) -> bool {
    let domain = domain.trim_start_matches('.');
    host == domain
        || (host.len() > domain.len()
            && host.ends_with(domain)
            && host.as_bytes()[host.len() - domain.len() - 1] == b'.')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn matches_subdomain_and_path_prefix() {
        let c = Cookie::new("a", "1").with_domain("example.com").with_path("/api");

        assert!(c.matches_url(&url("https://sub.example.com/api/v1")));
        assert!(c.matches_url(&url("https://example.com/api")));
        assert!(!c.matches_url(&url("https://other.com/api/v1")));
        assert!(!c.matches_url(&url("https://sub.example.com/other")));
    }

    #[test]
    fn leading_dot_is_ignored() {
        let c = Cookie::new("a", "1").with_domain(".example.com");
        assert!(c.matches_url(&url("https://example.com/")));
        assert!(c.matches_url(&url("https://www.example.com/")));
    }

    #[test]
    fn suffix_without_dot_boundary_does_not_match() {
        let c = Cookie::new("a", "1").with_domain("example.com");
        assert!(!c.matches_url(&url("https://notexample.com/")));
    }

    #[test]
    fn empty_domain_and_path_mean_unrestricted() {
        let c = Cookie::new("a", "1").with_domain("").with_path("").normalized();
        assert_eq!(c.domain, None);
        assert_eq!(c.path, None);
        assert!(c.same_identity(&Cookie::new("a", "2")));
        assert!(c.matches_url(&url("https://anything.test/")));
    }

    #[test]
    fn path_prefix_is_loose() {
        // no segment boundary: "/api" also covers "/apiary"
        let c = Cookie::new("a", "1").with_path("/api");
        assert!(c.matches_url(&url("https://anything.test/apiary")));
    }

    #[test]
    fn unrestricted_cookie_matches_everything() {
        let c = Cookie::new("a", "1");
        assert!(c.matches_url(&url("https://a.test/")));
        assert!(c.matches_url(&url("file:///tmp/x")));
    }

    #[test]
    fn expiry_is_inclusive() {
        let c = Cookie::new("a", "1").with_expires_at(1_000);
        assert!(!c.is_expired(999));
        assert!(c.is_expired(1_000));
        assert!(!Cookie::new("s", "1").is_expired(i64::MAX));
    }

    #[test]
    fn validate_rejects_delimiters() {
        assert!(Cookie::new("sid", "x").validate().is_ok());
        assert!(Cookie::new("", "x").validate().is_err());
        for bad in ["a|b", "a;b", "a,b", "a=b", "a b", "a\tb"] {
            assert!(
                matches!(Cookie::new(bad, "x").validate(), Err(StoreError::InvalidCookie(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn encoding_names_parse_back() {
        for enc in [
            CookieEncoding::Raw,
            CookieEncoding::DQuotes,
            CookieEncoding::UriEncoding,
            CookieEncoding::Base64Encoding,
        ] {
            assert_eq!(enc.as_str().parse::<CookieEncoding>().unwrap(), enc);
        }
        assert!("NOPE".parse::<CookieEncoding>().is_err());
    }
}
