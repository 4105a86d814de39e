//! HTTP pipeline glue for the cookie store.
//!
//! The store has exactly two call sites per request:
//! - before sending, [`attach_cookies`] fills the `Cookie` header from
//!   [`CookieStore::get_cookies`];
//! - after receiving, [`store_response_cookies`] feeds every `Set-Cookie`
//!   header to [`CookieStore::add_cookie`].
//!
//! [`CookieClient`] wires both around a `reqwest::Client`.
mod client;
mod response;

pub use client::CookieClient;
pub use response::Response;

use http::header::{COOKIE, SET_COOKIE};
use http::{HeaderMap, HeaderValue};
use url::Url;

use crate::cookies::{cookie_header, parse_set_cookie, CookieStore};

/// Sets the `Cookie` header for a request to `url`. Returns how many cookies were attached.
///
/// `Secure` cookies are only sent over https. An existing `Cookie` header is replaced.
pub async fn attach_cookies(store: &dyn CookieStore, url: &Url, headers: &mut HeaderMap) -> usize {
    let is_https = url.scheme() == "https";
    let cookies: Vec<_> = store
        .get_cookies(url)
        .await
        .into_iter()
        .filter(|c| !c.secure || is_https)
        .collect();

    let Some(header) = cookie_header(&cookies) else {
        return 0;
    };

    match HeaderValue::from_str(&header) {
        Ok(value) => {
            headers.insert(COOKIE, value);
            cookies.len()
        }
        Err(e) => {
            log::warn!("Not sending cookies to {}: {}", url, e);
            0
        }
    }
}

/// Stores every `Set-Cookie` in `headers` received for `url`. Returns how many were stored.
pub async fn store_response_cookies(
    store: &dyn CookieStore,
    url: &Url,
    headers: &HeaderMap,
    now_millis: i64,
) -> usize {
    let mut stored = 0;

    for header in headers.get_all(SET_COOKIE) {
        let Ok(raw) = header.to_str() else {
            log::debug!("Skipping non-ASCII Set-Cookie from {}", url);
            continue;
        };
        let Some(cookie) = parse_set_cookie(raw, url, now_millis) else {
            log::debug!("Skipping unparsable Set-Cookie from {}: {:?}", url, raw);
            continue;
        };

        match store.add_cookie(cookie).await {
            Ok(()) => stored += 1,
            Err(e) => log::warn!("Rejected cookie from {}: {}", url, e),
        }
    }

    stored
}
