// src/cookies.rs
//! Cookies: the [`Cookie`] record, [`CookieStore`] and its backends.

mod cookie;
mod set_cookie;
mod store;

pub use cookie::{Cookie, CookieEncoding};

pub use set_cookie::{cookie_header, parse_set_cookie};

pub use store::{CookieMedium, CookieStore, CookieStoreHandle, PersistentCookieStore};
pub use store::{decode_cookies, encode_cookies, JsonCookieStore, JsonFileMedium};
pub use store::{KeyValueCookieStore, KeyValueMedium};
