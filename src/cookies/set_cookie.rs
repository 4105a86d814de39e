//! `Set-Cookie` parsing and `Cookie` header rendering.
//!
//! Parsing is intentionally small: `Domain` (leading dot stripped), `Path`,
//! `Expires`, `Max-Age`, `Secure` and `HttpOnly` are understood, every other
//! attribute is kept verbatim in [`Cookie::extensions`].
//!
//! A `Domain` must be the request host or one of its parent domains, otherwise
//! the cookie is dropped.
//!
//! Missing `Domain`/`Path` are filled from the request URL: the domain becomes
//! the request host and the path the request's directory (RFC 6265 default-path).

use time::format_description::well_known::Rfc2822;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime};
use url::Url;

use super::cookie::domain_matches;
use crate::cookies::{Cookie, CookieEncoding};

/// `Wed, 21 Oct 2015 07:28:00 GMT`
const IMF_FIXDATE: &[BorrowedFormatItem<'static>] =
    format_description!("[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second] GMT");

/// `Wed, 21-Oct-2015 07:28:00 GMT`, still sent by older servers.
const DASHED_DATE: &[BorrowedFormatItem<'static>] =
    format_description!("[weekday repr:short], [day]-[month repr:short]-[year] [hour]:[minute]:[second] GMT");

/// Parses one `Set-Cookie` header value received for `request_url`.
///
/// Returns `None` when the header has no `name=value` pair, the name is empty,
/// or `Domain` names a domain the request host is not part of.
/// When both are present, `Max-Age` wins over `Expires`; a non-positive
/// `Max-Age` produces a cookie that is already expired at `now_millis`.
pub fn parse_set_cookie(header: &str, request_url: &Url, now_millis: i64) -> Option<Cookie> {
    let mut parts = header.split(';');

    let (name, value) = parts.next()?.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }

    let mut cookie = Cookie::new(name, value.trim());
    if cookie.value.len() >= 2 && cookie.value.starts_with('"') && cookie.value.ends_with('"') {
        cookie.value = cookie.value[1..cookie.value.len() - 1].to_string();
        cookie.encoding = CookieEncoding::DQuotes;
    }

    let mut expires = None;
    for part in parts {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }

        match part.split_once('=') {
            Some((k, v)) => {
                let (k, v) = (k.trim(), v.trim());
                match k.to_ascii_lowercase().as_str() {
                    "domain" => {
                        let domain = v.trim_start_matches('.');
                        if !domain.is_empty() {
                            cookie.domain = Some(domain.to_ascii_lowercase());
                        }
                    }
                    "path" => {
                        if v.starts_with('/') {
                            cookie.path = Some(v.to_string());
                        }
                    }
                    "expires" => expires = parse_cookie_date(v),
                    "max-age" => match v.parse::<i64>() {
                        Ok(secs) => cookie.max_age_seconds = Some(secs),
                        Err(_) => log::debug!("Ignoring unparsable Max-Age {:?} on cookie {}", v, name),
                    },
                    _ => {
                        cookie.extensions.insert(k.to_string(), Some(v.to_string()));
                    }
                }
            }
            None => {
                if part.eq_ignore_ascii_case("secure") {
                    cookie.secure = true;
                } else if part.eq_ignore_ascii_case("httponly") {
                    cookie.http_only = true;
                } else {
                    cookie.extensions.insert(part.to_string(), None);
                }
            }
        }
    }

    cookie.expires_at_millis = match cookie.max_age_seconds {
        Some(secs) if secs <= 0 => Some(i64::MIN),
        Some(secs) => Some(now_millis.saturating_add(secs.saturating_mul(1000))),
        None => expires,
    };

    let host = request_url.host_str();
    if let Some(domain) = cookie.domain.as_deref() {
        if !host.is_some_and(|h| domain_matches(h, domain)) {
            log::debug!(
                "Ignoring cookie {} from {:?}: Domain={} does not cover the request host",
                cookie.name,
                host,
                domain
            );
            return None;
        }
    }
    if cookie.domain.is_none() {
        cookie.domain = host.map(str::to_string);
    }
    if cookie.path.is_none() {
        cookie.path = Some(default_path(request_url).to_string());
    }

    Some(cookie)
}

/// Renders the `Cookie` request header value, or `None` when there is nothing to send.
pub fn cookie_header(cookies: &[Cookie]) -> Option<String> {
    if cookies.is_empty() {
        return None;
    }

    Some(cookies.iter().map(Cookie::pair).collect::<Vec<_>>().join("; "))
}

fn default_path(url: &Url) -> &str {
    url.path()
        .rsplit_once('/')
        .map_or("/", |(dir, _)| if dir.is_empty() { "/" } else { dir })
}

/// Parses an `Expires` attribute into epoch millis.
fn parse_cookie_date(s: &str) -> Option<i64> {
    let parsed = [IMF_FIXDATE, DASHED_DATE]
        .into_iter()
        .find_map(|fmt| PrimitiveDateTime::parse(s, fmt).ok())
        .map(PrimitiveDateTime::assume_utc)
        .or_else(|| OffsetDateTime::parse(s, &Rfc2822).ok());

    match parsed {
        Some(dt) => Some((dt.unix_timestamp_nanos() / 1_000_000) as i64),
        None => {
            log::debug!("Ignoring unparsable cookie date {:?}", s);
            None
        }
    }
}
