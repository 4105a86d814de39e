//! Minimal HTTP response model.
//!
//! A **fully buffered** response as returned by [`CookieClient`](super::CookieClient).
//! By the time a caller sees it, its `Set-Cookie` headers have already been
//! handed to the cookie store.
//!
//! For JSON API responses, parse the body with [`Response::json`].
use http::HeaderMap;
use serde::de::DeserializeOwned;

/// Simple structure for HTTP responses.
#[derive(Debug)]
pub struct Response {
    /// Final URL of the response (after redirects, if any).
    pub url: url::Url,

    /// Numeric HTTP status code (e.g., `200`, `404`).
    pub status: u16,

    /// Human-readable reason phrase. `"Unknown"` for non-standard codes.
    pub status_text: String,

    /// Response headers as a case-insensitive map.
    pub headers: HeaderMap,

    /// Raw response body bytes.
    pub body: Vec<u8>,
}

impl Response {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Deserializes the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Notice {
        id: u32,
        title: String,
    }

    #[test]
    fn json_body() {
        let resp = Response {
            url: "https://forum.test/api/notices/1".parse().unwrap(),
            status: 200,
            status_text: "OK".into(),
            headers: HeaderMap::new(),
            body: br#"{"id": 1, "title": "Maintenance"}"#.to_vec(),
        };

        assert!(resp.is_success());
        let notice: Notice = resp.json().unwrap();
        assert_eq!(notice.id, 1);
        assert_eq!(notice.title, "Maintenance");
    }
}
