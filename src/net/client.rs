use crate::clock::ClockHandle;
use crate::cookies::CookieStoreHandle;
use crate::net::{attach_cookies, store_response_cookies, Response};

/// An HTTP client with a persistent cookie jar.
///
/// The store is injected by the host application; the client never creates
/// one of its own. Cloning is cheap and clones share the jar.
///
/// Redirects are followed by `reqwest`, so cookies set on an intermediate
/// redirect response are not seen; only the final response's `Set-Cookie`
/// headers reach the store.
#[derive(Clone)]
pub struct CookieClient {
    client: reqwest::Client,
    store: CookieStoreHandle,
    clock: ClockHandle,
}

impl CookieClient {
    /// Builds a client with its own `reqwest::Client` using `user_agent`.
    pub fn new(store: CookieStoreHandle, clock: ClockHandle, user_agent: &str) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().user_agent(user_agent).build()?;
        Ok(Self::with_client(client, store, clock))
    }

    pub fn with_client(client: reqwest::Client, store: CookieStoreHandle, clock: ClockHandle) -> Self {
        Self { client, store, clock }
    }

    pub fn cookie_store(&self) -> &CookieStoreHandle {
        &self.store
    }

    /// Starts a request; finish it with [`execute`](Self::execute).
    pub fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        self.client.request(method, url)
    }

    /// Sends `request` with stored cookies and stores the cookies it returns.
    pub async fn execute(&self, mut request: reqwest::Request) -> Result<Response, reqwest::Error> {
        let url = request.url().clone();
        attach_cookies(self.store.as_ref(), &url, request.headers_mut()).await;

        let res = self.client.execute(request).await?;

        // Fetch results
        let final_url = res.url().clone();
        let status = res.status().as_u16();
        let status_text = res.status().canonical_reason().unwrap_or("Unknown").to_string();
        let headers = res.headers().clone();

        store_response_cookies(self.store.as_ref(), &final_url, &headers, self.clock.now_millis()).await;

        // Fetch body. We don't do streaming yet
        let body = res.bytes().await?.to_vec();

        Ok(Response {
            url: final_url,
            status,
            status_text,
            headers,
            body,
        })
    }

    /// Loads an URL with a GET request.
    pub async fn get(&self, url: &str) -> Result<Response, reqwest::Error> {
        let request = self.client.get(url).build()?;
        self.execute(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::cookies::{Cookie, KeyValueCookieStore};
    use crate::storage::InMemoryArea;
    use std::sync::Arc;

    #[tokio::test]
    async fn clones_share_the_injected_jar() {
        let store: CookieStoreHandle = KeyValueCookieStore::new(Arc::new(InMemoryArea::default()), ManualClock::new(0));
        let client = CookieClient::new(store.clone(), ManualClock::new(0), "ForumClient/test").unwrap();
        let clone = client.clone();

        store.add_cookie(Cookie::new("sid", "abc")).await.unwrap();
        assert_eq!(clone.cookie_store().all_cookies().await.len(), 1);
        assert!(Arc::ptr_eq(client.cookie_store(), clone.cookie_store()));
    }

    #[test]
    fn request_builder_targets_url() {
        let store: CookieStoreHandle = KeyValueCookieStore::new(Arc::new(InMemoryArea::default()), ManualClock::new(0));
        let client = CookieClient::new(store, ManualClock::new(0), "ForumClient/test").unwrap();

        let request = client
            .request(reqwest::Method::POST, "https://forum.test/api/posts")
            .build()
            .unwrap();
        assert_eq!(request.url().path(), "/api/posts");
        assert_eq!(request.method(), reqwest::Method::POST);
    }
}
