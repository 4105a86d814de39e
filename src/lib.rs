//! Persistence layer of the forum client: a durable cookie jar and a small
//! settings store, plus the glue that plugs the jar into the HTTP pipeline.
//!
//! ```rust,no_run
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! use std::sync::Arc;
//! use forum_store::clock::SystemClock;
//! use forum_store::config::{open_cookie_store, StoreConfig};
//! use forum_store::net::CookieClient;
//!
//! let config = StoreConfig::default();
//! let clock = Arc::new(SystemClock);
//! let store = open_cookie_store(&config.cookies, clock.clone())?;
//!
//! let client = CookieClient::new(store.clone(), clock, &config.user_agent)?;
//! let resp = client.get("https://forum.test/api/notices").await?;
//! store.close().await;
//! # Ok(())
//! # }
//! ```
pub mod clock;
pub mod config;
pub mod cookies;
pub mod errors;
pub mod net;
pub mod storage;

pub use errors::StoreError;
