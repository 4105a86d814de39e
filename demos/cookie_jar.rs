use forum_store::clock::{Clock, SystemClock};
use forum_store::config::{open_cookie_store, open_settings, StoreConfig};
use forum_store::cookies::{Cookie, CookieStore};
use forum_store::net::CookieClient;
use std::sync::Arc;
use url::Url;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    // Pass a config file as the first argument, or run with the defaults (cookies.json in the
    // current directory, settings in memory).
    let config = match std::env::args().nth(1) {
        Some(path) => StoreConfig::from_json_file(path)?,
        None => StoreConfig::default(),
    };

    // The store is created once and handed to everything that needs it.
    let clock = Arc::new(SystemClock);
    let store = open_cookie_store(&config.cookies, clock.clone())?;
    let settings = open_settings(&config)?;

    let launches = settings.get_i64("launch_count")?.unwrap_or(0) + 1;
    settings.set_i64("launch_count", launches)?;
    println!("launch #{launches}");

    // Simulate a login response: a session cookie valid for one hour.
    let forum = Url::parse("https://forum.test/home")?;
    let session = Cookie::new("sid", "abc")
        .with_domain("forum.test")
        .with_path("/")
        .with_expires_at(clock.now_millis() + 3_600_000);
    store.add_cookie(session).await?;

    for cookie in store.get_cookies(&forum).await {
        println!("{} -> {}", forum, cookie.pair());
    }

    // A real request goes through the client, which reads and writes the same jar.
    if let Some(url) = std::env::args().nth(2) {
        let client = CookieClient::new(store.clone(), clock.clone(), &config.user_agent)?;
        let resp = client.get(&url).await?;
        println!("{} {} ({} bytes)", resp.status, resp.status_text, resp.body.len());
        println!("jar now holds {} cookie(s)", store.all_cookies().await.len());
    }

    store.close().await;
    Ok(())
}
