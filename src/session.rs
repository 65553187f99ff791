use crate::error::ScrapeError;
use reqwest::header::{COOKIE, REFERER, SET_COOKIE, USER_AGENT};
use reqwest::{Client, ClientBuilder};
use std::time::Duration;

/// Catalog origin. The whole pipeline targets this one site.
pub const ORIGIN: &str = "https://kisskh.co/";

/// Fixed browser-like user agent; the catalog API rejects obvious bots.
pub const BROWSER_UA: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 Chrome/115.0 Safari/537.36";

/// Cookies and headers captured for one resolution run.
///
/// Rebuilt per top-level call; never persisted.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub cookie: String,
    pub user_agent: &'static str,
    pub referer: String,
}

/// Plain HTTP client that warms a session against the catalog origin and
/// replays the captured cookies on every subsequent API request.
#[derive(Clone)]
pub struct SessionClient {
    client: Client,
}

impl SessionClient {
    pub fn new(timeout: Duration) -> Result<Self, ScrapeError> {
        let client = ClientBuilder::new().timeout(timeout).build()?;
        Ok(Self { client })
    }

    /// Visit the origin page and capture its cookies. The API rejects
    /// cookie-less requests, so this must run before any API call.
    pub async fn bootstrap(&self) -> Result<SessionContext, ScrapeError> {
        let resp = self
            .client
            .get(ORIGIN)
            .header(USER_AGENT, BROWSER_UA)
            .send()
            .await?;

        let mut cookie = String::new();
        for value in resp.headers().get_all(SET_COOKIE) {
            if let Ok(raw) = value.to_str() {
                // keep only the name=value pair, drop attributes
                if let Some(pair) = raw.split(';').next() {
                    let pair = pair.trim();
                    if !pair.is_empty() {
                        cookie.push_str(pair);
                        cookie.push_str("; ");
                    }
                }
            }
        }

        Ok(SessionContext {
            cookie,
            user_agent: BROWSER_UA,
            referer: ORIGIN.to_string(),
        })
    }

    /// Authenticated GET carrying the session cookie and origin referer.
    pub async fn get_bytes(
        &self,
        url: &str,
        ctx: &SessionContext,
    ) -> Result<Vec<u8>, ScrapeError> {
        self.get_bytes_with_referer(url, ctx, &ctx.referer).await
    }

    /// Same as `get_bytes` but with an explicit referer (subtitle fetches
    /// must present the drama page, not the origin).
    pub async fn get_bytes_with_referer(
        &self,
        url: &str,
        ctx: &SessionContext,
        referer: &str,
    ) -> Result<Vec<u8>, ScrapeError> {
        let resp = self
            .client
            .get(url)
            .header(USER_AGENT, ctx.user_agent)
            .header(REFERER, referer)
            .header(COOKIE, ctx.cookie.clone())
            .send()
            .await?;

        Ok(resp.bytes().await?.to_vec())
    }
}
