//! Blocking HTTP client with a fixed referer per request and an optional politeness delay.

use crate::provider::{Fetch, FetchedPage, ProviderError};
use reqwest::header::REFERER;
use std::sync::Mutex;
use std::time::{Duration, Instant};

const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_DELAY_SECS: u64 = 0;
const MAX_REDIRECTS: usize = 10;

/// Blocking HTTP client that enforces a minimum delay between requests.
///
/// The last-request timestamp sits behind a mutex so the client can be shared by
/// reference across threads; everything else is immutable after build.
#[derive(Debug)]
pub struct PoliteClient {
    inner: reqwest::blocking::Client,
    delay: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl PoliteClient {
    /// Build a client with default User-Agent, timeout, and no delay.
    pub fn new() -> Result<Self, reqwest::Error> {
        Self::builder().build()
    }

    pub fn builder() -> PoliteClientBuilder {
        PoliteClientBuilder::default()
    }

    /// Sleep until the configured delay has passed since the previous request, then
    /// claim the slot for this one.
    fn wait_delay(&self) {
        let mut last = self
            .last_request
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.delay {
                std::thread::sleep(self.delay - elapsed);
            }
        }
        *last = Some(Instant::now());
    }
}

impl Fetch for PoliteClient {
    fn get(&self, url: &str, referer: &str) -> Result<FetchedPage, ProviderError> {
        self.wait_delay();
        tracing::debug!(url, "GET");
        let response = self
            .inner
            .get(url)
            .header(REFERER, referer)
            .send()
            .map_err(|e| ProviderError::Network {
                url: url.to_string(),
                source: e,
            })?;
        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let body = response.text().map_err(|e| ProviderError::BodyRead {
            url: url.to_string(),
            source: e,
        })?;
        tracing::debug!(url = %final_url, status, bytes = body.len(), "response");
        Ok(FetchedPage {
            url: final_url,
            status,
            body,
        })
    }
}

/// Builder for PoliteClient with optional User-Agent, delay, and timeout.
#[derive(Debug)]
pub struct PoliteClientBuilder {
    user_agent: Option<String>,
    delay_secs: u64,
    timeout_secs: u64,
}

impl Default for PoliteClientBuilder {
    fn default() -> Self {
        Self {
            user_agent: None,
            delay_secs: DEFAULT_DELAY_SECS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl PoliteClientBuilder {
    /// Set a custom User-Agent. If not set, a browser-like default is used.
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    /// Set delay between requests in seconds. Default 0.
    pub fn delay_secs(mut self, secs: u64) -> Self {
        self.delay_secs = secs;
        self
    }

    /// Set request timeout in seconds. Default 30.
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn build(self) -> Result<PoliteClient, reqwest::Error> {
        let user_agent = self
            .user_agent
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());
        let inner = reqwest::blocking::Client::builder()
            .cookie_store(true)
            .user_agent(user_agent)
            .timeout(Duration::from_secs(self.timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .build()?;
        Ok(PoliteClient {
            inner,
            delay: Duration::from_secs(self.delay_secs),
            last_request: Mutex::new(None),
        })
    }
}
