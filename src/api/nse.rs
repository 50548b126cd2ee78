use crate::api::session::SessionManager;
use crate::config::UpstreamConfig;
use crate::error::UpstreamError;
use crate::models::cache::{Flight, ResponseCache};
use crate::models::clock::Clock;
use crate::models::retry::RetryPolicy;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client, Url};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,image/apng,*/*;q=0.8";
const ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";

/// Cache partitions for the index endpoints.
pub mod keys {
    pub const NIFTY_50: &str = "nifty50";
    pub const NIFTY_500: &str = "nifty";
    pub const BANK_NIFTY: &str = "bankNifty";
}

pub const NIFTY_50_INDEX: &str = "NIFTY 50";
pub const NIFTY_500_INDEX: &str = "NIFTY 500";

/// Client for the exchange's JSON API with a short-lived response cache.
pub struct NseApi {
    client: Client,
    origin: String,
    cached_retry: RetryPolicy,
    per_symbol_retry: RetryPolicy,
    cache: ResponseCache,
    session: SessionManager,
    clock: Arc<dyn Clock>,
}

impl NseApi {
    pub fn new(config: &UpstreamConfig, clock: Arc<dyn Clock>) -> Result<Self, UpstreamError> {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static(ACCEPT));
        headers.insert(
            header::ACCEPT_LANGUAGE,
            HeaderValue::from_static(ACCEPT_LANGUAGE),
        );

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()?;

        let session = SessionManager::new(
            client.clone(),
            format!("{}/", config.origin),
            config.session_ttl,
            config.session_retry,
            clock.clone(),
            config.initial_cookie.clone(),
        );

        Ok(Self {
            client,
            origin: config.origin.clone(),
            cached_retry: config.cached_retry,
            per_symbol_retry: config.per_symbol_retry,
            cache: ResponseCache::new(config.cache_ttl),
            session,
            clock,
        })
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn index_url(&self, index: &str) -> Result<String, UpstreamError> {
        self.api_url("equity-stockIndices", &[("index", index)])
    }

    pub fn quote_url(&self, symbol: &str) -> Result<String, UpstreamError> {
        self.api_url("quote-equity", &[("symbol", symbol)])
    }

    pub fn trade_info_url(&self, symbol: &str) -> Result<String, UpstreamError> {
        self.api_url("quote-equity", &[("symbol", symbol), ("section", "trade_info")])
    }

    pub fn historical_url(&self, symbol: &str) -> Result<String, UpstreamError> {
        self.api_url("historical/cm/equity", &[("symbol", symbol)])
    }

    /// Query values are percent-encoded (`NIFTY 50` becomes `NIFTY%2050`).
    fn api_url(&self, path: &str, params: &[(&str, &str)]) -> Result<String, UpstreamError> {
        let query = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        let url = format!("{}/api/{}?{}", self.origin, path, query);
        Url::parse(&url)
            .map(String::from)
            .map_err(|e| UpstreamError::InvalidUrl(format!("{url}: {e}")))
    }

    /// Cached fetch for an index endpoint, see [`NseApi::fetch`].
    pub async fn fetch_cached(&self, key: &str, url: &str) -> Result<Value, UpstreamError> {
        self.fetch(key, url, self.cached_retry).await
    }

    /// Serves `key` from the cache while it is fresh, otherwise fetches `url`.
    ///
    /// Concurrent misses for one key share a single upstream fetch: the first
    /// caller runs the retry loop and everyone waiting gets its outcome, so an
    /// outage fails them together instead of one after another. Failures never
    /// touch the cache: a stale entry stays as it was.
    pub async fn fetch(
        &self,
        key: &str,
        url: &str,
        policy: RetryPolicy,
    ) -> Result<Value, UpstreamError> {
        loop {
            if let Some(payload) = self.cache.get_fresh(key, self.clock.now_millis()) {
                debug!("Cache hit for {}", key);
                return Ok(payload);
            }

            match self.cache.join_flight(key) {
                Flight::Leader(leader) => {
                    debug!("Cache miss for {}", key);
                    let outcome = self.fetch_with_retry(url, policy).await;
                    if let Ok(payload) = &outcome {
                        self.cache
                            .insert(key, payload.clone(), self.clock.now_millis());
                    }
                    leader.finish(&outcome);
                    return outcome;
                }
                Flight::Follower(follower) => {
                    debug!("Waiting on in-flight fetch for {}", key);
                    if let Some(outcome) = follower.outcome().await {
                        return outcome;
                    }
                    debug!("In-flight fetch for {} was abandoned", key);
                }
            }
        }
    }

    /// Per-symbol fetch that bypasses the cache.
    pub async fn fetch_uncached(&self, url: &str) -> Result<Value, UpstreamError> {
        self.fetch_with_retry(url, self.per_symbol_retry).await
    }

    async fn fetch_with_retry(&self, url: &str, policy: RetryPolicy) -> Result<Value, UpstreamError> {
        policy
            .run(
                url,
                move |_| self.get_json(url),
                move |_, _: &UpstreamError| async move {
                    if let Err(e) = self.session.ensure_session(true).await {
                        warn!("Session refresh failed: {}", e);
                    }
                },
            )
            .await
    }

    async fn get_json(&self, url: &str) -> Result<Value, UpstreamError> {
        let mut request = self.client.get(url);
        if let Some(cookie) = self.session.cookie_header() {
            request = request.header(header::COOKIE, cookie);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let err = UpstreamError::Status(status);
            if err.is_forbidden() {
                self.session.invalidate();
            }
            return Err(err);
        }

        let body = response.bytes().await?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return Err(UpstreamError::EmptyPayload);
        }
        match serde_json::from_slice::<Value>(&body)? {
            Value::Null => Err(UpstreamError::EmptyPayload),
            payload => Ok(payload),
        }
    }
}
