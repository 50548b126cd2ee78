use crate::error::ConfigError;
use crate::models::retry::RetryPolicy;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_ORIGIN: &str = "https://www.nseindia.com";
pub const DEFAULT_ALLOWED_ORIGINS: [&str; 2] =
    ["http://localhost:3000", "https://stock-data-eight.vercel.app"];

/// How the proxy talks to the exchange.
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    /// Scheme and host of the exchange; its root page hands out the session cookie.
    pub origin: String,
    pub cache_ttl: Duration,
    /// `None` keeps a cookie until the origin rejects it.
    pub session_ttl: Option<Duration>,
    pub request_timeout: Duration,
    /// Cookie to start with instead of bootstrapping on the first request.
    pub initial_cookie: Option<String>,
    pub cached_retry: RetryPolicy,
    pub per_symbol_retry: RetryPolicy,
    pub session_retry: RetryPolicy,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            origin: DEFAULT_ORIGIN.to_string(),
            cache_ttl: Duration::from_millis(5_000),
            session_ttl: Some(Duration::from_millis(5_000)),
            request_timeout: Duration::from_millis(15_000),
            initial_cookie: None,
            cached_retry: RetryPolicy::cached(),
            per_symbol_retry: RetryPolicy::per_symbol(),
            session_retry: RetryPolicy::session(),
        }
    }
}

impl UpstreamConfig {
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = origin.into().trim_end_matches('/').to_string();
        self
    }

    /// Same attempt counts, no waiting between attempts.
    pub fn without_backoff(mut self) -> Self {
        self.cached_retry = self.cached_retry.without_backoff();
        self.per_symbol_retry = self.per_symbol_retry.without_backoff();
        self.session_retry = self.session_retry.without_backoff();
        self
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub upstream: UpstreamConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            allowed_origins: DEFAULT_ALLOWED_ORIGINS.iter().map(|o| o.to_string()).collect(),
            upstream: UpstreamConfig::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| {
            lookup(var)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let mut config = Config::default();

        if let Some(port) = get("PORT") {
            config.port = parse_var("PORT", &port)?;
        }
        if let Some(origins) = get("ALLOWED_ORIGINS") {
            config.allowed_origins = origins
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect();
        }
        if let Some(origin) = get("NSE_ORIGIN") {
            config.upstream = config.upstream.with_origin(origin);
        }
        config.upstream.initial_cookie = get("NSE_COOKIE");
        if let Some(ttl) = get("CACHE_TTL_MS") {
            config.upstream.cache_ttl = Duration::from_millis(parse_var("CACHE_TTL_MS", &ttl)?);
        }
        if let Some(ttl) = get("SESSION_TTL_MS") {
            let millis: u64 = parse_var("SESSION_TTL_MS", &ttl)?;
            config.upstream.session_ttl = (millis > 0).then_some(Duration::from_millis(millis));
        }
        if let Some(timeout) = get("REQUEST_TIMEOUT_MS") {
            config.upstream.request_timeout =
                Duration::from_millis(parse_var("REQUEST_TIMEOUT_MS", &timeout)?);
        }

        Ok(config)
    }
}

fn parse_var<T: std::str::FromStr>(var: &'static str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::Invalid {
        var,
        value: value.to_string(),
    })
}
