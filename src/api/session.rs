use crate::error::UpstreamError;
use crate::models::cache::SessionState;
use crate::models::clock::Clock;
use crate::models::retry::RetryPolicy;
use parking_lot::RwLock;
use reqwest::header::SET_COOKIE;
use reqwest::{Client, Response};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Holds the single anti-bot cookie shared by every upstream call.
pub struct SessionManager {
    client: Client,
    bootstrap_url: String,
    ttl: Option<Duration>,
    policy: RetryPolicy,
    clock: Arc<dyn Clock>,
    state: RwLock<SessionState>,
}

impl SessionManager {
    pub fn new(
        client: Client,
        bootstrap_url: String,
        ttl: Option<Duration>,
        policy: RetryPolicy,
        clock: Arc<dyn Clock>,
        initial_cookie: Option<String>,
    ) -> Self {
        let state = SessionState {
            fetched_at_millis: clock.now_millis(),
            cookie_header_value: initial_cookie,
        };
        Self {
            client,
            bootstrap_url,
            ttl,
            policy,
            clock,
            state: RwLock::new(state),
        }
    }

    /// Value to send in the `Cookie` header, if a session is held.
    pub fn cookie_header(&self) -> Option<String> {
        self.state.read().cookie_header_value.clone()
    }

    pub fn state(&self) -> SessionState {
        self.state.read().clone()
    }

    /// Drops the current cookie after the origin rejected it.
    pub fn invalidate(&self) {
        debug!("Invalidating upstream session");
        self.state.write().clear();
    }

    /// Makes sure a usable cookie is held.
    ///
    /// A fresh session short-circuits unless `force_refresh` is set. Otherwise
    /// the origin's root page is requested until it hands out cookies or the
    /// session policy runs out of attempts; the last failure is returned and
    /// the previous state is left untouched.
    pub async fn ensure_session(&self, force_refresh: bool) -> Result<(), UpstreamError> {
        if !force_refresh && self.state.read().is_fresh(self.clock.now_millis(), self.ttl) {
            debug!("Reusing fresh upstream session");
            return Ok(());
        }

        let cookie = self
            .policy
            .run(
                "Session bootstrap",
                move |_| self.bootstrap(),
                |_, _: &UpstreamError| async {},
            )
            .await?;

        info!("Acquired upstream session");
        *self.state.write() = SessionState {
            cookie_header_value: Some(cookie),
            fetched_at_millis: self.clock.now_millis(),
        };
        Ok(())
    }

    async fn bootstrap(&self) -> Result<String, UpstreamError> {
        debug!("Requesting session cookies from {}", self.bootstrap_url);
        let response = self
            .client
            .get(&self.bootstrap_url)
            .send()
            .await?
            .error_for_status()?;

        join_set_cookies(&response).ok_or(UpstreamError::NoSessionCookie)
    }
}

/// Folds every `Set-Cookie` directive into one `Cookie` header value,
/// keeping only the `name=value` pairs.
fn join_set_cookies(response: &Response) -> Option<String> {
    let pairs: Vec<&str> = response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|directive| directive.split(';').next())
        .map(str::trim)
        .filter(|pair| pair.contains('='))
        .collect();

    if pairs.is_empty() {
        None
    } else {
        Some(pairs.join("; "))
    }
}
