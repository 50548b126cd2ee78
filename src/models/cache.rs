use crate::error::UpstreamError;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::watch;

pub type FlightOutcome = Result<Value, UpstreamError>;
type FlightSlot = watch::Receiver<Option<FlightOutcome>>;

#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub key: String,
    pub payload: Option<Value>,
    pub fetched_at_millis: i64,
}

impl CacheEntry {
    pub fn is_fresh(&self, now_millis: i64, ttl: Duration) -> bool {
        self.payload.is_some() && now_millis - self.fetched_at_millis < ttl.as_millis() as i64
    }
}

/// In-memory response cache keyed by logical endpoint.
///
/// Entries are overwritten in place on every successful fetch and never
/// removed. While a key is being fetched it has an in-flight slot: the
/// first caller leads the fetch, later callers follow and receive the
/// leader's outcome, success or failure.
#[derive(Debug)]
pub struct ResponseCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, CacheEntry>>,
    in_flight: Mutex<HashMap<String, FlightSlot>>,
}

pub enum Flight<'a> {
    Leader(FlightLeader<'a>),
    Follower(FlightFollower),
}

/// Owns the in-flight slot for a key; the slot is released on drop.
pub struct FlightLeader<'a> {
    cache: &'a ResponseCache,
    key: String,
    tx: watch::Sender<Option<FlightOutcome>>,
}

impl FlightLeader<'_> {
    pub fn finish(self, outcome: &FlightOutcome) {
        self.tx.send_replace(Some(outcome.clone()));
    }
}

impl Drop for FlightLeader<'_> {
    fn drop(&mut self) {
        self.cache.in_flight.lock().remove(&self.key);
    }
}

pub struct FlightFollower {
    rx: FlightSlot,
}

impl FlightFollower {
    /// The leader's outcome, or `None` if the leader went away without one.
    pub async fn outcome(mut self) -> Option<FlightOutcome> {
        self.rx
            .wait_for(Option::is_some)
            .await
            .ok()
            .and_then(|outcome| (*outcome).clone())
    }
}

impl ResponseCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Payload for `key` if it was fetched less than one TTL ago.
    pub fn get_fresh(&self, key: &str, now_millis: i64) -> Option<Value> {
        let entries = self.entries.lock();
        entries
            .get(key)
            .filter(|entry| entry.is_fresh(now_millis, self.ttl))
            .and_then(|entry| entry.payload.clone())
    }

    pub fn insert(&self, key: &str, payload: Value, now_millis: i64) {
        self.entries.lock().insert(
            key.to_string(),
            CacheEntry {
                key: key.to_string(),
                payload: Some(payload),
                fetched_at_millis: now_millis,
            },
        );
    }

    pub fn entry(&self, key: &str) -> Option<CacheEntry> {
        self.entries.lock().get(key).cloned()
    }

    /// Whether `key` holds any payload, fresh or stale.
    pub fn has_payload(&self, key: &str) -> bool {
        self.entries
            .lock()
            .get(key)
            .is_some_and(|entry| entry.payload.is_some())
    }

    /// Joins the fetch already running for `key`, or starts leading one.
    pub fn join_flight(&self, key: &str) -> Flight<'_> {
        let mut in_flight = self.in_flight.lock();
        if let Some(rx) = in_flight.get(key) {
            return Flight::Follower(FlightFollower { rx: rx.clone() });
        }

        let (tx, rx) = watch::channel(None);
        in_flight.insert(key.to_string(), rx);
        Flight::Leader(FlightLeader {
            cache: self,
            key: key.to_string(),
            tx,
        })
    }
}

/// The shared anti-bot cookie and when it was obtained.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    pub cookie_header_value: Option<String>,
    pub fetched_at_millis: i64,
}

impl SessionState {
    /// With no TTL the cookie is reused until the origin rejects it.
    pub fn is_fresh(&self, now_millis: i64, ttl: Option<Duration>) -> bool {
        match (&self.cookie_header_value, ttl) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(_), Some(ttl)) => now_millis - self.fetched_at_millis < ttl.as_millis() as i64,
        }
    }

    pub fn clear(&mut self) {
        self.cookie_header_value = None;
    }
}
