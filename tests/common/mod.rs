#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::Asia::Kolkata;
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use nse_proxy::config::UpstreamConfig;
use nse_proxy::models::clock::{Clock, ManualClock};
use nse_proxy::NseApi;

pub const INDEX_PATH: &str = "/api/equity-stockIndices";
pub const SEED_COOKIE: &str = "nsit=seed";

/// Tuesday 2026-10-13, 10:00 in Kolkata: the market is open.
pub fn trading_morning() -> DateTime<Utc> {
    Kolkata
        .with_ymd_and_hms(2026, 10, 13, 10, 0, 0)
        .unwrap()
        .with_timezone(&Utc)
}

pub fn test_config(server: &MockServer) -> UpstreamConfig {
    let mut config = UpstreamConfig::default()
        .with_origin(server.uri())
        .without_backoff();
    config.initial_cookie = Some(SEED_COOKIE.to_string());
    config
}

pub fn test_api(server: &MockServer) -> (NseApi, Arc<ManualClock>) {
    test_api_with(test_config(server))
}

pub fn test_api_with(config: UpstreamConfig) -> (NseApi, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(trading_morning()));
    let api = NseApi::new(&config, clock.clone() as Arc<dyn Clock>).unwrap();
    (api, clock)
}

/// Root page handing out two cookies, as the real origin does.
pub async fn mount_bootstrap(server: &MockServer, expected_calls: u64) {
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .append_header("set-cookie", "nsit=fresh; Path=/; HttpOnly")
                .append_header("set-cookie", "nseappid=abc; Path=/api; Secure"),
        )
        .expect(expected_calls)
        .mount(server)
        .await;
}

pub fn index_payload(name: &str, constituents: &[(&str, f64)]) -> Value {
    let mut rows = vec![json!({
        "symbol": name,
        "lastPrice": 24_500.5,
        "change": 120.25,
        "pChange": 0.49,
        "totalTradedVolume": 1_000_001,
    })];
    rows.extend(constituents.iter().map(|(symbol, price)| {
        json!({
            "symbol": symbol,
            "identifier": format!("{symbol}EQN"),
            "lastPrice": price,
            "open": price,
            "dayHigh": price + 10.0,
            "dayLow": price - 10.0,
            "previousClose": price - 1.0,
            "totalTradedVolume": 5_000,
            "lastUpdateTime": "13-Oct-2026 10:00:00",
        })
    }));
    json!({ "name": name, "data": rows })
}

pub async fn requests_to(server: &MockServer, request_path: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|request| request.url.path() == request_path)
        .count()
}
