use crate::utils::display::to_exchange_time;
use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MarketSession {
    PreMarket,
    Open,
    PostMarket,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MarketStatus {
    pub status: MarketSession,
    pub message: &'static str,
}

/// Trading session at `now`, judged on the exchange's wall clock.
pub fn market_status(now: DateTime<Utc>) -> MarketStatus {
    let local = to_exchange_time(now);
    let hhmm = local.hour() * 100 + local.minute();

    let (status, message) = match local.weekday() {
        Weekday::Sat | Weekday::Sun => (MarketSession::Closed, "Weekend - Market Closed"),
        _ => match hhmm {
            900..=914 => (MarketSession::PreMarket, "Pre-market Session"),
            915..=1529 => (MarketSession::Open, "Market Open"),
            1530..=1559 => (MarketSession::PostMarket, "Post-market Session"),
            _ => (MarketSession::Closed, "Market Closed"),
        },
    };

    MarketStatus { status, message }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::display::EXCHANGE_TZ;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        EXCHANGE_TZ
            .with_ymd_and_hms(y, m, d, h, min, 0)
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_tuesday_morning_is_open() {
        let now = at(2026, 10, 13, 10, 0);
        assert_eq!(to_exchange_time(now).weekday(), Weekday::Tue);
        assert_eq!(market_status(now).status, MarketSession::Open);
        assert_eq!(market_status(now).message, "Market Open");
    }

    #[test]
    fn test_saturday_is_closed_all_day() {
        for hour in [0, 9, 10, 15, 23] {
            let status = market_status(at(2026, 10, 17, hour, 20));
            assert_eq!(status.status, MarketSession::Closed);
            assert_eq!(status.message, "Weekend - Market Closed");
        }
    }

    #[test]
    fn test_monday_pre_market() {
        let now = at(2026, 10, 12, 9, 10);
        assert_eq!(to_exchange_time(now).weekday(), Weekday::Mon);
        assert_eq!(market_status(now).status, MarketSession::PreMarket);
    }

    #[test]
    fn test_friday_post_market() {
        let now = at(2026, 10, 16, 15, 45);
        assert_eq!(to_exchange_time(now).weekday(), Weekday::Fri);
        assert_eq!(market_status(now).status, MarketSession::PostMarket);
    }

    #[test]
    fn test_session_boundaries() {
        assert_eq!(market_status(at(2026, 10, 14, 8, 59)).status, MarketSession::Closed);
        assert_eq!(market_status(at(2026, 10, 14, 9, 0)).status, MarketSession::PreMarket);
        assert_eq!(market_status(at(2026, 10, 14, 9, 15)).status, MarketSession::Open);
        assert_eq!(market_status(at(2026, 10, 14, 15, 30)).status, MarketSession::PostMarket);
        assert_eq!(market_status(at(2026, 10, 14, 16, 0)).status, MarketSession::Closed);
        assert_eq!(market_status(at(2026, 10, 14, 16, 0)).message, "Market Closed");
    }

    #[test]
    fn test_serializes_kebab_case_status() {
        let value = serde_json::to_value(market_status(at(2026, 10, 12, 9, 10))).unwrap();
        assert_eq!(value, serde_json::json!({"status": "pre-market", "message": "Pre-market Session"}));
    }
}
