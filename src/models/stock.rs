use serde::Serialize;
use serde_json::{json, Map, Value};

/// Numeric field that tolerates absent values, nulls and numeric strings.
pub fn num_field(obj: &Value, name: &str) -> f64 {
    obj.get(name).and_then(parse_number).unwrap_or(0.0)
}

pub fn str_field(obj: &Value, name: &str) -> String {
    obj.get(name)
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string()
}

/// Accepts JSON numbers and strings such as `"1,234.50"`.
pub fn parse_number(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', "").parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|n| n.is_finite())
}

/// The `data` array of an index payload.
pub fn data_rows(payload: &Value) -> Option<&Vec<Value>> {
    payload.get("data").and_then(|d| d.as_array())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockRecord {
    pub symbol: String,
    pub identifier: String,
    pub last_price: f64,
    pub change: f64,
    pub p_change: f64,
    pub open: f64,
    pub day_high: f64,
    pub day_low: f64,
    pub previous_close: f64,
    pub total_traded_volume: f64,
    pub total_traded_value: f64,
    pub year_high: f64,
    pub year_low: f64,
    #[serde(rename = "perChange365d")]
    pub per_change_365d: f64,
    #[serde(rename = "perChange30d")]
    pub per_change_30d: f64,
    pub last_update_time: String,
}

impl StockRecord {
    pub fn from_row(row: &Value, fallback_time: &str) -> Self {
        let last_update_time = match row.get("lastUpdateTime").and_then(|v| v.as_str()) {
            Some(t) if !t.is_empty() => t.to_string(),
            _ => fallback_time.to_string(),
        };

        Self {
            symbol: str_field(row, "symbol"),
            identifier: str_field(row, "identifier"),
            last_price: num_field(row, "lastPrice"),
            change: num_field(row, "change"),
            p_change: num_field(row, "pChange"),
            open: num_field(row, "open"),
            day_high: num_field(row, "dayHigh"),
            day_low: num_field(row, "dayLow"),
            previous_close: num_field(row, "previousClose"),
            total_traded_volume: num_field(row, "totalTradedVolume"),
            total_traded_value: num_field(row, "totalTradedValue"),
            year_high: num_field(row, "yearHigh"),
            year_low: num_field(row, "yearLow"),
            per_change_365d: num_field(row, "perChange365d"),
            per_change_30d: num_field(row, "perChange30d"),
            last_update_time,
        }
    }

    /// Normalizes every row of an index payload; anything else yields no rows.
    pub fn from_payload(payload: &Value, fallback_time: &str) -> Vec<Self> {
        data_rows(payload)
            .map(|rows| {
                rows.iter()
                    .map(|row| Self::from_row(row, fallback_time))
                    .collect()
            })
            .unwrap_or_default()
    }
}

pub const BANK_NIFTY_INDEX: &str = "NIFTY BANK";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BankNiftyConstituent {
    pub symbol: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub pre_close: f64,
    pub last_price: f64,
    pub change: f64,
    pub p_change: f64,
    pub volume: f64,
    pub indices: Vec<&'static str>,
}

impl BankNiftyConstituent {
    pub fn from_row(row: &Value) -> Self {
        Self {
            symbol: str_field(row, "symbol"),
            open: num_field(row, "open"),
            high: num_field(row, "dayHigh"),
            low: num_field(row, "dayLow"),
            pre_close: num_field(row, "previousClose"),
            last_price: num_field(row, "lastPrice"),
            change: num_field(row, "change"),
            p_change: num_field(row, "pChange"),
            volume: num_field(row, "totalTradedVolume"),
            indices: vec![BANK_NIFTY_INDEX],
        }
    }
}

/// One daily OHLC bar. Unparsable prices serialize as `null`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candle {
    pub date: Value,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
}

impl Candle {
    pub fn from_row(row: &Value) -> Self {
        let price = |name: &str| row.get(name).and_then(parse_number);
        Self {
            date: row.get("CH_TIMESTAMP").cloned().unwrap_or(Value::Null),
            open: price("CH_OPENING_PRICE"),
            high: price("CH_TRADE_HIGH_PRICE"),
            low: price("CH_TRADE_LOW_PRICE"),
            close: price("CH_CLOSING_PRICE"),
        }
    }
}

/// Zeroed snapshot served when an index could not be fetched.
pub fn default_index_snapshot(symbol: &str, last_update_time: &str) -> Value {
    json!({
        "symbol": symbol,
        "lastPrice": 0,
        "change": 0,
        "pChange": 0,
        "open": 0,
        "dayHigh": 0,
        "dayLow": 0,
        "previousClose": 0,
        "yearHigh": 0,
        "yearLow": 0,
        "totalTradedVolume": 0,
        "totalTradedValue": 0,
        "previousDayVolume": 0,
        "lowerCircuit": 0,
        "upperCircuit": 0,
        "lastUpdateTime": last_update_time,
    })
}

/// First row of an index payload with `previousDayVolume` filled in.
///
/// A missing or zero previous-day volume is estimated as 90% of today's.
pub fn index_snapshot(payload: &Value) -> Option<Value> {
    let mut row: Map<String, Value> = data_rows(payload)?.first()?.as_object()?.clone();
    let reported = row.get("previousDayVolume").and_then(parse_number);
    if reported.map_or(true, |v| v == 0.0) {
        let today = row
            .get("totalTradedVolume")
            .and_then(parse_number)
            .unwrap_or(0.0);
        row.insert(
            "previousDayVolume".to_string(),
            json!((today * 0.9).floor() as i64),
        );
    }
    Some(Value::Object(row))
}
