use crate::api::nse::{keys, NseApi, NIFTY_50_INDEX, NIFTY_500_INDEX};
use crate::error::{ServiceError, UpstreamError};
use crate::models::stock::{
    data_rows, default_index_snapshot, index_snapshot, BankNiftyConstituent, Candle, StockRecord,
    BANK_NIFTY_INDEX,
};
use crate::services::market_status::{market_status, MarketStatus};
use crate::utils::display::{format_elapsed, format_exchange_timestamp};
use serde::Serialize;
use serde_json::Value;
use std::time::Instant;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndicesView {
    pub market_status: MarketStatus,
    pub nifty50: Value,
    pub bank_nifty: Value,
    pub performance: Performance,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Performance {
    pub fetch_time: String,
    pub cached: bool,
}

/// Shapes exchange payloads into what the dashboard consumes.
pub struct MarketService {
    api: NseApi,
}

impl MarketService {
    pub fn new(api: NseApi) -> Self {
        Self { api }
    }

    pub fn api(&self) -> &NseApi {
        &self.api
    }

    fn now_label(&self) -> String {
        format_exchange_timestamp(self.api.clock().now())
    }

    /// Best-effort session warm-up.
    async fn warm_session(&self) {
        if let Err(e) = self.api.session().ensure_session(false).await {
            warn!("Proceeding without a fresh session: {}", e);
        }
    }

    pub async fn nifty50_snapshot(&self) -> Result<Value, UpstreamError> {
        let url = self.api.index_url(NIFTY_50_INDEX)?;
        self.api.fetch_cached(keys::NIFTY_50, &url).await
    }

    async fn nifty500_payload(&self) -> Result<Value, UpstreamError> {
        let url = self.api.index_url(NIFTY_500_INDEX)?;
        self.api.fetch_cached(keys::NIFTY_500, &url).await
    }

    async fn bank_nifty_payload(&self) -> Result<Value, UpstreamError> {
        let url = self.api.index_url(BANK_NIFTY_INDEX)?;
        self.api.fetch_cached(keys::BANK_NIFTY, &url).await
    }

    /// NIFTY 500 constituents; empty when the exchange is unreachable.
    pub async fn nifty_stocks(&self) -> Vec<StockRecord> {
        match self.nifty500_payload().await {
            Ok(payload) => StockRecord::from_payload(&payload, &self.now_label()),
            Err(e) => {
                error!("Serving empty NIFTY 500 list: {}", e);
                Vec::new()
            }
        }
    }

    /// NIFTY BANK constituents; empty when the exchange is unreachable.
    pub async fn bank_nifty_stocks(&self) -> Vec<StockRecord> {
        self.warm_session().await;
        match self.bank_nifty_payload().await {
            Ok(payload) => StockRecord::from_payload(&payload, &self.now_label()),
            Err(e) => {
                error!("Serving empty NIFTY BANK list: {}", e);
                Vec::new()
            }
        }
    }

    pub async fn bank_nifty_constituents(&self) -> Result<Vec<BankNiftyConstituent>, ServiceError> {
        let payload = self.bank_nifty_payload().await?;
        let rows = data_rows(&payload).ok_or(ServiceError::MalformedPayload("missing data array"))?;
        Ok(rows.iter().map(BankNiftyConstituent::from_row).collect())
    }

    /// Quote merged with its trade-info section under `tradeInfo`.
    pub async fn stock_detail(&self, symbol: &str) -> Result<Value, UpstreamError> {
        let quote = self.api.fetch_uncached(&self.api.quote_url(symbol)?).await?;
        let trade_info = self
            .api
            .fetch_uncached(&self.api.trade_info_url(symbol)?)
            .await?;

        let mut combined = match quote {
            Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };
        combined.insert("tradeInfo".to_string(), trade_info);
        Ok(Value::Object(combined))
    }

    pub async fn historical(&self, symbol: &str) -> Result<Vec<Candle>, ServiceError> {
        let payload = self
            .api
            .fetch_uncached(&self.api.historical_url(symbol)?)
            .await?;
        let rows = data_rows(&payload).ok_or(ServiceError::MalformedPayload("missing data array"))?;
        Ok(rows.iter().map(Candle::from_row).collect())
    }

    /// Both headline indices plus the current market session. Never fails:
    /// an index that cannot be fetched is replaced by a zeroed snapshot.
    pub async fn indices(&self) -> IndicesView {
        let started = Instant::now();
        let market_status = market_status(self.api.clock().now());
        self.warm_session().await;

        let (nifty50, bank_nifty) = tokio::join!(self.nifty50_snapshot(), self.bank_nifty_payload());
        let now_label = self.now_label();

        let nifty50 = nifty50
            .map_err(|e| warn!("NIFTY 50 unavailable: {}", e))
            .ok()
            .and_then(|payload| index_snapshot(&payload))
            .unwrap_or_else(|| default_index_snapshot(NIFTY_50_INDEX, &now_label));
        let bank_nifty = bank_nifty
            .map_err(|e| warn!("NIFTY BANK unavailable: {}", e))
            .ok()
            .and_then(|payload| index_snapshot(&payload))
            .unwrap_or_else(|| default_index_snapshot(BANK_NIFTY_INDEX, &now_label));

        let cache = self.api.cache();
        let performance = Performance {
            fetch_time: format_elapsed(started.elapsed()),
            cached: cache.has_payload(keys::NIFTY_50) && cache.has_payload(keys::BANK_NIFTY),
        };
        info!("Indices assembled in {}", performance.fetch_time);

        IndicesView {
            market_status,
            nifty50,
            bank_nifty,
            performance,
        }
    }
}
