use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use serde_json::{json, Value};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

use crate::services::market_service::MarketService;

pub type AppState = Arc<MarketService>;

/// JSON failure body: `{ "error": ..., "message": ... }` with a 500 status.
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ApiError {
    pub fn new(error: &'static str) -> Self {
        Self {
            error,
            message: None,
        }
    }

    pub fn with_message(error: &'static str, cause: impl ToString) -> Self {
        Self {
            error,
            message: Some(cause.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (StatusCode::INTERNAL_SERVER_ERROR, Json(self)).into_response()
    }
}

/// Build the router for the dashboard API.
pub fn router(state: AppState, allowed_origins: &[String]) -> Router {
    Router::new()
        .route("/", get(liveness))
        .route("/api/nifty50", get(nifty50))
        .route("/api/nifty", get(nifty))
        .route("/api/banknifty", get(banknifty))
        .route("/api/banknifty-stocks", get(banknifty_stocks))
        .route("/api/stock/{symbol}", get(stock_detail))
        .route("/api/historical/{symbol}", get(historical))
        .route("/api/indices", get(indices))
        .layer(cors_layer(allowed_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
        .max_age(Duration::from_secs(86_400))
}

async fn liveness() -> Json<Value> {
    Json(json!({ "message": "Hello from NSE proxy server!" }))
}

async fn nifty50(State(service): State<AppState>) -> Result<Json<Value>, ApiError> {
    service.nifty50_snapshot().await.map(Json).map_err(|e| {
        error!("GET /api/nifty50 failed: {}", e);
        ApiError::new("Failed to fetch data from NSE")
    })
}

async fn nifty(State(service): State<AppState>) -> impl IntoResponse {
    Json(service.nifty_stocks().await)
}

async fn banknifty(State(service): State<AppState>) -> impl IntoResponse {
    Json(service.bank_nifty_stocks().await)
}

async fn banknifty_stocks(State(service): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    service.bank_nifty_constituents().await.map(Json).map_err(|e| {
        error!("GET /api/banknifty-stocks failed: {}", e);
        ApiError::with_message("Failed to fetch Bank Nifty stocks", e)
    })
}

async fn stock_detail(
    State(service): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Json<Value>, ApiError> {
    service.stock_detail(&symbol).await.map(Json).map_err(|e| {
        error!("GET /api/stock/{} failed: {}", symbol, e);
        ApiError::with_message("Failed to fetch stock details", e)
    })
}

async fn historical(
    State(service): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    service.historical(&symbol).await.map(Json).map_err(|e| {
        error!("GET /api/historical/{} failed: {}", symbol, e);
        ApiError::with_message("Failed to fetch historical data from NSE", e)
    })
}

async fn indices(State(service): State<AppState>) -> impl IntoResponse {
    Json(service.indices().await)
}
