pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod server;
pub mod services;
pub mod utils;

// Re-export commonly used items
pub use api::nse::NseApi;
pub use config::Config;
pub use services::market_service::MarketService;
