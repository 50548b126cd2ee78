pub mod market_service;
pub mod market_status;
