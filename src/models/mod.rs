pub mod cache;
pub mod clock;
pub mod retry;
pub mod stock;
