pub mod nse;
pub mod session;
