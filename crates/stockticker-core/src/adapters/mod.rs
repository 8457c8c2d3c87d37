//! Upstream provider adapters.

mod alphavantage;

pub use alphavantage::{
    AlphaVantageAdapter, AlphaVantageConfig, DEFAULT_API_KEY_NAME, DEFAULT_BASE_URL,
};
