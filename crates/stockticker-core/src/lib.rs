//! # Stockticker Core
//!
//! Closing price reports for a single configured symbol, served from a
//! single-flight time series cache that expires at the end of the trading day.
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapters`] | Alpha Vantage time series adapter |
//! | [`aggregator`] | Report building and the [`QuoteAggregator`] service |
//! | [`cache`] | Expiring store and the single-flight [`TimeSeriesCache`] |
//! | [`clock`] | System and manual clocks |
//! | [`data_source`] | Upstream source trait and structured errors |
//! | [`domain`] | Symbols, time series, reports |
//! | [`error`] | Core error types |
//! | [`http_client`] | HTTP transport abstraction |
//! | [`throttling`] | Client-side request budget |
//! | [`trading_day`] | End-of-day expiry in the series time zone |
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │  HTTP handler   │
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │ QuoteAggregator │────▶│ TimeSeriesCache  │
//! └─────────────────┘     └────────┬─────────┘
//!                                  │ miss (one at a time)
//!                                  ▼
//!                         ┌──────────────────┐     ┌──────────────┐
//!                         │ TimeSeriesSource │────▶│ HttpClient   │
//!                         └──────────────────┘     └──────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use stockticker_core::{
//!     AggregatorConfig, AlphaVantageAdapter, AlphaVantageConfig, QuoteAggregator, Symbol,
//!     TimeSeriesCache,
//! };
//!
//! let source = Arc::new(AlphaVantageAdapter::new(AlphaVantageConfig::default()));
//! let aggregator = QuoteAggregator::new(
//!     AggregatorConfig::new(Symbol::parse("MSFT")?),
//!     TimeSeriesCache::default(),
//!     source,
//! );
//! let report = aggregator.closing_price_report().await?;
//! println!("{}", report.average_price);
//! ```

pub mod adapters;
pub mod aggregator;
pub mod cache;
pub mod clock;
pub mod data_source;
pub mod domain;
pub mod error;
pub mod http_client;
pub mod throttling;
pub mod trading_day;

pub use adapters::{AlphaVantageAdapter, AlphaVantageConfig};

pub use aggregator::{build_report, AggregatorConfig, QuoteAggregator, DEFAULT_WINDOW_DAYS};

pub use cache::{CacheEntry, CacheKey, CacheStore, CachedSeries, SeriesOrigin, TimeSeriesCache};

pub use clock::{Clock, ManualClock, SystemClock};

pub use data_source::{SeriesFuture, SourceError, SourceErrorKind, TimeSeriesSource};

pub use domain::{
    ClosingPriceReport, ClosingStockPrice, DailyRecord, SeriesKind, SeriesMetadata, Symbol,
    TimeSeries,
};

pub use error::{CacheStoreError, QuoteError, ReportError, ValidationError};

pub use http_client::{HttpClient, HttpError, HttpRequest, HttpResponse, ReqwestHttpClient};

pub use throttling::{QuotaPolicy, RequestThrottle};
