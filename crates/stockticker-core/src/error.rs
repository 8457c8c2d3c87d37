use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::data_source::SourceError;

/// Validation errors for configuration-facing domain types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("symbol cannot be empty")]
    EmptySymbol,
    #[error("symbol length {len} exceeds max {max}")]
    SymbolTooLong { len: usize, max: usize },
    #[error("symbol must start with an ASCII letter: '{ch}'")]
    SymbolInvalidStart { ch: char },
    #[error("symbol contains invalid character '{ch}' at index {index}")]
    SymbolInvalidChar { ch: char, index: usize },
}

/// Failure to persist a freshly fetched series into the cache.
///
/// These never fail the request that triggered the fetch; the next request
/// simply misses and fetches again.
#[derive(Debug, Error)]
pub enum CacheStoreError {
    #[error("unable to serialize time series for '{key}': {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("unable to resolve time zone '{name}'")]
    UnknownTimeZone { name: String },

    #[error("no end of day exists for {date} in time zone '{time_zone}'")]
    UnresolvableEndOfDay { date: String, time_zone: String },

    #[error("entry for '{key}' expired at {expires_at} before it could be stored")]
    AlreadyExpired {
        key: String,
        expires_at: DateTime<Utc>,
    },
}

/// Errors raised while shaping a time series into a closing price report.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReportError {
    #[error("unable to parse closing price '{value}' for {date}: {reason}")]
    PriceParse {
        date: String,
        value: String,
        reason: String,
    },

    #[error("sum of closing prices overflows at {date}")]
    PriceOverflow { date: String },

    #[error("average price {average} cannot be represented with {scale} decimal places")]
    AveragePrecision { average: String, scale: u32 },

    #[error("no trading days available for a {window_days}-day window")]
    EmptySeries { window_days: usize },
}

/// Top-level error for a closing price report request.
#[derive(Debug, Error)]
pub enum QuoteError {
    #[error("unable to get time series data: {0}")]
    Upstream(#[from] SourceError),

    #[error(transparent)]
    Report(#[from] ReportError),
}
