//! Upstream time series contract.
//!
//! The cache never talks to a provider directly; it is handed a fetch future
//! built on top of a [`TimeSeriesSource`]. Adapters (see [`crate::adapters`])
//! implement the trait, tests substitute their own.

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;

use crate::{SeriesKind, Symbol, TimeSeries};

/// Adapter-level error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceErrorKind {
    Unavailable,
    RateLimited,
    InvalidRequest,
    Internal,
}

/// Structured upstream fetch error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    kind: SourceErrorKind,
    message: String,
    retryable: bool,
}

impl SourceError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Unavailable,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::RateLimited,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::InvalidRequest,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Internal,
            message: message.into(),
            retryable: false,
        }
    }

    pub const fn kind(&self) -> SourceErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Whether a later attempt may succeed. Informational only: the core
    /// never retries on its own.
    pub const fn retryable(&self) -> bool {
        self.retryable
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            SourceErrorKind::Unavailable => "source.unavailable",
            SourceErrorKind::RateLimited => "source.rate_limited",
            SourceErrorKind::InvalidRequest => "source.invalid_request",
            SourceErrorKind::Internal => "source.internal",
        }
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for SourceError {}

/// Boxed future returned by [`TimeSeriesSource::time_series`].
pub type SeriesFuture<'a> = Pin<Box<dyn Future<Output = Result<TimeSeries, SourceError>> + Send + 'a>>;

/// Provider of raw time series, one call per `(kind, symbol)` pair.
pub trait TimeSeriesSource: Send + Sync {
    fn time_series<'a>(&'a self, kind: SeriesKind, symbol: &'a Symbol) -> SeriesFuture<'a>;
}
