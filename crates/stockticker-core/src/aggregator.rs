//! Closing price reports built from cached time series.

use std::str::FromStr;
use std::sync::Arc;

use rust_decimal::{Decimal, RoundingStrategy};
use tracing::warn;

use crate::cache::{CacheKey, SeriesOrigin, TimeSeriesCache};
use crate::data_source::TimeSeriesSource;
use crate::{
    ClosingPriceReport, ClosingStockPrice, QuoteError, ReportError, SeriesKind, Symbol, TimeSeries,
};

/// Decimal places kept in the reported average.
pub const AVERAGE_PRICE_SCALE: u32 = 4;

/// Default report window in trading days.
pub const DEFAULT_WINDOW_DAYS: usize = 7;

/// Builds a report from the most recent `window_days` trading days of `series`.
///
/// A series shorter than the window yields every available day. The whole
/// report fails on the first unparseable closing price, and on sums or
/// averages outside the range of [`Decimal`].
pub fn build_report(
    series: &TimeSeries,
    window_days: usize,
) -> Result<ClosingPriceReport, ReportError> {
    let mut prices = Vec::with_capacity(window_days.min(series.len()));
    let mut total = Decimal::ZERO;

    for date in series.trading_days().take(window_days) {
        let raw = series.closing_price(date).unwrap_or_default();
        let price = Decimal::from_str(raw).map_err(|error| ReportError::PriceParse {
            date: date.to_owned(),
            value: raw.to_owned(),
            reason: error.to_string(),
        })?;

        total = total
            .checked_add(price)
            .ok_or_else(|| ReportError::PriceOverflow {
                date: date.to_owned(),
            })?;
        prices.push(ClosingStockPrice {
            date: date.to_owned(),
            price,
        });
    }

    if prices.is_empty() {
        return Err(ReportError::EmptySeries { window_days });
    }

    let mut average_price = (total / Decimal::from(prices.len()))
        .round_dp_with_strategy(AVERAGE_PRICE_SCALE, RoundingStrategy::MidpointAwayFromZero);
    average_price.rescale(AVERAGE_PRICE_SCALE);
    // `rescale` lowers the scale instead of failing when the mantissa overflows.
    if average_price.scale() != AVERAGE_PRICE_SCALE {
        return Err(ReportError::AveragePrecision {
            average: average_price.to_string(),
            scale: AVERAGE_PRICE_SCALE,
        });
    }

    Ok(ClosingPriceReport {
        prices,
        average_price,
    })
}

/// What to report on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatorConfig {
    pub symbol: Symbol,
    pub series_kind: SeriesKind,
    pub window_days: usize,
}

impl AggregatorConfig {
    pub fn new(symbol: Symbol) -> Self {
        Self {
            symbol,
            series_kind: SeriesKind::Daily,
            window_days: DEFAULT_WINDOW_DAYS,
        }
    }

    pub fn with_series_kind(mut self, series_kind: SeriesKind) -> Self {
        self.series_kind = series_kind;
        self
    }

    pub fn with_window_days(mut self, window_days: usize) -> Self {
        self.window_days = window_days;
        self
    }
}

/// Answers closing price requests for one configured symbol.
#[derive(Clone)]
pub struct QuoteAggregator {
    config: AggregatorConfig,
    cache: TimeSeriesCache,
    source: Arc<dyn TimeSeriesSource>,
}

impl QuoteAggregator {
    pub fn new(
        config: AggregatorConfig,
        cache: TimeSeriesCache,
        source: Arc<dyn TimeSeriesSource>,
    ) -> Self {
        Self {
            config,
            cache,
            source,
        }
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    pub fn cache_key(&self) -> CacheKey {
        CacheKey::new(self.config.series_kind, &self.config.symbol)
    }

    pub async fn closing_price_report(&self) -> Result<ClosingPriceReport, QuoteError> {
        let source = Arc::clone(&self.source);
        let symbol = self.config.symbol.clone();
        let kind = self.config.series_kind;

        let cached = self
            .cache
            .get_or_fetch(&self.cache_key(), move || async move {
                source.time_series(kind, &symbol).await
            })
            .await?;

        if let SeriesOrigin::UpstreamUnstored(error) = &cached.origin {
            warn!(
                symbol = %self.config.symbol,
                series = %self.config.series_kind,
                %error,
                "serving time series that could not be cached"
            );
        }

        Ok(build_report(&cached.series, self.config.window_days)?)
    }
}
