//! # Domain Models
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Symbol`] | Validated stock ticker |
//! | [`SeriesKind`] | Upstream series function (daily, weekly, monthly) |
//! | [`TimeSeries`] | Provider series with metadata and per-day records |
//! | [`ClosingPriceReport`] | Truncated closing prices and their average |
//!
//! Prices stay strings inside [`TimeSeries`]; they only become
//! [`rust_decimal::Decimal`] when a report is built, so a malformed value
//! surfaces as a report error instead of being dropped on ingest.

mod report;
mod series;
mod symbol;

pub use report::{ClosingPriceReport, ClosingStockPrice};
pub use series::{DailyRecord, SeriesKind, SeriesMetadata, TimeSeries};
pub use symbol::Symbol;
