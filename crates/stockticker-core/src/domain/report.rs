use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Closing price of a single trading day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClosingStockPrice {
    pub date: String,
    pub price: Decimal,
}

/// Closing prices for the requested window plus their mean.
///
/// Serializes as `{"prices": [...], "averagePrice": "..."}` with decimals
/// rendered as strings so no precision is lost on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClosingPriceReport {
    pub prices: Vec<ClosingStockPrice>,
    pub average_price: Decimal,
}
