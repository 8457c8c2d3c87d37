use std::time::Duration;

use clap::{Parser, ValueEnum};
use stockticker_core::adapters::{DEFAULT_API_KEY_NAME, DEFAULT_BASE_URL};
use stockticker_core::{
    AggregatorConfig, AlphaVantageConfig, SeriesKind, Symbol, ValidationError, DEFAULT_WINDOW_DAYS,
};

/// Serves closing price reports for one stock symbol.
#[derive(Debug, Clone, Parser)]
#[command(name = "stockticker", version, about)]
pub struct Config {
    /// Address to bind.
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// Ticker symbol to report on.
    #[arg(long, env = "QUERY_STOCK_SYMBOL", default_value = "MSFT")]
    pub query_stock_symbol: String,

    /// Number of most recent trading days in a report.
    #[arg(long, env = "QUERY_NDAYS", default_value_t = DEFAULT_WINDOW_DAYS)]
    pub query_ndays: usize,

    #[arg(long, env = "QUERY_SERIES", value_enum, default_value_t = SeriesSelector::Daily)]
    pub query_series: SeriesSelector,

    #[arg(long, env = "ALPHA_VANTAGE_URL", default_value = DEFAULT_BASE_URL)]
    pub alpha_vantage_url: String,

    #[arg(long, env = "ALPHA_VANTAGE_KEY_NAME", default_value = DEFAULT_API_KEY_NAME)]
    pub alpha_vantage_key_name: String,

    #[arg(long, env = "ALPHA_VANTAGE_KEY_VALUE", default_value = "", hide_env_values = true)]
    pub alpha_vantage_key_value: String,

    /// Timeout for a single upstream call, in milliseconds.
    #[arg(long, env = "UPSTREAM_TIMEOUT_MS", default_value_t = 5_000)]
    pub upstream_timeout_ms: u64,

    /// Timeout for a whole inbound request, in seconds.
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SeriesSelector {
    Daily,
    Weekly,
    Monthly,
}

impl From<SeriesSelector> for SeriesKind {
    fn from(value: SeriesSelector) -> Self {
        match value {
            SeriesSelector::Daily => Self::Daily,
            SeriesSelector::Weekly => Self::Weekly,
            SeriesSelector::Monthly => Self::Monthly,
        }
    }
}

impl Config {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn aggregator(&self) -> Result<AggregatorConfig, ValidationError> {
        let symbol = Symbol::parse(&self.query_stock_symbol)?;
        Ok(AggregatorConfig::new(symbol)
            .with_series_kind(self.query_series.into())
            .with_window_days(self.query_ndays))
    }

    pub fn alpha_vantage(&self) -> AlphaVantageConfig {
        AlphaVantageConfig {
            base_url: self.alpha_vantage_url.clone(),
            api_key_name: self.alpha_vantage_key_name.clone(),
            api_key: self.alpha_vantage_key_value.clone(),
            timeout_ms: self.upstream_timeout_ms,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::try_parse_from(["stockticker", "--host", "127.0.0.1", "--port", "9090"])
            .expect("defaults should parse");

        assert_eq!(config.bind_addr(), "127.0.0.1:9090");
        assert_eq!(config.query_series, SeriesSelector::Daily);
        assert_eq!(config.request_timeout(), Duration::from_secs(30));

        let aggregator = config.aggregator().expect("default symbol is valid");
        assert_eq!(aggregator.symbol.as_str(), "MSFT");
        assert_eq!(aggregator.window_days, 7);

        let upstream = config.alpha_vantage();
        assert_eq!(upstream.base_url, "https://www.alphavantage.co");
        assert_eq!(upstream.api_key_name, "apikey");
        assert_eq!(upstream.timeout_ms, 5_000);
    }

    #[test]
    fn flags_override_defaults() {
        let config = Config::try_parse_from([
            "stockticker",
            "--query-stock-symbol",
            "ibm",
            "--query-ndays",
            "30",
            "--query-series",
            "weekly",
            "--alpha-vantage-key-value",
            "demo",
        ])
        .expect("flags should parse");

        let aggregator = config.aggregator().expect("symbol is valid");
        assert_eq!(aggregator.symbol.as_str(), "IBM");
        assert_eq!(aggregator.series_kind, SeriesKind::Weekly);
        assert_eq!(aggregator.window_days, 30);
        assert_eq!(config.alpha_vantage().api_key, "demo");
    }

    #[test]
    fn invalid_symbol_is_rejected_at_startup() {
        let config = Config::try_parse_from(["stockticker", "--query-stock-symbol", "MS FT"])
            .expect("flag itself parses");

        assert!(matches!(
            config.aggregator(),
            Err(ValidationError::SymbolInvalidChar { ch: ' ', .. })
        ));
    }

    #[test]
    fn negative_window_is_rejected_by_the_parser() {
        assert!(Config::try_parse_from(["stockticker", "--query-ndays", "-1"]).is_err());
    }
}
