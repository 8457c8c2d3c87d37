use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;

use crate::data_source::{SeriesFuture, SourceError, TimeSeriesSource};
use crate::http_client::{HttpClient, HttpRequest, ReqwestHttpClient};
use crate::throttling::RequestThrottle;
use crate::{DailyRecord, SeriesKind, SeriesMetadata, Symbol, TimeSeries};

pub const DEFAULT_BASE_URL: &str = "https://www.alphavantage.co";
pub const DEFAULT_API_KEY_NAME: &str = "apikey";

/// Connection settings for the Alpha Vantage REST API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlphaVantageConfig {
    pub base_url: String,
    pub api_key_name: String,
    pub api_key: String,
    pub timeout_ms: u64,
}

impl Default for AlphaVantageConfig {
    fn default() -> Self {
        Self {
            base_url: String::from(DEFAULT_BASE_URL),
            api_key_name: String::from(DEFAULT_API_KEY_NAME),
            api_key: String::new(),
            timeout_ms: 5_000,
        }
    }
}

/// Time series source backed by Alpha Vantage.
#[derive(Clone)]
pub struct AlphaVantageAdapter {
    config: AlphaVantageConfig,
    http_client: Arc<dyn HttpClient>,
    throttle: RequestThrottle,
}

impl AlphaVantageAdapter {
    pub fn new(config: AlphaVantageConfig) -> Self {
        Self::with_http_client(config, Arc::new(ReqwestHttpClient::default()))
    }

    pub fn with_http_client(config: AlphaVantageConfig, http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            config,
            http_client,
            throttle: RequestThrottle::default(),
        }
    }

    pub fn with_throttle(mut self, throttle: RequestThrottle) -> Self {
        self.throttle = throttle;
        self
    }

    pub fn config(&self) -> &AlphaVantageConfig {
        &self.config
    }

    fn query_url(&self, kind: SeriesKind, symbol: &Symbol) -> String {
        format!(
            "{}/query?function={}&symbol={}&{}={}",
            self.config.base_url.trim_end_matches('/'),
            kind.function(),
            urlencoding::encode(symbol.as_str()),
            urlencoding::encode(&self.config.api_key_name),
            urlencoding::encode(&self.config.api_key),
        )
    }

    async fn fetch_time_series(
        &self,
        kind: SeriesKind,
        symbol: &Symbol,
    ) -> Result<TimeSeries, SourceError> {
        if let Err(delay) = self.throttle.acquire() {
            return Err(SourceError::rate_limited(format!(
                "alphavantage request budget exhausted; retry in {:.2}s",
                delay.as_secs_f64()
            )));
        }

        debug!(function = kind.function(), %symbol, "requesting alphavantage time series");
        let request = HttpRequest::get(self.query_url(kind, symbol))
            .with_header("accept", "application/json")
            .with_timeout_ms(self.config.timeout_ms);

        let response = self.http_client.execute(request).await.map_err(|error| {
            if error.timed_out() {
                SourceError::unavailable(format!(
                    "alphavantage request timed out after {}ms",
                    self.config.timeout_ms
                ))
            } else {
                SourceError::unavailable(format!("alphavantage transport error: {}", error.message()))
            }
        })?;

        if !response.is_success() {
            return Err(SourceError::unavailable(format!(
                "alphavantage returned status {}",
                response.status
            )));
        }

        parse_time_series(&response.body, symbol)
    }
}

impl TimeSeriesSource for AlphaVantageAdapter {
    fn time_series<'a>(&'a self, kind: SeriesKind, symbol: &'a Symbol) -> SeriesFuture<'a> {
        Box::pin(self.fetch_time_series(kind, symbol))
    }
}

#[derive(Debug, Clone, Deserialize)]
struct AlphaVantageSeriesResponse {
    #[serde(rename = "Meta Data", default)]
    meta_data: Option<BTreeMap<String, String>>,
    #[serde(
        rename = "Time Series (Daily)",
        alias = "Weekly Time Series",
        alias = "Monthly Time Series",
        default
    )]
    time_series: Option<BTreeMap<String, AlphaVantageBar>>,
    #[serde(rename = "Error Message", default)]
    error_message: Option<String>,
    #[serde(rename = "Note", default)]
    note: Option<String>,
    #[serde(rename = "Information", default)]
    information: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct AlphaVantageBar {
    #[serde(rename = "1. open")]
    open: String,
    #[serde(rename = "2. high")]
    high: String,
    #[serde(rename = "3. low")]
    low: String,
    #[serde(rename = "4. close")]
    close: String,
    #[serde(rename = "5. volume")]
    volume: String,
}

impl From<AlphaVantageBar> for DailyRecord {
    fn from(bar: AlphaVantageBar) -> Self {
        Self {
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            volume: bar.volume,
        }
    }
}

fn parse_time_series(body: &str, symbol: &Symbol) -> Result<TimeSeries, SourceError> {
    let response: AlphaVantageSeriesResponse = serde_json::from_str(body).map_err(|e| {
        SourceError::internal(format!("failed to parse alphavantage time series: {e}"))
    })?;

    if let Some(message) = response.error_message {
        return Err(SourceError::invalid_request(format!(
            "alphavantage rejected request for {symbol}: {message}"
        )));
    }
    // Throttled responses still come back as 200 with an explanatory note.
    if let Some(message) = response.note.or(response.information) {
        return Err(SourceError::rate_limited(format!("alphavantage: {message}")));
    }

    let meta_data = response
        .meta_data
        .ok_or_else(|| SourceError::internal("no meta data in alphavantage response"))?;
    let time_series = response
        .time_series
        .ok_or_else(|| SourceError::internal(format!("unable to get time series for {symbol}")))?;

    let time_zone = meta_field(&meta_data, "Time Zone")
        .ok_or_else(|| SourceError::internal("no time zone in alphavantage meta data"))?;
    let metadata = SeriesMetadata {
        information: meta_field(&meta_data, "Information").unwrap_or_default(),
        symbol: meta_field(&meta_data, "Symbol").unwrap_or_else(|| symbol.to_string()),
        last_refreshed: meta_field(&meta_data, "Last Refreshed").unwrap_or_default(),
        time_zone,
    };

    Ok(TimeSeries::new(
        metadata,
        time_series
            .into_iter()
            .map(|(date, bar)| (date, DailyRecord::from(bar))),
    ))
}

/// Meta data keys are numbered per series function ("5. Time Zone" for
/// daily, "4. Time Zone" for weekly), so fields are matched by label.
fn meta_field(meta_data: &BTreeMap<String, String>, label: &str) -> Option<String> {
    meta_data.iter().find_map(|(key, value)| {
        let name = key.split_once(". ").map_or(key.as_str(), |(_, name)| name);
        (name == label).then(|| value.clone())
    })
}
