use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// Upstream series function. Determines both the query and the cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SeriesKind {
    #[default]
    Daily,
    Weekly,
    Monthly,
}

impl SeriesKind {
    /// Alpha Vantage `function` parameter for this kind.
    pub const fn function(self) -> &'static str {
        match self {
            Self::Daily => "TIME_SERIES_DAILY",
            Self::Weekly => "TIME_SERIES_WEEKLY",
            Self::Monthly => "TIME_SERIES_MONTHLY",
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }
}

impl Display for SeriesKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Series-level metadata reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesMetadata {
    pub information: String,
    pub symbol: String,
    pub last_refreshed: String,
    /// IANA zone the provider reports its trading days in, e.g. `US/Eastern`.
    pub time_zone: String,
}

/// One trading day, prices kept verbatim as the provider sent them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyRecord {
    pub open: String,
    pub high: String,
    pub low: String,
    pub close: String,
    pub volume: String,
}

/// Provider time series keyed by `YYYY-MM-DD` trading day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSeries {
    metadata: SeriesMetadata,
    records: BTreeMap<String, DailyRecord>,
}

impl TimeSeries {
    pub fn new(
        metadata: SeriesMetadata,
        records: impl IntoIterator<Item = (String, DailyRecord)>,
    ) -> Self {
        Self {
            metadata,
            records: records.into_iter().collect(),
        }
    }

    pub fn metadata(&self) -> &SeriesMetadata {
        &self.metadata
    }

    pub fn time_zone(&self) -> &str {
        &self.metadata.time_zone
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Trading days, most recent first.
    pub fn trading_days(&self) -> impl Iterator<Item = &str> + '_ {
        self.records.keys().rev().map(String::as_str)
    }

    pub fn record(&self, date: &str) -> Option<&DailyRecord> {
        self.records.get(date)
    }

    pub fn closing_price(&self, date: &str) -> Option<&str> {
        self.record(date).map(|record| record.close.as_str())
    }
}
