//! End-of-trading-day expiry in the provider's own time zone.

use chrono::{DateTime, Days, Duration, TimeZone, Utc};
use chrono_tz::Tz;

use crate::CacheStoreError;

/// Resolves a provider time zone name such as `US/Eastern`.
pub fn resolve_time_zone(name: &str) -> Result<Tz, CacheStoreError> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| CacheStoreError::UnknownTimeZone {
            name: name.to_owned(),
        })
}

/// Last second of `now`'s calendar day as observed in `tz`.
///
/// Computed as local midnight of the following day minus one second, so on a
/// day with a DST change this is still 23:59:59 wall time.
pub fn end_of_trading_day(now: DateTime<Utc>, tz: Tz) -> Result<DateTime<Utc>, CacheStoreError> {
    let today = now.with_timezone(&tz).date_naive();
    let unresolvable = || CacheStoreError::UnresolvableEndOfDay {
        date: today.to_string(),
        time_zone: tz.name().to_owned(),
    };

    let next_midnight = today
        .checked_add_days(Days::new(1))
        .and_then(|tomorrow| tomorrow.and_hms_opt(0, 0, 0))
        .ok_or_else(unresolvable)?;
    let end_of_day = next_midnight - Duration::seconds(1);

    // `latest` keeps the later instant when the wall time repeats on a DST fold.
    tz.from_local_datetime(&end_of_day)
        .latest()
        .map(|local| local.with_timezone(&Utc))
        .ok_or_else(unresolvable)
}
