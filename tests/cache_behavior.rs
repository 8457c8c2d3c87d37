//! Behavior-driven tests for the time series cache
//!
//! These tests verify HOW the cache shields the upstream provider: one fetch
//! per miss episode, end-of-trading-day expiry, and no cached failures.

use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use stockticker_core::{
    CacheKey, CacheStoreError, DailyRecord, ManualClock, SeriesKind, SeriesMetadata,
    SeriesOrigin, SourceError, SourceErrorKind, Symbol, TimeSeries, TimeSeriesCache,
};
use tokio::task::JoinSet;

fn trading_afternoon() -> DateTime<Utc> {
    // 10:00 EST
    Utc.with_ymd_and_hms(2024, 1, 10, 15, 0, 0).unwrap()
}

fn end_of_trading_day() -> DateTime<Utc> {
    // 23:59:59 EST
    Utc.with_ymd_and_hms(2024, 1, 11, 4, 59, 59).unwrap()
}

fn key_for(symbol: &str) -> CacheKey {
    CacheKey::new(SeriesKind::Daily, &Symbol::parse(symbol).expect("valid symbol"))
}

fn sample_series(symbol: &str) -> TimeSeries {
    TimeSeries::new(
        SeriesMetadata {
            information: String::from("Daily Prices (open, high, low, close) and Volumes"),
            symbol: symbol.to_owned(),
            last_refreshed: String::from("2024-01-09"),
            time_zone: String::from("US/Eastern"),
        },
        [
            ("2024-01-08", "374.69"),
            ("2024-01-09", "375.79"),
        ]
        .into_iter()
        .map(|(date, close)| {
            (
                date.to_owned(),
                DailyRecord {
                    open: close.to_owned(),
                    high: close.to_owned(),
                    low: close.to_owned(),
                    close: close.to_owned(),
                    volume: String::from("20000000"),
                },
            )
        }),
    )
}

// =============================================================================
// Cache: Single Flight
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn when_many_requests_miss_together_upstream_is_called_once() {
    // Given: A cold cache
    let cache = TimeSeriesCache::new(Arc::new(ManualClock::new(trading_afternoon())));
    let calls = Arc::new(AtomicUsize::new(0));

    // When: 32 requests for the same key arrive at once
    let mut tasks = JoinSet::new();
    for _ in 0..32 {
        let cache = cache.clone();
        let calls = Arc::clone(&calls);
        tasks.spawn(async move {
            cache
                .get_or_fetch(&key_for("MSFT"), move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    Ok(sample_series("MSFT"))
                })
                .await
        });
    }

    let mut results = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        results.push(joined.expect("task should not panic").expect("fetch should succeed"));
    }

    // Then: Exactly one upstream call served everyone the same payload
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(results.len(), 32);
    assert!(results.iter().all(|cached| cached.series == sample_series("MSFT")));
    assert_eq!(results.iter().filter(|cached| !cached.is_cache_hit()).count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn when_different_keys_miss_together_fetches_run_one_at_a_time() {
    // Given: A cold cache and a source that tracks concurrent calls
    let cache = TimeSeriesCache::new(Arc::new(ManualClock::new(trading_afternoon())));
    let in_flight = Arc::new(AtomicUsize::new(0));
    let max_in_flight = Arc::new(AtomicUsize::new(0));

    // When: Several symbols miss concurrently
    let mut tasks = JoinSet::new();
    for symbol in ["MSFT", "AAPL", "IBM", "NVDA"] {
        let cache = cache.clone();
        let in_flight = Arc::clone(&in_flight);
        let max_in_flight = Arc::clone(&max_in_flight);
        tasks.spawn(async move {
            cache
                .get_or_fetch(&key_for(symbol), move || async move {
                    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    max_in_flight.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                    Ok(sample_series(symbol))
                })
                .await
        });
    }
    while let Some(joined) = tasks.join_next().await {
        joined.expect("task should not panic").expect("fetch should succeed");
    }

    // Then: The shared fetch lock never let two upstream calls overlap
    assert_eq!(max_in_flight.load(Ordering::SeqCst), 1);
    assert_eq!(cache.store().len().await, 4);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn when_cached_key_is_read_during_another_fetch_it_does_not_wait() {
    // Given: MSFT is cached and a slow AAPL fetch holds the fetch lock
    let cache = TimeSeriesCache::new(Arc::new(ManualClock::new(trading_afternoon())));
    cache
        .get_or_fetch(&key_for("MSFT"), || async { Ok(sample_series("MSFT")) })
        .await
        .expect("warm-up fetch should succeed");

    let slow = {
        let cache = cache.clone();
        tokio::spawn(async move {
            cache
                .get_or_fetch(&key_for("AAPL"), || async {
                    tokio::time::sleep(Duration::from_millis(300)).await;
                    Ok(sample_series("AAPL"))
                })
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(30)).await;

    // When: MSFT is requested again
    let hit = tokio::time::timeout(
        Duration::from_millis(100),
        cache.get_or_fetch(&key_for("MSFT"), || async {
            Err(SourceError::internal("cached key must not be fetched"))
        }),
    )
    .await
    .expect("cache hit must not block on the fetch lock")
    .expect("cache hit should succeed");

    // Then: It is served from cache immediately
    assert!(hit.is_cache_hit());
    slow.await.expect("task should not panic").expect("slow fetch should succeed");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn when_fetching_caller_disconnects_waiters_still_get_the_result() {
    // Given: A caller that starts a slow fetch
    let cache = TimeSeriesCache::new(Arc::new(ManualClock::new(trading_afternoon())));
    let calls = Arc::new(AtomicUsize::new(0));
    let first = {
        let cache = cache.clone();
        let calls = Arc::clone(&calls);
        tokio::spawn(async move {
            cache
                .get_or_fetch(&key_for("MSFT"), move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(150)).await;
                    Ok(sample_series("MSFT"))
                })
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(30)).await;

    // When: That caller goes away mid-fetch and another request arrives
    first.abort();
    let waiter = cache
        .get_or_fetch(&key_for("MSFT"), || async {
            Err(SourceError::internal("in-flight fetch must be reused"))
        })
        .await
        .expect("waiter should receive the shared fetch");

    // Then: The original fetch completed and populated the cache
    assert!(waiter.is_cache_hit());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

// =============================================================================
// Cache: End-of-Day Expiry
// =============================================================================

#[tokio::test]
async fn when_trading_day_ends_entry_expires_one_second_later() {
    // Given: A series fetched mid-session in New York
    let clock = Arc::new(ManualClock::new(trading_afternoon()));
    let cache = TimeSeriesCache::new(clock.clone());
    let fetched = cache
        .get_or_fetch(&key_for("MSFT"), || async { Ok(sample_series("MSFT")) })
        .await
        .expect("fetch should succeed");

    // Then: It expires at 23:59:59 local time
    assert!(matches!(
        fetched.origin,
        SeriesOrigin::Upstream { expires_at } if expires_at == end_of_trading_day()
    ));

    // And: It is still served at the expiry instant
    clock.set(end_of_trading_day());
    assert!(cache.get(&key_for("MSFT")).await.is_some());

    // And: It is a miss one second later
    clock.advance(ChronoDuration::seconds(1));
    assert!(cache.get(&key_for("MSFT")).await.is_none());

    // And: The next request goes upstream again
    let refreshed = cache
        .get_or_fetch(&key_for("MSFT"), || async { Ok(sample_series("MSFT")) })
        .await
        .expect("refetch should succeed");
    assert!(!refreshed.is_cache_hit());
}

#[tokio::test]
async fn when_fetch_lands_in_the_last_second_entry_is_not_kept() {
    // Given: The clock half a second before local midnight
    let clock = Arc::new(ManualClock::new(
        end_of_trading_day() + ChronoDuration::milliseconds(500),
    ));
    let cache = TimeSeriesCache::new(clock.clone());
    let calls = Arc::new(AtomicUsize::new(0));

    // When: Two requests arrive back to back
    for _ in 0..2 {
        let calls = Arc::clone(&calls);
        let fetched = cache
            .get_or_fetch(&key_for("MSFT"), move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(sample_series("MSFT"))
            })
            .await
            .expect("fetch should still return data");

        // Then: Each gets fresh data but nothing is stored
        assert!(matches!(
            fetched.origin,
            SeriesOrigin::UpstreamUnstored(CacheStoreError::AlreadyExpired { .. })
        ));
    }
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

// =============================================================================
// Cache: Failures
// =============================================================================

#[tokio::test]
async fn when_upstream_fails_the_failure_is_not_cached() {
    // Given: A cold cache and a failing upstream
    let cache = TimeSeriesCache::new(Arc::new(ManualClock::new(trading_afternoon())));

    // When: The first request fails
    let error = cache
        .get_or_fetch(&key_for("MSFT"), || async {
            Err(SourceError::unavailable("alphavantage returned status 503"))
        })
        .await
        .expect_err("upstream failure should propagate");
    assert_eq!(error.kind(), SourceErrorKind::Unavailable);
    assert!(cache.get(&key_for("MSFT")).await.is_none());

    // Then: A later request with a healthy upstream fetches and succeeds
    let fetched = cache
        .get_or_fetch(&key_for("MSFT"), || async { Ok(sample_series("MSFT")) })
        .await
        .expect("second attempt should succeed");
    assert!(!fetched.is_cache_hit());

    // And: From then on the entry is served from cache
    let cached = cache
        .get_or_fetch(&key_for("MSFT"), || async {
            Err(SourceError::internal("must not be called"))
        })
        .await
        .expect("cached entry should be served");
    assert!(cached.is_cache_hit());
}
