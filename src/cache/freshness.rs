//! cache::freshness
//!
//! Cache-aside reads with an age-based freshness check.
//!
//! # Flow
//!
//! 1. Read `{data, timestamp}` from the store.
//! 2. If present and younger than the threshold, return it. No upstream call.
//! 3. Otherwise run the caller's fetch, wrap the result with the current
//!    time, write it back and return it.
//!
//! # Concurrency
//!
//! With single-flight enabled (the default) concurrent cold readers of the
//! same key queue behind one fetch and re-check the cache once it lands.
//! With it disabled every cold reader fetches and writes independently and
//! the last write wins; the store still never holds a partial value.
//!
//! The fetch and the write-back are not transactional: if the caller is
//! cancelled after the fetch completes, nothing is written.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::{CacheError, CacheStore, KvBackend};

/// Default maximum age of a cached entry.
pub const DEFAULT_FRESHNESS: Duration = Duration::from_secs(10);

/// Source of "now" for freshness decisions.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Hand-driven clock for tests. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    pub fn set(&self, time: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = time;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(next) = chrono::Duration::from_std(by)
            .ok()
            .and_then(|d| now.checked_add_signed(d))
        {
            *now = next;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Stored shape of a policy-managed entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedEntry<T> {
    pub data: T,
    pub timestamp: DateTime<Utc>,
}

impl<T> CachedEntry<T> {
    /// Whether `now - timestamp < threshold`.
    ///
    /// Entries stamped in the future count as fresh.
    pub fn is_fresh(&self, now: DateTime<Utc>, threshold: Duration) -> bool {
        match (now - self.timestamp).to_std() {
            Ok(age) => age < threshold,
            Err(_) => true,
        }
    }
}

/// Where a [`CacheRead`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadSource {
    /// A fresh cached entry
    Cache,
    /// A new upstream fetch, now written back
    Upstream,
}

/// Result of a cache-aside read.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheRead<T> {
    pub entry: CachedEntry<T>,
    pub source: ReadSource,
}

impl<T> CacheRead<T> {
    pub fn is_hit(&self) -> bool {
        self.source == ReadSource::Cache
    }

    pub fn data(&self) -> &T {
        &self.entry.data
    }

    pub fn into_data(self) -> T {
        self.entry.data
    }
}

/// Cache-aside orchestration over a [`CacheStore`].
pub struct FreshnessPolicy<B, C = SystemClock> {
    store: Arc<CacheStore<B>>,
    clock: C,
    threshold: Duration,
    single_flight: bool,
    in_flight: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl<B, C> std::fmt::Debug for FreshnessPolicy<B, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FreshnessPolicy")
            .field("threshold", &self.threshold)
            .field("single_flight", &self.single_flight)
            .finish()
    }
}

impl<B: KvBackend> FreshnessPolicy<B, SystemClock> {
    /// Wall-clock policy with [`DEFAULT_FRESHNESS`] and single-flight on.
    pub fn new(store: Arc<CacheStore<B>>) -> Self {
        Self {
            store,
            clock: SystemClock,
            threshold: DEFAULT_FRESHNESS,
            single_flight: true,
            in_flight: Mutex::new(HashMap::new()),
        }
    }
}

impl<B: KvBackend, C: Clock> FreshnessPolicy<B, C> {
    /// Replace the clock.
    pub fn with_clock<C2: Clock>(self, clock: C2) -> FreshnessPolicy<B, C2> {
        FreshnessPolicy {
            store: self.store,
            clock,
            threshold: self.threshold,
            single_flight: self.single_flight,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_threshold(mut self, threshold: Duration) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_single_flight(mut self, enabled: bool) -> Self {
        self.single_flight = enabled;
        self
    }

    pub fn threshold(&self) -> Duration {
        self.threshold
    }

    pub fn store(&self) -> &CacheStore<B> {
        &self.store
    }

    /// Return a fresh cached value for `(table, id)` or fetch, store and
    /// return a new one.
    ///
    /// Cache failures convert into `E`, so they surface exactly like fetch
    /// failures.
    pub async fn read<T, E, F, Fut>(
        &self,
        table: &str,
        id: &str,
        fetch: F,
    ) -> Result<CacheRead<T>, E>
    where
        T: Serialize + DeserializeOwned,
        E: From<CacheError>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(hit) = self.lookup(table, id).await? {
            return Ok(hit);
        }
        if !self.single_flight {
            return self.refresh(table, id, fetch).await;
        }

        let key = self.store.key(table, id);
        let gate = self.gate(&key);
        let result = {
            let _guard = gate.lock().await;
            // Another reader may have filled the entry while we waited.
            match self.lookup(table, id).await {
                Ok(Some(hit)) => Ok(hit),
                Ok(None) => self.refresh(table, id, fetch).await,
                Err(e) => Err(E::from(e)),
            }
        };
        self.release(&key, gate);
        result
    }

    async fn lookup<T: DeserializeOwned>(
        &self,
        table: &str,
        id: &str,
    ) -> Result<Option<CacheRead<T>>, CacheError> {
        let entry: Option<CachedEntry<T>> = self.store.get(table, id).await?;
        match entry {
            Some(entry) if entry.is_fresh(self.clock.now(), self.threshold) => {
                tracing::debug!(table, id, "cache hit");
                Ok(Some(CacheRead {
                    entry,
                    source: ReadSource::Cache,
                }))
            }
            Some(_) => {
                tracing::debug!(table, id, "cache entry stale");
                Ok(None)
            }
            None => {
                tracing::debug!(table, id, "cache miss");
                Ok(None)
            }
        }
    }

    async fn refresh<T, E, F, Fut>(
        &self,
        table: &str,
        id: &str,
        fetch: F,
    ) -> Result<CacheRead<T>, E>
    where
        T: Serialize,
        E: From<CacheError>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let data = fetch().await?;
        let entry = CachedEntry {
            data,
            timestamp: self.clock.now(),
        };
        self.store.put(table, id, &entry).await?;
        Ok(CacheRead {
            entry,
            source: ReadSource::Upstream,
        })
    }

    fn gate(&self, key: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut map = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        map.entry(key.to_string()).or_default().clone()
    }

    fn release(&self, key: &str, gate: Arc<tokio::sync::Mutex<()>>) {
        let mut map = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        // Only the map and this handle remain: nobody is waiting.
        if Arc::strong_count(&gate) <= 2 {
            map.remove(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryBackend;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, PartialEq)]
    enum TestError {
        Cache(String),
        Upstream,
    }

    impl From<CacheError> for TestError {
        fn from(e: CacheError) -> Self {
            TestError::Cache(e.to_string())
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    fn policy(clock: &ManualClock) -> FreshnessPolicy<MemoryBackend, ManualClock> {
        let store = Arc::new(CacheStore::new(MemoryBackend::new(), "test"));
        FreshnessPolicy::new(store)
            .with_clock(clock.clone())
            .with_threshold(Duration::from_secs(10))
    }

    async fn counted_read(
        p: &FreshnessPolicy<MemoryBackend, ManualClock>,
        calls: &AtomicUsize,
        value: &str,
    ) -> CacheRead<String> {
        p.read("Comment", "t1", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, TestError>(value.to_string())
        })
        .await
        .unwrap()
    }

    mod freshness {
        use super::*;

        #[test]
        fn strictly_less_than_threshold() {
            let entry = CachedEntry {
                data: (),
                timestamp: t0(),
            };
            let ten = Duration::from_secs(10);
            assert!(entry.is_fresh(t0() + chrono::Duration::seconds(9), ten));
            assert!(!entry.is_fresh(t0() + chrono::Duration::seconds(10), ten));
            assert!(entry.is_fresh(t0() - chrono::Duration::seconds(5), ten));
        }

        #[tokio::test]
        async fn fresh_read_skips_upstream() {
            let clock = ManualClock::new(t0());
            let p = policy(&clock);
            let calls = AtomicUsize::new(0);

            let first = counted_read(&p, &calls, "v1").await;
            assert_eq!(first.source, ReadSource::Upstream);
            assert_eq!(first.entry.timestamp, t0());

            clock.advance(Duration::from_secs(5));
            let second = counted_read(&p, &calls, "v2").await;
            assert!(second.is_hit());
            assert_eq!(second.data(), "v1");
            assert_eq!(calls.load(Ordering::SeqCst), 1);
        }

        #[tokio::test]
        async fn stale_read_fetches_once() {
            let clock = ManualClock::new(t0());
            let p = policy(&clock);
            let calls = AtomicUsize::new(0);

            counted_read(&p, &calls, "v1").await;
            clock.advance(Duration::from_secs(15));
            let read = counted_read(&p, &calls, "v2").await;

            assert_eq!(read.source, ReadSource::Upstream);
            assert_eq!(read.into_data(), "v2");
            assert_eq!(calls.load(Ordering::SeqCst), 2);

            let stored: Option<CachedEntry<String>> =
                p.store().get("Comment", "t1").await.unwrap();
            let stored = stored.unwrap();
            assert_eq!(stored.data, "v2");
            assert_eq!(stored.timestamp, t0() + chrono::Duration::seconds(15));
        }

        #[tokio::test]
        async fn fetch_error_writes_nothing() {
            let clock = ManualClock::new(t0());
            let p = policy(&clock);
            let err = p
                .read::<String, _, _, _>("Comment", "t1", || async { Err(TestError::Upstream) })
                .await
                .unwrap_err();
            assert_eq!(err, TestError::Upstream);
            let stored: Option<CachedEntry<String>> =
                p.store().get("Comment", "t1").await.unwrap();
            assert!(stored.is_none());
        }

        #[tokio::test]
        async fn cache_error_converts_into_caller_error() {
            let clock = ManualClock::new(t0());
            let p = policy(&clock);
            p.store().close().await.unwrap();
            let err = p
                .read::<String, _, _, _>("Comment", "t1", || async {
                    Ok::<_, TestError>("x".into())
                })
                .await
                .unwrap_err();
            assert!(matches!(err, TestError::Cache(_)));
        }
    }

    mod concurrency {
        use super::*;
        use tokio::sync::Barrier;

        #[tokio::test]
        async fn single_flight_dedups_cold_readers() {
            let clock = ManualClock::new(t0());
            let p = policy(&clock);
            let calls = AtomicUsize::new(0);

            let read = |value: &'static str| {
                let p = &p;
                let calls = &calls;
                async move {
                    p.read("Comment", "t1", || async {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::task::yield_now().await;
                        Ok::<_, TestError>(value.to_string())
                    })
                    .await
                    .unwrap()
                }
            };

            let (a, b, c) = tokio::join!(read("a"), read("b"), read("c"));
            assert_eq!(calls.load(Ordering::SeqCst), 1);
            assert_eq!(a.data(), b.data());
            assert_eq!(b.data(), c.data());
            assert!(p.in_flight.lock().unwrap().is_empty());
        }

        #[tokio::test]
        async fn without_single_flight_each_cold_reader_fetches() {
            let clock = ManualClock::new(t0());
            let p = policy(&clock).with_single_flight(false);
            let calls = AtomicUsize::new(0);
            let barrier = Barrier::new(3);

            let read = |value: &'static str| {
                let p = &p;
                let calls = &calls;
                let barrier = &barrier;
                async move {
                    p.read("Comment", "t1", || async {
                        calls.fetch_add(1, Ordering::SeqCst);
                        barrier.wait().await;
                        Ok::<_, TestError>(value.to_string())
                    })
                    .await
                    .unwrap()
                }
            };

            let (a, b, c) = tokio::join!(read("a"), read("b"), read("c"));
            assert_eq!(calls.load(Ordering::SeqCst), 3);
            assert!(!a.is_hit() && !b.is_hit() && !c.is_hit());

            let stored: Option<CachedEntry<String>> =
                p.store().get("Comment", "t1").await.unwrap();
            let data = stored.unwrap().data;
            assert!(["a", "b", "c"].contains(&data.as_str()));
        }
    }
}
