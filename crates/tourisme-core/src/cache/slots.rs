//! Keyed single-flight memoization with optional expiry.
//!
//! `SlotCache` backs each of the reference-data collections. Every key has at
//! most one stored entry and at most one in-flight fetch. Readers arriving
//! while a fetch is running await the same `Shared` future. Fetches run on
//! spawned tasks and install their result themselves, so a fetch completes
//! even if all of its callers go away.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Duration;
use futures::future::{BoxFuture, FutureExt, Shared};
use tracing::{debug, info, warn};

use crate::api::ApiError;

use super::clock::Clock;
use super::entry::CacheEntry;
use super::error::CacheError;
use super::stats::Counters;

pub(crate) type FetchResult<T> = Result<Arc<Vec<T>>, CacheError>;

type SharedFetch<T> = Shared<BoxFuture<'static, FetchResult<T>>>;

struct InFlight<T> {
    id: u64,
    future: SharedFetch<T>,
}

struct Slots<K, T> {
    entries: HashMap<K, CacheEntry<T>>,
    in_flight: HashMap<K, InFlight<T>>,
    next_flight_id: u64,
}

impl<K, T> Default for Slots<K, T> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            in_flight: HashMap::new(),
            next_flight_id: 0,
        }
    }
}

fn lock<K, T>(slots: &Arc<Mutex<Slots<K, T>>>) -> MutexGuard<'_, Slots<K, T>> {
    slots.lock().unwrap_or_else(|e| e.into_inner())
}

pub(crate) struct SlotCache<K, T> {
    resource: &'static str,
    ttl: Option<Duration>,
    clock: Arc<dyn Clock>,
    counters: Arc<Counters>,
    slots: Arc<Mutex<Slots<K, T>>>,
}

impl<K, T> SlotCache<K, T>
where
    K: Eq + Hash + Clone + std::fmt::Debug + Send + Sync + 'static,
    T: Send + Sync + 'static,
{
    pub(crate) fn new(
        resource: &'static str,
        ttl: Option<Duration>,
        clock: Arc<dyn Clock>,
        counters: Arc<Counters>,
    ) -> Self {
        Self {
            resource,
            ttl,
            clock,
            counters,
            slots: Arc::new(Mutex::new(Slots::default())),
        }
    }

    /// Return the fresh entry for `key`, join the running fetch for it, or
    /// start a new fetch with `fetch`.
    ///
    /// Must be called from within a Tokio runtime.
    pub(crate) async fn get_or_fetch<F, Fut>(&self, key: K, fetch: F) -> FetchResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<T>, ApiError>> + Send + 'static,
    {
        let pending = {
            let mut slots = lock(&self.slots);

            if let Some(entry) = slots.entries.get(&key) {
                if entry.is_fresh(self.clock.now()) {
                    self.counters.hit();
                    debug!(resource = self.resource, key = ?key, "Cache hit");
                    return Ok(Arc::clone(entry.items()));
                }
            }

            if let Some(flight) = slots.in_flight.get(&key) {
                self.counters.join();
                debug!(resource = self.resource, key = ?key, "Joining in-flight fetch");
                flight.future.clone()
            } else {
                self.counters.miss();
                let id = slots.next_flight_id;
                slots.next_flight_id += 1;
                let future = self.spawn_fetch(key.clone(), id, fetch());
                slots.in_flight.insert(
                    key,
                    InFlight {
                        id,
                        future: future.clone(),
                    },
                );
                future
            }
        };

        pending.await
    }

    fn spawn_fetch<Fut>(&self, key: K, id: u64, fetch: Fut) -> SharedFetch<T>
    where
        Fut: Future<Output = Result<Vec<T>, ApiError>> + Send + 'static,
    {
        let resource = self.resource;
        let ttl = self.ttl;
        let clock = Arc::clone(&self.clock);
        let counters = Arc::clone(&self.counters);
        let slots = Arc::clone(&self.slots);

        info!(resource, key = ?key, "Fetching");

        let flight_key = key.clone();
        let flight_slots = Arc::clone(&self.slots);
        let failures = Arc::clone(&self.counters);

        let task = tokio::spawn(async move {
            let outcome = fetch.await;

            let mut slots = lock(&slots);
            // Invalidation detaches the flight; its result must not be installed.
            let current = slots.in_flight.get(&key).is_some_and(|f| f.id == id);
            if current {
                slots.in_flight.remove(&key);
            }

            match outcome {
                Ok(items) => {
                    let items = Arc::new(items);
                    if current {
                        info!(resource, key = ?key, count = items.len(), "Cached");
                        slots
                            .entries
                            .insert(key, CacheEntry::new(Arc::clone(&items), clock.now(), ttl));
                    } else {
                        debug!(resource, key = ?key, "Discarding result of detached fetch");
                    }
                    Ok(items)
                }
                Err(e) => {
                    counters.failure();
                    warn!(resource, key = ?key, error = %e, "Fetch failed");
                    Err(CacheError::fetch_failed(resource, e))
                }
            }
        });

        async move {
            match task.await {
                Ok(result) => result,
                Err(e) => {
                    // The task never reached its own cleanup.
                    let mut slots = lock(&flight_slots);
                    if slots.in_flight.get(&flight_key).is_some_and(|f| f.id == id) {
                        slots.in_flight.remove(&flight_key);
                    }
                    drop(slots);
                    failures.failure();
                    warn!(resource, error = %e, "Fetch task did not complete");
                    Err(CacheError::fetch_failed(
                        resource,
                        ApiError::Interrupted(e.to_string()),
                    ))
                }
            }
        }
        .boxed()
        .shared()
    }

    /// Whether `key` has an unexpired entry. No side effects.
    pub(crate) fn is_fresh(&self, key: &K) -> bool {
        let now = self.clock.now();
        lock(&self.slots)
            .entries
            .get(key)
            .is_some_and(|entry| entry.is_fresh(now))
    }

    /// Human readable age of the stored entry for `key`, fresh or not.
    pub(crate) fn age_display(&self, key: &K) -> Option<String> {
        let now = self.clock.now();
        lock(&self.slots)
            .entries
            .get(key)
            .map(|entry| entry.age_display(now))
    }

    /// Drop the entry and detach any in-flight fetch for `key`.
    pub(crate) fn invalidate(&self, key: &K) {
        let mut slots = lock(&self.slots);
        let had_entry = slots.entries.remove(key).is_some();
        let had_flight = slots.in_flight.remove(key).is_some();
        if had_entry || had_flight {
            debug!(resource = self.resource, key = ?key, had_entry, had_flight, "Invalidated");
        }
    }

    /// Drop every entry and detach every in-flight fetch.
    pub(crate) fn clear(&self) {
        let mut slots = lock(&self.slots);
        slots.entries.clear();
        slots.in_flight.clear();
    }

    pub(crate) fn len(&self) -> usize {
        lock(&self.slots).entries.len()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::Utc;
    use tokio::sync::oneshot;

    use super::*;
    use crate::cache::clock::ManualClock;

    fn cache(ttl: Option<Duration>) -> (SlotCache<u32, u32>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let cache = SlotCache::new("numbers", ttl, clock.clone(), Arc::new(Counters::default()));
        (cache, clock)
    }

    #[tokio::test]
    async fn test_fetch_then_hit() {
        let (cache, _) = cache(None);
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let items = cache
                .get_or_fetch(1, || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Ok::<_, ApiError>(vec![7]) }
                })
                .await
                .unwrap();
            assert_eq!(*items, vec![7]);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_invalidate_during_flight_discards_result() {
        let (cache, _) = cache(Some(Duration::minutes(5)));
        let (release, gate) = oneshot::channel::<()>();

        let first = cache.get_or_fetch(1, move || async move {
            let _ = gate.await;
            Ok::<_, ApiError>(vec![1])
        });
        let invalidate_then_release = async {
            tokio::task::yield_now().await;
            cache.invalidate(&1);
            let _ = release.send(());
        };

        let (result, ()) = tokio::join!(first, invalidate_then_release);

        // The waiting caller still gets its answer...
        assert_eq!(*result.unwrap(), vec![1]);
        // ...but it was not installed.
        assert!(!cache.is_fresh(&1));
        assert_eq!(cache.len(), 0);
    }

    #[tokio::test]
    async fn test_panicking_fetch_is_counted_and_not_cached() {
        let counters = Arc::new(Counters::default());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let cache: SlotCache<u32, u32> = SlotCache::new("numbers", None, clock, counters.clone());

        let err = cache
            .get_or_fetch(1, || async {
                if true {
                    panic!("fetch blew up");
                }
                Ok::<_, ApiError>(vec![1])
            })
            .await
            .unwrap_err();

        assert!(matches!(err.api_error(), ApiError::Interrupted(_)));
        assert_eq!(counters.snapshot().fetch_failures, 1);

        // The slot is usable again.
        let items = cache
            .get_or_fetch(1, || async { Ok::<_, ApiError>(vec![2]) })
            .await
            .unwrap();
        assert_eq!(*items, vec![2]);
    }

    #[tokio::test]
    async fn test_fetch_completes_when_caller_drops() {
        let (cache, _) = cache(None);
        let (release, gate) = oneshot::channel::<()>();

        let abandoned = cache.get_or_fetch(1, move || async move {
            let _ = gate.await;
            Ok::<_, ApiError>(vec![5])
        });
        // Poll once so the fetch is started, then drop the caller.
        assert!(futures::poll!(Box::pin(abandoned)).is_pending());
        let _ = release.send(());

        for _ in 0..10 {
            if cache.is_fresh(&1) {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert!(cache.is_fresh(&1));
    }
}
