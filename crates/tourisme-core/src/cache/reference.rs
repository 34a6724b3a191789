use std::sync::Arc;

use chrono::Duration;
use tracing::info;

use crate::api::ReferenceFetcher;
use crate::models::{Activity, City, Zone, ZoneId};

use super::clock::{Clock, SystemClock};
use super::error::CacheError;
use super::slots::SlotCache;
use super::stats::{CacheStats, Counters};

/// Default time-to-live for city and activity entries.
pub const DEFAULT_TTL_MINUTES: i64 = 5;

/// Cities and activities of one zone, as loaded by `preload_zone_data`.
#[derive(Debug, Clone)]
pub struct ZoneData {
    pub cities: Arc<Vec<City>>,
    pub activities: Arc<Vec<Activity>>,
}

/// Session cache for the reference data behind the circuit wizard.
///
/// Zones are cached once for the session. Cities and activities are cached
/// per zone for `ttl`. Concurrent reads of the same key share one request.
/// Failed fetches are never cached.
pub struct ReferenceDataCache {
    fetcher: Arc<dyn ReferenceFetcher>,
    ttl: Duration,
    counters: Arc<Counters>,
    zones: SlotCache<(), Zone>,
    cities: SlotCache<ZoneId, City>,
    activities: SlotCache<ZoneId, Activity>,
}

impl ReferenceDataCache {
    pub fn new(fetcher: Arc<dyn ReferenceFetcher>, ttl: Duration) -> Self {
        Self::with_clock(fetcher, ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(
        fetcher: Arc<dyn ReferenceFetcher>,
        ttl: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let counters = Arc::new(Counters::default());
        Self {
            zones: SlotCache::new("zones", None, Arc::clone(&clock), Arc::clone(&counters)),
            cities: SlotCache::new(
                "cities",
                Some(ttl),
                Arc::clone(&clock),
                Arc::clone(&counters),
            ),
            activities: SlotCache::new(
                "activities",
                Some(ttl),
                Arc::clone(&clock),
                Arc::clone(&counters),
            ),
            fetcher,
            ttl,
            counters,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// All zones. Fetched once per session unless `clear_all` is called.
    pub async fn zones(&self) -> Result<Arc<Vec<Zone>>, CacheError> {
        let fetcher = Arc::clone(&self.fetcher);
        self.zones
            .get_or_fetch((), move || async move { fetcher.fetch_zones().await })
            .await
    }

    pub async fn cities_for_zone(&self, zone_id: ZoneId) -> Result<Arc<Vec<City>>, CacheError> {
        let fetcher = Arc::clone(&self.fetcher);
        self.cities
            .get_or_fetch(zone_id, move || async move { fetcher.fetch_cities(zone_id).await })
            .await
    }

    pub async fn activities_for_zone(
        &self,
        zone_id: ZoneId,
    ) -> Result<Arc<Vec<Activity>>, CacheError> {
        let fetcher = Arc::clone(&self.fetcher);
        self.activities
            .get_or_fetch(zone_id, move || async move {
                fetcher.fetch_activities(zone_id).await
            })
            .await
    }

    /// Load cities and activities of a zone concurrently.
    /// Fails with the first error; the successful half stays cached.
    pub async fn preload_zone_data(&self, zone_id: ZoneId) -> Result<ZoneData, CacheError> {
        let (cities, activities) = futures::try_join!(
            self.cities_for_zone(zone_id),
            self.activities_for_zone(zone_id),
        )?;
        Ok(ZoneData { cities, activities })
    }

    /// Forget the cities and activities of a zone. The zone list is kept.
    pub fn invalidate_zone(&self, zone_id: ZoneId) {
        self.cities.invalidate(&zone_id);
        self.activities.invalidate(&zone_id);
        info!(zone_id, "Zone data invalidated");
    }

    /// Forget everything, zone list included.
    pub fn clear_all(&self) {
        self.zones.clear();
        self.cities.clear();
        self.activities.clear();
        info!("Reference data cache cleared");
    }

    /// True when both the cities and the activities of the zone are cached and unexpired.
    pub fn has_fresh_data_for_zone(&self, zone_id: ZoneId) -> bool {
        self.cities.is_fresh(&zone_id) && self.activities.is_fresh(&zone_id)
    }

    /// Age of the cached cities of a zone, e.g. "3m ago". `None` if not cached.
    pub fn zone_entry_age(&self, zone_id: ZoneId) -> Option<String> {
        self.cities.age_display(&zone_id)
    }

    pub fn stats(&self) -> CacheStats {
        let mut stats = self.counters.snapshot();
        stats.entries = self.zones.len() + self.cities.len() + self.activities.len();
        stats
    }
}

// ============================================================================
// Tests
// ============================================================================
