//! Reference-data mutations with cache invalidation.
//!
//! The cache cannot observe writes, so every create/update/delete goes
//! through `ReferenceAdmin`, which invalidates the keys the write affects
//! once the backend has accepted it.

use std::sync::Arc;

use tracing::info;

use crate::api::{ApiError, ReferenceWriter};
use crate::cache::ReferenceDataCache;
use crate::models::{Activity, ActivityInput, City, CityInput, Zone, ZoneId, ZoneInput};

pub struct ReferenceAdmin {
    writer: Arc<dyn ReferenceWriter>,
    cache: Arc<ReferenceDataCache>,
}

impl ReferenceAdmin {
    pub fn new(writer: Arc<dyn ReferenceWriter>, cache: Arc<ReferenceDataCache>) -> Self {
        Self { writer, cache }
    }

    // ===== Zones =====
    // The zone list has a single slot, and a zone change can orphan its
    // cities and activities, so any zone write clears everything.

    pub async fn create_zone(&self, input: &ZoneInput) -> Result<Zone, ApiError> {
        let zone = self.writer.create_zone(input).await?;
        info!(zone_id = zone.id, "Zone created");
        self.cache.clear_all();
        Ok(zone)
    }

    pub async fn update_zone(&self, id: ZoneId, input: &ZoneInput) -> Result<Zone, ApiError> {
        let zone = self.writer.update_zone(id, input).await?;
        info!(zone_id = id, "Zone updated");
        self.cache.clear_all();
        Ok(zone)
    }

    pub async fn delete_zone(&self, id: ZoneId) -> Result<(), ApiError> {
        self.writer.delete_zone(id).await?;
        info!(zone_id = id, "Zone deleted");
        self.cache.clear_all();
        Ok(())
    }

    // ===== Cities =====

    pub async fn create_city(&self, input: &CityInput) -> Result<City, ApiError> {
        let city = self.writer.create_city(input).await?;
        info!(city_id = city.id, zone_id = city.zone_id, "City created");
        self.cache.invalidate_zone(city.zone_id);
        Ok(city)
    }

    /// Update `before`. Both the old and the new zone are invalidated so a
    /// city moved between zones disappears from the first and shows up in
    /// the second.
    pub async fn update_city(&self, before: &City, changes: &CityInput) -> Result<City, ApiError> {
        let city = self.writer.update_city(before.id, changes).await?;
        info!(
            city_id = city.id,
            from_zone = before.zone_id,
            to_zone = city.zone_id,
            "City updated"
        );
        self.invalidate_both(before.zone_id, city.zone_id);
        Ok(city)
    }

    pub async fn delete_city(&self, city: &City) -> Result<(), ApiError> {
        self.writer.delete_city(city.id).await?;
        info!(city_id = city.id, zone_id = city.zone_id, "City deleted");
        self.cache.invalidate_zone(city.zone_id);
        Ok(())
    }

    // ===== Activities =====

    pub async fn create_activity(&self, input: &ActivityInput) -> Result<Activity, ApiError> {
        let activity = self.writer.create_activity(input).await?;
        info!(activity_id = activity.id, zone_id = activity.zone_id, "Activity created");
        self.cache.invalidate_zone(activity.zone_id);
        Ok(activity)
    }

    pub async fn update_activity(
        &self,
        before: &Activity,
        changes: &ActivityInput,
    ) -> Result<Activity, ApiError> {
        let activity = self.writer.update_activity(before.id, changes).await?;
        info!(
            activity_id = activity.id,
            from_zone = before.zone_id,
            to_zone = activity.zone_id,
            "Activity updated"
        );
        self.invalidate_both(before.zone_id, activity.zone_id);
        Ok(activity)
    }

    pub async fn delete_activity(&self, activity: &Activity) -> Result<(), ApiError> {
        self.writer.delete_activity(activity.id).await?;
        info!(activity_id = activity.id, zone_id = activity.zone_id, "Activity deleted");
        self.cache.invalidate_zone(activity.zone_id);
        Ok(())
    }

    fn invalidate_both(&self, previous: ZoneId, current: ZoneId) {
        self.cache.invalidate_zone(previous);
        if current != previous {
            self.cache.invalidate_zone(current);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::Duration;

    use super::*;
    use crate::api::ReferenceFetcher;
    use crate::models::{ActivityId, CityId};

    /// Backend double: reads count calls, writes echo their input or fail.
    struct FakeBackend {
        reads: AtomicUsize,
        reject_writes: bool,
    }

    impl FakeBackend {
        fn check(&self) -> Result<(), ApiError> {
            if self.reject_writes {
                return Err(ApiError::AccessDenied("read-only account".to_string()));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl ReferenceFetcher for FakeBackend {
        async fn fetch_zones(&self) -> Result<Vec<Zone>, ApiError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            Ok(vec![Zone { id: 1, name: "Littoral".to_string() }])
        }

        async fn fetch_cities(&self, zone_id: ZoneId) -> Result<Vec<City>, ApiError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            Ok(vec![City { id: 10, name: "Cotonou".to_string(), zone_id }])
        }

        async fn fetch_activities(&self, _zone_id: ZoneId) -> Result<Vec<Activity>, ApiError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            Ok(vec![])
        }
    }

    #[async_trait]
    impl ReferenceWriter for FakeBackend {
        async fn create_zone(&self, input: &ZoneInput) -> Result<Zone, ApiError> {
            self.check()?;
            Ok(Zone { id: 2, name: input.name.clone() })
        }

        async fn update_zone(&self, id: ZoneId, input: &ZoneInput) -> Result<Zone, ApiError> {
            self.check()?;
            Ok(Zone { id, name: input.name.clone() })
        }

        async fn delete_zone(&self, _id: ZoneId) -> Result<(), ApiError> {
            self.check()
        }

        async fn create_city(&self, input: &CityInput) -> Result<City, ApiError> {
            self.check()?;
            Ok(City { id: 11, name: input.name.clone(), zone_id: input.zone_id })
        }

        async fn update_city(&self, id: CityId, input: &CityInput) -> Result<City, ApiError> {
            self.check()?;
            Ok(City { id, name: input.name.clone(), zone_id: input.zone_id })
        }

        async fn delete_city(&self, _id: CityId) -> Result<(), ApiError> {
            self.check()
        }

        async fn create_activity(&self, input: &ActivityInput) -> Result<Activity, ApiError> {
            self.check()?;
            Ok(activity_from(12, input))
        }

        async fn update_activity(
            &self,
            id: ActivityId,
            input: &ActivityInput,
        ) -> Result<Activity, ApiError> {
            self.check()?;
            Ok(activity_from(id, input))
        }

        async fn delete_activity(&self, _id: ActivityId) -> Result<(), ApiError> {
            self.check()
        }
    }

    fn activity_from(id: ActivityId, input: &ActivityInput) -> Activity {
        Activity {
            id,
            name: input.name.clone(),
            description: input.description.clone(),
            zone_id: input.zone_id,
            city_id: input.city_id,
        }
    }

    async fn setup(reject_writes: bool) -> (ReferenceAdmin, Arc<ReferenceDataCache>) {
        let backend = Arc::new(FakeBackend { reads: AtomicUsize::new(0), reject_writes });
        let cache = Arc::new(ReferenceDataCache::new(backend.clone(), Duration::minutes(5)));
        cache.zones().await.unwrap();
        cache.preload_zone_data(1).await.unwrap();
        cache.preload_zone_data(2).await.unwrap();
        (ReferenceAdmin::new(backend, Arc::clone(&cache)), cache)
    }

    #[tokio::test]
    async fn test_create_city_invalidates_its_zone_only() {
        let (admin, cache) = setup(false).await;

        let input = CityInput { name: "Ouidah".to_string(), zone_id: 1 };
        admin.create_city(&input).await.unwrap();

        assert!(!cache.has_fresh_data_for_zone(1));
        assert!(cache.has_fresh_data_for_zone(2));
    }

    #[tokio::test]
    async fn test_moving_city_invalidates_both_zones() {
        let (admin, cache) = setup(false).await;

        let before = City { id: 10, name: "Cotonou".to_string(), zone_id: 1 };
        let changes = CityInput { name: "Cotonou".to_string(), zone_id: 2 };
        let after = admin.update_city(&before, &changes).await.unwrap();

        assert_eq!(after.zone_id, 2);
        assert!(!cache.has_fresh_data_for_zone(1));
        assert!(!cache.has_fresh_data_for_zone(2));
    }

    #[tokio::test]
    async fn test_delete_activity_invalidates_zone() {
        let (admin, cache) = setup(false).await;

        let activity = Activity {
            id: 5,
            name: "Pirogue".to_string(),
            description: String::new(),
            zone_id: 2,
            city_id: None,
        };
        admin.delete_activity(&activity).await.unwrap();

        assert!(cache.has_fresh_data_for_zone(1));
        assert!(!cache.has_fresh_data_for_zone(2));
    }

    #[tokio::test]
    async fn test_zone_write_clears_everything() {
        let (admin, cache) = setup(false).await;

        admin.create_zone(&ZoneInput { name: "Plateau".to_string() }).await.unwrap();

        assert_eq!(cache.stats().entries, 0);
    }

    #[tokio::test]
    async fn test_failed_write_keeps_cache() {
        let (admin, cache) = setup(true).await;

        let input = ActivityInput {
            name: "Safari".to_string(),
            description: "Pendjari".to_string(),
            zone_id: 1,
            city_id: None,
        };
        let err = admin.create_activity(&input).await.unwrap_err();

        assert!(matches!(err, ApiError::AccessDenied(_)));
        assert!(cache.has_fresh_data_for_zone(1));
        assert_eq!(cache.stats().entries, 5);
    }
}
