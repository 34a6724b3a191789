//! Collaborator contracts between the REST backend and the rest of the crate.
//!
//! `ReferenceFetcher` is what the cache consumes; `ReferenceWriter` is what
//! `ReferenceAdmin` consumes. `ApiClient` implements both, tests substitute
//! in-memory fakes.

use async_trait::async_trait;

use crate::models::{
    Activity, ActivityId, ActivityInput, City, CityId, CityInput, Zone, ZoneId, ZoneInput,
};

use super::ApiError;

/// Read side of the reference-data endpoints.
#[async_trait]
pub trait ReferenceFetcher: Send + Sync {
    async fn fetch_zones(&self) -> Result<Vec<Zone>, ApiError>;

    async fn fetch_cities(&self, zone_id: ZoneId) -> Result<Vec<City>, ApiError>;

    async fn fetch_activities(&self, zone_id: ZoneId) -> Result<Vec<Activity>, ApiError>;
}

/// Write side of the reference-data endpoints.
#[async_trait]
pub trait ReferenceWriter: Send + Sync {
    async fn create_zone(&self, input: &ZoneInput) -> Result<Zone, ApiError>;

    async fn update_zone(&self, id: ZoneId, input: &ZoneInput) -> Result<Zone, ApiError>;

    async fn delete_zone(&self, id: ZoneId) -> Result<(), ApiError>;

    async fn create_city(&self, input: &CityInput) -> Result<City, ApiError>;

    async fn update_city(&self, id: CityId, input: &CityInput) -> Result<City, ApiError>;

    async fn delete_city(&self, id: CityId) -> Result<(), ApiError>;

    async fn create_activity(&self, input: &ActivityInput) -> Result<Activity, ApiError>;

    async fn update_activity(
        &self,
        id: ActivityId,
        input: &ActivityInput,
    ) -> Result<Activity, ApiError>;

    async fn delete_activity(&self, id: ActivityId) -> Result<(), ApiError>;
}
