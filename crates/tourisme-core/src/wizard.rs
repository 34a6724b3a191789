//! Headless model of the circuit creation wizard.
//!
//! The wizard walks through dependent choices: a zone, then one of the
//! zone's cities, then activities offered in that city. Every list it offers
//! comes from the `ReferenceDataCache`, so stepping back and forth between
//! zones costs no extra requests while the cache is fresh.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::cache::{CacheError, ReferenceDataCache, ZoneData};
use crate::models::{Activity, ActivityId, City, CityId, Zone, ZoneId};

#[derive(Error, Debug)]
pub enum WizardError {
    #[error("No zone selected")]
    NoZoneSelected,

    #[error("No city selected")]
    NoCitySelected,

    #[error("City {0} is not in the selected zone")]
    UnknownCity(CityId),

    #[error("Activity {0} is not offered in the selected city")]
    UnknownActivity(ActivityId),

    #[error("Select at least one activity")]
    NoActivitiesSelected,

    #[error(transparent)]
    Cache(#[from] CacheError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardStep {
    Zone,
    City,
    Activities,
    Review,
}

impl WizardStep {
    pub fn title(&self) -> &'static str {
        match self {
            WizardStep::Zone => "Zone",
            WizardStep::City => "City",
            WizardStep::Activities => "Activities",
            WizardStep::Review => "Review",
        }
    }

    fn prev(&self) -> Self {
        match self {
            WizardStep::Zone | WizardStep::City => WizardStep::Zone,
            WizardStep::Activities => WizardStep::City,
            WizardStep::Review => WizardStep::Activities,
        }
    }
}

/// The choices made in the wizard, ready to submit as a new circuit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CircuitDraft {
    pub zone_id: ZoneId,
    pub city_id: CityId,
    pub activity_ids: Vec<ActivityId>,
}

pub struct CircuitWizard {
    cache: Arc<ReferenceDataCache>,
    step: WizardStep,
    zone_id: Option<ZoneId>,
    zone_data: Option<ZoneData>,
    city_id: Option<CityId>,
    activity_ids: Vec<ActivityId>,
}

impl CircuitWizard {
    pub fn new(cache: Arc<ReferenceDataCache>) -> Self {
        Self {
            cache,
            step: WizardStep::Zone,
            zone_id: None,
            zone_data: None,
            city_id: None,
            activity_ids: Vec::new(),
        }
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub async fn zone_options(&self) -> Result<Arc<Vec<Zone>>, WizardError> {
        Ok(self.cache.zones().await?)
    }

    /// Whether choosing `zone_id` will hit the network.
    pub fn needs_loading_indicator(&self, zone_id: ZoneId) -> bool {
        !self.cache.has_fresh_data_for_zone(zone_id)
    }

    /// Choose a zone and load its cities and activities. Picking a different
    /// zone discards the city and activity choices.
    pub async fn select_zone(&mut self, zone_id: ZoneId) -> Result<(), WizardError> {
        let data = self.cache.preload_zone_data(zone_id).await?;

        if self.zone_id != Some(zone_id) {
            debug!(zone_id, "Zone changed, resetting dependent choices");
            self.city_id = None;
            self.activity_ids.clear();
        }
        self.zone_id = Some(zone_id);
        self.zone_data = Some(data);
        self.step = WizardStep::City;
        Ok(())
    }

    pub fn city_options(&self) -> &[City] {
        self.zone_data
            .as_ref()
            .map(|data| data.cities.as_slice())
            .unwrap_or_default()
    }

    pub fn select_city(&mut self, city_id: CityId) -> Result<(), WizardError> {
        if self.zone_data.is_none() {
            return Err(WizardError::NoZoneSelected);
        }
        if !self.city_options().iter().any(|c| c.id == city_id) {
            return Err(WizardError::UnknownCity(city_id));
        }

        if self.city_id != Some(city_id) {
            self.activity_ids.clear();
        }
        self.city_id = Some(city_id);
        self.step = WizardStep::Activities;
        Ok(())
    }

    /// Activities of the zone offered in the selected city.
    pub fn activity_options(&self) -> Vec<&Activity> {
        let (Some(data), Some(city_id)) = (self.zone_data.as_ref(), self.city_id) else {
            return Vec::new();
        };
        data.activities
            .iter()
            .filter(|a| a.is_offered_in(city_id))
            .collect()
    }

    /// Add or remove an activity. Returns whether it is now selected.
    pub fn toggle_activity(&mut self, activity_id: ActivityId) -> Result<bool, WizardError> {
        if self.city_id.is_none() {
            return Err(WizardError::NoCitySelected);
        }
        if !self.activity_options().iter().any(|a| a.id == activity_id) {
            return Err(WizardError::UnknownActivity(activity_id));
        }

        if let Some(pos) = self.activity_ids.iter().position(|id| *id == activity_id) {
            self.activity_ids.remove(pos);
            Ok(false)
        } else {
            self.activity_ids.push(activity_id);
            Ok(true)
        }
    }

    pub fn selected_activities(&self) -> &[ActivityId] {
        &self.activity_ids
    }

    pub fn review(&mut self) -> Result<CircuitDraft, WizardError> {
        let draft = self.draft()?;
        self.step = WizardStep::Review;
        Ok(draft)
    }

    /// Go back one step. Choices are kept.
    pub fn back(&mut self) {
        self.step = self.step.prev();
    }

    pub fn draft(&self) -> Result<CircuitDraft, WizardError> {
        let zone_id = self.zone_id.ok_or(WizardError::NoZoneSelected)?;
        let city_id = self.city_id.ok_or(WizardError::NoCitySelected)?;
        if self.activity_ids.is_empty() {
            return Err(WizardError::NoActivitiesSelected);
        }
        Ok(CircuitDraft {
            zone_id,
            city_id,
            activity_ids: self.activity_ids.clone(),
        })
    }
}
