use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{CityId, ZoneId};

pub type ActivityId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Activity {
    pub id: ActivityId,
    #[serde(rename = "nom")]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "zoneId")]
    pub zone_id: ZoneId,
    #[serde(rename = "villeId", default, skip_serializing_if = "Option::is_none")]
    pub city_id: Option<CityId>,
}

impl Activity {
    /// Whether the activity is offered in `city`.
    /// Activities without a city are zone-wide and offered everywhere in the zone.
    pub fn is_offered_in(&self, city: CityId) -> bool {
        self.city_id.map_or(true, |own| own == city)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ActivityDto {
    #[serde(default)]
    pub id: Option<ActivityId>,
    #[serde(default, alias = "name")]
    pub nom: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, rename = "zoneId", alias = "zone_id")]
    pub zone_id: Option<ZoneId>,
    #[serde(default, rename = "villeId", alias = "cityId")]
    pub city_id: Option<CityId>,
}

impl ActivityDto {
    pub fn into_activity(self, requested_zone: ZoneId) -> Option<Activity> {
        let Some(id) = self.id else {
            warn!(zone_id = requested_zone, name = ?self.nom, "Dropping activity without id");
            return None;
        };
        Some(Activity {
            id,
            name: self.nom.unwrap_or_default(),
            description: self.description.unwrap_or_default(),
            zone_id: self.zone_id.unwrap_or(requested_zone),
            city_id: self.city_id,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivityInput {
    #[serde(rename = "nom")]
    pub name: String,
    pub description: String,
    #[serde(rename = "zoneId")]
    pub zone_id: ZoneId,
    #[serde(rename = "villeId", skip_serializing_if = "Option::is_none")]
    pub city_id: Option<CityId>,
}
