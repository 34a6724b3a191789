use serde::{Deserialize, Serialize};
use tracing::warn;

use super::ZoneId;

pub type CityId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct City {
    pub id: CityId,
    #[serde(rename = "nom")]
    pub name: String,
    #[serde(rename = "zoneId")]
    pub zone_id: ZoneId,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CityDto {
    #[serde(default)]
    pub id: Option<CityId>,
    #[serde(default, alias = "name")]
    pub nom: Option<String>,
    #[serde(default, rename = "zoneId", alias = "zone_id")]
    pub zone_id: Option<ZoneId>,
}

impl CityDto {
    /// Convert to a `City` fetched for `requested_zone`.
    /// Cities the backend returns without a zone are attached to the requested one.
    pub fn into_city(self, requested_zone: ZoneId) -> Option<City> {
        let Some(id) = self.id else {
            warn!(zone_id = requested_zone, name = ?self.nom, "Dropping city without id");
            return None;
        };
        Some(City {
            id,
            name: self.nom.unwrap_or_default(),
            zone_id: self.zone_id.unwrap_or(requested_zone),
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CityInput {
    #[serde(rename = "nom")]
    pub name: String,
    #[serde(rename = "zoneId")]
    pub zone_id: ZoneId,
}
