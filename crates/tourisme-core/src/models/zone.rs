use serde::{Deserialize, Serialize};
use tracing::warn;

pub type ZoneId = i64;

/// A tourism zone (region). Effectively static for a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Zone {
    pub id: ZoneId,
    #[serde(rename = "nom")]
    pub name: String,
}

/// Zone as returned by the backend, before identifiers are checked.
#[derive(Debug, Clone, Deserialize)]
pub struct ZoneDto {
    #[serde(default)]
    pub id: Option<ZoneId>,
    #[serde(default, alias = "name")]
    pub nom: Option<String>,
}

impl ZoneDto {
    /// Convert to a `Zone`, dropping records without an identifier.
    pub fn into_zone(self) -> Option<Zone> {
        let Some(id) = self.id else {
            warn!(name = ?self.nom, "Dropping zone without id");
            return None;
        };
        Some(Zone {
            id,
            name: self.nom.unwrap_or_default(),
        })
    }
}

/// Payload for creating or renaming a zone.
#[derive(Debug, Clone, Serialize)]
pub struct ZoneInput {
    #[serde(rename = "nom")]
    pub name: String,
}
