//! Data models for the tourism reference data.
//!
//! Each entity has a clean domain type, a raw `*Dto` matching what the
//! backend may send (every field optional), and an `*Input` write payload:
//!
//! - `Zone`: region, the root of the circuit wizard
//! - `City`: belongs to a zone
//! - `Activity`: belongs to a zone, optionally pinned to a city

pub mod activity;
pub mod city;
pub mod zone;

pub use activity::{Activity, ActivityDto, ActivityId, ActivityInput};
pub use city::{City, CityDto, CityId, CityInput};
pub use zone::{Zone, ZoneDto, ZoneId, ZoneInput};
