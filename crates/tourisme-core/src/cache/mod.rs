//! In-memory caching of reference data for the circuit wizard.
//!
//! This module provides the `ReferenceDataCache`, which memoizes the zone
//! list for the session and the cities and activities of each zone for a
//! configurable time-to-live (5 minutes by default).
//!
//! - Concurrent reads of the same key share one request
//! - Failed fetches are never stored
//! - Writers invalidate a zone, or everything, after mutating the backend

pub mod clock;
pub mod entry;
pub mod error;
pub mod reference;
mod slots;
pub mod stats;

pub use clock::{Clock, ManualClock, SystemClock};
pub use entry::CacheEntry;
pub use error::CacheError;
pub use reference::{ReferenceDataCache, ZoneData, DEFAULT_TTL_MINUTES};
pub use stats::CacheStats;
