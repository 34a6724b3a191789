//! Tourisme core library.
//!
//! Reference data (zones, cities, activities) for the circuit planning
//! back office: the REST client, the time-to-live cache with request
//! de-duplication, the admin layer that invalidates it on writes, and the
//! headless circuit wizard.

pub mod admin;
pub mod api;
pub mod cache;
pub mod config;
pub mod models;
pub mod utils;
pub mod wizard;

pub use admin::ReferenceAdmin;
pub use api::{ApiClient, ApiError};
pub use cache::{CacheError, ReferenceDataCache};
pub use config::Config;
pub use wizard::{CircuitDraft, CircuitWizard, WizardError};
