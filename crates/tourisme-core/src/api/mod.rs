//! REST API client module for the tourism backend.
//!
//! This module provides the `ApiClient` for reading and writing the
//! reference data (zones, cities, activities) that the circuit wizard
//! relies on, and the collaborator traits the cache and admin layer
//! are written against.
//!
//! Requests are authenticated with an optional bearer token.

pub mod client;
pub mod error;
pub mod fetcher;

pub use client::ApiClient;
pub use error::ApiError;
pub use fetcher::{ReferenceFetcher, ReferenceWriter};
