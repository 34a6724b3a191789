use std::sync::Arc;

use thiserror::Error;

use crate::api::ApiError;

/// Failure of a cache read. Cloneable so a single failed fetch can be
/// handed to every caller that joined it.
#[derive(Error, Debug, Clone)]
pub enum CacheError {
    #[error("Failed to fetch {resource}: {source}")]
    FetchFailed {
        resource: &'static str,
        #[source]
        source: Arc<ApiError>,
    },
}

impl CacheError {
    pub(crate) fn fetch_failed(resource: &'static str, source: ApiError) -> Self {
        CacheError::FetchFailed {
            resource,
            source: Arc::new(source),
        }
    }

    /// The underlying API error.
    pub fn api_error(&self) -> &ApiError {
        match self {
            CacheError::FetchFailed { source, .. } => source,
        }
    }
}
