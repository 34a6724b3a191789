//! API client for communicating with the tourism REST backend.
//!
//! This module provides the `ApiClient` struct for making authenticated
//! requests against the zone, city (`villes`) and activity (`activites`)
//! endpoints.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, Method, RequestBuilder, Response, Url};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, warn};

use crate::models::{
    Activity, ActivityDto, ActivityId, ActivityInput, City, CityDto, CityId, CityInput, Zone,
    ZoneDto, ZoneId, ZoneInput,
};

use super::{ApiError, ReferenceFetcher, ReferenceWriter};

// ============================================================================
// Constants
// ============================================================================

/// Default HTTP request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Maximum number of retries for rate-limited (429) requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

const ZONES_PATH: &str = "zones";
const CITIES_PATH: &str = "villes";
const ACTIVITIES_PATH: &str = "activites";

/// API client for the tourism backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
    initial_backoff: Duration,
}

impl ApiClient {
    /// Create a new API client rooted at `base_url` (e.g. `https://host/api`).
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        Url::parse(base_url).map_err(|e| ApiError::InvalidUrl(format!("{}: {}", base_url, e)))?;

        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
            initial_backoff: Duration::from_millis(INITIAL_BACKOFF_MS),
        })
    }

    /// Set the bearer token for authenticated requests
    pub fn set_token(&mut self, token: String) {
        self.token = Some(token);
    }

    /// Create a new ApiClient with the given token, sharing the connection pool.
    pub fn with_token(&self, token: String) -> Self {
        Self {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            token: Some(token),
            initial_backoff: self.initial_backoff,
        }
    }

    /// Override the first rate-limit backoff delay. Doubles on each retry.
    pub fn with_initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff = backoff;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn auth_headers(&self) -> Result<header::HeaderMap, ApiError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));
        if let Some(ref token) = self.token {
            let value = header::HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| {
                    ApiError::InvalidResponse("Token is not a valid header value".to_string())
                })?;
            headers.insert(header::AUTHORIZATION, value);
        }
        Ok(headers)
    }

    /// Check if response is successful, returning an error with body if not.
    /// Returns Ok(Some(response)) for success, Ok(None) for rate limit (should retry),
    /// or Err for other errors.
    async fn check_response_for_retry(response: Response) -> Result<Option<Response>, ApiError> {
        if response.status().is_success() {
            Ok(Some(response))
        } else if response.status().as_u16() == 429 {
            Ok(None)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    /// Send a request, retrying with exponential backoff while rate limited.
    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: &str,
        body: Option<&B>,
    ) -> Result<Response, ApiError> {
        let mut retries = 0;
        let mut backoff = self.initial_backoff;

        loop {
            let mut request: RequestBuilder = self
                .client
                .request(method.clone(), url)
                .headers(self.auth_headers()?);
            if let Some(body) = body {
                request = request.json(body);
            }

            let response = request.send().await?;

            match Self::check_response_for_retry(response).await? {
                Some(response) => return Ok(response),
                None => {
                    retries += 1;
                    if retries > MAX_RATE_LIMIT_RETRIES {
                        return Err(ApiError::RateLimited);
                    }
                    warn!(
                        url = url,
                        retry = retries,
                        backoff_ms = backoff.as_millis() as u64,
                        "Rate limited, backing off"
                    );
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                }
            }
        }
    }

    async fn get_list<D: DeserializeOwned>(&self, path: &str) -> Result<Vec<D>, ApiError> {
        let url = self.url(path);
        let response = self.send::<()>(Method::GET, &url, None).await?;
        let text = response.text().await?;
        let items = parse_list(&text)?;
        debug!(url = %url, count = items.len(), "List response received");
        Ok(items)
    }

    async fn write<B: Serialize, D: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<D, ApiError> {
        let url = self.url(path);
        let response = self.send(method, &url, Some(body)).await?;
        let text = response.text().await?;
        Ok(parse_single(&text)?)
    }

    async fn delete(&self, path: &str) -> Result<(), ApiError> {
        let url = self.url(path);
        self.send::<()>(Method::DELETE, &url, None).await?;
        debug!(url = %url, "Resource deleted");
        Ok(())
    }
}

/// Parse a list payload that is either a bare array or wrapped in an object.
fn parse_list<D: DeserializeOwned>(text: &str) -> Result<Vec<D>, serde_json::Error> {
    #[derive(Deserialize)]
    struct Wrapper<D> {
        #[serde(alias = "items", alias = "content")]
        data: Vec<D>,
    }

    let value: serde_json::Value = serde_json::from_str(text)?;
    if value.is_object() {
        serde_json::from_value::<Wrapper<D>>(value).map(|w| w.data)
    } else {
        serde_json::from_value(value)
    }
}

/// Parse a single-object payload, unwrapping a `data` envelope if present.
fn parse_single<D: DeserializeOwned>(text: &str) -> Result<D, serde_json::Error> {
    #[derive(Deserialize)]
    struct Wrapper<D> {
        data: D,
    }

    if let Ok(wrapper) = serde_json::from_str::<Wrapper<D>>(text) {
        return Ok(wrapper.data);
    }
    serde_json::from_str(text)
}

fn missing_id(resource: &str) -> ApiError {
    ApiError::InvalidResponse(format!("{} returned without an id", resource))
}

// ===== Reads =====

#[async_trait]
impl ReferenceFetcher for ApiClient {
    async fn fetch_zones(&self) -> Result<Vec<Zone>, ApiError> {
        let dtos: Vec<ZoneDto> = self.get_list(ZONES_PATH).await?;
        Ok(dtos.into_iter().filter_map(ZoneDto::into_zone).collect())
    }

    async fn fetch_cities(&self, zone_id: ZoneId) -> Result<Vec<City>, ApiError> {
        let path = format!("{}/{}/{}", ZONES_PATH, zone_id, CITIES_PATH);
        let dtos: Vec<CityDto> = self.get_list(&path).await?;
        Ok(dtos.into_iter().filter_map(|d| d.into_city(zone_id)).collect())
    }

    async fn fetch_activities(&self, zone_id: ZoneId) -> Result<Vec<Activity>, ApiError> {
        let path = format!("{}/{}/{}", ZONES_PATH, zone_id, ACTIVITIES_PATH);
        let dtos: Vec<ActivityDto> = self.get_list(&path).await?;
        Ok(dtos.into_iter().filter_map(|d| d.into_activity(zone_id)).collect())
    }
}

// ===== Writes =====

#[async_trait]
impl ReferenceWriter for ApiClient {
    async fn create_zone(&self, input: &ZoneInput) -> Result<Zone, ApiError> {
        let dto: ZoneDto = self.write(Method::POST, ZONES_PATH, input).await?;
        dto.into_zone().ok_or_else(|| missing_id("zone"))
    }

    async fn update_zone(&self, id: ZoneId, input: &ZoneInput) -> Result<Zone, ApiError> {
        let path = format!("{}/{}", ZONES_PATH, id);
        let dto: ZoneDto = self.write(Method::PUT, &path, input).await?;
        dto.into_zone().ok_or_else(|| missing_id("zone"))
    }

    async fn delete_zone(&self, id: ZoneId) -> Result<(), ApiError> {
        self.delete(&format!("{}/{}", ZONES_PATH, id)).await
    }

    async fn create_city(&self, input: &CityInput) -> Result<City, ApiError> {
        let dto: CityDto = self.write(Method::POST, CITIES_PATH, input).await?;
        dto.into_city(input.zone_id).ok_or_else(|| missing_id("city"))
    }

    async fn update_city(&self, id: CityId, input: &CityInput) -> Result<City, ApiError> {
        let path = format!("{}/{}", CITIES_PATH, id);
        let dto: CityDto = self.write(Method::PUT, &path, input).await?;
        dto.into_city(input.zone_id).ok_or_else(|| missing_id("city"))
    }

    async fn delete_city(&self, id: CityId) -> Result<(), ApiError> {
        self.delete(&format!("{}/{}", CITIES_PATH, id)).await
    }

    async fn create_activity(&self, input: &ActivityInput) -> Result<Activity, ApiError> {
        let dto: ActivityDto = self.write(Method::POST, ACTIVITIES_PATH, input).await?;
        dto.into_activity(input.zone_id).ok_or_else(|| missing_id("activity"))
    }

    async fn update_activity(
        &self,
        id: ActivityId,
        input: &ActivityInput,
    ) -> Result<Activity, ApiError> {
        let path = format!("{}/{}", ACTIVITIES_PATH, id);
        let dto: ActivityDto = self.write(Method::PUT, &path, input).await?;
        dto.into_activity(input.zone_id).ok_or_else(|| missing_id("activity"))
    }

    async fn delete_activity(&self, id: ActivityId) -> Result<(), ApiError> {
        self.delete(&format!("{}/{}", ACTIVITIES_PATH, id)).await
    }
}

// ============================================================================
// Tests
// ============================================================================
