use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

use crate::config::GeocoderSettings;
use crate::models::domain::as_number;

/// Errors that can occur while resolving a place name
#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("Geocoder returned error: {0}")]
    ApiError(String),
}

/// Place-name resolver backed by a search endpoint returning `{"top": {"lat", "lon"}}`
///
/// Successful lookups are cached in memory keyed by the normalized query.
#[derive(Clone)]
pub struct GeocoderClient {
    endpoint: String,
    client: Client,
    cache: moka::future::Cache<String, (f64, f64)>,
}

impl GeocoderClient {
    pub fn new(endpoint: String, settings: &GeocoderSettings) -> Result<Self, GeocodeError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;

        let cache = moka::future::CacheBuilder::new(settings.cache_size)
            .time_to_live(Duration::from_secs(settings.cache_ttl_secs))
            .build();

        Ok(Self {
            endpoint,
            client,
            cache,
        })
    }

    /// Build a client from settings, `None` when no endpoint is configured
    pub fn from_settings(settings: &GeocoderSettings) -> Result<Option<Self>, GeocodeError> {
        match settings.endpoint.as_deref().map(str::trim).filter(|e| !e.is_empty()) {
            Some(endpoint) => Self::new(endpoint.to_string(), settings).map(Some),
            None => Ok(None),
        }
    }

    /// Resolve a place name to (lat, lon)
    ///
    /// `Ok(None)` means the service answered but found nothing usable.
    pub async fn geocode(&self, query: &str) -> Result<Option<(f64, f64)>, GeocodeError> {
        let key = query.trim().to_lowercase();
        if key.is_empty() {
            return Ok(None);
        }

        if let Some(point) = self.cache.get(&key).await {
            tracing::trace!("Geocode cache hit: {}", key);
            return Ok(Some(point));
        }

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("q", query.trim()), ("limit", "1")])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GeocodeError::ApiError(format!(
                "Search failed: {}",
                response.status()
            )));
        }

        let json: Value = response.json().await?;
        let point = parse_top_hit(&json);

        match point {
            Some(p) => {
                tracing::debug!("Geocoded '{}' to ({:.5}, {:.5})", query, p.0, p.1);
                self.cache.insert(key, p).await;
            }
            None => tracing::debug!("No geocoding result for '{}'", query),
        }

        Ok(point)
    }
}

fn parse_top_hit(json: &Value) -> Option<(f64, f64)> {
    let top = json.get("top")?;
    let lat = top.get("lat").and_then(as_number)?;
    let lon = top.get("lon").and_then(as_number)?;

    if (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon) {
        Some((lat, lon))
    } else {
        None
    }
}
