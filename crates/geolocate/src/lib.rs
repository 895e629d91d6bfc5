//! IP Geolocation Module
//!
//! Resolves a coarse location tag (latitude, longitude, place name) from
//! an ip-api.com style endpoint. The lookup runs at most once per
//! process; events are tagged with the cached result as opaque
//! passthrough data. Failures degrade to "no location" and are never
//! fatal.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{info, warn};

/// Geolocation error types
#[derive(Error, Debug)]
pub enum GeolocateError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("lookup rejected with status {0:?}")]
    Rejected(String),

    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Resolved location metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationTag {
    pub latitude: f64,
    pub longitude: f64,
    /// "City, Region, Country" display string.
    pub place: String,
}

/// Geolocation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeolocateConfig {
    /// Lookup endpoint returning ip-api.com style JSON.
    pub endpoint: String,
    /// Request timeout (seconds).
    pub timeout_seconds: u64,
}

impl Default for GeolocateConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://ip-api.com/json/".to_string(),
            timeout_seconds: 5,
        }
    }
}

/// Wire format of the lookup endpoint.
#[derive(Debug, Deserialize)]
struct LookupResponse {
    status: String,
    #[serde(default)]
    lat: Option<f64>,
    #[serde(default)]
    lon: Option<f64>,
    #[serde(default)]
    city: Option<String>,
    #[serde(default, rename = "regionName")]
    region_name: Option<String>,
    #[serde(default)]
    country: Option<String>,
}

/// Once-per-process location resolver.
pub struct Geolocator {
    config: GeolocateConfig,
    client: reqwest::Client,
    cached: OnceCell<Option<LocationTag>>,
}

impl Geolocator {
    pub fn new(config: GeolocateConfig) -> Result<Self, GeolocateError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| GeolocateError::Request(e.to_string()))?;
        Ok(Self {
            config,
            client,
            cached: OnceCell::new(),
        })
    }

    /// Resolve the location tag, hitting the network at most once.
    ///
    /// Later calls return the cached outcome, including a cached failure:
    /// a process that starts offline simply runs untagged.
    pub async fn resolve(&self) -> Option<LocationTag> {
        self.cached
            .get_or_init(|| async {
                match self.fetch().await {
                    Ok(tag) => {
                        info!(place = %tag.place, "resolved geolocation");
                        Some(tag)
                    }
                    Err(e) => {
                        warn!("geolocation unavailable: {e}");
                        None
                    }
                }
            })
            .await
            .clone()
    }

    async fn fetch(&self) -> Result<LocationTag, GeolocateError> {
        let body = self
            .client
            .get(&self.config.endpoint)
            .send()
            .await
            .map_err(|e| GeolocateError::Request(e.to_string()))?
            .text()
            .await
            .map_err(|e| GeolocateError::Request(e.to_string()))?;
        parse_lookup(&body)
    }
}

/// Parse a lookup response body into a location tag.
fn parse_lookup(body: &str) -> Result<LocationTag, GeolocateError> {
    let parsed: LookupResponse =
        serde_json::from_str(body).map_err(|e| GeolocateError::Malformed(e.to_string()))?;

    if parsed.status != "success" {
        return Err(GeolocateError::Rejected(parsed.status));
    }

    let latitude = parsed
        .lat
        .ok_or_else(|| GeolocateError::Malformed("missing lat".to_string()))?;
    let longitude = parsed
        .lon
        .ok_or_else(|| GeolocateError::Malformed("missing lon".to_string()))?;

    let place = format!(
        "{}, {}, {}",
        parsed.city.unwrap_or_default(),
        parsed.region_name.unwrap_or_default(),
        parsed.country.unwrap_or_default()
    );

    Ok(LocationTag {
        latitude,
        longitude,
        place,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_success_response() {
        let body = r#"{
            "status": "success",
            "lat": 48.8566,
            "lon": 2.3522,
            "city": "Paris",
            "regionName": "Ile-de-France",
            "country": "France"
        }"#;

        let tag = parse_lookup(body).unwrap();
        assert!((tag.latitude - 48.8566).abs() < 1e-9);
        assert!((tag.longitude - 2.3522).abs() < 1e-9);
        assert_eq!(tag.place, "Paris, Ile-de-France, France");
    }

    #[test]
    fn test_parse_failed_status() {
        let body = r#"{"status": "fail", "message": "private range"}"#;
        assert!(matches!(
            parse_lookup(body),
            Err(GeolocateError::Rejected(_))
        ));
    }

    #[test]
    fn test_parse_missing_coordinates() {
        let body = r#"{"status": "success", "city": "Paris"}"#;
        assert!(matches!(
            parse_lookup(body),
            Err(GeolocateError::Malformed(_))
        ));
    }

    #[test]
    fn test_parse_garbage_body() {
        assert!(matches!(
            parse_lookup("<html>502</html>"),
            Err(GeolocateError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn test_resolve_caches_failure() {
        // Unroutable endpoint: the first resolve fails, later calls
        // reuse the cached outcome without retrying.
        let locator = Geolocator::new(GeolocateConfig {
            endpoint: "http://127.0.0.1:9/json/".to_string(),
            timeout_seconds: 1,
        })
        .unwrap();

        assert_eq!(locator.resolve().await, None);
        assert_eq!(locator.resolve().await, None);
    }
}
