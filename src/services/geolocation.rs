//! Visitor geolocation lookup.

use std::future::Future;
use std::time::Duration;

use serde::Deserialize;

use crate::config::GeolocationConfig;
use crate::models::GeoLocation;
use crate::{Error, Result};

/// Placeholder for fields the lookup did not report.
pub const UNKNOWN: &str = "unknown";

/// Resolves the caller's network-derived location.
pub trait GeoLocator: Send + Sync {
    /// Looks up the current visitor. Makes a single attempt.
    ///
    /// # Errors
    ///
    /// Returns [`Error::GeolocationFailed`] if the lookup fails or answers
    /// with a non-success status.
    fn locate(&self) -> impl Future<Output = Result<GeoLocation>> + Send;
}

/// [`GeoLocator`] calling a JSON lookup endpoint (ipapi-style).
#[derive(Debug, Clone)]
pub struct HttpGeoLocator {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpGeoLocator {
    /// Creates a locator from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &GeolocationConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(format!("folio/{}", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::OperationFailed {
                operation: "build_http_client".to_string(),
                cause: e.to_string(),
            })?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
        })
    }

    /// Returns the lookup endpoint.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl GeoLocator for HttpGeoLocator {
    async fn locate(&self) -> Result<GeoLocation> {
        let response = self
            .client
            .get(&self.endpoint)
            .send()
            .await
            .map_err(|e| Error::GeolocationFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::GeolocationFailed(format!("HTTP {status}")));
        }

        let body: LookupResponse = response
            .json()
            .await
            .map_err(|e| Error::GeolocationFailed(e.to_string()))?;

        if body.error == Some(true) {
            let reason = body.reason.unwrap_or_else(|| "lookup refused".to_string());
            return Err(Error::GeolocationFailed(reason));
        }

        Ok(body.into_location())
    }
}

/// Wire shape of the lookup response; every field is optional.
#[derive(Debug, Default, Deserialize)]
struct LookupResponse {
    ip: Option<String>,
    city: Option<String>,
    region: Option<String>,
    country_name: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    timezone: Option<String>,
    // ipapi answers rate limits with 200 and an error flag
    error: Option<bool>,
    reason: Option<String>,
}

impl LookupResponse {
    fn into_location(self) -> GeoLocation {
        let or_unknown = |v: Option<String>| {
            v.filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| UNKNOWN.to_string())
        };
        GeoLocation {
            ip: or_unknown(self.ip),
            city: or_unknown(self.city),
            region: or_unknown(self.region),
            country: or_unknown(self.country_name),
            latitude: self.latitude.unwrap_or(0.0),
            longitude: self.longitude.unwrap_or(0.0),
            timezone: self.timezone,
        }
    }
}
