//! Visit analytics types.

use serde::{Deserialize, Serialize};

/// Where a visitor appears to be, as stored in the visit log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisitLocation {
    /// City name.
    pub city: String,
    /// Region or state.
    pub region: String,
    /// Country name.
    pub country: String,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
}

/// An entry in the append-only visit log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitLogEntry {
    /// Visitor IP address.
    pub ip: String,
    /// Resolved location.
    pub location: VisitLocation,
    /// Browser user-agent string.
    pub user_agent: String,
    /// Server-assigned time (epoch milliseconds).
    pub timestamp: i64,
    /// Request path that was viewed.
    pub path: String,
}

/// Result of a network-derived geolocation lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoLocation {
    /// Visitor IP address.
    pub ip: String,
    /// City name.
    pub city: String,
    /// Region or state.
    pub region: String,
    /// Country name.
    pub country: String,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// IANA timezone, when reported.
    pub timezone: Option<String>,
}

impl GeoLocation {
    /// Returns the subset persisted in the visit log.
    #[must_use]
    pub fn location(&self) -> VisitLocation {
        VisitLocation {
            city: self.city.clone(),
            region: self.region.clone(),
            country: self.country.clone(),
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }
}

/// Request details supplied by the presentation layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisitContext {
    /// Browser user-agent string.
    pub user_agent: String,
    /// Path of the rendered view.
    pub path: String,
}

impl VisitContext {
    /// Creates a visit context.
    #[must_use]
    pub fn new(user_agent: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
            path: path.into(),
        }
    }
}
