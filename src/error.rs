//! Error types for persistence, routing and geofence registration.

use thiserror::Error;

/// Errors from the key-value persistence layer.
#[derive(Error, Debug)]
pub enum StoreError {
    /// I/O error while reading or writing a stored value
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The marker list could not be serialized
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Key cannot be used as a storage slot name
    #[error("Invalid storage key: {0:?}")]
    InvalidKey(String),

    /// A record's position has a NaN or infinite coordinate, which JSON
    /// cannot represent
    #[error("Marker {index} has a non-finite position ({latitude}, {longitude})")]
    NonFiniteCoordinate { index: usize, latitude: f64, longitude: f64 },
}

/// Errors from building, sending or decoding a route request.
#[derive(Error, Debug)]
pub enum RoutingError {
    /// No API key configured for the routing service
    #[error("Routing API key is missing")]
    MissingApiKey,

    /// Service answered with a non-success HTTP status
    #[error("Routing service error ({status}): {message}")]
    Status { status: u16, message: String },

    /// Service returned an error payload in place of a route
    #[error("Routing service rejected request: {0}")]
    Service(String),

    /// Response body was empty
    #[error("Empty response from routing service")]
    EmptyResponse,

    /// Response contained no route features
    #[error("No route found")]
    NoRoute,

    /// Response body was not the expected GeoJSON
    #[error("Malformed routing response: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Route geometry had fewer than two usable coordinates
    #[error("Invalid route geometry: {0}")]
    InvalidGeometry(String),

    /// Transport-level failure
    #[error("HTTP error: {0}")]
    Http(String),

    /// Async runtime could not be started
    #[error("Runtime error: {0}")]
    Runtime(String),
}

#[cfg(feature = "http")]
impl From<reqwest::Error> for RoutingError {
    fn from(e: reqwest::Error) -> Self {
        RoutingError::Http(e.to_string())
    }
}

/// Errors reported by a geofence registry.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeofenceError {
    /// Platform refused the registration
    #[error("Geofence {request_id} rejected: {reason}")]
    Rejected { request_id: String, reason: String },

    /// Location permission is missing
    #[error("Location permission not granted")]
    PermissionDenied,
}
