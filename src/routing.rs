//! Driving route requests against the openrouteservice directions API.
//!
//! This module shapes the request body and decodes the GeoJSON response; it
//! does no I/O. The HTTP client lives in [`crate::http`] behind the `http`
//! feature.
//!
//! Coordinates on the wire are `[longitude, latitude]`, the GeoJSON order.

use geo::{algorithm::simplify::Simplify, Coord, LineString};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::RoutingError;
use crate::geo_utils::polyline_length;
use crate::GpsPoint;

/// Default directions endpoint (driving profile, GeoJSON output).
pub const DEFAULT_ROUTING_ENDPOINT: &str =
    "https://api.openrouteservice.org/v2/directions/driving-car/geojson";

/// Environment variable [`RoutingConfig::from_env`] reads the API key from.
pub const API_KEY_ENV: &str = "ORS_API_KEY";

/// Configuration for route fetching.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct RoutingConfig {
    /// Directions endpoint URL.
    pub endpoint: String,
    /// API key sent in the `Authorization` header.
    pub api_key: String,
    /// Whole-request timeout. Default: 30 seconds
    pub timeout_secs: u64,
    /// Retries on 429 or transport errors. Default: 3
    pub max_retries: u32,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ROUTING_ENDPOINT.to_string(),
            api_key: String::new(),
            timeout_secs: 30,
            max_retries: 3,
        }
    }
}

impl RoutingConfig {
    /// Default configuration with the API key taken from `ORS_API_KEY`.
    pub fn from_env() -> Self {
        Self {
            api_key: std::env::var(API_KEY_ENV).unwrap_or_default(),
            ..Self::default()
        }
    }
}

/// A decoded driving route.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteGeometry {
    /// Route polyline from origin to destination
    pub points: Vec<GpsPoint>,
    /// Route length in meters (service summary, or computed from the points)
    pub distance_meters: f64,
    /// Travel time in seconds, when the service reports it
    pub duration_seconds: Option<f64>,
}

impl RouteGeometry {
    /// Great-circle length of the polyline in meters.
    pub fn length_meters(&self) -> f64 {
        polyline_length(&self.points)
    }

    pub fn to_line_string(&self) -> LineString<f64> {
        LineString::new(
            self.points
                .iter()
                .map(|p| Coord { x: p.longitude, y: p.latitude })
                .collect(),
        )
    }

    /// Douglas-Peucker simplified copy for drawing.
    ///
    /// `tolerance_degrees` is in coordinate units; 0.0001 is roughly 11 m.
    /// Distance and duration are kept from the full route.
    pub fn simplified(&self, tolerance_degrees: f64) -> RouteGeometry {
        let simplified = self.to_line_string().simplify(&tolerance_degrees);
        RouteGeometry {
            points: simplified.0.iter().map(|c| GpsPoint::new(c.y, c.x)).collect(),
            distance_meters: self.distance_meters,
            duration_seconds: self.duration_seconds,
        }
    }
}

/// Build the JSON body for a route from `origin` to `destination`.
///
/// # Example
/// ```
/// use activity_markers::{GpsPoint, routing::route_request_body};
///
/// let body = route_request_body(&GpsPoint::new(52.52, 13.405), &GpsPoint::new(52.5165, 13.3777));
/// assert_eq!(body["coordinates"][0][0], 13.405);
/// assert_eq!(body["coordinates"][0][1], 52.52);
/// ```
pub fn route_request_body(origin: &GpsPoint, destination: &GpsPoint) -> Value {
    json!({
        "coordinates": [
            [origin.longitude, origin.latitude],
            [destination.longitude, destination.latitude],
        ]
    })
}

// ============================================================================
// Response decoding
// ============================================================================

#[derive(Debug, Deserialize)]
struct RouteResponse {
    features: Option<Vec<RouteFeature>>,
    error: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct RouteFeature {
    geometry: FeatureGeometry,
    #[serde(default)]
    properties: Option<FeatureProperties>,
}

#[derive(Debug, Deserialize)]
struct FeatureGeometry {
    // Positions may carry a third elevation value
    coordinates: Vec<Vec<f64>>,
}

#[derive(Debug, Deserialize)]
struct FeatureProperties {
    summary: Option<RouteSummary>,
}

#[derive(Debug, Deserialize)]
struct RouteSummary {
    distance: Option<f64>,
    duration: Option<f64>,
}

/// Extract a readable message from an ORS error payload.
///
/// ORS sends either `{"error": "text"}` or `{"error": {"code": n, "message": "text"}}`.
pub(crate) fn service_error_message(error: &Value) -> String {
    match error {
        Value::String(s) => s.clone(),
        Value::Object(obj) => match (obj.get("message").and_then(Value::as_str), obj.get("code")) {
            (Some(message), Some(code)) => format!("{} (code {})", message, code),
            (Some(message), None) => message.to_string(),
            _ => error.to_string(),
        },
        other => other.to_string(),
    }
}

/// Decode a directions response body into the first route it contains.
///
/// # Example
/// ```
/// use activity_markers::routing::parse_route_response;
///
/// let body = r#"{"features":[{"geometry":{"coordinates":[[13.405,52.52],[13.3777,52.5165]]},
///                 "properties":{"summary":{"distance":2300.5,"duration":310.0}}}]}"#;
/// let route = parse_route_response(body).unwrap();
/// assert_eq!(route.points.len(), 2);
/// assert_eq!(route.points[0].latitude, 52.52);
/// assert_eq!(route.distance_meters, 2300.5);
/// ```
pub fn parse_route_response(body: &str) -> Result<RouteGeometry, RoutingError> {
    if body.trim().is_empty() {
        return Err(RoutingError::EmptyResponse);
    }

    let response: RouteResponse = serde_json::from_str(body)?;

    if let Some(error) = response.error {
        return Err(RoutingError::Service(service_error_message(&error)));
    }

    let feature = response
        .features
        .and_then(|features| features.into_iter().next())
        .ok_or(RoutingError::NoRoute)?;

    let points = feature
        .geometry
        .coordinates
        .iter()
        .enumerate()
        .map(|(i, position)| match position.as_slice() {
            [lng, lat, ..] => Ok(GpsPoint::new(*lat, *lng)),
            _ => Err(RoutingError::InvalidGeometry(format!(
                "position {} has {} values",
                i,
                position.len()
            ))),
        })
        .collect::<Result<Vec<GpsPoint>, RoutingError>>()?;

    if points.len() < 2 {
        return Err(RoutingError::InvalidGeometry(format!(
            "route has {} points",
            points.len()
        )));
    }

    let summary = feature.properties.and_then(|p| p.summary);
    let distance_meters = summary
        .as_ref()
        .and_then(|s| s.distance)
        .unwrap_or_else(|| polyline_length(&points));
    let duration_seconds = summary.and_then(|s| s.duration);

    Ok(RouteGeometry { points, distance_meters, duration_seconds })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    fn straight_route(n: usize) -> RouteGeometry {
        let points: Vec<GpsPoint> = (0..n)
            .map(|i| GpsPoint::new(52.5 + i as f64 * 0.001, 13.4))
            .collect();
        let distance_meters = polyline_length(&points);
        RouteGeometry { points, distance_meters, duration_seconds: None }
    }

    #[test]
    fn test_request_body_uses_lon_lat_order() {
        let body = route_request_body(&GpsPoint::new(1.0, 2.0), &GpsPoint::new(3.0, 4.0));
        assert_eq!(body, json!({"coordinates": [[2.0, 1.0], [4.0, 3.0]]}));
    }

    #[test]
    fn test_parse_full_response() {
        let body = r#"{
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "properties": {"summary": {"distance": 1520.3, "duration": 245.7}, "way_points": [0, 2]},
                "geometry": {"type": "LineString", "coordinates": [[13.405, 52.52], [13.39, 52.518], [13.3777, 52.5165]]}
            }],
            "metadata": {"service": "routing"}
        }"#;
        let route = parse_route_response(body).unwrap();
        assert_eq!(route.points.len(), 3);
        assert_eq!(route.points[2], GpsPoint::new(52.5165, 13.3777));
        assert_eq!(route.distance_meters, 1520.3);
        assert_eq!(route.duration_seconds, Some(245.7));
    }

    #[test]
    fn test_parse_without_summary_computes_distance() {
        let body = r#"{"features":[{"geometry":{"coordinates":[[13.4,52.5,34.0],[13.4,52.501,35.5]]}}]}"#;
        let route = parse_route_response(body).unwrap();
        assert!(approx_eq(route.distance_meters, route.length_meters(), 1e-9));
        assert!(approx_eq(route.distance_meters, 111.19, 0.1));
        assert_eq!(route.duration_seconds, None);
    }

    #[test]
    fn test_parse_empty_body() {
        assert!(matches!(parse_route_response(""), Err(RoutingError::EmptyResponse)));
        assert!(matches!(parse_route_response("  \n"), Err(RoutingError::EmptyResponse)));
    }

    #[test]
    fn test_parse_no_features() {
        assert!(matches!(parse_route_response("{}"), Err(RoutingError::NoRoute)));
        assert!(matches!(parse_route_response(r#"{"features":[]}"#), Err(RoutingError::NoRoute)));
    }

    #[test]
    fn test_parse_service_errors() {
        let body = r#"{"error":{"code":2010,"message":"Could not find routable point"},"info":{}}"#;
        match parse_route_response(body) {
            Err(RoutingError::Service(message)) => {
                assert!(message.contains("Could not find routable point"));
                assert!(message.contains("2010"));
            }
            other => panic!("unexpected result: {:?}", other),
        }

        let body = r#"{"error":"Access to this API has been disallowed"}"#;
        match parse_route_response(body) {
            Err(RoutingError::Service(message)) => assert_eq!(message, "Access to this API has been disallowed"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_parse_malformed() {
        assert!(matches!(parse_route_response("<html>"), Err(RoutingError::Malformed(_))));
    }

    #[test]
    fn test_parse_bad_geometry() {
        let short = r#"{"features":[{"geometry":{"coordinates":[[13.4,52.5]]}}]}"#;
        assert!(matches!(parse_route_response(short), Err(RoutingError::InvalidGeometry(_))));

        let truncated = r#"{"features":[{"geometry":{"coordinates":[[13.4,52.5],[13.4]]}}]}"#;
        assert!(matches!(parse_route_response(truncated), Err(RoutingError::InvalidGeometry(_))));
    }

    #[test]
    fn test_simplified_keeps_endpoints() {
        let route = straight_route(20);
        let simplified = route.simplified(0.0001);
        assert_eq!(simplified.points.len(), 2);
        assert_eq!(simplified.points[0], route.points[0]);
        assert_eq!(simplified.points[1], route.points[19]);
        assert_eq!(simplified.distance_meters, route.distance_meters);
    }

    #[test]
    fn test_line_string_is_lng_lat() {
        let route = straight_route(3);
        let line = route.to_line_string();
        assert_eq!(line.0.len(), 3);
        assert_eq!(line.0[0], Coord { x: 13.4, y: 52.5 });
    }

    #[test]
    fn test_config_defaults() {
        let config = RoutingConfig::default();
        assert_eq!(config.endpoint, DEFAULT_ROUTING_ENDPOINT);
        assert!(config.api_key.is_empty());
        assert_eq!(config.max_retries, 3);
    }
}
