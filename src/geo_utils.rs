//! # Geographic Utilities
//!
//! Great-circle math shared by the nearest-marker query, geofence regions and
//! route geometry.
//!
//! ## Overview
//!
//! | Item | Description |
//! |------|-------------|
//! | [`haversine_distance`] | Great-circle distance between two GPS points |
//! | [`polyline_length`] | Total length of a polyline in meters |
//! | [`EARTH_RADIUS_METERS`] | Sphere radius used by every distance in this crate |
//! | [`MAX_SURFACE_DISTANCE_METERS`] | Half the circumference, the largest possible distance |
//!
//! ## Example
//!
//! ```rust
//! use activity_markers::{GpsPoint, geo_utils};
//!
//! let berlin = GpsPoint::new(52.5200, 13.4050);
//! let brandenburg_gate = GpsPoint::new(52.5163, 13.3777);
//!
//! let dist = geo_utils::haversine_distance(&berlin, &brandenburg_gate);
//! println!("Gate is {:.0}m away", dist);
//! ```
//!
//! ## Algorithm Notes
//!
//! ### Haversine Formula
//!
//! The Earth is modelled as a sphere of radius 6,371,000 m. The `atan2` form is
//! used for the central angle, which stays well-conditioned for both coincident
//! and antipodal points.
//!
//! Reference: [Haversine formula (Wikipedia)](https://en.wikipedia.org/wiki/Haversine_formula)
//!
//! ### Coordinate System
//!
//! Inputs are WGS84 latitude/longitude in degrees. No datum conversion and no
//! range validation is done: out-of-range input produces a finite but
//! geographically meaningless number.

use crate::GpsPoint;

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Half the circumference of the model sphere (~20,015 km).
pub const MAX_SURFACE_DISTANCE_METERS: f64 = std::f64::consts::PI * EARTH_RADIUS_METERS;

// =============================================================================
// Distance Functions
// =============================================================================

/// Calculate the great-circle distance between two GPS points using the Haversine formula.
///
/// Returns the distance in meters along the surface of a sphere with radius
/// [`EARTH_RADIUS_METERS`].
///
/// # Arguments
///
/// * `p1` - First GPS point
/// * `p2` - Second GPS point
///
/// # Returns
///
/// Distance in meters, in `[0, MAX_SURFACE_DISTANCE_METERS]` for valid input.
///
/// # Example
///
/// ```rust
/// use activity_markers::{GpsPoint, geo_utils};
///
/// let london = GpsPoint::new(51.5074, -0.1278);
/// let paris = GpsPoint::new(48.8566, 2.3522);
///
/// let distance = geo_utils::haversine_distance(&london, &paris);
/// assert!((distance - 343_500.0).abs() < 1000.0); // ~344 km
/// ```
#[inline]
pub fn haversine_distance(p1: &GpsPoint, p2: &GpsPoint) -> f64 {
    let lat1 = p1.latitude.to_radians();
    let lat2 = p2.latitude.to_radians();
    let d_lat = (p2.latitude - p1.latitude).to_radians();
    let d_lng = (p2.longitude - p1.longitude).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
    // Rounding can push `a` a hair past 1.0 near the antipode
    let a = a.clamp(0.0, 1.0);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_METERS * c
}

/// Calculate the total length of a polyline in meters.
///
/// Sums the haversine distance between consecutive points. Empty or single-point
/// input returns 0.0.
///
/// # Example
///
/// ```rust
/// use activity_markers::{GpsPoint, geo_utils};
///
/// let route = vec![
///     GpsPoint::new(52.5200, 13.4050),
///     GpsPoint::new(52.5190, 13.4000),
///     GpsPoint::new(52.5165, 13.3777),
/// ];
///
/// let length = geo_utils::polyline_length(&route);
/// assert!(length > geo_utils::haversine_distance(&route[0], &route[2]) - 1e-6);
/// ```
pub fn polyline_length(points: &[GpsPoint]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }

    points
        .windows(2)
        .map(|w| haversine_distance(&w[0], &w[1]))
        .sum()
}

// =============================================================================
// Unit Tests
// =============================================================================
