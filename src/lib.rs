//! # Activity Markers
//!
//! Persisted activity markers for a mobile map, with nearest-marker lookup,
//! geofence regions and driving routes.
//!
//! This library provides:
//! - A marker store mirrored to a single key-value slot
//! - Nearest saved marker lookup by great-circle distance
//! - Geofence region descriptions for saved markers
//! - Route request/response handling for openrouteservice
//!
//! ## Features
//!
//! - **`http`** - Enable the HTTP client for route fetching
//! - **`ffi`** - Enable FFI bindings for mobile platforms (iOS/Android)
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use activity_markers::{GpsPoint, MarkerRecord, MarkerStore, MemoryKeyValueStore};
//!
//! let mut store = MarkerStore::open(MemoryKeyValueStore::new());
//! store.append(MarkerRecord::with_default_icon(GpsPoint::new(52.5200, 13.4050), "Arbeit", "Office", "High")).unwrap();
//! store.append(MarkerRecord::with_default_icon(GpsPoint::new(52.5165, 13.3777), "Einkaufen", "Bakery", "Low")).unwrap();
//!
//! match store.nearest(&GpsPoint::new(52.5170, 13.3790)) {
//!     Some(nearest) => println!("Nearest: {} ({:.0}m)", nearest.record.summary(), nearest.distance_meters),
//!     None => println!("No saved markers"),
//! }
//! ```

use serde::{Deserialize, Serialize};

pub mod error;
pub use error::{GeofenceError, RoutingError, StoreError};

pub mod geo_utils;

pub mod markers;
pub use markers::{decode_markers, encode_markers, icon_for_category, MarkerRecord};

pub mod nearest;
pub use nearest::{find_nearest, NearestLookup, NearestMarker, PositionSource};

pub mod store;
pub use store::{
    FileKeyValueStore, KeyValueStore, LoadOutcome, MarkerStore, MemoryKeyValueStore, StoreConfig,
};

pub mod geofence;
pub use geofence::{GeofenceConfig, GeofenceRegion, GeofenceRegistry, InMemoryGeofences};

pub mod session;
pub use session::MarkerSession;

pub mod routing;
pub use routing::{parse_route_response, route_request_body, RouteGeometry, RoutingConfig};

// HTTP module for route fetching
#[cfg(feature = "http")]
pub mod http;

#[cfg(feature = "http")]
pub use http::{fetch_route_sync, RouteFetcher};

#[cfg(feature = "ffi")]
uniffi::setup_scaffolding!();

/// Initialize logging for Android (only used in FFI)
#[cfg(all(feature = "ffi", target_os = "android"))]
fn init_logging() {
    use android_logger::Config;
    use log::LevelFilter;

    android_logger::init_once(
        Config::default()
            .with_max_level(LevelFilter::Debug)
            .with_tag("ActivityMarkersRust")
    );
}

#[cfg(all(feature = "ffi", not(target_os = "android")))]
fn init_logging() {
    // No-op on non-Android platforms
}

// ============================================================================
// Core Types
// ============================================================================

/// A GPS coordinate with latitude and longitude in degrees.
///
/// # Example
/// ```
/// use activity_markers::GpsPoint;
/// let point = GpsPoint::new(52.5200, 13.4050); // Berlin
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct GpsPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GpsPoint {
    /// Create a new GPS point.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Both coordinates are finite (no NaN or infinity).
    ///
    /// This is all the persisted JSON form requires; range is not checked.
    pub fn is_finite(&self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite()
    }

    /// Check if the point has valid coordinates.
    ///
    /// Distance functions do not call this; it is for hosts that want to
    /// reject bad fixes before storing them.
    pub fn is_valid(&self) -> bool {
        self.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }
}

// ============================================================================
// FFI Exports (only when feature enabled)
// ============================================================================

#[cfg(feature = "ffi")]
mod ffi {
    use super::*;
    use log::{debug, info, warn};

    /// Nearest marker with the record copied out for the host.
    #[derive(Debug, Clone, uniffi::Record)]
    pub struct FfiNearestMarker {
        pub index: u32,
        pub record: MarkerRecord,
        pub distance_meters: f64,
    }

    /// Great-circle distance in meters.
    #[uniffi::export]
    pub fn ffi_haversine_distance(a: GpsPoint, b: GpsPoint) -> f64 {
        geo_utils::haversine_distance(&a, &b)
    }

    /// Find the saved marker closest to `query`. Ties go to the earliest marker.
    #[uniffi::export]
    pub fn ffi_find_nearest(query: GpsPoint, markers: Vec<MarkerRecord>) -> Option<FfiNearestMarker> {
        init_logging();
        debug!("[ActivityMarkersRust] find_nearest over {} markers", markers.len());
        find_nearest(&query, &markers).map(|n| FfiNearestMarker {
            index: n.index as u32,
            record: n.record.clone(),
            distance_meters: n.distance_meters,
        })
    }

    /// Decode a persisted marker list; unreadable payloads give an empty list.
    #[uniffi::export]
    pub fn ffi_decode_markers(payload: Option<String>) -> Vec<MarkerRecord> {
        init_logging();
        let markers = decode_markers(payload.as_deref());
        info!("[ActivityMarkersRust] Decoded {} markers", markers.len());
        markers
    }

    /// Encode the full marker list for the host's key-value store.
    #[uniffi::export]
    pub fn ffi_encode_markers(markers: Vec<MarkerRecord>) -> Option<String> {
        init_logging();
        match encode_markers(&markers) {
            Ok(json) => Some(json),
            Err(e) => {
                warn!("[ActivityMarkersRust] Failed to encode {} markers: {}", markers.len(), e);
                None
            }
        }
    }

    /// Icon reference for an activity category.
    #[uniffi::export]
    pub fn ffi_icon_for_category(category: String) -> String {
        icon_for_category(&category).to_string()
    }

    /// Geofence region to register for a marker.
    #[uniffi::export]
    pub fn ffi_geofence_for_marker(marker: MarkerRecord, config: GeofenceConfig) -> GeofenceRegion {
        GeofenceRegion::for_marker(&marker, config.radius_meters)
    }

    /// Key the marker list is stored under.
    #[uniffi::export]
    pub fn default_store_config_key() -> String {
        StoreConfig::default().storage_key
    }

    /// Result of fetching a route, flattened for the host.
    #[cfg(feature = "http")]
    #[derive(Debug, Clone, uniffi::Record)]
    pub struct FfiRouteResult {
        /// Route coordinates as flat array [lat1, lng1, lat2, lng2, ...]
        pub latlngs: Vec<f64>,
        pub distance_meters: f64,
        pub duration_seconds: Option<f64>,
        pub success: bool,
        pub error: Option<String>,
    }

    /// Fetch the driving route between two points (blocking).
    #[cfg(feature = "http")]
    #[uniffi::export]
    pub fn ffi_fetch_route(config: RoutingConfig, origin: GpsPoint, destination: GpsPoint) -> FfiRouteResult {
        init_logging();
        info!("[ActivityMarkersRust] fetch_route {:?} -> {:?}", origin, destination);

        match crate::http::fetch_route_sync(config, origin, destination) {
            Ok(route) => FfiRouteResult {
                latlngs: route.points.iter().flat_map(|p| [p.latitude, p.longitude]).collect(),
                distance_meters: route.distance_meters,
                duration_seconds: route.duration_seconds,
                success: true,
                error: None,
            },
            Err(e) => {
                warn!("[ActivityMarkersRust] Routing failed: {}", e);
                FfiRouteResult {
                    latlngs: vec![],
                    distance_meters: 0.0,
                    duration_seconds: None,
                    success: false,
                    error: Some(e.to_string()),
                }
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
