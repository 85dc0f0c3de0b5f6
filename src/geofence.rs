//! Circular geofence regions around saved markers.
//!
//! This module only describes regions and the registry they are handed to.
//! Monitoring and transition delivery belong to the platform.

use std::collections::BTreeMap;

use log::debug;

use crate::error::GeofenceError;
use crate::geo_utils::haversine_distance;
use crate::{GpsPoint, MarkerRecord};

/// Configuration for marker geofences.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct GeofenceConfig {
    /// Radius of the region registered around each marker.
    /// Default: 50.0 meters
    pub radius_meters: f64,
}

impl Default for GeofenceConfig {
    fn default() -> Self {
        Self { radius_meters: 50.0 }
    }
}

/// Transitions a region reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct GeofenceTransitions {
    pub enter: bool,
    pub exit: bool,
}

impl GeofenceTransitions {
    pub const ENTER_EXIT: Self = Self { enter: true, exit: true };
}

/// A circular region registered with the platform geofencing service.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct GeofenceRegion {
    /// Identifier the region is registered and removed under
    pub request_id: String,
    pub center: GpsPoint,
    pub radius_meters: f64,
    pub transitions: GeofenceTransitions,
}

impl GeofenceRegion {
    /// Region around a marker, identified by the marker's title.
    ///
    /// Markers sharing a category and priority share a request id.
    ///
    /// # Example
    /// ```
    /// use activity_markers::{GpsPoint, MarkerRecord, GeofenceRegion};
    ///
    /// let shop = MarkerRecord::with_default_icon(GpsPoint::new(52.5165, 13.3777), "Einkaufen", "Milk", "Low");
    /// let region = GeofenceRegion::for_marker(&shop, 50.0);
    /// assert_eq!(region.request_id, "Einkaufen - Low");
    /// assert!(region.contains(&GpsPoint::new(52.5166, 13.3777)));
    /// ```
    pub fn for_marker(marker: &MarkerRecord, radius_meters: f64) -> Self {
        Self {
            request_id: marker.title(),
            center: marker.position,
            radius_meters,
            transitions: GeofenceTransitions::ENTER_EXIT,
        }
    }

    /// Whether `point` lies inside the region (boundary included).
    pub fn contains(&self, point: &GpsPoint) -> bool {
        haversine_distance(&self.center, point) <= self.radius_meters
    }
}

/// The platform geofencing service.
pub trait GeofenceRegistry {
    fn add_geofence(&mut self, region: &GeofenceRegion) -> Result<(), GeofenceError>;

    /// Remove the region registered under `request_id`.
    fn remove_geofence(&mut self, request_id: &str) -> Result<(), GeofenceError>;
}

/// Registry that keeps regions in memory.
///
/// Registering an id that is already present replaces the earlier region,
/// which is how platform services treat duplicate request ids.
#[derive(Debug, Clone, Default)]
pub struct InMemoryGeofences {
    regions: BTreeMap<String, GeofenceRegion>,
}

impl InMemoryGeofences {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, request_id: &str) -> Option<&GeofenceRegion> {
        self.regions.get(request_id)
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Regions containing `point`, ordered by request id.
    pub fn regions_containing<'a>(&'a self, point: &'a GpsPoint) -> impl Iterator<Item = &'a GeofenceRegion> + 'a {
        self.regions.values().filter(move |r| r.contains(point))
    }
}

impl GeofenceRegistry for InMemoryGeofences {
    fn add_geofence(&mut self, region: &GeofenceRegion) -> Result<(), GeofenceError> {
        debug!("[Geofences] Added {} ({:.0}m)", region.request_id, region.radius_meters);
        self.regions.insert(region.request_id.clone(), region.clone());
        Ok(())
    }

    fn remove_geofence(&mut self, request_id: &str) -> Result<(), GeofenceError> {
        if self.regions.remove(request_id).is_some() {
            debug!("[Geofences] Removed {}", request_id);
        }
        Ok(())
    }
}
