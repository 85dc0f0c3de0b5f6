//! Nearest saved marker lookup.
//!
//! A plain linear minimum scan over a snapshot of the marker list. Marker
//! lists are small and hand-curated, so there is no spatial index.

use std::fmt;

use crate::geo_utils::haversine_distance;
use crate::{GpsPoint, MarkerRecord};

/// Result of a nearest-marker query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearestMarker<'a> {
    /// Position of the record in store order
    pub index: usize,
    /// The matched record
    pub record: &'a MarkerRecord,
    /// Great-circle distance from the query point in meters
    pub distance_meters: f64,
}

/// Find the marker closest to `query`.
///
/// Returns `None` for an empty slice. When several markers are equally close,
/// the first one in slice order wins. A marker whose distance is NaN (a NaN
/// coordinate on either side) is never a candidate, so if every distance is
/// NaN there is no match.
///
/// # Example
/// ```
/// use activity_markers::{GpsPoint, MarkerRecord, find_nearest};
///
/// let markers = vec![
///     MarkerRecord::with_default_icon(GpsPoint::new(52.5200, 13.4050), "Work", "", "High"),
///     MarkerRecord::with_default_icon(GpsPoint::new(52.5165, 13.3777), "Shop", "", "Low"),
/// ];
///
/// let nearest = find_nearest(&GpsPoint::new(52.5200, 13.4050), &markers).unwrap();
/// assert_eq!(nearest.record.category, "Work");
/// assert_eq!(nearest.distance_meters, 0.0);
///
/// assert!(find_nearest(&GpsPoint::new(0.0, 0.0), &[]).is_none());
/// ```
pub fn find_nearest<'a>(query: &GpsPoint, markers: &'a [MarkerRecord]) -> Option<NearestMarker<'a>> {
    let mut best: Option<NearestMarker<'a>> = None;

    for (index, record) in markers.iter().enumerate() {
        let distance_meters = haversine_distance(query, &record.position);
        if distance_meters.is_nan() {
            continue;
        }
        // Strict `<` keeps the earliest record on ties
        let closer = match best {
            None => true,
            Some(ref b) => distance_meters < b.distance_meters,
        };
        if closer {
            best = Some(NearestMarker { index, record, distance_meters });
        }
    }

    best
}

/// Source of the device's current position.
///
/// Implemented by the host's location service; returns `None` when no fix is
/// available.
pub trait PositionSource {
    fn current_position(&self) -> Option<GpsPoint>;
}

impl PositionSource for Option<GpsPoint> {
    fn current_position(&self) -> Option<GpsPoint> {
        *self
    }
}

/// Outcome of looking up the nearest marker to the current position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NearestLookup<'a> {
    /// The position source had no fix
    PositionUnavailable,
    /// There are no saved markers
    NoMarkers,
    /// Closest saved marker
    Found(NearestMarker<'a>),
}

impl<'a> NearestLookup<'a> {
    /// Resolve the current position and scan `markers` for the closest one.
    pub fn resolve(source: &dyn PositionSource, markers: &'a [MarkerRecord]) -> Self {
        let Some(position) = source.current_position() else {
            return NearestLookup::PositionUnavailable;
        };
        match find_nearest(&position, markers) {
            Some(nearest) => NearestLookup::Found(nearest),
            None => NearestLookup::NoMarkers,
        }
    }

    /// The matched marker, if any.
    pub fn marker(&self) -> Option<&'a MarkerRecord> {
        match self {
            NearestLookup::Found(nearest) => Some(nearest.record),
            _ => None,
        }
    }

    /// User-facing message for this outcome.
    pub fn message(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for NearestLookup<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NearestLookup::PositionUnavailable => write!(f, "Current location not available"),
            NearestLookup::NoMarkers => write!(f, "No saved markers found"),
            NearestLookup::Found(nearest) => write!(f, "Nearest marker: {}", nearest.record.summary()),
        }
    }
}
