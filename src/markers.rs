//! Marker records and the serialized form they are persisted in.
//!
//! A [`MarkerRecord`] is a saved point of interest: a position plus the
//! category, note and priority the user chose when dropping it. The whole
//! marker list is persisted as one JSON array; see [`encode_markers`] and
//! [`decode_markers`].
//!
//! Records are never edited in place. Changing a marker means removing it and
//! placing a new one.

use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::GpsPoint;

/// Icon used when a category has no entry in [`CATEGORY_ICONS`].
pub const DEFAULT_ICON: &str = "marker_household";

/// Known activity categories and their icon references.
///
/// Both the German labels written by older app versions and the English ones
/// resolve to the same icon.
pub const CATEGORY_ICONS: &[(&str, &str)] = &[
    ("Sport", "marker_sport"),
    ("Einkaufen", "marker_shopping"),
    ("Shopping", "marker_shopping"),
    ("Haushalt", "marker_household"),
    ("Household", "marker_household"),
    ("Arbeit", "marker_work"),
    ("Work", "marker_work"),
];

/// Resolve the icon reference for a category label.
///
/// Matching is exact. Unknown labels get [`DEFAULT_ICON`].
///
/// # Example
/// ```
/// use activity_markers::markers::{icon_for_category, DEFAULT_ICON};
///
/// assert_eq!(icon_for_category("Sport"), "marker_sport");
/// assert_eq!(icon_for_category("Gardening"), DEFAULT_ICON);
/// ```
pub fn icon_for_category(category: &str) -> &'static str {
    CATEGORY_ICONS
        .iter()
        .find(|(label, _)| *label == category)
        .map(|(_, icon)| *icon)
        .unwrap_or(DEFAULT_ICON)
}

/// A saved point of interest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct MarkerRecord {
    /// Where the marker was dropped
    pub position: GpsPoint,
    /// Activity label, e.g. "Sport" (not validated)
    pub category: String,
    /// Free-text description, may be empty
    pub note: String,
    /// Free-text priority label, no ordering implied
    pub priority: String,
    /// Opaque icon reference resolved by the host
    pub icon_ref: String,
}

impl MarkerRecord {
    /// Create a marker record with an explicit icon reference.
    pub fn new(
        position: GpsPoint,
        category: impl Into<String>,
        note: impl Into<String>,
        priority: impl Into<String>,
        icon_ref: impl Into<String>,
    ) -> Self {
        Self {
            position,
            category: category.into(),
            note: note.into(),
            priority: priority.into(),
            icon_ref: icon_ref.into(),
        }
    }

    /// Create a marker record whose icon is looked up from its category.
    ///
    /// # Example
    /// ```
    /// use activity_markers::{GpsPoint, MarkerRecord};
    ///
    /// let gym = MarkerRecord::with_default_icon(GpsPoint::new(52.52, 13.405), "Sport", "Gym", "High");
    /// assert_eq!(gym.icon_ref, "marker_sport");
    /// assert_eq!(gym.title(), "Sport - High");
    /// ```
    pub fn with_default_icon(
        position: GpsPoint,
        category: impl Into<String>,
        note: impl Into<String>,
        priority: impl Into<String>,
    ) -> Self {
        let category = category.into();
        let icon_ref = icon_for_category(&category);
        Self::new(position, category, note, priority, icon_ref)
    }

    /// Display title, `"{category} - {priority}"`.
    ///
    /// Also used as the geofence request id for this marker.
    pub fn title(&self) -> String {
        format!("{} - {}", self.category, self.priority)
    }

    /// Short description for notifications and toasts, `"{category} ({note})"`.
    pub fn summary(&self) -> String {
        format!("{} ({})", self.category, self.note)
    }
}

// ============================================================================
// Serialized form
// ============================================================================

/// Serialize the full marker list into the persisted JSON blob.
///
/// Fails with [`StoreError::NonFiniteCoordinate`] if any position has a NaN or
/// infinite coordinate. `serde_json` would write those as `null`, and the
/// resulting blob could not be read back.
pub fn encode_markers(markers: &[MarkerRecord]) -> Result<String, StoreError> {
    if let Some(index) = markers.iter().position(|m| !m.position.is_finite()) {
        let position = markers[index].position;
        return Err(StoreError::NonFiniteCoordinate {
            index,
            latitude: position.latitude,
            longitude: position.longitude,
        });
    }
    Ok(serde_json::to_string(markers)?)
}

/// Parse a persisted blob, reporting why it could not be read.
///
/// A blank string and a JSON `null` both mean "no markers yet".
pub fn try_decode_markers(raw: &str) -> Result<Vec<MarkerRecord>, serde_json::Error> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    let parsed: Option<Vec<MarkerRecord>> = serde_json::from_str(raw)?;
    Ok(parsed.unwrap_or_default())
}

/// Parse a persisted blob, falling back to an empty list.
///
/// A missing value or one that does not parse both yield an empty list; a
/// parse failure is logged and never returned.
///
/// # Example
/// ```
/// use activity_markers::markers::decode_markers;
///
/// assert!(decode_markers(None).is_empty());
/// assert!(decode_markers(Some("[{\"position\":")).is_empty());
/// ```
pub fn decode_markers(raw: Option<&str>) -> Vec<MarkerRecord> {
    let Some(raw) = raw else {
        return Vec::new();
    };
    match try_decode_markers(raw) {
        Ok(markers) => markers,
        Err(e) => {
            warn!("[Markers] Discarding unreadable marker list ({} bytes): {}", raw.len(), e);
            Vec::new()
        }
    }
}
