//! Marker session: the store, its geofences and the nearest-marker lookup
//! wired together the way the map screen uses them.
//!
//! Geofence registration is best-effort. A marker that was saved stays saved
//! even if the platform refuses its geofence; the failure is only logged.

use log::{info, warn};

use crate::error::StoreError;
use crate::geofence::{GeofenceConfig, GeofenceRegion, GeofenceRegistry};
use crate::nearest::{NearestLookup, PositionSource};
use crate::store::{KeyValueStore, MarkerStore};
use crate::MarkerRecord;

pub struct MarkerSession<S: KeyValueStore, G: GeofenceRegistry> {
    store: MarkerStore<S>,
    geofences: G,
    config: GeofenceConfig,
}

impl<S: KeyValueStore, G: GeofenceRegistry> MarkerSession<S, G> {
    pub fn new(store: MarkerStore<S>, geofences: G, config: GeofenceConfig) -> Self {
        Self { store, geofences, config }
    }

    pub fn store(&self) -> &MarkerStore<S> {
        &self.store
    }

    pub fn geofences(&self) -> &G {
        &self.geofences
    }

    pub fn into_parts(self) -> (MarkerStore<S>, G) {
        (self.store, self.geofences)
    }

    /// Register a geofence for every loaded marker.
    ///
    /// Returns how many registrations succeeded.
    pub fn register_saved(&mut self) -> usize {
        let regions: Vec<GeofenceRegion> = self
            .store
            .all()
            .iter()
            .map(|m| GeofenceRegion::for_marker(m, self.config.radius_meters))
            .collect();

        let registered = regions.iter().filter(|r| self.try_add_geofence(r)).count();
        info!("[MarkerSession] Registered {}/{} saved geofences", registered, regions.len());
        registered
    }

    /// Save a new marker and register its geofence.
    ///
    /// Returns the region that was requested for the marker.
    pub fn place_marker(&mut self, record: MarkerRecord) -> Result<GeofenceRegion, StoreError> {
        let region = GeofenceRegion::for_marker(&record, self.config.radius_meters);
        self.store.append(record)?;
        self.try_add_geofence(&region);
        Ok(region)
    }

    /// Delete the marker at `index`.
    ///
    /// Its geofence is removed unless another remaining marker still uses the
    /// same request id.
    pub fn delete_marker(&mut self, index: usize) -> Result<Option<MarkerRecord>, StoreError> {
        let Some(removed) = self.store.remove(index)? else {
            return Ok(None);
        };

        let request_id = removed.title();
        let still_used = self.store.all().iter().any(|m| m.title() == request_id);
        if still_used {
            info!("[MarkerSession] Keeping geofence {}: shared with another marker", request_id);
        } else if let Err(e) = self.geofences.remove_geofence(&request_id) {
            warn!("[MarkerSession] Failed to remove geofence {}: {}", request_id, e);
        }

        Ok(Some(removed))
    }

    /// Closest saved marker to the current position.
    pub fn locate_nearest(&self, source: &dyn PositionSource) -> NearestLookup<'_> {
        NearestLookup::resolve(source, self.store.all())
    }

    fn try_add_geofence(&mut self, region: &GeofenceRegion) -> bool {
        match self.geofences.add_geofence(region) {
            Ok(()) => true,
            Err(e) => {
                warn!("[MarkerSession] Failed to add geofence {}: {}", region.request_id, e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GeofenceError;
    use crate::geofence::InMemoryGeofences;
    use crate::store::MemoryKeyValueStore;
    use crate::GpsPoint;

    fn marker(lat: f64, lng: f64, category: &str, priority: &str) -> MarkerRecord {
        MarkerRecord::with_default_icon(GpsPoint::new(lat, lng), category, "", priority)
    }

    fn new_session() -> MarkerSession<MemoryKeyValueStore, InMemoryGeofences> {
        MarkerSession::new(
            MarkerStore::open(MemoryKeyValueStore::new()),
            InMemoryGeofences::new(),
            GeofenceConfig::default(),
        )
    }

    /// Registry without location permission.
    struct DeniedGeofences;

    impl GeofenceRegistry for DeniedGeofences {
        fn add_geofence(&mut self, _region: &GeofenceRegion) -> Result<(), GeofenceError> {
            Err(GeofenceError::PermissionDenied)
        }

        fn remove_geofence(&mut self, _request_id: &str) -> Result<(), GeofenceError> {
            Err(GeofenceError::PermissionDenied)
        }
    }

    /// Registry that accepts a fixed number of regions, like a platform
    /// service with a per-app geofence limit.
    struct CappedGeofences {
        inner: InMemoryGeofences,
        limit: usize,
    }

    impl GeofenceRegistry for CappedGeofences {
        fn add_geofence(&mut self, region: &GeofenceRegion) -> Result<(), GeofenceError> {
            if self.inner.get(&region.request_id).is_none() && self.inner.len() >= self.limit {
                return Err(GeofenceError::Rejected {
                    request_id: region.request_id.clone(),
                    reason: format!("limit of {} geofences reached", self.limit),
                });
            }
            self.inner.add_geofence(region)
        }

        fn remove_geofence(&mut self, request_id: &str) -> Result<(), GeofenceError> {
            self.inner.remove_geofence(request_id)
        }
    }

    #[test]
    fn test_place_marker_persists_and_registers() {
        let mut session = new_session();
        let region = session.place_marker(marker(52.52, 13.405, "Sport", "High")).unwrap();
        assert_eq!(region.request_id, "Sport - High");
        assert_eq!(session.store().len(), 1);
        assert!(session.geofences().get("Sport - High").is_some());
    }

    #[test]
    fn test_delete_marker_unregisters() {
        let mut session = new_session();
        session.place_marker(marker(52.52, 13.405, "Sport", "High")).unwrap();
        let removed = session.delete_marker(0).unwrap();
        assert!(removed.is_some());
        assert!(session.store().is_empty());
        assert!(session.geofences().is_empty());
    }

    #[test]
    fn test_delete_keeps_shared_geofence() {
        let mut session = new_session();
        session.place_marker(marker(52.52, 13.405, "Sport", "High")).unwrap();
        session.place_marker(marker(48.85, 2.35, "Sport", "High")).unwrap();

        session.delete_marker(0).unwrap();
        assert!(session.geofences().get("Sport - High").is_some());

        session.delete_marker(0).unwrap();
        assert!(session.geofences().is_empty());
    }

    #[test]
    fn test_delete_out_of_range() {
        let mut session = new_session();
        assert!(session.delete_marker(3).unwrap().is_none());
    }

    #[test]
    fn test_geofence_failure_does_not_block_save() {
        let mut session = MarkerSession::new(
            MarkerStore::open(MemoryKeyValueStore::new()),
            DeniedGeofences,
            GeofenceConfig::default(),
        );
        session.place_marker(marker(1.0, 1.0, "Work", "Low")).unwrap();
        assert_eq!(session.store().len(), 1);
        assert_eq!(session.register_saved(), 0);
        assert!(session.delete_marker(0).unwrap().is_some());
    }

    #[test]
    fn test_rejected_geofence_is_skipped() {
        let mut session = MarkerSession::new(
            MarkerStore::open(MemoryKeyValueStore::new()),
            CappedGeofences { inner: InMemoryGeofences::new(), limit: 2 },
            GeofenceConfig::default(),
        );
        session.place_marker(marker(1.0, 1.0, "Work", "Low")).unwrap();
        session.place_marker(marker(2.0, 2.0, "Sport", "High")).unwrap();
        let region = session.place_marker(marker(3.0, 3.0, "Haushalt", "Medium")).unwrap();
        assert_eq!(region.request_id, "Haushalt - Medium");
        assert_eq!(session.store().len(), 3);
        assert_eq!(session.geofences().inner.len(), 2);
        assert!(session.geofences().inner.get("Haushalt - Medium").is_none());

        let third = GeofenceRegion::for_marker(&session.store().all()[2], 50.0);
        let (_, mut geofences) = session.into_parts();
        assert_eq!(
            geofences.add_geofence(&third),
            Err(GeofenceError::Rejected {
                request_id: "Haushalt - Medium".to_string(),
                reason: "limit of 2 geofences reached".to_string(),
            })
        );
    }

    #[test]
    fn test_register_saved_on_startup() {
        let mut session = new_session();
        session.place_marker(marker(1.0, 1.0, "Work", "Low")).unwrap();
        session.place_marker(marker(2.0, 2.0, "Sport", "High")).unwrap();
        let (store, _) = session.into_parts();

        let mut restarted = MarkerSession::new(
            MarkerStore::open(store.into_backend()),
            InMemoryGeofences::new(),
            GeofenceConfig { radius_meters: 75.0 },
        );
        assert_eq!(restarted.register_saved(), 2);
        assert_eq!(restarted.geofences().get("Work - Low").map(|r| r.radius_meters), Some(75.0));
    }

    #[test]
    fn test_locate_nearest() {
        let mut session = new_session();
        let unavailable: Option<GpsPoint> = None;
        let here: Option<GpsPoint> = Some(GpsPoint::new(52.5200, 13.4050));

        assert_eq!(session.locate_nearest(&here), NearestLookup::NoMarkers);

        session.place_marker(marker(52.5200, 13.4050, "Work", "High")).unwrap();
        session.place_marker(marker(52.5165, 13.3777, "Shop", "Low")).unwrap();

        assert_eq!(session.locate_nearest(&unavailable), NearestLookup::PositionUnavailable);
        let lookup = session.locate_nearest(&here);
        assert_eq!(lookup.marker().map(|m| m.category.as_str()), Some("Work"));
    }
}
