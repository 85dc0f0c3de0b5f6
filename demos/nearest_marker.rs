//! Place a few markers, persist them to disk, reopen the store and look up
//! the nearest one.
//!
//! Run with: cargo run --example nearest_marker

use activity_markers::{
    FileKeyValueStore, GeofenceConfig, GpsPoint, InMemoryGeofences, MarkerRecord, MarkerSession,
    MarkerStore,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let dir = std::env::temp_dir().join("activity-markers-demo");

    let backend = FileKeyValueStore::new(&dir)?;
    let mut session = MarkerSession::new(
        MarkerStore::open(backend),
        InMemoryGeofences::new(),
        GeofenceConfig::default(),
    );

    if session.store().is_empty() {
        println!("Placing markers in {}\n", dir.display());
        session.place_marker(MarkerRecord::with_default_icon(
            GpsPoint::new(52.5200, 13.4050), "Arbeit", "Office", "High",
        ))?;
        session.place_marker(MarkerRecord::with_default_icon(
            GpsPoint::new(52.5165, 13.3777), "Einkaufen", "Bakery", "Low",
        ))?;
        session.place_marker(MarkerRecord::with_default_icon(
            GpsPoint::new(52.5145, 13.3501), "Sport", "Running loop", "Medium",
        ))?;
    }

    // Simulate an app restart: reopen from disk and re-register geofences
    let (store, _) = session.into_parts();
    let backend = FileKeyValueStore::new(store.backend().root())?;
    let mut session = MarkerSession::new(
        MarkerStore::open(backend),
        InMemoryGeofences::new(),
        GeofenceConfig::default(),
    );
    println!("Loaded: {:?}", session.store().load_outcome());
    println!("Registered {} geofences\n", session.register_saved());

    for (i, marker) in session.store().all().iter().enumerate() {
        println!("  {}. {} [{}] at ({:.4}, {:.4})",
            i + 1, marker.title(), marker.icon_ref,
            marker.position.latitude, marker.position.longitude);
    }

    let here = Some(GpsPoint::new(52.5160, 13.3800));
    let lookup = session.locate_nearest(&here);
    println!("\n{}", lookup.message());
    if let activity_markers::NearestLookup::Found(nearest) = lookup {
        println!("Distance: {:.0}m", nearest.distance_meters);
    }

    Ok(())
}
