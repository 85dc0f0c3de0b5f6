//! Fetch a driving route between two points from openrouteservice.
//!
//! Run with: ORS_API_KEY=... cargo run --example fetch_route --features http

use activity_markers::{fetch_route_sync, GpsPoint, RoutingConfig};

fn main() {
    let config = RoutingConfig::from_env();
    let origin = GpsPoint::new(52.5200, 13.4050); // Alexanderplatz
    let destination = GpsPoint::new(52.5163, 13.3777); // Brandenburg Gate

    println!("Requesting route {:?} -> {:?}", origin, destination);

    match fetch_route_sync(config, origin, destination) {
        Ok(route) => {
            println!("  Points: {}", route.points.len());
            println!("  Distance: {:.0}m (polyline {:.0}m)", route.distance_meters, route.length_meters());
            if let Some(duration) = route.duration_seconds {
                println!("  Duration: {:.1} min", duration / 60.0);
            }
            let simplified = route.simplified(0.0001);
            println!("  Simplified for drawing: {} points", simplified.points.len());
        }
        Err(e) => println!("  Routing failed: {}", e),
    }
}
