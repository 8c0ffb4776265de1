use geo::{Distance, Geodesic, Point};

/// Ellipsoidal (WGS-84) distance in meters between two coordinates given in degrees.
pub fn measure_distance(
    lat1: Option<f64>,
    lon1: Option<f64>,
    lat2: Option<f64>,
    lon2: Option<f64>,
) -> Option<f64> {
    let (lat1, lon1, lat2, lon2) = (lat1?, lon1?, lat2?, lon2?);
    let meters = Geodesic::distance(Point::new(lon1, lat1), Point::new(lon2, lat2));
    meters.is_finite().then_some(meters)
}
