use crate::models::BuildingRecord;

/// Earth's mean radius in miles
pub const EARTH_RADIUS_MILES: f64 = 3958.7613;

/// Smallest cos(latitude) used when widening longitude bounds near the poles
const MIN_COS_LAT: f64 = 1e-12;

/// Absorbs float rounding at the exact edge of the circle
const BBOX_SLACK_DEG: f64 = 1e-9;

/// Anything that may carry a coordinate pair
pub trait GeoPoint {
    /// Latitude/longitude in degrees, `None` when either is missing
    fn coordinates(&self) -> Option<(f64, f64)>;
}

impl GeoPoint for BuildingRecord {
    fn coordinates(&self) -> Option<(f64, f64)> {
        BuildingRecord::coordinates(self)
    }
}

impl GeoPoint for (Option<f64>, Option<f64>) {
    fn coordinates(&self) -> Option<(f64, f64)> {
        Some((self.0?, self.1?))
    }
}

impl<T: GeoPoint> GeoPoint for &T {
    fn coordinates(&self) -> Option<(f64, f64)> {
        (*self).coordinates()
    }
}

/// Latitude and longitude thresholds (degrees) for the rectangular pre-filter
///
/// A point whose latitude or longitude difference exceeds these values is
/// certainly farther than `radius_miles` from a center at `lat`.
///
/// # Returns
/// `(dlat_deg, dlon_deg)`
pub fn bbox_thresholds(lat: f64, radius_miles: f64) -> (f64, f64) {
    let angular = radius_miles / EARTH_RADIUS_MILES;
    let dlat_deg = angular.to_degrees();

    let cos_lat = lat.to_radians().cos().max(MIN_COS_LAT);
    let mut dlon_deg = (angular / cos_lat).to_degrees();

    // The cap's true longitudinal half-width is asin(sin(d) / cos(lat)), which is
    // never smaller than d / cos(lat). A cap touching a pole spans every longitude.
    let sin_angular = angular.sin();
    let cap_deg = if angular >= std::f64::consts::FRAC_PI_2 || sin_angular >= cos_lat {
        180.0
    } else {
        (sin_angular / cos_lat).asin().to_degrees()
    };
    dlon_deg = dlon_deg.max(cap_deg).min(180.0);

    (dlat_deg + BBOX_SLACK_DEG, dlon_deg + BBOX_SLACK_DEG)
}

/// Shortest angular separation between two longitudes, in [0, 180]
///
/// Safe across the date line: `lon_diff_deg(179.0, -179.0)` is 2.
#[inline]
pub fn lon_diff_deg(lon1: f64, lon2: f64) -> f64 {
    let diff = (lon2 - lon1).abs() % 360.0;
    diff.min(360.0 - diff)
}

/// Calculate the Haversine distance between two points in miles
///
/// # Arguments
/// * `lat1` - Latitude of first point in degrees
/// * `lon1` - Longitude of first point in degrees
/// * `lat2` - Latitude of second point in degrees
/// * `lon2` - Longitude of second point in degrees
///
/// # Returns
/// Distance in miles
#[inline]
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lon = lon_diff_deg(lon1, lon2).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).max(0.0).sqrt());

    EARTH_RADIUS_MILES * c
}

/// Two-stage radius test centered on (`lat1`, `lon1`)
///
/// Stage 1 rejects on the rectangular thresholds without any trigonometry on
/// the candidate; stage 2 confirms with the exact Haversine distance.
#[inline]
pub fn is_within_radius(lat1: f64, lon1: f64, lat2: f64, lon2: f64, radius_miles: f64) -> bool {
    let (dlat, dlon) = bbox_thresholds(lat1, radius_miles);

    if (lat2 - lat1).abs() > dlat || lon_diff_deg(lon1, lon2) > dlon {
        return false;
    }

    haversine_distance(lat1, lon1, lat2, lon2) <= radius_miles
}

/// Count points within `radius_miles` of the center, skipping points without coordinates
pub fn count_nearby_points<P: GeoPoint>(
    center_lat: f64,
    center_lon: f64,
    points: &[P],
    radius_miles: f64,
) -> usize {
    points
        .iter()
        .filter_map(GeoPoint::coordinates)
        .filter(|&(lat, lon)| is_within_radius(center_lat, center_lon, lat, lon, radius_miles))
        .count()
}

/// Keep the points within `radius_miles` of the center, skipping points without coordinates
pub fn filter_nearby_points<P: GeoPoint + Clone>(
    center_lat: f64,
    center_lon: f64,
    points: &[P],
    radius_miles: f64,
) -> Vec<P> {
    points
        .iter()
        .filter(|p| match p.coordinates() {
            Some((lat, lon)) => is_within_radius(center_lat, center_lon, lat, lon, radius_miles),
            None => false,
        })
        .cloned()
        .collect()
}
