/// Local equirectangular projection from WGS84 to meters
///
/// Uses approximation suitable for city-scale networks:
/// - x = (lon - center_lon) * cos(center_lat) * 111320
/// - y = (lat - center_lat) * 111320
///
/// Accurate enough for nearest-node lookups and plotting at city scale.
#[derive(Debug, Clone)]
pub struct Projector {
    center_lat: f64,
    center_lon: f64,
    cos_lat: f64,
}

impl Projector {
    /// Create a new projector centered at the given (lat, lon)
    pub fn new(center: (f64, f64)) -> Self {
        let (lat, lon) = center;
        Self {
            center_lat: lat,
            center_lon: lon,
            cos_lat: lat.to_radians().cos(),
        }
    }

    /// Projector centered on the mean of the given (lat, lon) points
    pub fn centered_on(points: &[(f64, f64)]) -> Self {
        if points.is_empty() {
            return Self::new((0.0, 0.0));
        }
        let n = points.len() as f64;
        let (lat, lon) = points
            .iter()
            .fold((0.0, 0.0), |(la, lo), &(lat, lon)| (la + lat, lo + lon));
        Self::new((lat / n, lon / n))
    }

    /// Project a lat/lon point to local meters
    ///
    /// # Returns
    /// * (x, y) in meters, centered at the projection center
    pub fn project(&self, lat: f64, lon: f64) -> (f64, f64) {
        // Meters per degree at equator
        const METERS_PER_DEGREE: f64 = 111320.0;

        let x = (lon - self.center_lon) * self.cos_lat * METERS_PER_DEGREE;
        let y = (lat - self.center_lat) * METERS_PER_DEGREE;

        (x, y)
    }

    /// Project a slice of (lat, lon) points
    pub fn project_points(&self, points: &[(f64, f64)]) -> Vec<(f64, f64)> {
        points
            .iter()
            .map(|&(lat, lon)| self.project(lat, lon))
            .collect()
    }
}
