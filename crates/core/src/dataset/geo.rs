//! Geodetic to local tangent plane projection.

pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Reference point of the local frame, in radians.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anchor {
    pub lat: f64,
    pub lon: f64,
}

impl Anchor {
    pub fn from_degrees(lat: f64, lon: f64) -> Self {
        Self {
            lat: lat.to_radians(),
            lon: lon.to_radians(),
        }
    }
}

/// Azimuthal equidistant projection of (`lat`, `lon`) in radians around
/// `anchor`. Returns (x north, y east) in meters.
pub fn project(lat: f64, lon: f64, anchor: Anchor) -> (f64, f64) {
    let (sin_lat, cos_lat) = lat.sin_cos();
    let cos_d_lon = (lon - anchor.lon).cos();
    let (sin_anchor, cos_anchor) = anchor.lat.sin_cos();

    let arg = (sin_anchor * sin_lat + cos_anchor * cos_lat * cos_d_lon).clamp(-1.0, 1.0);
    let c = arg.acos();
    let k = if c.abs() < f64::EPSILON { 1.0 } else { c / c.sin() };

    let x = k * (cos_anchor * sin_lat - sin_anchor * cos_lat * cos_d_lon) * EARTH_RADIUS_M;
    let y = k * cos_lat * (lon - anchor.lon).sin() * EARTH_RADIUS_M;
    (x, y)
}

/// Project degree columns (after dividing by `div`). Without an explicit
/// anchor the first sample is used; an empty series yields `None`.
pub fn project_series(
    lat_deg: &[f64],
    lon_deg: &[f64],
    div: f64,
    anchor: Option<Anchor>,
) -> Option<(Vec<f64>, Vec<f64>)> {
    let lat: Vec<f64> = lat_deg.iter().map(|v| (v / div).to_radians()).collect();
    let lon: Vec<f64> = lon_deg.iter().map(|v| (v / div).to_radians()).collect();
    let anchor = match anchor {
        Some(a) => a,
        None => Anchor {
            lat: *lat.first()?,
            lon: *lon.first()?,
        },
    };
    Some(
        lat.iter()
            .zip(&lon)
            .map(|(&la, &lo)| project(la, lo, anchor))
            .unzip(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anchor_projects_to_origin() {
        let anchor = Anchor::from_degrees(47.397_742, 8.545_594);
        assert_eq!(project(anchor.lat, anchor.lon, anchor), (0.0, 0.0));
    }

    #[test]
    fn small_offsets_match_flat_earth() {
        let anchor = Anchor::from_degrees(0.0, 0.0);
        let (x, y) = project(1e-5_f64.to_radians(), 2e-5_f64.to_radians(), anchor);
        let per_deg = EARTH_RADIUS_M * std::f64::consts::PI / 180.0;
        assert!((x - 1e-5 * per_deg).abs() < 1e-6);
        assert!((y - 2e-5 * per_deg).abs() < 1e-6);
    }

    #[test]
    fn series_defaults_to_first_sample() {
        let lat = [473_977_420.0, 473_977_520.0];
        let lon = [85_455_940.0, 85_455_940.0];
        let (x, y) = project_series(&lat, &lon, 1e7, None).unwrap();
        assert_eq!((x[0], y[0]), (0.0, 0.0));
        assert!(x[1] > 1.0 && x[1] < 1.2);
        assert!(y[1].abs() < 1e-9);
        assert!(project_series(&[], &[], 1.0, None).is_none());
    }
}
