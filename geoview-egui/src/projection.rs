//! Web-Mercator projection (EPSG:3857) and the zoom level convention of the viewport.

use nalgebra::Point2;

/// Radius of the Earth used by the Web-Mercator projection, in meters.
pub const EARTH_RADIUS: f64 = 6_378_137.0;
/// Length of the equator in projected meters.
pub const EARTH_CIRCUMFERENCE: f64 = 40_075_016.685_578_49;
/// Half of the projected world width. Projected coordinates are in `[-MAX_X, MAX_X]`.
pub const MAX_X: f64 = EARTH_CIRCUMFERENCE / 2.0;
/// Latitudes beyond this value are clamped, so that the projected world is a square.
pub const MAX_LATITUDE: f64 = 85.051_128_779_806_59;

/// Width of the world in pixels at zoom level 0.
const ZOOM_0_WORLD_SIZE: f64 = 512.0;

/// Projects longitude and latitude (degrees) into Web-Mercator meters.
pub fn project(longitude: f64, latitude: f64) -> Point2<f64> {
    let latitude = latitude.clamp(-MAX_LATITUDE, MAX_LATITUDE);
    let x = EARTH_RADIUS * longitude.to_radians();
    let y = EARTH_RADIUS
        * (std::f64::consts::FRAC_PI_4 + latitude.to_radians() / 2.0)
            .tan()
            .ln();

    Point2::new(x, y)
}

/// Converts Web-Mercator meters back into longitude and latitude (degrees).
pub fn unproject(point: &Point2<f64>) -> (f64, f64) {
    let longitude = (point.x / EARTH_RADIUS).to_degrees();
    let latitude = (2.0 * (point.y / EARTH_RADIUS).exp().atan() - std::f64::consts::FRAC_PI_2)
        .to_degrees();

    (longitude, latitude)
}

/// Meters per pixel at the equator for the given zoom level.
pub fn zoom_to_resolution(zoom: f64) -> f64 {
    EARTH_CIRCUMFERENCE / (ZOOM_0_WORLD_SIZE * 2f64.powf(zoom))
}

/// Zoom level for the given resolution.
pub fn resolution_to_zoom(resolution: f64) -> f64 {
    (EARTH_CIRCUMFERENCE / (ZOOM_0_WORLD_SIZE * resolution)).log2()
}

/// Ratio between projected and true distances at the given latitude.
///
/// Sizes given in meters on the ground (e.g. circle radius) are multiplied by this factor before
/// they are converted into pixels.
pub fn scale_factor(latitude: f64) -> f64 {
    1.0 / latitude.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians().cos()
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn projection_round_trip() {
        for (longitude, latitude) in [(0.0, 0.0), (16.44, 43.51), (-122.4, 37.8), (179.9, -60.0)] {
            let projected = project(longitude, latitude);
            let (lon, lat) = unproject(&projected);
            assert_abs_diff_eq!(lon, longitude, epsilon = 1e-9);
            assert_abs_diff_eq!(lat, latitude, epsilon = 1e-9);
        }
    }

    #[test]
    fn projection_bounds() {
        let corner = project(180.0, MAX_LATITUDE);
        assert_abs_diff_eq!(corner.x, MAX_X, epsilon = 1e-3);
        assert_abs_diff_eq!(corner.y, MAX_X, epsilon = 1e-3);

        let clamped = project(0.0, 89.9);
        assert_abs_diff_eq!(clamped.y, MAX_X, epsilon = 1e-3);
    }

    #[test]
    fn zoom_and_resolution() {
        assert_abs_diff_eq!(zoom_to_resolution(0.0), 78_271.516_964, epsilon = 1e-3);
        assert_abs_diff_eq!(zoom_to_resolution(1.0), zoom_to_resolution(0.0) / 2.0);
        for zoom in [0.0, 2.0, 7.0, 12.5, 20.0] {
            assert_abs_diff_eq!(resolution_to_zoom(zoom_to_resolution(zoom)), zoom, epsilon = 1e-9);
        }
    }

    #[test]
    fn scale_factor_grows_with_latitude() {
        assert_abs_diff_eq!(scale_factor(0.0), 1.0);
        assert_abs_diff_eq!(scale_factor(60.0), 2.0, epsilon = 1e-9);
    }
}
