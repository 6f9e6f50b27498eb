//! Camera of the map widget in projected coordinates.

use geoview::Viewport;
use nalgebra::{Point2, Rotation2, Vector2};

use crate::projection::{self, MAX_X};

/// Position and orientation of the map on the screen.
///
/// The center is in Web-Mercator meters. Bearing rotates the map around the center of the screen,
/// pitch tilts it away from the viewer. Tilt is rendered as a vertical squeeze of the map plane,
/// so the transformation between map and screen stays affine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapView {
    center: Point2<f64>,
    resolution: f64,
    bearing: f64,
    pitch: f64,
    size: Vector2<f64>,
}

impl MapView {
    /// Creates a view of the given size (in pixels) looking at the viewport.
    pub fn from_viewport(viewport: &Viewport, size: [f64; 2]) -> Self {
        Self {
            center: projection::project(viewport.longitude, viewport.latitude),
            resolution: projection::zoom_to_resolution(viewport.zoom),
            bearing: viewport.bearing.to_radians(),
            pitch: viewport.pitch.to_radians(),
            size: Vector2::new(size[0], size[1]),
        }
    }

    /// Converts the view back into a viewport.
    pub fn to_viewport(&self) -> Viewport {
        let (longitude, latitude) = projection::unproject(&self.center);
        Viewport {
            longitude: wrap_degrees(longitude),
            latitude,
            zoom: projection::resolution_to_zoom(self.resolution),
            pitch: self.pitch.to_degrees(),
            bearing: wrap_degrees(self.bearing.to_degrees()),
        }
    }

    /// Center of the view in projected meters.
    pub fn center(&self) -> Point2<f64> {
        self.center
    }

    /// Meters per pixel.
    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    /// Compass direction the camera faces, in radians.
    pub fn bearing(&self) -> f64 {
        self.bearing
    }

    /// Tilt of the map in radians.
    pub fn pitch(&self) -> f64 {
        self.pitch
    }

    /// Size of the view in pixels.
    pub fn size(&self) -> Vector2<f64> {
        self.size
    }

    /// Returns a copy of the view with the given resolution.
    pub fn with_resolution(&self, resolution: f64) -> Self {
        Self {
            resolution,
            ..*self
        }
    }

    /// Returns a copy of the view with the given pitch and bearing (radians).
    pub fn with_rotation(&self, pitch: f64, bearing: f64) -> Self {
        Self {
            pitch,
            bearing,
            ..*self
        }
    }

    /// Converts a point in projected meters into screen pixels (relative to the view origin).
    pub fn map_to_screen(&self, point: &Point2<f64>) -> Point2<f64> {
        let rotated = self.rotation() * (*point - self.center);
        let squeezed_y = rotated.y * self.pitch.cos();

        Point2::new(
            self.size.x / 2.0 + rotated.x / self.resolution,
            self.size.y / 2.0 - squeezed_y / self.resolution,
        )
    }

    /// Converts a point in screen pixels into projected meters.
    pub fn screen_to_map(&self, point: &Point2<f64>) -> Point2<f64> {
        let rotated = Vector2::new(
            (point.x - self.size.x / 2.0) * self.resolution,
            (self.size.y / 2.0 - point.y) * self.resolution / self.pitch.cos(),
        );

        self.center + self.rotation().inverse() * rotated
    }

    /// Moves the view so that the map point under `from` ends up under `to`.
    pub fn translate_by_pixels(&self, from: Point2<f64>, to: Point2<f64>) -> Self {
        let delta = self.screen_to_map(&from) - self.screen_to_map(&to);
        Self {
            center: normalize_center(self.center + delta),
            ..*self
        }
    }

    /// Changes resolution by the factor `k` keeping the map point under `pointer` in place.
    pub fn zoom(&self, k: f64, pointer: Point2<f64>) -> Self {
        let anchor = self.screen_to_map(&pointer);
        Self {
            center: normalize_center(anchor + (self.center - anchor) * k),
            resolution: self.resolution * k,
            ..*self
        }
    }

    /// Bounding box of the visible area in projected meters: `[x_min, y_min, x_max, y_max]`.
    pub fn bbox(&self) -> [f64; 4] {
        let corners = [
            Point2::new(0.0, 0.0),
            Point2::new(self.size.x, 0.0),
            Point2::new(0.0, self.size.y),
            Point2::new(self.size.x, self.size.y),
        ]
        .map(|corner| self.screen_to_map(&corner));

        corners.iter().fold(
            [f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY],
            |[x_min, y_min, x_max, y_max], p| {
                [x_min.min(p.x), y_min.min(p.y), x_max.max(p.x), y_max.max(p.y)]
            },
        )
    }

    /// Number of pixels per meter on the ground at the given projected point.
    pub fn pixels_per_meter(&self, point: &Point2<f64>) -> f64 {
        let (_, latitude) = projection::unproject(point);
        projection::scale_factor(latitude) / self.resolution
    }

    fn rotation(&self) -> Rotation2<f64> {
        Rotation2::new(self.bearing)
    }
}

/// Wraps the center around the antimeridian and keeps it inside the projected world vertically.
fn normalize_center(center: Point2<f64>) -> Point2<f64> {
    let x = (center.x + MAX_X).rem_euclid(2.0 * MAX_X) - MAX_X;
    Point2::new(x, center.y.clamp(-MAX_X, MAX_X))
}

fn wrap_degrees(value: f64) -> f64 {
    let wrapped = (value + 180.0).rem_euclid(360.0) - 180.0;
    if wrapped == -180.0 && value > 0.0 {
        180.0
    } else {
        wrapped
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    fn viewport(pitch: f64, bearing: f64) -> Viewport {
        Viewport {
            longitude: 15.0,
            latitude: 45.0,
            zoom: 7.0,
            pitch,
            bearing,
        }
    }

    #[test]
    fn viewport_round_trip() {
        let original = viewport(30.0, -45.0);
        let restored = MapView::from_viewport(&original, [800.0, 600.0]).to_viewport();
        assert_abs_diff_eq!(restored.longitude, original.longitude, epsilon = 1e-9);
        assert_abs_diff_eq!(restored.latitude, original.latitude, epsilon = 1e-9);
        assert_abs_diff_eq!(restored.zoom, original.zoom, epsilon = 1e-9);
        assert_abs_diff_eq!(restored.pitch, original.pitch, epsilon = 1e-9);
        assert_abs_diff_eq!(restored.bearing, original.bearing, epsilon = 1e-9);
    }

    #[test]
    fn center_is_in_the_middle_of_the_screen() {
        let view = MapView::from_viewport(&viewport(40.0, 70.0), [800.0, 600.0]);
        let center = view.map_to_screen(&view.center());
        assert_abs_diff_eq!(center.x, 400.0, epsilon = 1e-9);
        assert_abs_diff_eq!(center.y, 300.0, epsilon = 1e-9);
    }

    #[test]
    fn screen_map_round_trip_with_rotation_and_tilt() {
        for (pitch, bearing) in [(0.0, 0.0), (0.0, 90.0), (45.0, -30.0), (60.0, 180.0)] {
            let view = MapView::from_viewport(&viewport(pitch, bearing), [640.0, 480.0]);
            let screen = Point2::new(13.0, 411.0);
            let back = view.map_to_screen(&view.screen_to_map(&screen));
            assert_abs_diff_eq!(back.x, screen.x, epsilon = 1e-6);
            assert_abs_diff_eq!(back.y, screen.y, epsilon = 1e-6);
        }
    }

    #[test]
    fn bearing_rotates_east_to_the_top() {
        let view = MapView::from_viewport(&viewport(0.0, 90.0), [100.0, 100.0]);
        let east = view.center() + Vector2::new(view.resolution() * 10.0, 0.0);
        let screen = view.map_to_screen(&east);
        assert_abs_diff_eq!(screen.x, 50.0, epsilon = 1e-9);
        assert_abs_diff_eq!(screen.y, 40.0, epsilon = 1e-9);
    }

    #[test]
    fn pitch_squeezes_vertical_distances() {
        let view = MapView::from_viewport(&viewport(60.0, 0.0), [100.0, 100.0]);
        let north = view.center() + Vector2::new(0.0, view.resolution() * 20.0);
        let screen = view.map_to_screen(&north);
        assert_abs_diff_eq!(screen.y, 40.0, epsilon = 1e-9);
    }

    #[test]
    fn translation_moves_point_under_cursor() {
        let view = MapView::from_viewport(&viewport(20.0, 15.0), [800.0, 600.0]);
        let from = Point2::new(100.0, 100.0);
        let to = Point2::new(250.0, 180.0);
        let anchor = view.screen_to_map(&from);

        let moved = view.translate_by_pixels(from, to);
        let screen = moved.map_to_screen(&anchor);
        assert_abs_diff_eq!(screen.x, to.x, epsilon = 1e-6);
        assert_abs_diff_eq!(screen.y, to.y, epsilon = 1e-6);
    }

    #[test]
    fn zoom_keeps_point_under_cursor() {
        let view = MapView::from_viewport(&viewport(0.0, 30.0), [800.0, 600.0]);
        let pointer = Point2::new(600.0, 150.0);
        let anchor = view.screen_to_map(&pointer);

        let zoomed = view.zoom(0.5, pointer);
        assert_abs_diff_eq!(zoomed.resolution(), view.resolution() / 2.0);
        let screen = zoomed.map_to_screen(&anchor);
        assert_abs_diff_eq!(screen.x, pointer.x, epsilon = 1e-6);
        assert_abs_diff_eq!(screen.y, pointer.y, epsilon = 1e-6);
        assert_abs_diff_eq!(zoomed.to_viewport().zoom, 8.0, epsilon = 1e-9);
    }

    #[test]
    fn panning_wraps_around_antimeridian() {
        let view = MapView::from_viewport(
            &Viewport {
                longitude: 179.0,
                ..Default::default()
            },
            [100.0, 100.0],
        );
        let shift = 2.0 * MAX_X / 360.0 * 2.0 / view.resolution();
        let moved =
            view.translate_by_pixels(Point2::new(50.0 + shift, 50.0), Point2::new(50.0, 50.0));
        assert_abs_diff_eq!(moved.to_viewport().longitude, -179.0, epsilon = 1e-6);
    }

    #[test]
    fn bbox_of_unrotated_view() {
        let view = MapView::from_viewport(&Viewport::default(), [200.0, 100.0]);
        let [x_min, y_min, x_max, y_max] = view.bbox();
        assert_abs_diff_eq!(x_max - x_min, 200.0 * view.resolution(), epsilon = 1e-6);
        assert_abs_diff_eq!(y_max - y_min, 100.0 * view.resolution(), epsilon = 1e-6);
        assert_abs_diff_eq!(x_min + x_max, 0.0, epsilon = 1e-6);
    }
}
