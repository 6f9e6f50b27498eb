//! Pan, zoom, rotation and tilt of the map from user input.

use nalgebra::{Point2, Vector2};

use crate::projection;
use crate::view::MapView;

const ROTATION_SPEED_K: f64 = 0.005;

/// Mouse button that drags the map.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DragButton {
    /// Pans the map.
    Primary,
    /// Rotates the map with horizontal movement and tilts it with vertical movement.
    Secondary,
}

/// Map navigation input, in screen pixels relative to the map origin.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum MapInput {
    /// Pointer moved while the button was pressed.
    Drag {
        /// Pressed button.
        button: DragButton,
        /// Current pointer position.
        position: Point2<f64>,
        /// Movement since the previous frame.
        delta: Vector2<f64>,
    },
    /// Mouse wheel turned.
    Scroll {
        /// Number of wheel steps. Positive values zoom in.
        delta: f64,
        /// Pointer position.
        position: Point2<f64>,
    },
    /// Pinch gesture.
    Pinch {
        /// Scale of the gesture. Values greater than 1 zoom in.
        factor: f64,
        /// Center of the gesture.
        position: Point2<f64>,
    },
}

/// Limits and sensitivity of the [`MapController`].
///
/// Every mouse wheel step changes the resolution `zoom_speed + 1` times. `rotation_speed` is a
/// multiplier of the rotation and tilt sensitivity. Pitch is limited to `max_pitch` radians.
#[derive(Debug, Copy, Clone, PartialEq)]
struct MapControllerConfiguration {
    zoom_speed: f64,
    min_resolution: f64,
    max_resolution: f64,
    rotation_speed: f64,
    max_pitch: f64,
}

impl Default for MapControllerConfiguration {
    fn default() -> Self {
        Self {
            zoom_speed: 0.2,
            min_resolution: projection::zoom_to_resolution(20.0),
            max_resolution: projection::zoom_to_resolution(0.0),
            rotation_speed: 1.0,
            max_pitch: 60f64.to_radians(),
        }
    }
}

/// Applies user input to the map view.
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct MapController {
    config: MapControllerConfiguration,
}

impl MapController {
    /// Returns the view after the input.
    pub fn handle(&self, view: &MapView, input: &MapInput) -> MapView {
        let target = match *input {
            MapInput::Drag {
                button: DragButton::Primary,
                position,
                delta,
            } => view.translate_by_pixels(position - delta, position),
            MapInput::Drag {
                button: DragButton::Secondary,
                delta,
                ..
            } => self.rotate(view, delta),
            MapInput::Scroll { delta, position } => {
                view.zoom((self.config.zoom_speed + 1.0).powf(-delta), position)
            }
            MapInput::Pinch { factor, position } if factor > 0.0 && factor.is_finite() => {
                view.zoom(1.0 / factor, position)
            }
            MapInput::Pinch { .. } => *view,
        };

        self.adjust_target_view(target)
    }

    fn rotate(&self, view: &MapView, delta: Vector2<f64>) -> MapView {
        let k = self.config.rotation_speed * ROTATION_SPEED_K;
        view.with_rotation(view.pitch() - delta.y * k, view.bearing() + delta.x * k)
    }

    fn adjust_target_view(&self, mut target: MapView) -> MapView {
        if target.resolution() < self.config.min_resolution {
            target = target.with_resolution(self.config.min_resolution);
        }

        if target.resolution() > self.config.max_resolution {
            target = target.with_resolution(self.config.max_resolution);
        }

        let pitch = target.pitch().clamp(0.0, self.config.max_pitch.max(0.0));
        target.with_rotation(pitch, target.bearing())
    }
}

#[cfg(test)]
mod tests {
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use geoview::Viewport;

    use super::*;

    fn view(zoom: f64) -> MapView {
        MapView::from_viewport(
            &Viewport {
                zoom,
                ..Default::default()
            },
            [800.0, 600.0],
        )
    }

    fn center() -> Point2<f64> {
        Point2::new(400.0, 300.0)
    }

    #[test]
    fn zoom_is_limited() {
        let controller = MapController::default();
        let zoomed_in = controller.handle(
            &view(19.9),
            &MapInput::Scroll {
                delta: 10.0,
                position: center(),
            },
        );
        assert_abs_diff_eq!(zoomed_in.to_viewport().zoom, 20.0, epsilon = 1e-9);

        let zoomed_out = controller.handle(
            &view(0.1),
            &MapInput::Scroll {
                delta: -10.0,
                position: center(),
            },
        );
        assert_abs_diff_eq!(zoomed_out.to_viewport().zoom, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn scroll_up_zooms_in() {
        let controller = MapController::default();
        let start = view(5.0);
        let zoomed = controller.handle(
            &start,
            &MapInput::Scroll {
                delta: 1.0,
                position: center(),
            },
        );
        assert_relative_eq!(zoomed.resolution(), start.resolution() / 1.2);
    }

    #[test]
    fn pinch_scales_resolution() {
        let controller = MapController::default();
        let start = view(5.0);
        let zoomed = controller.handle(
            &start,
            &MapInput::Pinch {
                factor: 2.0,
                position: center(),
            },
        );
        assert_relative_eq!(zoomed.resolution(), start.resolution() / 2.0);

        let ignored = controller.handle(
            &start,
            &MapInput::Pinch {
                factor: 0.0,
                position: center(),
            },
        );
        assert_eq!(ignored, start);
    }

    #[test]
    fn primary_drag_pans() {
        let controller = MapController::default();
        let start = view(5.0);
        let anchor = start.screen_to_map(&Point2::new(100.0, 100.0));
        let moved = controller.handle(
            &start,
            &MapInput::Drag {
                button: DragButton::Primary,
                position: Point2::new(130.0, 80.0),
                delta: Vector2::new(30.0, -20.0),
            },
        );

        let screen = moved.map_to_screen(&anchor);
        assert_abs_diff_eq!(screen.x, 130.0, epsilon = 1e-6);
        assert_abs_diff_eq!(screen.y, 80.0, epsilon = 1e-6);
    }

    #[test]
    fn secondary_drag_rotates_and_tilts() {
        let controller = MapController::default();
        let start = view(5.0);
        let rotated = controller.handle(
            &start,
            &MapInput::Drag {
                button: DragButton::Secondary,
                position: center(),
                delta: Vector2::new(100.0, -40.0),
            },
        );

        assert_relative_eq!(rotated.bearing(), 100.0 * ROTATION_SPEED_K);
        assert_relative_eq!(rotated.pitch(), 40.0 * ROTATION_SPEED_K);
        assert_eq!(rotated.center(), start.center());
    }

    #[test]
    fn pitch_is_limited() {
        let controller = MapController::default();
        let tilted = controller.handle(
            &view(5.0),
            &MapInput::Drag {
                button: DragButton::Secondary,
                position: center(),
                delta: Vector2::new(0.0, -10_000.0),
            },
        );
        assert_relative_eq!(tilted.pitch(), 60f64.to_radians());

        let flat = controller.handle(
            &tilted,
            &MapInput::Drag {
                button: DragButton::Secondary,
                position: center(),
                delta: Vector2::new(0.0, 10_000.0),
            },
        );
        assert_abs_diff_eq!(flat.pitch(), 0.0);

        let controller = MapController {
            config: MapControllerConfiguration {
                max_pitch: 0.0,
                ..Default::default()
            },
        };
        let tilted = controller.handle(
            &view(5.0),
            &MapInput::Drag {
                button: DragButton::Secondary,
                position: center(),
                delta: Vector2::new(0.0, -100.0),
            },
        );
        assert_abs_diff_eq!(tilted.pitch(), 0.0);
    }
}
