//! Egui widget that draws the base map with the data layers and handles navigation.

use egui::{Color32, Event, MouseWheelUnit, PointerButton, Pos2, Sense, Ui};
use geoview::config::BaseMap;
use geoview::{LayerSpec, Viewport};
use nalgebra::{Point2, Vector2};

use crate::control::{DragButton, MapController, MapInput};
use crate::render;
use crate::tiles::RasterTiles;
use crate::view::MapView;

const BACKGROUND: Color32 = Color32::from_gray(32);

/// Persistent part of the map widget: tile cache and controller.
pub struct MapState {
    tiles: RasterTiles,
    controller: MapController,
}

impl MapState {
    /// Creates the widget state drawing the given base map.
    pub fn new(base_map: BaseMap, context: egui::Context) -> Self {
        Self {
            tiles: RasterTiles::new(base_map, context),
            controller: MapController::default(),
        }
    }

    /// Draws the map into the remaining space of the ui.
    ///
    /// Returns the new viewport if the user moved the map in this frame.
    pub fn show(
        &mut self,
        ui: &mut Ui,
        viewport: &Viewport,
        layers: &[LayerSpec],
    ) -> Option<Viewport> {
        let available_size = ui.available_size().floor();
        let (rect, response) = ui.allocate_exact_size(available_size, Sense::click_and_drag());

        let mut view =
            MapView::from_viewport(viewport, [rect.width() as f64, rect.height() as f64]);

        let mut inputs = vec![];
        for (egui_button, button) in [
            (PointerButton::Primary, DragButton::Primary),
            (PointerButton::Secondary, DragButton::Secondary),
        ] {
            if !response.dragged_by(egui_button) {
                continue;
            }

            let delta = response.drag_delta();
            if let Some(position) = response.interact_pointer_pos() {
                if delta != egui::Vec2::ZERO {
                    inputs.push(MapInput::Drag {
                        button,
                        position: to_local(position, rect.min),
                        delta: Vector2::new(delta.x as f64, delta.y as f64),
                    });
                }
            }
        }

        if response.contains_pointer() {
            let (events, hover) =
                ui.input(|input| (input.events.clone(), input.pointer.hover_pos()));
            if let Some(hover) = hover {
                let position = to_local(hover, rect.min);
                inputs.extend(events.iter().filter_map(|event| convert_event(event, position)));
            }
        }

        for input in &inputs {
            view = self.controller.handle(&view, input);
        }

        let painter = ui.painter_at(rect);
        painter.rect_filled(rect, 0.0, BACKGROUND);

        let tiles = self.tiles.visible_tiles(&view);
        render::paint_tiles(&painter, rect, &view, self.tiles.schema(), &tiles);
        render::paint_layers(&painter, rect, &view, layers);

        self.show_attribution(ui);

        if inputs.is_empty() {
            None
        } else {
            Some(view.to_viewport())
        }
    }

    fn show_attribution(&self, ui: &Ui) {
        let attribution = self.tiles.attribution();
        egui::Window::new("Attributions")
            .collapsible(false)
            .title_bar(false)
            .resizable(false)
            .anchor(egui::Align2::RIGHT_BOTTOM, [-10., -10.])
            .auto_sized()
            .show(ui.ctx(), |ui| match attribution.url() {
                Some(url) => {
                    ui.hyperlink_to(attribution.text(), url);
                }
                None => {
                    ui.label(attribution.text());
                }
            });
    }
}

fn to_local(position: Pos2, origin: Pos2) -> Point2<f64> {
    Point2::new(
        (position.x - origin.x) as f64,
        (position.y - origin.y) as f64,
    )
}

fn convert_event(event: &Event, position: Point2<f64>) -> Option<MapInput> {
    match event {
        Event::MouseWheel { unit, delta, .. } => {
            let delta = wheel_steps(*unit, delta.y);
            if delta.abs() < 0.0001 {
                return None;
            }

            Some(MapInput::Scroll { delta, position })
        }
        Event::Zoom(factor) if *factor != 1.0 => Some(MapInput::Pinch {
            factor: *factor as f64,
            position,
        }),
        _ => None,
    }
}

/// Converts mouse wheel movement into the number of wheel steps.
#[cfg(not(target_arch = "wasm32"))]
fn wheel_steps(unit: MouseWheelUnit, delta: f32) -> f64 {
    match unit {
        MouseWheelUnit::Point => delta as f64 / 50.0,
        MouseWheelUnit::Line => delta as f64,
        MouseWheelUnit::Page => delta as f64 * 3.0,
    }
}

/// Converts mouse wheel movement into the number of wheel steps.
///
/// Browsers report very different values for the same wheel turn. The divisors are picked so that
/// a single step of a common mouse gives about one zoom step.
#[cfg(target_arch = "wasm32")]
fn wheel_steps(unit: MouseWheelUnit, delta: f32) -> f64 {
    match unit {
        MouseWheelUnit::Point => delta as f64 / 120.0,
        MouseWheelUnit::Line => delta as f64 / 6.0,
        MouseWheelUnit::Page => delta as f64,
    }
}
