//! Drawing of base map tiles and data layers with the egui painter.

use egui::epaint::{Vertex, WHITE_UV};
use egui::{pos2, Color32, Mesh, Painter, Pos2, Rect, Shape, Stroke, TextureHandle, TextureId};
use geojson::Value;
use geoview::layer::{GeoJsonLayer, LayerSpec, ScatterplotLayer};
use geoview::Color;
use lyon::math::point;
use lyon::path::Path;
use lyon::tessellation::{
    BuffersBuilder, FillOptions, FillTessellator, FillVertex, FillVertexConstructor, VertexBuffers,
};
use nalgebra::Point2;

use crate::projection;
use crate::tile_schema::{TileSchema, WrappingTileIndex};
use crate::view::MapView;

/// Draws loaded tiles. Each tile is a textured quad, so bearing and pitch of the view apply to
/// the base map the same way they apply to the data.
pub fn paint_tiles(
    painter: &Painter,
    rect: Rect,
    view: &MapView,
    schema: &TileSchema,
    tiles: &[(WrappingTileIndex, TextureHandle)],
) {
    for (index, texture) in tiles {
        let [x_min, y_min, x_max, y_max] = schema.tile_bbox(index);
        let corners = [
            (x_min, y_max, pos2(0.0, 0.0)),
            (x_max, y_max, pos2(1.0, 0.0)),
            (x_max, y_min, pos2(1.0, 1.0)),
            (x_min, y_min, pos2(0.0, 1.0)),
        ];

        let mut mesh = Mesh::with_texture(texture.id());
        for (x, y, uv) in corners {
            mesh.vertices.push(Vertex {
                pos: to_screen(rect, view, &Point2::new(x, y)),
                uv,
                color: Color32::WHITE,
            });
        }
        mesh.add_triangle(0, 1, 2);
        mesh.add_triangle(0, 2, 3);

        painter.add(Shape::mesh(mesh));
    }
}

/// Draws the data layers in order.
pub fn paint_layers(painter: &Painter, rect: Rect, view: &MapView, layers: &[LayerSpec]) {
    for layer in layers {
        match layer {
            LayerSpec::Scatterplot(layer) => paint_scatterplot(painter, rect, view, layer),
            LayerSpec::GeoJson(layer) => GeoJsonPainter::new(painter, rect, view, layer).paint(),
        }
    }
}

fn paint_scatterplot(painter: &Painter, rect: Rect, view: &MapView, layer: &ScatterplotLayer) {
    let color = color32(layer.fill_color);
    for [longitude, latitude] in layer.positions() {
        let projected = projection::project(longitude, latitude);
        let center = to_screen(rect, view, &projected);
        let radius = (layer.radius * view.pixels_per_meter(&projected)) as f32;

        if rect.expand(radius).contains(center) {
            painter.circle_filled(center, radius, color);
        }
    }
}

struct GeoJsonPainter<'a> {
    painter: &'a Painter,
    rect: Rect,
    view: &'a MapView,
    layer: &'a GeoJsonLayer,
    fill: Option<Color32>,
    stroke: Option<Stroke>,
}

impl<'a> GeoJsonPainter<'a> {
    fn new(painter: &'a Painter, rect: Rect, view: &'a MapView, layer: &'a GeoJsonLayer) -> Self {
        let meters_per_pixel = 1.0 / view.pixels_per_meter(&view.center());
        let fill = layer.filled.then(|| color32(layer.fill_color));
        let stroke = layer.stroked.then(|| {
            Stroke::new(
                layer.line_width_pixels(meters_per_pixel) as f32,
                color32(layer.line_color),
            )
        });

        Self {
            painter,
            rect,
            view,
            layer,
            fill,
            stroke,
        }
    }

    fn paint(&self) {
        for feature in self.layer.features() {
            if let Some(geometry) = &feature.geometry {
                self.paint_value(&geometry.value);
            }
        }
    }

    fn paint_value(&self, value: &Value) {
        match value {
            Value::Point(position) => self.paint_point(position),
            Value::MultiPoint(positions) => positions.iter().for_each(|p| self.paint_point(p)),
            Value::LineString(line) => self.paint_line(line),
            Value::MultiLineString(lines) => lines.iter().for_each(|line| self.paint_line(line)),
            Value::Polygon(rings) => self.paint_polygon(rings),
            Value::MultiPolygon(polygons) => polygons
                .iter()
                .for_each(|rings| self.paint_polygon(rings)),
            Value::GeometryCollection(members) => members
                .iter()
                .for_each(|member| self.paint_value(&member.value)),
        }
    }

    fn paint_point(&self, position: &[f64]) {
        let Some(projected) = project_position(position) else {
            return;
        };

        let center = to_screen(self.rect, self.view, &projected);
        let meters_per_pixel = 1.0 / self.view.pixels_per_meter(&projected);
        let radius = self.layer.point_radius_pixels(meters_per_pixel) as f32;
        if !self.rect.expand(radius).contains(center) {
            return;
        }

        if let Some(fill) = self.fill {
            self.painter.circle_filled(center, radius, fill);
        }
        if let Some(stroke) = self.stroke {
            self.painter.circle_stroke(center, radius, stroke);
        }
    }

    fn paint_line(&self, line: &[Vec<f64>]) {
        let Some(stroke) = self.stroke else {
            return;
        };

        let points = self.screen_points(line);
        if points.len() >= 2 {
            self.painter.add(Shape::line(points, stroke));
        }
    }

    fn paint_polygon(&self, rings: &[Vec<Vec<f64>>]) {
        let rings: Vec<Vec<Pos2>> = rings.iter().map(|ring| self.screen_points(ring)).collect();

        if let Some(fill) = self.fill {
            if let Some(mesh) = tessellate_polygon(&rings, fill) {
                self.painter.add(Shape::mesh(mesh));
            }
        }

        if let Some(stroke) = self.stroke {
            for ring in rings.into_iter().filter(|ring| ring.len() >= 2) {
                self.painter.add(Shape::closed_line(ring, stroke));
            }
        }
    }

    fn screen_points(&self, positions: &[Vec<f64>]) -> Vec<Pos2> {
        positions
            .iter()
            .filter_map(|position| project_position(position))
            .map(|projected| to_screen(self.rect, self.view, &projected))
            .collect()
    }
}

/// Triangulates a polygon given by its rings in screen coordinates. Rings are combined with the
/// even-odd rule, so inner rings cut holes regardless of their orientation.
///
/// Returns `None` if the polygon has no area.
pub fn tessellate_polygon(rings: &[Vec<Pos2>], color: Color32) -> Option<Mesh> {
    let mut builder = Path::builder();
    for ring in rings {
        let Some((first, rest)) = ring.split_first() else {
            continue;
        };

        let _ = builder.begin(point(first.x, first.y));
        for p in rest {
            let _ = builder.line_to(point(p.x, p.y));
        }
        builder.end(true);
    }
    let path = builder.build();

    let mut buffers: VertexBuffers<Vertex, u32> = VertexBuffers::new();
    let result = FillTessellator::new().tessellate_path(
        &path,
        &FillOptions::even_odd(),
        &mut BuffersBuilder::new(&mut buffers, PolygonVertexConstructor { color }),
    );

    if let Err(err) = result {
        log::debug!("Failed to tessellate polygon: {err:?}");
        return None;
    }

    if buffers.indices.is_empty() {
        return None;
    }

    Some(Mesh {
        indices: buffers.indices,
        vertices: buffers.vertices,
        texture_id: TextureId::default(),
    })
}

struct PolygonVertexConstructor {
    color: Color32,
}

impl FillVertexConstructor<Vertex> for PolygonVertexConstructor {
    fn new_vertex(&mut self, vertex: FillVertex) -> Vertex {
        let position = vertex.position();
        Vertex {
            pos: pos2(position.x, position.y),
            uv: WHITE_UV,
            color: self.color,
        }
    }
}

fn project_position(position: &[f64]) -> Option<Point2<f64>> {
    match position {
        [longitude, latitude, ..] if longitude.is_finite() && latitude.is_finite() => {
            Some(projection::project(*longitude, *latitude))
        }
        _ => None,
    }
}

/// Converts a projected point into a position on the screen inside `rect`.
pub fn to_screen(rect: Rect, view: &MapView, point: &Point2<f64>) -> Pos2 {
    let screen = view.map_to_screen(point);
    pos2(
        rect.min.x + screen.x as f32,
        rect.min.y + screen.y as f32,
    )
}

fn color32(color: Color) -> Color32 {
    Color32::from_rgba_unmultiplied(color.r(), color.g(), color.b(), color.a())
}
