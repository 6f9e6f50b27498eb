//! Declarative description of the map overlay built from the live dataset.

use std::sync::Arc;

use geojson::Feature;

use crate::color::Color;
use crate::dataset::{Dataset, PointTable, Record};

/// Id of the layer built for delimited text data.
pub const SCATTERPLOT_LAYER_ID: &str = "scatterplot-layer";
/// Id of the layer built for markup data.
pub const GEOJSON_LAYER_ID: &str = "geojson-layer";

/// A renderable overlay. The render surface decides how to draw each variant.
#[derive(Debug, Clone, PartialEq)]
pub enum LayerSpec {
    /// Every record drawn as a circle at its `Longitude`/`Latitude`.
    Scatterplot(ScatterplotLayer),
    /// Feature geometries drawn as filled polygons, stroked lines and circles for points.
    GeoJson(GeoJsonLayer),
}

impl LayerSpec {
    /// Unique id of the layer.
    pub fn id(&self) -> &'static str {
        match self {
            LayerSpec::Scatterplot(layer) => layer.id,
            LayerSpec::GeoJson(layer) => layer.id,
        }
    }
}

/// Point cloud of the records of a delimited text file.
#[derive(Debug, Clone, PartialEq)]
pub struct ScatterplotLayer {
    /// Layer id.
    pub id: &'static str,
    /// Circle radius in meters.
    pub radius: f64,
    /// Circle fill color.
    pub fill_color: Color,
    data: Arc<Dataset>,
}

impl ScatterplotLayer {
    /// Radius of the circles in meters.
    pub const RADIUS: f64 = 100.0;
    /// Fill color of the circles.
    pub const FILL_COLOR: Color = Color::rgba(255, 255, 255, 50);

    fn new(data: Arc<Dataset>) -> Self {
        Self {
            id: SCATTERPLOT_LAYER_ID,
            radius: Self::RADIUS,
            fill_color: Self::FILL_COLOR,
            data,
        }
    }

    /// Dataset the layer is built from.
    pub fn data(&self) -> &Arc<Dataset> {
        &self.data
    }

    /// Positions of the records as `[longitude, latitude]` in the file order. Records without a
    /// drawable position are skipped.
    pub fn positions(&self) -> impl Iterator<Item = [f64; 2]> + '_ {
        let table = match self.data.as_ref() {
            Dataset::Points(table) => Some(table),
            Dataset::Features(_) => None,
        };

        table
            .into_iter()
            .flat_map(PointTable::records)
            .filter_map(|record| record_position(&record))
    }
}

/// Position of a record for the scatterplot.
///
/// If either coordinate field is absent or empty the record is drawn at `(0, 0)`. A field that is
/// present but is not a number makes the whole position undefined.
fn record_position(record: &Record) -> Option<[f64; 2]> {
    let (longitude, latitude) = record.raw_position();
    match (non_empty(longitude), non_empty(latitude)) {
        (Some(longitude), Some(latitude)) => {
            Some([coordinate_value(longitude)?, coordinate_value(latitude)?])
        }
        _ => Some([0.0, 0.0]),
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

fn coordinate_value(value: &str) -> Option<f64> {
    value.parse().ok().filter(|v: &f64| v.is_finite())
}

/// Geometry layer of the features of a markup file.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoJsonLayer {
    /// Layer id.
    pub id: &'static str,
    /// Whether polygons and point circles are filled.
    pub filled: bool,
    /// Whether polygon outlines and lines are drawn.
    pub stroked: bool,
    /// Fill color of polygons and points.
    pub fill_color: Color,
    /// Color of lines and outlines.
    pub line_color: Color,
    /// Width of lines in meters.
    pub line_width: f64,
    /// Multiplier applied to the line width.
    pub line_width_scale: f64,
    /// Lines are never drawn thinner than this number of pixels.
    pub line_width_min_pixels: f64,
    /// Radius of point features in meters.
    pub point_radius: f64,
    /// Point circles are never drawn smaller than this number of pixels.
    pub point_radius_min_pixels: f64,
    data: Arc<Dataset>,
}

impl GeoJsonLayer {
    fn new(data: Arc<Dataset>) -> Self {
        Self {
            id: GEOJSON_LAYER_ID,
            filled: true,
            stroked: true,
            fill_color: Color::rgba(255, 255, 255, 50),
            line_color: Color::rgba(255, 255, 255, 100),
            line_width: 1.0,
            line_width_scale: 2.0,
            line_width_min_pixels: 2.0,
            point_radius: 100.0,
            point_radius_min_pixels: 5.0,
            data,
        }
    }

    /// Dataset the layer is built from.
    pub fn data(&self) -> &Arc<Dataset> {
        &self.data
    }

    /// Features to draw.
    pub fn features(&self) -> &[Feature] {
        match self.data.as_ref() {
            Dataset::Features(collection) => &collection.features,
            Dataset::Points(_) => &[],
        }
    }

    /// Width of lines in pixels at the given resolution (meters per pixel).
    pub fn line_width_pixels(&self, resolution: f64) -> f64 {
        (self.line_width * self.line_width_scale / resolution).max(self.line_width_min_pixels)
    }

    /// Radius of point circles in pixels at the given resolution (meters per pixel).
    pub fn point_radius_pixels(&self, resolution: f64) -> f64 {
        (self.point_radius / resolution).max(self.point_radius_min_pixels)
    }
}

/// Builds the layers for the live dataset: nothing if no dataset is loaded, otherwise exactly one
/// layer of the kind matching the dataset.
pub fn build_layers(dataset: Option<&Arc<Dataset>>) -> Vec<LayerSpec> {
    let Some(dataset) = dataset else {
        return vec![];
    };

    let layer = match dataset.as_ref() {
        Dataset::Points(_) => LayerSpec::Scatterplot(ScatterplotLayer::new(dataset.clone())),
        Dataset::Features(_) => LayerSpec::GeoJson(GeoJsonLayer::new(dataset.clone())),
    };

    vec![layer]
}
