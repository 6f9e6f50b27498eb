//! Strategies of converting a KML document into a feature collection.

use std::fmt::{Display, Formatter};
use std::ops::Range;

use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value};
use serde_json::Value as JsonValue;

use crate::error::GeoviewError;
use crate::loader::kml::{self, Coord, KmlGeometry, Placemark, ReadOptions};

/// A way to read a markup file into features.
///
/// Strategies differ in how tolerant they are to malformed input and in the shape of the
/// produced features, so the dispatcher tries them one after another until one succeeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkupStrategy {
    /// Strict conversion of every placemark into one feature. Requires the `<kml>` root and valid
    /// coordinates everywhere. Altitudes are preserved.
    Raw,
    /// Lenient conversion through `geo-types` geometries. Placemarks with invalid geometry are
    /// skipped, positions are 2D.
    GeoJson,
    /// Lenient conversion through a flat position buffer. Every part of a multi-geometry becomes
    /// a separate feature.
    Binary,
}

impl MarkupStrategy {
    /// Default order in which the strategies are tried.
    pub const PRIORITY: [MarkupStrategy; 3] = [
        MarkupStrategy::Raw,
        MarkupStrategy::GeoJson,
        MarkupStrategy::Binary,
    ];

    /// Short name of the strategy used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            MarkupStrategy::Raw => "raw",
            MarkupStrategy::GeoJson => "geojson",
            MarkupStrategy::Binary => "binary",
        }
    }

    /// Decodes the KML file content.
    pub fn decode(&self, data: &[u8]) -> Result<FeatureCollection, GeoviewError> {
        let text = std::str::from_utf8(data)?;
        let features = match self {
            MarkupStrategy::Raw => decode_raw(text)?,
            MarkupStrategy::GeoJson => decode_geojson(text)?,
            MarkupStrategy::Binary => decode_binary(text)?,
        };

        Ok(FeatureCollection {
            bbox: None,
            features,
            foreign_members: None,
        })
    }
}

impl Display for MarkupStrategy {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

fn decode_raw(text: &str) -> Result<Vec<Feature>, GeoviewError> {
    let document = kml::read(text, ReadOptions::STRICT)?;
    Ok(document
        .placemarks
        .into_iter()
        .map(|placemark| {
            let geometry = placemark.geometry.as_ref().map(raw_value).map(Geometry::new);
            feature(geometry, properties(&placemark))
        })
        .collect())
}

fn raw_value(geometry: &KmlGeometry) -> Value {
    match geometry {
        KmlGeometry::Point(coord) => Value::Point(position(coord)),
        KmlGeometry::LineString(coords) | KmlGeometry::LinearRing(coords) => {
            Value::LineString(positions(coords))
        }
        KmlGeometry::Polygon { outer, inner } => Value::Polygon(
            std::iter::once(outer)
                .chain(inner)
                .map(|ring| positions(ring))
                .collect(),
        ),
        KmlGeometry::MultiGeometry(parts) => Value::GeometryCollection(
            parts
                .iter()
                .map(|part| Geometry::new(raw_value(part)))
                .collect(),
        ),
    }
}

fn position(coord: &Coord) -> Vec<f64> {
    match coord.z {
        Some(z) => vec![coord.x, coord.y, z],
        None => vec![coord.x, coord.y],
    }
}

fn positions(coords: &[Coord]) -> Vec<Vec<f64>> {
    coords.iter().map(position).collect()
}

fn decode_geojson(text: &str) -> Result<Vec<Feature>, GeoviewError> {
    let document = kml::read(text, ReadOptions::LENIENT)?;
    Ok(document
        .placemarks
        .into_iter()
        .map(|placemark| {
            let geometry = placemark
                .geometry
                .as_ref()
                .map(to_geo)
                .map(|geometry| Geometry::new(Value::from(&geometry)));
            feature(geometry, properties(&placemark))
        })
        .collect())
}

fn to_geo(geometry: &KmlGeometry) -> geo_types::Geometry<f64> {
    match geometry {
        KmlGeometry::Point(coord) => geo_types::Point::from(to_geo_coord(coord)).into(),
        KmlGeometry::LineString(coords) | KmlGeometry::LinearRing(coords) => {
            to_geo_line(coords).into()
        }
        KmlGeometry::Polygon { outer, inner } => geo_types::Polygon::new(
            to_geo_line(outer),
            inner.iter().map(|ring| to_geo_line(ring)).collect(),
        )
        .into(),
        KmlGeometry::MultiGeometry(parts) => geo_types::Geometry::GeometryCollection(
            geo_types::GeometryCollection::new_from(parts.iter().map(to_geo).collect()),
        ),
    }
}

fn to_geo_coord(coord: &Coord) -> geo_types::Coord<f64> {
    geo_types::coord! { x: coord.x, y: coord.y }
}

fn to_geo_line(coords: &[Coord]) -> geo_types::LineString<f64> {
    coords.iter().map(to_geo_coord).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PartKind {
    Point,
    Line,
    Polygon,
}

/// A geometry part in the packed buffer. Polygons have one range per ring, the outer ring first.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PackedPart {
    placemark: usize,
    kind: PartKind,
    rings: Vec<Range<usize>>,
}

/// All coordinates of a document in one flat buffer of 2D positions.
#[derive(Debug, Default)]
struct PackedGeometries {
    positions: Vec<[f64; 2]>,
    parts: Vec<PackedPart>,
}

impl PackedGeometries {
    fn pack(placemarks: &[Placemark]) -> Self {
        let mut packed = Self::default();
        for (index, placemark) in placemarks.iter().enumerate() {
            if let Some(geometry) = &placemark.geometry {
                packed.push_geometry(index, geometry);
            }
        }

        packed
    }

    fn push_geometry(&mut self, placemark: usize, geometry: &KmlGeometry) {
        match geometry {
            KmlGeometry::Point(coord) => {
                let range = self.push_coords(std::slice::from_ref(coord));
                self.push_part(placemark, PartKind::Point, vec![range]);
            }
            KmlGeometry::LineString(coords) | KmlGeometry::LinearRing(coords) => {
                let range = self.push_coords(coords);
                self.push_part(placemark, PartKind::Line, vec![range]);
            }
            KmlGeometry::Polygon { outer, inner } => {
                let rings = std::iter::once(outer)
                    .chain(inner)
                    .map(|ring| self.push_coords(ring))
                    .collect();
                self.push_part(placemark, PartKind::Polygon, rings);
            }
            KmlGeometry::MultiGeometry(parts) => {
                for part in parts {
                    self.push_geometry(placemark, part);
                }
            }
        }
    }

    fn push_coords(&mut self, coords: &[Coord]) -> Range<usize> {
        let start = self.positions.len();
        self.positions
            .extend(coords.iter().map(|coord| [coord.x, coord.y]));
        start..self.positions.len()
    }

    fn push_part(&mut self, placemark: usize, kind: PartKind, rings: Vec<Range<usize>>) {
        self.parts.push(PackedPart {
            placemark,
            kind,
            rings,
        });
    }

    fn ring(&self, range: &Range<usize>) -> Vec<Vec<f64>> {
        self.positions
            .get(range.clone())
            .unwrap_or_default()
            .iter()
            .map(|[x, y]| vec![*x, *y])
            .collect()
    }

    fn unpack(&self, part: &PackedPart) -> Option<Value> {
        let value = match part.kind {
            PartKind::Point => {
                let range = part.rings.first()?;
                let [x, y] = self.positions.get(range.start)?;
                Value::Point(vec![*x, *y])
            }
            PartKind::Line => Value::LineString(self.ring(part.rings.first()?)),
            PartKind::Polygon => {
                Value::Polygon(part.rings.iter().map(|range| self.ring(range)).collect())
            }
        };

        Some(value)
    }
}

fn decode_binary(text: &str) -> Result<Vec<Feature>, GeoviewError> {
    let document = kml::read(text, ReadOptions::LENIENT)?;
    let packed = PackedGeometries::pack(&document.placemarks);

    Ok(packed
        .parts
        .iter()
        .filter_map(|part| {
            let value = packed.unpack(part)?;
            let placemark = document.placemarks.get(part.placemark)?;
            Some(feature(Some(Geometry::new(value)), properties(placemark)))
        })
        .collect())
}

fn properties(placemark: &Placemark) -> JsonObject {
    let mut properties = JsonObject::new();
    if let Some(name) = &placemark.name {
        properties.insert("name".into(), JsonValue::String(name.clone()));
    }
    if let Some(description) = &placemark.description {
        properties.insert("description".into(), JsonValue::String(description.clone()));
    }
    for (key, value) in &placemark.data {
        properties.insert(key.clone(), JsonValue::String(value.clone()));
    }

    properties
}

fn feature(geometry: Option<Geometry>, properties: JsonObject) -> Feature {
    Feature {
        bbox: None,
        geometry,
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}
