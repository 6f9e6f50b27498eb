//! Camera position of the map and its derivation from a loaded dataset.

use geojson::{Geometry, Value};
use serde::{Deserialize, Serialize};

use crate::dataset::{Dataset, PointTable};

/// Zoom level of the viewport derived from a freshly loaded dataset.
pub const DATASET_ZOOM: f64 = 7.0;

/// Camera state of the map.
///
/// Angles are in degrees. Zoom follows the Web-Mercator convention of a 512 pixel wide world at
/// zoom 0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// Longitude of the center.
    pub longitude: f64,
    /// Latitude of the center.
    pub latitude: f64,
    /// Zoom level.
    pub zoom: f64,
    /// Tilt of the camera from the vertical.
    pub pitch: f64,
    /// Compass direction the camera faces.
    pub bearing: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            longitude: 0.0,
            latitude: 0.0,
            zoom: 2.0,
            pitch: 0.0,
            bearing: 0.0,
        }
    }
}

impl Viewport {
    /// Viewport looking straight down at the given point with the [`DATASET_ZOOM`].
    pub fn centered_at(longitude: f64, latitude: f64) -> Self {
        Self {
            longitude,
            latitude,
            zoom: DATASET_ZOOM,
            pitch: 0.0,
            bearing: 0.0,
        }
    }
}

/// Computes the initial viewport for the dataset from its first record or feature.
///
/// Returns `None` if the first item has no usable position: a record without numeric
/// `Longitude`/`Latitude` values, a feature without geometry or coordinates, or an empty dataset.
pub fn derive_viewport(dataset: &Dataset) -> Option<Viewport> {
    let (longitude, latitude) = match dataset {
        Dataset::Points(table) => first_record_position(table)?,
        Dataset::Features(collection) => {
            first_position(collection.features.first()?.geometry.as_ref()?)?
        }
    };

    Some(Viewport::centered_at(longitude, latitude))
}

fn first_record_position(table: &PointTable) -> Option<(f64, f64)> {
    let (longitude, latitude) = table.get(0)?.raw_position();
    Some((parse_degrees(longitude?)?, parse_degrees(latitude?)?))
}

fn parse_degrees(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn first_position(geometry: &Geometry) -> Option<(f64, f64)> {
    let position = match &geometry.value {
        Value::Point(position) => position,
        Value::MultiPoint(positions) | Value::LineString(positions) => positions.first()?,
        Value::MultiLineString(lines) | Value::Polygon(lines) => lines.first()?.first()?,
        Value::MultiPolygon(polygons) => polygons.first()?.first()?.first()?,
        Value::GeometryCollection(members) => return members.iter().find_map(first_position),
    };

    match position.as_slice() {
        [x, y, ..] if x.is_finite() && y.is_finite() => Some((*x, *y)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use geojson::{Feature, FeatureCollection};

    use super::*;

    fn points(rows: Vec<Vec<&str>>) -> Dataset {
        Dataset::Points(PointTable::new(
            vec!["Name".into(), "Longitude".into(), "Latitude".into()],
            rows.into_iter()
                .map(|row| row.into_iter().map(String::from).collect())
                .collect(),
        ))
    }

    fn features(values: Vec<Option<Value>>) -> Dataset {
        Dataset::Features(FeatureCollection {
            bbox: None,
            features: values
                .into_iter()
                .map(|value| Feature {
                    bbox: None,
                    geometry: value.map(Geometry::new),
                    id: None,
                    properties: None,
                    foreign_members: None,
                })
                .collect(),
            foreign_members: None,
        })
    }

    #[test]
    fn default_viewport() {
        let viewport = Viewport::default();
        assert_eq!(viewport.zoom, 2.0);
        assert_eq!((viewport.longitude, viewport.latitude), (0.0, 0.0));
        assert_eq!((viewport.pitch, viewport.bearing), (0.0, 0.0));
    }

    #[test]
    fn viewport_from_first_record() {
        let dataset = points(vec![vec!["a", "10.5", "20.25"], vec!["b", "1", "1"]]);
        let viewport = derive_viewport(&dataset).unwrap();
        assert_abs_diff_eq!(viewport.longitude, 10.5);
        assert_abs_diff_eq!(viewport.latitude, 20.25);
        assert_abs_diff_eq!(viewport.zoom, 7.0);
        assert_abs_diff_eq!(viewport.pitch, 0.0);
        assert_abs_diff_eq!(viewport.bearing, 0.0);
    }

    #[test]
    fn unusable_first_record() {
        assert_eq!(derive_viewport(&points(vec![vec!["a", "east", "20"]])), None);
        assert_eq!(derive_viewport(&points(vec![vec!["a", "NaN", "20"]])), None);
        assert_eq!(derive_viewport(&points(vec![vec!["a", "10"]])), None);
        assert_eq!(derive_viewport(&points(vec![])), None);
    }

    #[test]
    fn viewport_from_point_feature() {
        let dataset = features(vec![Some(Value::Point(vec![15.0, 45.0, 100.0]))]);
        assert_eq!(
            derive_viewport(&dataset),
            Some(Viewport::centered_at(15.0, 45.0))
        );
    }

    #[test]
    fn viewport_from_first_polygon_coordinate() {
        let dataset = features(vec![Some(Value::Polygon(vec![vec![
            vec![1.0, 2.0],
            vec![3.0, 4.0],
        ]]))]);
        let viewport = derive_viewport(&dataset).unwrap();
        assert_abs_diff_eq!(viewport.longitude, 1.0);
        assert_abs_diff_eq!(viewport.latitude, 2.0);
        assert_abs_diff_eq!(viewport.zoom, DATASET_ZOOM);
    }

    #[test]
    fn viewport_from_nested_geometries() {
        let dataset = features(vec![Some(Value::MultiPolygon(vec![vec![vec![
            vec![5.0, 6.0],
            vec![7.0, 8.0],
        ]]]))]);
        assert_eq!(
            derive_viewport(&dataset),
            Some(Viewport::centered_at(5.0, 6.0))
        );

        let dataset = features(vec![Some(Value::GeometryCollection(vec![
            Geometry::new(Value::LineString(vec![])),
            Geometry::new(Value::LineString(vec![vec![-3.0, 9.0]])),
        ]))]);
        assert_eq!(
            derive_viewport(&dataset),
            Some(Viewport::centered_at(-3.0, 9.0))
        );
    }

    #[test]
    fn only_the_first_feature_is_used() {
        let dataset = features(vec![None, Some(Value::Point(vec![1.0, 1.0]))]);
        assert_eq!(derive_viewport(&dataset), None);

        let dataset = features(vec![Some(Value::LineString(vec![]))]);
        assert_eq!(derive_viewport(&dataset), None);

        assert_eq!(derive_viewport(&features(vec![])), None);
    }
}
