//! Streaming reader of KML documents.
//!
//! Only the parts of KML that carry geometry are read: placemarks (at any depth of
//! `Document`/`Folder` nesting) with their name, description, extended data and geometry. Styles,
//! overlays and other elements are skipped.

use std::borrow::Cow;

use log::warn;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::GeoviewError;

/// A coordinate tuple of a KML geometry: `longitude,latitude[,altitude]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coord {
    /// Longitude in degrees.
    pub x: f64,
    /// Latitude in degrees.
    pub y: f64,
    /// Altitude in meters, if specified.
    pub z: Option<f64>,
}

/// Geometry of a placemark.
#[derive(Debug, Clone, PartialEq)]
pub enum KmlGeometry {
    /// `<Point>`.
    Point(Coord),
    /// `<LineString>`.
    LineString(Vec<Coord>),
    /// `<LinearRing>` used outside of a polygon.
    LinearRing(Vec<Coord>),
    /// `<Polygon>` with the outer boundary and zero or more holes.
    Polygon {
        /// Outer boundary.
        outer: Vec<Coord>,
        /// Inner boundaries.
        inner: Vec<Vec<Coord>>,
    },
    /// `<MultiGeometry>`.
    MultiGeometry(Vec<KmlGeometry>),
}

/// A `<Placemark>` element.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Placemark {
    /// Content of `<name>`.
    pub name: Option<String>,
    /// Content of `<description>`.
    pub description: Option<String>,
    /// Name/value pairs of `<ExtendedData>` in the document order.
    pub data: Vec<(String, String)>,
    /// Geometry of the placemark. Placemarks without geometry are kept.
    pub geometry: Option<KmlGeometry>,
}

/// Content of a KML document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KmlDocument {
    /// All placemarks of the document in the document order.
    pub placemarks: Vec<Placemark>,
}

/// Options of [`read`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadOptions {
    /// Fail if the document has no `<kml>` root element.
    pub require_root: bool,
    /// Skip placemarks with invalid geometry instead of failing.
    pub skip_invalid: bool,
}

impl ReadOptions {
    /// Options that reject anything that is not a well-formed KML document.
    pub const STRICT: Self = Self {
        require_root: true,
        skip_invalid: false,
    };

    /// Options that take whatever placemarks can be read.
    pub const LENIENT: Self = Self {
        require_root: false,
        skip_invalid: true,
    };
}

/// Reads placemarks from the KML text.
///
/// Malformed XML is always an error. What happens with a missing root element or an invalid
/// geometry depends on the `options`.
pub fn read(text: &str, options: ReadOptions) -> Result<KmlDocument, GeoviewError> {
    let mut reader = Reader::from_str(text);
    reader.trim_text(true);

    let mut placemarks = vec![];
    let mut has_root = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"kml" => has_root = true,
                b"Placemark" => {
                    let (placemark, geometry_error) = read_placemark(&mut reader)?;
                    match geometry_error {
                        None => placemarks.push(placemark),
                        Some(error) if options.skip_invalid => {
                            warn!(
                                "Skipping placemark {:?} with invalid geometry: {error}",
                                placemark.name
                            );
                        }
                        Some(error) => return Err(error),
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    if options.require_root && !has_root {
        return Err(GeoviewError::Parse("document has no <kml> root element".into()));
    }

    Ok(KmlDocument { placemarks })
}

/// Reads the placemark content up to its closing tag. An invalid geometry does not stop reading,
/// so the reader always ends up after the placemark; the geometry error is returned separately.
fn read_placemark(
    reader: &mut Reader<&[u8]>,
) -> Result<(Placemark, Option<GeoviewError>), GeoviewError> {
    let mut placemark = Placemark::default();
    let mut geometry_error = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let local_name = e.local_name();
                match local_name.as_ref() {
                    b"name" => placemark.name = Some(read_text(reader, b"name")?),
                    b"description" => {
                        placemark.description = Some(read_text(reader, b"description")?)
                    }
                    b"ExtendedData" => read_extended_data(reader, &mut placemark.data)?,
                    tag => match GeometryTag::from_name(tag) {
                        Some(tag) => match read_geometry(reader, tag)? {
                            Ok(geometry) => placemark.geometry = Some(geometry),
                            Err(error) => geometry_error = Some(error),
                        },
                        None => skip(reader, &e)?,
                    },
                }
            }
            Event::End(e) if e.local_name().as_ref() == b"Placemark" => break,
            Event::Eof => return Err(unexpected_eof("Placemark")),
            _ => {}
        }
    }

    Ok((placemark, geometry_error))
}

fn read_extended_data(
    reader: &mut Reader<&[u8]>,
    data: &mut Vec<(String, String)>,
) -> Result<(), GeoviewError> {
    let mut current_name = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"Data" => current_name = name_attribute(&e)?,
                b"value" => {
                    let value = read_text(reader, b"value")?;
                    if let Some(name) = current_name.take() {
                        data.push((name, value));
                    }
                }
                b"SimpleData" => {
                    let name = name_attribute(&e)?;
                    let value = read_text(reader, b"SimpleData")?;
                    if let Some(name) = name {
                        data.push((name, value));
                    }
                }
                _ => {}
            },
            Event::End(e) if e.local_name().as_ref() == b"ExtendedData" => break,
            Event::Eof => return Err(unexpected_eof("ExtendedData")),
            _ => {}
        }
    }

    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GeometryTag {
    Point,
    LineString,
    LinearRing,
    Polygon,
    MultiGeometry,
}

impl GeometryTag {
    fn from_name(name: &[u8]) -> Option<Self> {
        Some(match name {
            b"Point" => Self::Point,
            b"LineString" => Self::LineString,
            b"LinearRing" => Self::LinearRing,
            b"Polygon" => Self::Polygon,
            b"MultiGeometry" => Self::MultiGeometry,
            _ => return None,
        })
    }

    fn name(&self) -> &'static [u8] {
        match self {
            Self::Point => b"Point",
            Self::LineString => b"LineString",
            Self::LinearRing => b"LinearRing",
            Self::Polygon => b"Polygon",
            Self::MultiGeometry => b"MultiGeometry",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Boundary {
    Outer,
    Inner,
}

/// Reads a geometry element up to its closing tag. The outer `Result` is an XML error that stops
/// reading the document, the inner one is an invalid geometry.
fn read_geometry(
    reader: &mut Reader<&[u8]>,
    tag: GeometryTag,
) -> Result<Result<KmlGeometry, GeoviewError>, GeoviewError> {
    let mut coords: Option<Result<Vec<Coord>, GeoviewError>> = None;
    let mut outer = None;
    let mut inner = vec![];
    let mut parts = vec![];
    let mut boundary = None;
    let mut first_error = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let local_name = e.local_name();
                match local_name.as_ref() {
                    b"coordinates" => {
                        coords = Some(parse_coordinates(&read_text(reader, b"coordinates")?))
                    }
                    b"outerBoundaryIs" => boundary = Some(Boundary::Outer),
                    b"innerBoundaryIs" => boundary = Some(Boundary::Inner),
                    name => match GeometryTag::from_name(name) {
                        Some(child_tag) => match (boundary, read_geometry(reader, child_tag)?) {
                            (Some(Boundary::Outer), Ok(KmlGeometry::LinearRing(ring))) => {
                                outer = Some(ring)
                            }
                            (Some(Boundary::Inner), Ok(KmlGeometry::LinearRing(ring))) => {
                                inner.push(ring)
                            }
                            (_, Ok(geometry)) => parts.push(geometry),
                            (_, Err(error)) => {
                                first_error.get_or_insert(error);
                            }
                        },
                        None => skip(reader, &e)?,
                    },
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"outerBoundaryIs" | b"innerBoundaryIs" => boundary = None,
                name if name == tag.name() => break,
                _ => {}
            },
            Event::Eof => {
                return Err(unexpected_eof(&String::from_utf8_lossy(tag.name())));
            }
            _ => {}
        }
    }

    if let Some(error) = first_error {
        return Ok(Err(error));
    }

    let coords = match coords.transpose() {
        Ok(coords) => coords,
        Err(error) => return Ok(Err(error)),
    };

    Ok(build_geometry(tag, coords, outer, inner, parts))
}

fn build_geometry(
    tag: GeometryTag,
    coords: Option<Vec<Coord>>,
    outer: Option<Vec<Coord>>,
    inner: Vec<Vec<Coord>>,
    parts: Vec<KmlGeometry>,
) -> Result<KmlGeometry, GeoviewError> {
    let invalid = |reason: &str| {
        Err(GeoviewError::Parse(format!(
            "invalid {}: {reason}",
            String::from_utf8_lossy(tag.name())
        )))
    };

    match tag {
        GeometryTag::Point => match coords.as_deref() {
            Some([coord, ..]) => Ok(KmlGeometry::Point(*coord)),
            _ => invalid("no coordinates"),
        },
        GeometryTag::LineString => match coords {
            Some(coords) if coords.len() >= 2 => Ok(KmlGeometry::LineString(coords)),
            _ => invalid("at least 2 coordinates are required"),
        },
        GeometryTag::LinearRing => match coords {
            Some(coords) if coords.len() >= 3 => Ok(KmlGeometry::LinearRing(coords)),
            _ => invalid("at least 3 coordinates are required"),
        },
        GeometryTag::Polygon => match outer {
            Some(outer) => Ok(KmlGeometry::Polygon { outer, inner }),
            None => invalid("no outer boundary"),
        },
        GeometryTag::MultiGeometry => Ok(KmlGeometry::MultiGeometry(parts)),
    }
}

/// Parses the content of a `<coordinates>` element: whitespace separated tuples of comma
/// separated numbers.
pub fn parse_coordinates(text: &str) -> Result<Vec<Coord>, GeoviewError> {
    text.split_whitespace()
        .map(|tuple| {
            let mut values = tuple.split(',').map(|value| {
                value.parse::<f64>().map_err(|_| {
                    GeoviewError::Parse(format!("invalid coordinate value {value:?} in {tuple:?}"))
                })
            });

            let (Some(x), Some(y)) = (values.next(), values.next()) else {
                return Err(GeoviewError::Parse(format!(
                    "coordinate tuple {tuple:?} has less than 2 values"
                )));
            };
            let z = values.next().transpose()?;

            Ok(Coord { x: x?, y: y?, z })
        })
        .collect()
}

fn read_text(reader: &mut Reader<&[u8]>, end: &[u8]) -> Result<String, GeoviewError> {
    let mut text = String::new();
    loop {
        match reader.read_event()? {
            Event::Text(e) => text.push_str(&e.unescape()?),
            Event::CData(e) => text.push_str(std::str::from_utf8(&e)?),
            Event::Start(e) => skip(reader, &e)?,
            Event::End(e) if e.local_name().as_ref() == end => break,
            Event::Eof => return Err(unexpected_eof(&String::from_utf8_lossy(end))),
            _ => {}
        }
    }

    Ok(text.trim().to_string())
}

fn name_attribute(element: &BytesStart) -> Result<Option<String>, GeoviewError> {
    let attribute = element
        .try_get_attribute("name")
        .map_err(quick_xml::Error::from)?;
    match attribute {
        Some(attribute) => Ok(Some(Cow::into_owned(attribute.unescape_value()?))),
        None => Ok(None),
    }
}

fn skip(reader: &mut Reader<&[u8]>, element: &BytesStart) -> Result<(), GeoviewError> {
    reader.read_to_end(element.name())?;
    Ok(())
}

fn unexpected_eof(element: &str) -> GeoviewError {
    GeoviewError::Parse(format!("unexpected end of document inside <{element}>"))
}
