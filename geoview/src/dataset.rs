//! In-memory representation of a loaded file.

use geojson::FeatureCollection;

/// Name of the column with the longitude of a record.
pub const LONGITUDE_COLUMN: &str = "Longitude";
/// Name of the column with the latitude of a record.
pub const LATITUDE_COLUMN: &str = "Latitude";

/// Parsed content of a loaded file.
///
/// A dataset is produced once per successful load and is never modified afterwards. A new load
/// replaces it as a whole.
#[derive(Debug, Clone, PartialEq)]
pub enum Dataset {
    /// Flat records of a delimited text file.
    Points(PointTable),
    /// Features of a markup (KML) file.
    Features(FeatureCollection),
}

impl Dataset {
    /// Kind of the layer this dataset is rendered with.
    pub fn kind(&self) -> LayerKind {
        match self {
            Dataset::Points(_) => LayerKind::PointSet,
            Dataset::Features(_) => LayerKind::GeometrySet,
        }
    }

    /// Number of records or features.
    pub fn len(&self) -> usize {
        match self {
            Dataset::Points(table) => table.len(),
            Dataset::Features(collection) => collection.features.len(),
        }
    }

    /// Returns true if the dataset has no records or features.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Rendering strategy for the current dataset.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerKind {
    /// Nothing is loaded.
    #[default]
    None,
    /// Records with `Longitude`/`Latitude` fields, rendered as a point cloud.
    PointSet,
    /// Geometry features, rendered as a geometry layer.
    GeometrySet,
}

/// Records of a delimited text file. All values are kept as strings in the file order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PointTable {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl PointTable {
    /// Creates a table from the header and the rows.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { columns, rows }
    }

    /// Column names from the header row.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if the table has no records.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns the record at the given index.
    pub fn get(&self, index: usize) -> Option<Record<'_>> {
        self.rows.get(index).map(|values| Record {
            columns: &self.columns,
            values,
        })
    }

    /// Iterates over the records in the file order.
    pub fn records(&self) -> impl Iterator<Item = Record<'_>> + '_ {
        self.rows.iter().map(|values| Record {
            columns: &self.columns,
            values,
        })
    }
}

/// A single record of a [`PointTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Record<'a> {
    columns: &'a [String],
    values: &'a [String],
}

impl<'a> Record<'a> {
    /// Value of the given column. Returns `None` if the table has no such column or the row is
    /// shorter than the header.
    pub fn get(&self, column: &str) -> Option<&'a str> {
        let index = self.columns.iter().position(|name| name == column)?;
        self.values.get(index).map(String::as_str)
    }

    /// Longitude and latitude of the record as they are written in the file.
    pub fn raw_position(&self) -> (Option<&'a str>, Option<&'a str>) {
        (self.get(LONGITUDE_COLUMN), self.get(LATITUDE_COLUMN))
    }
}
