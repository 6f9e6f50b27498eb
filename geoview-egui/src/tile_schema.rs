//! Web-Mercator tile grid used by the raster base map.

use std::ops::Range;

use crate::projection::MAX_X;
use crate::view::MapView;

const RESOLUTION_TOLERANCE: f64 = 0.01;
const INDEX_TOLERANCE: f64 = 1e-9;

/// Tile index with additional virtual `display_x` index that is used to wrap tiles over the 180
/// longitude line.
#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash)]
pub struct WrappingTileIndex {
    /// Z index.
    pub z: u32,
    /// X index.
    pub x: i32,
    /// Y index.
    pub y: i32,
    /// Virtual wrapping X index. Tiles to the east of the antimeridian have it greater than the
    /// number of tiles in a row, tiles to the west have it negative.
    pub display_x: i32,
}

impl WrappingTileIndex {
    /// Index of the tile to load, without wrapping information.
    pub fn tile(&self) -> TileIndex {
        TileIndex {
            z: self.z,
            x: self.x,
            y: self.y,
        }
    }
}

/// Tile index.
#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash)]
pub struct TileIndex {
    /// Z index.
    pub z: u32,
    /// X index.
    pub x: i32,
    /// Y index.
    pub y: i32,
}

/// Standard Web-Mercator tile grid with `Y == 0` at the top (used by OSM and Mapbox).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileSchema {
    tile_size: u32,
    max_z: u32,
    max_tiles: usize,
}

impl TileSchema {
    /// Resolution of the z-level 0 of a 256 pixel tile grid.
    const TOP_RESOLUTION_256: f64 = 2.0 * MAX_X / 256.0;

    /// Creates a grid of the given tile size with z-levels from 0 to `max_z`.
    pub fn web(tile_size: u32, max_z: u32) -> Self {
        Self {
            tile_size,
            max_z,
            max_tiles: 96,
        }
    }

    /// Limits the number of tiles a single view may need. If a view (usually a strongly tilted
    /// one) needs more, a lower z-level is used for it.
    pub fn with_max_tiles(mut self, max_tiles: usize) -> Self {
        self.max_tiles = max_tiles;
        self
    }

    /// Tile size in pixels.
    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    /// Resolution of the z-level.
    pub fn resolution(&self, z: u32) -> f64 {
        Self::TOP_RESOLUTION_256 * 256.0 / self.tile_size as f64 / 2f64.powi(z as i32)
    }

    /// Selects the lowest z-level whose tiles are at least as detailed as the given resolution.
    pub fn select_z(&self, resolution: f64) -> Option<u32> {
        if !resolution.is_finite() || resolution <= 0.0 {
            return None;
        }

        (0..=self.max_z)
            .find(|z| self.resolution(*z) <= resolution * (1.0 + RESOLUTION_TOLERANCE))
            .or(Some(self.max_z))
    }

    /// Iterates over tiles covering the view.
    pub fn iter_tiles(&self, view: &MapView) -> Option<impl Iterator<Item = WrappingTileIndex>> {
        let mut z = self.select_z(view.resolution())?;
        let bbox = view.bbox();

        loop {
            let ranges = self.index_ranges(z, bbox);
            let (x_range, y_range) = ranges.clone();
            let count = x_range.len() * y_range.len();
            if count <= self.max_tiles || z == 0 {
                return Some(self.tiles_in(z, ranges));
            }

            z -= 1;
        }
    }

    /// Bounding box of the tile in projected meters: `[x_min, y_min, x_max, y_max]`.
    pub fn tile_bbox(&self, index: &WrappingTileIndex) -> [f64; 4] {
        let size = self.resolution(index.z) * self.tile_size as f64;
        let x_min = -MAX_X + index.display_x as f64 * size;
        let y_max = MAX_X - index.y as f64 * size;

        [x_min, y_max - size, x_min + size, y_max]
    }

    fn index_ranges(
        &self,
        z: u32,
        [x_min, y_min, x_max, y_max]: [f64; 4],
    ) -> (Range<i32>, Range<i32>) {
        if y_min >= MAX_X || y_max <= -MAX_X {
            return (0..0, 0..0);
        }

        let size = self.resolution(z) * self.tile_size as f64;
        let row_len = 1i64 << z;

        // Edges that fall exactly on a tile border do not pull in the next tile.
        let first_index = |value: f64| (value / size + INDEX_TOLERANCE).floor() as i64;
        let last_index = |value: f64| (value / size - INDEX_TOLERANCE).ceil() as i64 - 1;

        let x_first = first_index(x_min + MAX_X);
        let x_last = last_index(x_max + MAX_X).max(x_first);

        let y_first = first_index(MAX_X - y_max).clamp(0, row_len - 1);
        let y_last = last_index(MAX_X - y_min).clamp(y_first, row_len - 1);

        (
            to_i32(x_first)..to_i32(x_last).saturating_add(1),
            to_i32(y_first)..to_i32(y_last) + 1,
        )
    }

    fn tiles_in(
        &self,
        z: u32,
        (x_range, y_range): (Range<i32>, Range<i32>),
    ) -> impl Iterator<Item = WrappingTileIndex> {
        let row_len = 1i64 << z;
        x_range.flat_map(move |display_x| {
            let x = (display_x as i64).rem_euclid(row_len) as i32;
            y_range.clone().map(move |y| WrappingTileIndex {
                z,
                x,
                y,
                display_x,
            })
        })
    }
}

fn to_i32(value: i64) -> i32 {
    value.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}
