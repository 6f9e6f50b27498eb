//! Raster tiles of the base map: loading, decoding and caching as egui textures.

use std::sync::Arc;

use egui::{ColorImage, TextureHandle, TextureOptions};
use geoview::config::{Attribution, BaseMap};
use geoview::error::GeoviewError;
use geoview::platform::PlatformService;
use quick_cache::sync::Cache;

use crate::tile_schema::{TileIndex, TileSchema, WrappingTileIndex};
use crate::view::MapView;

const CACHE_CAPACITY: usize = 512;

enum TileState {
    Loading,
    Loaded(TextureHandle),
    Error,
}

/// Base map tiles of a [`BaseMap`] source.
///
/// Tiles are requested lazily when a view needs them. Loading runs on the async runtime; when a
/// tile is ready, its texture is put into the cache and a repaint is requested.
pub struct RasterTiles {
    base_map: BaseMap,
    schema: TileSchema,
    tiles: Arc<Cache<TileIndex, Arc<TileState>>>,
    context: egui::Context,
}

impl RasterTiles {
    /// Creates an empty tile set.
    pub fn new(base_map: BaseMap, context: egui::Context) -> Self {
        let schema = TileSchema::web(BaseMap::TILE_SIZE, base_map.max_z());
        Self {
            base_map,
            schema,
            tiles: Arc::new(Cache::new(CACHE_CAPACITY)),
            context,
        }
    }

    /// Tile grid of the source.
    pub fn schema(&self) -> &TileSchema {
        &self.schema
    }

    /// Attribution of the tile source.
    pub fn attribution(&self) -> Attribution {
        self.base_map.attribution()
    }

    /// Returns the tiles of the view that are ready to be drawn and starts loading the missing
    /// ones.
    pub fn visible_tiles(&self, view: &MapView) -> Vec<(WrappingTileIndex, TextureHandle)> {
        let Some(indices) = self.schema.iter_tiles(view) else {
            return vec![];
        };

        let mut ready = vec![];
        for index in indices {
            match self.tiles.get(&index.tile()).as_deref() {
                Some(TileState::Loaded(texture)) => ready.push((index, texture.clone())),
                Some(TileState::Loading | TileState::Error) => {}
                None => self.load(index.tile()),
            }
        }

        ready
    }

    fn load(&self, index: TileIndex) {
        self.tiles.insert(index, Arc::new(TileState::Loading));

        let url = self
            .base_map
            .tile_url(index.z, index.x as u64, index.y as u64);
        let tiles = self.tiles.clone();
        let context = self.context.clone();

        geoview::async_runtime::spawn(async move {
            log::trace!("Loading tile {index:?} from {url}");
            let state = match load_tile(&url).await {
                Ok(image) => {
                    let name = format!("tile-{}-{}-{}", index.z, index.x, index.y);
                    TileState::Loaded(context.load_texture(name, image, TextureOptions::LINEAR))
                }
                Err(err) => {
                    log::debug!("Failed to load tile {index:?}: {err}");
                    TileState::Error
                }
            };

            tiles.insert(index, Arc::new(state));
            context.request_repaint();
        });
    }
}

async fn load_tile(url: &str) -> Result<ColorImage, GeoviewError> {
    let bytes = geoview::platform::instance()
        .load_bytes_from_url(url)
        .await?;
    decode_tile(&bytes)
}

/// Decodes a PNG or JPEG tile into an egui image.
pub fn decode_tile(bytes: &[u8]) -> Result<ColorImage, GeoviewError> {
    let decoded = image::load_from_memory(bytes)
        .map_err(|err| GeoviewError::Parse(format!("failed to decode tile image: {err}")))?;
    let rgba = decoded.to_rgba8();
    let size = [rgba.width() as usize, rgba.height() as usize];

    Ok(ColorImage::from_rgba_unmultiplied(size, rgba.as_raw()))
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use assert_matches::assert_matches;
    use image::{DynamicImage, ImageOutputFormat, Rgba, RgbaImage};

    use super::*;

    #[test]
    fn decodes_png_tile() {
        let mut tile = RgbaImage::new(4, 2);
        tile.put_pixel(1, 0, Rgba([10, 20, 30, 255]));

        let mut encoded = Cursor::new(vec![]);
        DynamicImage::ImageRgba8(tile)
            .write_to(&mut encoded, ImageOutputFormat::Png)
            .unwrap();

        let image = decode_tile(encoded.get_ref()).unwrap();
        assert_eq!(image.size, [4, 2]);
        assert_eq!(image.pixels[1], egui::Color32::from_rgb(10, 20, 30));
    }

    #[test]
    fn garbage_is_an_error() {
        assert_matches!(decode_tile(b"not an image"), Err(GeoviewError::Parse(_)));
    }
}
