//! Desktop and browser viewer for files loaded with [`geoview`].
//!
//! The map is drawn with the egui painter: raster base map tiles as textured quads, point data as
//! circles and feature geometries as tessellated polygons and lines. The map can be panned with the
//! primary mouse button, zoomed with the wheel or a pinch gesture, and rotated and tilted with the
//! secondary mouse button.

#![warn(clippy::unwrap_used)]
#![warn(missing_docs)]

mod app;
pub mod control;
mod init;
pub mod map_widget;
pub mod projection;
pub mod render;
pub mod tile_schema;
pub mod tiles;
pub mod view;

pub use app::GeoviewApp;
pub use init::InitBuilder;
pub use map_widget::MapState;
