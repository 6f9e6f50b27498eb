//! GeoView loads a geospatial file from a URL and turns it into a single map layer.
//!
//! Supported inputs are delimited text files (`.csv`, `.tsv`, `.dsv`) with `Longitude` and
//! `Latitude` columns, and KML documents (`.kml`).
//!
//! # Main components
//!
//! * [`Dispatcher`](loader::Dispatcher) picks a parser by the URL suffix, loads the file through a
//!   [`DataSource`](loader::DataSource) and, for KML, falls back through the
//!   [markup strategies](loader::MarkupStrategy) until one of them succeeds.
//! * [`derive_viewport`] computes the initial camera position from the first record or feature of
//!   a freshly loaded [`Dataset`].
//! * [`build_layers`] converts the live dataset into a [`LayerSpec`] that a render surface knows
//!   how to draw.
//! * [`ViewerState`] holds everything the UI shows and changes only through its transition
//!   methods. [`LoadController`] runs loads on the async runtime and feeds their results back into
//!   the state.
//!
//! ```no_run
//! use geoview::loader::{Dispatcher, HttpDataSource};
//! use geoview::{derive_viewport, build_layers};
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let dispatcher = Dispatcher::new(HttpDataSource::new());
//! let dataset = Arc::new(dispatcher.load_from_url("https://example.com/stations.csv").await?);
//! let viewport = derive_viewport(&dataset);
//! let layers = build_layers(Some(&dataset));
//! # Ok::<(), geoview::error::GeoviewError>(())
//! # });
//! ```

#![warn(clippy::unwrap_used)]
#![warn(missing_docs)]

pub mod async_runtime;
mod color;
pub mod config;
pub mod controller;
pub mod dataset;
pub mod error;
pub mod layer;
pub mod loader;
mod messenger;
pub mod platform;
pub mod state;
pub mod viewport;

pub use color::Color;
pub use controller::LoadController;
pub use dataset::{Dataset, LayerKind, PointTable, Record};
pub use layer::{build_layers, LayerSpec};
pub use messenger::{DummyMessenger, Messenger};
pub use state::ViewerState;
pub use viewport::{derive_viewport, Viewport};
