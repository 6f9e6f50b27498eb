//! GeoView: load a CSV, TSV, DSV or KML file from a URL and show it on a map.
//!
//! The url to open can be given as the first command line argument.

use geoview_egui::InitBuilder;

fn main() -> eframe::Result {
    InitBuilder::new().init()
}
