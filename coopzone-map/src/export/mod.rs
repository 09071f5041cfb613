//! Modules d'export

pub mod geojson;

pub use self::geojson::{export_layers, write_layer, LayerCounts, LayerFeature};
