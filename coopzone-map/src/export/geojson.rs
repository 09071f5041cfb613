//! Export des couches de carte en GeoJSON avec geozero (streaming)

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use geo::{Geometry, MultiPolygon};
use geojson::JsonObject;
use geozero::geojson::GeoJsonWriter;
use geozero::GeozeroGeometry;
use serde::Serialize;
use serde_json::json;

use coopzone::{EligibilityResult, Parcel, RunOutput};

pub const ELIGIBILITY_LAYER: &str = "eligibility.geojson";
pub const ALLOWED_LAYER: &str = "allowed.geojson";
pub const PROHIBITED_LAYER: &str = "prohibited.geojson";
pub const NON_RESIDENTIAL_LAYER: &str = "non_residential.geojson";

/// Feature prête à écrire
#[derive(Debug, Clone)]
pub struct LayerFeature {
    pub id: String,
    pub geometry: Geometry<f64>,
    pub properties: JsonObject,
}

/// Nombre de features écrites par couche
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LayerCounts {
    pub eligibility: usize,
    pub allowed: usize,
    pub prohibited: usize,
    pub non_residential: usize,
}

/// Écrit une FeatureCollection (avec CRS nommé si l'EPSG est connu)
pub fn write_layer<I>(features: I, epsg: Option<u32>, output_path: &Path) -> Result<usize>
where
    I: IntoIterator<Item = LayerFeature>,
{
    let file = File::create(output_path)
        .context(format!("Failed to create file: {}", output_path.display()))?;
    let mut writer = BufWriter::new(file);

    write!(writer, r#"{{"type":"FeatureCollection","#)?;
    if let Some(epsg) = epsg {
        write!(
            writer,
            r#""crs":{{"type":"name","properties":{{"name":"urn:ogc:def:crs:EPSG::{}"}}}},"#,
            epsg
        )?;
    }
    write!(writer, r#""features":["#)?;

    let mut count = 0;
    for feature in features {
        if count > 0 {
            write!(writer, ",")?;
        }
        write_feature(&mut writer, &feature)?;
        count += 1;
    }

    write!(writer, "]}}")?;
    writer.flush()?;

    Ok(count)
}

/// Écrit une feature en GeoJSON
fn write_feature<W: Write>(writer: &mut W, feature: &LayerFeature) -> Result<()> {
    write!(writer, r#"{{"type":"Feature","id":"#)?;
    serde_json::to_writer(&mut *writer, &feature.id)?;

    // Geometry via geozero
    write!(writer, r#","geometry":"#)?;
    let mut geom_buf = Vec::new();
    let mut geom_writer = GeoJsonWriter::new(&mut geom_buf);
    feature.geometry.process_geom(&mut geom_writer)?;
    writer.write_all(&geom_buf)?;

    write!(writer, r#","properties":"#)?;
    serde_json::to_writer(&mut *writer, &feature.properties)?;
    write!(writer, "}}")?;

    Ok(())
}

fn properties(value: serde_json::Value) -> JsonObject {
    match value {
        serde_json::Value::Object(map) => map,
        _ => JsonObject::new(),
    }
}

fn polygonal(geometry: &MultiPolygon<f64>) -> Geometry<f64> {
    Geometry::MultiPolygon(geometry.clone())
}

/// Une feature par parcelle résidentielle (géométrie de la parcelle, surfaces en attributs)
pub fn eligibility_feature(result: &EligibilityResult) -> LayerFeature {
    LayerFeature {
        id: result.parcel_id.clone(),
        geometry: polygonal(&result.parcel_geometry),
        properties: properties(json!({
            "parcel_id": result.parcel_id,
            "parcel_area": result.parcel_area(),
            "allowed_area": result.allowed_area(),
            "prohibited_area": result.prohibited_area(),
            "permitted": !result.is_fully_prohibited(),
        })),
    }
}

/// Surface autorisée d'une parcelle (None si vide)
pub fn allowed_feature(result: &EligibilityResult) -> Option<LayerFeature> {
    if result.allowed_geometry.0.is_empty() {
        return None;
    }
    Some(LayerFeature {
        id: result.parcel_id.clone(),
        geometry: polygonal(&result.allowed_geometry),
        properties: properties(json!({
            "parcel_id": result.parcel_id,
            "area": result.allowed_area(),
        })),
    })
}

/// Surface interdite d'une parcelle (None si vide)
pub fn prohibited_feature(result: &EligibilityResult) -> Option<LayerFeature> {
    if result.prohibited_geometry.0.is_empty() {
        return None;
    }
    Some(LayerFeature {
        id: result.parcel_id.clone(),
        geometry: polygonal(&result.prohibited_geometry),
        properties: properties(json!({
            "parcel_id": result.parcel_id,
            "area": result.prohibited_area(),
        })),
    })
}

pub fn non_residential_feature(parcel: &Parcel) -> LayerFeature {
    LayerFeature {
        id: parcel.id.clone(),
        geometry: polygonal(&parcel.geometry),
        properties: properties(json!({
            "parcel_id": parcel.id,
            "zoning_code": parcel.zoning_code,
        })),
    }
}

/// Écrit les quatre couches de carte dans `dir`
pub fn export_layers(output: &RunOutput, epsg: Option<u32>, dir: &Path) -> Result<LayerCounts> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory: {}", dir.display()))?;

    Ok(LayerCounts {
        eligibility: write_layer(
            output.results.iter().map(eligibility_feature),
            epsg,
            &dir.join(ELIGIBILITY_LAYER),
        )?,
        allowed: write_layer(
            output.results.iter().filter_map(allowed_feature),
            epsg,
            &dir.join(ALLOWED_LAYER),
        )?,
        prohibited: write_layer(
            output.results.iter().filter_map(prohibited_feature),
            epsg,
            &dir.join(PROHIBITED_LAYER),
        )?,
        non_residential: write_layer(
            output.non_residential.iter().map(non_residential_feature),
            epsg,
            &dir.join(NON_RESIDENTIAL_LAYER),
        )?,
    })
}
