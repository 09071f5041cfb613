//! Lecture des couches GeoJSON (parcelles, bâtiments)

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use anyhow::{Context, Result};
use geojson::{FeatureCollection, GeoJson, JsonObject, JsonValue};
use tracing::{debug, info};

use coopzone::{require_fields, BuildingRecord, ParcelRecord, BUILDING_FIELDS, PARCEL_FIELDS};

use super::{clean_text, parse_count, UseRow};
use crate::config::{BuildingFields, ParcelFields};

/// Feature lue: propriétés brutes et géométrie convertie
#[derive(Debug, Clone)]
pub struct FeatureRow {
    pub properties: JsonObject,
    pub geometry: Option<geo::Geometry<f64>>,
}

impl FeatureRow {
    fn text(&self, name: &str) -> Option<String> {
        self.properties.get(name).and_then(value_to_text)
    }

    fn count(&self, name: &str) -> Option<i64> {
        self.properties.get(name).and_then(value_to_count)
    }
}

/// Couche GeoJSON: lignes et ensemble des propriétés présentes
#[derive(Debug, Clone, Default)]
pub struct FeatureTable {
    pub rows: Vec<FeatureRow>,
    /// Noms de propriétés vus sur au moins une feature
    pub fields: BTreeSet<String>,
    /// Vrai si au moins une feature porte une géométrie
    pub has_geometry: bool,
}

impl FeatureTable {
    fn has(&self, field: &str) -> bool {
        self.fields.contains(field)
    }
}

/// Lit une FeatureCollection
pub fn read_feature_collection(path: &Path) -> Result<FeatureTable> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let geojson: GeoJson = content
        .parse()
        .with_context(|| format!("Failed to parse GeoJSON: {}", path.display()))?;
    let collection = FeatureCollection::try_from(geojson)
        .with_context(|| format!("Expected a FeatureCollection: {}", path.display()))?;

    let mut table = FeatureTable::default();
    let mut unconverted = 0usize;

    for feature in collection.features {
        let properties = feature.properties.unwrap_or_default();
        table.fields.extend(properties.keys().cloned());

        let geometry = match feature.geometry {
            Some(geometry) => {
                table.has_geometry = true;
                match geo::Geometry::<f64>::try_from(geometry) {
                    Ok(g) => Some(g),
                    Err(e) => {
                        debug!(error = %e, "GeoJSON geometry not convertible");
                        unconverted += 1;
                        None
                    }
                }
            }
            None => None,
        };

        table.rows.push(FeatureRow {
            properties,
            geometry,
        });
    }

    info!(
        path = %path.display(),
        features = table.rows.len(),
        unconverted = unconverted,
        "GeoJSON layer read"
    );
    Ok(table)
}

/// Colonnes logiques disponibles, d'après la correspondance (logique, propriété)
fn available_fields(table: &FeatureTable, mapping: &[(&str, bool)]) -> BTreeSet<String> {
    let mut available: BTreeSet<String> = mapping
        .iter()
        .filter(|(_, present)| *present)
        .map(|(logical, _)| logical.to_string())
        .collect();
    if table.has_geometry {
        available.insert("geometry".to_string());
    }
    available
}

/// Charge les parcelles
///
/// Une couche vide est acceptée; sinon chaque colonne requise doit être
/// présente sur au moins une feature.
pub fn load_parcels(path: &Path, fields: &ParcelFields) -> Result<Vec<ParcelRecord>> {
    let table = read_feature_collection(path)?;

    if !table.rows.is_empty() {
        let available = available_fields(
            &table,
            &[
                ("parcel_id", table.has(&fields.id)),
                ("zoning_code", table.has(&fields.zoning_code)),
            ],
        );
        require_fields("parcels", &available, PARCEL_FIELDS)
            .with_context(|| format!("Parcels layer {}", path.display()))?;
    }

    Ok(table
        .rows
        .into_iter()
        .map(|row| ParcelRecord {
            parcel_id: row.text(&fields.id),
            zoning_code: row.text(&fields.zoning_code),
            geometry: row.geometry,
        })
        .collect())
}

/// Charge les bâtiments, complétés par la table d'usage si fournie
///
/// Les attributs de la table d'usage l'emportent sur ceux de la couche.
pub fn load_buildings(
    path: &Path,
    fields: &BuildingFields,
    usage: Option<&HashMap<String, UseRow>>,
) -> Result<Vec<BuildingRecord>> {
    let table = read_feature_collection(path)?;

    if !table.rows.is_empty() {
        let available = available_fields(
            &table,
            &[
                ("facility_id", table.has(&fields.id)),
                ("use_type", usage.is_some() || table.has(&fields.use_type)),
            ],
        );
        require_fields("buildings", &available, BUILDING_FIELDS)
            .with_context(|| format!("Buildings layer {}", path.display()))?;
    }

    let mut matched = 0usize;
    let records: Vec<BuildingRecord> = table
        .rows
        .into_iter()
        .map(|row| {
            let facility_id = row.text(&fields.id);
            let mut record = BuildingRecord {
                use_type: row.text(&fields.use_type),
                unit_count: fields.unit_count.as_deref().and_then(|f| row.count(f)),
                ownership: fields.ownership.as_deref().and_then(|f| row.text(f)),
                facility_id,
                geometry: row.geometry,
            };

            let use_row = usage.zip(record.facility_id.as_ref()).and_then(|(u, id)| u.get(id));
            if let Some(use_row) = use_row {
                matched += 1;
                merge_use(&mut record, use_row);
            }
            record
        })
        .collect();

    if let Some(usage) = usage {
        info!(
            buildings = records.len(),
            matched = matched,
            use_rows = usage.len(),
            "Building use merged"
        );
    }
    Ok(records)
}

fn merge_use(record: &mut BuildingRecord, row: &UseRow) {
    if row.use_type.is_some() {
        record.use_type.clone_from(&row.use_type);
    }
    if row.unit_count.is_some() {
        record.unit_count = row.unit_count;
    }
    if row.ownership.is_some() {
        record.ownership.clone_from(&row.ownership);
    }
}

fn value_to_text(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::Null => None,
        JsonValue::String(s) => clean_text(s),
        JsonValue::Number(n) => Some(number_to_text(n)),
        other => Some(other.to_string()),
    }
}

/// Les flottants entiers (`12.0`) s'écrivent comme l'entier (`12`)
fn number_to_text(n: &serde_json::Number) -> String {
    match n.as_f64() {
        // Au-delà de 2^53 un flottant ne représente plus un entier exact
        Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < MAX_EXACT_INTEGER => {
            (f as i64).to_string()
        }
        _ => n.to_string(),
    }
}

const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

fn value_to_count(value: &JsonValue) -> Option<i64> {
    match value {
        JsonValue::Number(n) => n.as_i64().or_else(|| parse_count(&n.to_string())),
        JsonValue::String(s) => parse_count(s),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn write_temp(name: &str, content: &serde_json::Value) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(name);
        std::fs::write(&path, content.to_string()).unwrap();
        path
    }

    fn square(x: f64, y: f64) -> serde_json::Value {
        json!({
            "type": "Polygon",
            "coordinates": [[[x, y], [x + 10.0, y], [x + 10.0, y + 10.0], [x, y + 10.0], [x, y]]]
        })
    }

    fn parcel_fields() -> ParcelFields {
        ParcelFields {
            id: "OBJECTID".to_string(),
            zoning_code: "ZONING".to_string(),
        }
    }

    fn building_fields() -> BuildingFields {
        BuildingFields {
            id: "FACILITYID".to_string(),
            use_type: "USE".to_string(),
            unit_count: Some("UNITS".to_string()),
            ownership: None,
        }
    }

    #[test]
    fn test_load_parcels() {
        let path = write_temp(
            "coopzone_parcels_load.geojson",
            &json!({
                "type": "FeatureCollection",
                "features": [
                    {"type": "Feature", "properties": {"OBJECTID": 12, "ZONING": "R 8"}, "geometry": square(0.0, 0.0)},
                    {"type": "Feature", "properties": {"OBJECTID": 13, "ZONING": null}, "geometry": null}
                ]
            }),
        );

        let parcels = load_parcels(&path, &parcel_fields()).unwrap();
        assert_eq!(parcels.len(), 2);
        assert_eq!(parcels[0].parcel_id.as_deref(), Some("12"));
        assert_eq!(parcels[0].zoning_code.as_deref(), Some("R 8"));
        assert!(parcels[0].geometry.is_some());
        assert!(parcels[1].zoning_code.is_none());
        assert!(parcels[1].geometry.is_none());

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_integral_float_ids_read_as_integers() {
        assert_eq!(value_to_text(&json!(12.0)).as_deref(), Some("12"));
        assert_eq!(value_to_text(&json!(12)).as_deref(), Some("12"));
        assert_eq!(value_to_text(&json!(-3.0)).as_deref(), Some("-3"));
        assert_eq!(value_to_text(&json!(12.5)).as_deref(), Some("12.5"));
        assert_eq!(value_to_text(&json!(" B1 ")).as_deref(), Some("B1"));

        let path = write_temp(
            "coopzone_buildings_float_id.geojson",
            &json!({
                "type": "FeatureCollection",
                "features": [
                    {"type": "Feature", "properties": {"FACILITYID": 7.0, "USE": "Household"}, "geometry": square(0.0, 0.0)}
                ]
            }),
        );
        let usage: HashMap<String, UseRow> = [(
            "7".to_string(),
            UseRow {
                use_type: Some("Dormitory".to_string()),
                ..Default::default()
            },
        )]
        .into_iter()
        .collect();

        let buildings = load_buildings(&path, &building_fields(), Some(&usage)).unwrap();
        assert_eq!(buildings[0].facility_id.as_deref(), Some("7"));
        assert_eq!(buildings[0].use_type.as_deref(), Some("Dormitory"));

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_load_parcels_missing_column_is_schema_error() {
        let path = write_temp(
            "coopzone_parcels_nozoning.geojson",
            &json!({
                "type": "FeatureCollection",
                "features": [
                    {"type": "Feature", "properties": {"OBJECTID": 1}, "geometry": square(0.0, 0.0)}
                ]
            }),
        );

        let err = load_parcels(&path, &parcel_fields()).unwrap_err();
        let schema = err.downcast_ref::<coopzone::CoopzoneError>().unwrap();
        assert!(schema.to_string().contains("zoning_code"));

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_empty_layer_is_accepted() {
        let path = write_temp(
            "coopzone_parcels_empty.geojson",
            &json!({"type": "FeatureCollection", "features": []}),
        );
        assert!(load_parcels(&path, &parcel_fields()).unwrap().is_empty());
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_load_buildings_with_usage() {
        let path = write_temp(
            "coopzone_buildings_load.geojson",
            &json!({
                "type": "FeatureCollection",
                "features": [
                    {"type": "Feature", "properties": {"FACILITYID": "B1", "UNITS": "2"}, "geometry": square(0.0, 0.0)},
                    {"type": "Feature", "properties": {"FACILITYID": "B2"}, "geometry": square(20.0, 0.0)}
                ]
            }),
        );

        // Sans table d'usage, la colonne USE manque
        assert!(load_buildings(&path, &building_fields(), None).is_err());

        let usage: HashMap<String, UseRow> = [(
            "B1".to_string(),
            UseRow {
                use_type: Some("Household".to_string()),
                unit_count: None,
                ownership: Some("Private".to_string()),
            },
        )]
        .into_iter()
        .collect();

        let buildings = load_buildings(&path, &building_fields(), Some(&usage)).unwrap();
        assert_eq!(buildings[0].use_type.as_deref(), Some("Household"));
        // Pas d'unités dans la table: la valeur de la couche est conservée
        assert_eq!(buildings[0].unit_count, Some(2));
        assert_eq!(buildings[0].ownership.as_deref(), Some("Private"));
        assert!(buildings[1].use_type.is_none());

        std::fs::remove_file(path).ok();
    }
}
