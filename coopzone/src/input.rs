//! Enregistrements bruts et validation des entrées
//!
//! Les collaborateurs amont (lecture GeoJSON/CSV, reprojection) livrent des
//! enregistrements dont les champs peuvent manquer. La validation sépare:
//! - les erreurs de schéma, fatales pour tout le run;
//! - les erreurs par enregistrement (géométrie invalide, doublon), collectées.

use std::collections::{BTreeSet, HashSet};

use geo::{BoundingRect, Geometry, MultiPolygon, Rect, Validation};
use tracing::{debug, warn};

use crate::error::{CoopzoneError, RecordKind};
use crate::types::{Building, Parcel, UseType};

/// Champs obligatoires d'une parcelle
pub const PARCEL_FIELDS: &[&str] = &["parcel_id", "zoning_code", "geometry"];

/// Champs obligatoires d'un bâtiment
pub const BUILDING_FIELDS: &[&str] = &["facility_id", "geometry", "use_type"];

/// Parcelle telle que livrée par le chargeur
#[derive(Debug, Clone, Default)]
pub struct ParcelRecord {
    pub parcel_id: Option<String>,
    pub zoning_code: Option<String>,
    pub geometry: Option<Geometry<f64>>,
}

/// Bâtiment tel que livré par le chargeur
#[derive(Debug, Clone, Default)]
pub struct BuildingRecord {
    pub facility_id: Option<String>,
    pub geometry: Option<Geometry<f64>>,
    pub use_type: Option<String>,
    pub unit_count: Option<i64>,
    pub ownership: Option<String>,
}

/// Résultat de validation d'un jeu d'enregistrements
#[derive(Debug)]
pub struct Validated<T> {
    pub items: Vec<T>,
    pub failures: Vec<CoopzoneError>,
}

/// Bâtiment rejeté dont l'emprise reste localisable
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedBuilding {
    pub facility_id: String,
    pub extent: Rect<f64>,
    /// Usage Household ou Dormitory: son tampon aurait restreint les voisins
    pub is_dwelling: bool,
}

/// Bâtiments validés, plus les bâtiments rejetés qui restent localisables
#[derive(Debug)]
pub struct ValidatedBuildings {
    pub buildings: Vec<Building>,
    pub failures: Vec<CoopzoneError>,
    pub rejected: Vec<RejectedBuilding>,
}

/// Vérifie qu'un jeu de données expose toutes les colonnes requises
pub fn require_fields(
    dataset: &str,
    available: &BTreeSet<String>,
    required: &[&str],
) -> Result<(), CoopzoneError> {
    match required.iter().find(|field| !available.contains(**field)) {
        Some(field) => Err(CoopzoneError::schema(dataset, *field)),
        None => Ok(()),
    }
}

/// Valide les parcelles
///
/// # Errors
///
/// `CoopzoneError::Schema` si une parcelle n'a pas d'identifiant.
pub fn validate_parcels(records: Vec<ParcelRecord>) -> Result<Validated<Parcel>, CoopzoneError> {
    let mut items = Vec::with_capacity(records.len());
    let mut failures = Vec::new();
    let mut seen: HashSet<String> = HashSet::with_capacity(records.len());

    for record in records {
        let id = non_empty(record.parcel_id)
            .ok_or_else(|| CoopzoneError::schema("parcels", "parcel_id"))?;

        if !seen.insert(id.clone()) {
            failures.push(CoopzoneError::DuplicateId {
                kind: RecordKind::Parcel,
                id,
            });
            continue;
        }

        match normalize_geometry(RecordKind::Parcel, &id, record.geometry) {
            Ok(geometry) => items.push(Parcel {
                id,
                geometry,
                // Code absent: traité comme un code sans correspondance
                zoning_code: record.zoning_code.unwrap_or_default(),
            }),
            Err(e) => {
                warn!(parcel_id = %id, error = %e, "Parcel rejected");
                failures.push(e);
            }
        }
    }

    debug!(valid = items.len(), rejected = failures.len(), "Parcels validated");
    Ok(Validated { items, failures })
}

/// Valide les bâtiments
///
/// # Errors
///
/// `CoopzoneError::Schema` si un bâtiment n'a pas d'identifiant.
pub fn validate_buildings(
    records: Vec<BuildingRecord>,
) -> Result<ValidatedBuildings, CoopzoneError> {
    let mut buildings = Vec::with_capacity(records.len());
    let mut failures = Vec::new();
    let mut rejected = Vec::new();
    let mut seen: HashSet<String> = HashSet::with_capacity(records.len());

    for record in records {
        let id = non_empty(record.facility_id)
            .ok_or_else(|| CoopzoneError::schema("buildings", "facility_id"))?;

        if !seen.insert(id.clone()) {
            failures.push(CoopzoneError::DuplicateId {
                kind: RecordKind::Building,
                id,
            });
            continue;
        }

        // Emprise conservée avant validation: un bâtiment rejeté doit encore
        // pouvoir signaler les parcelles qu'il touche.
        let extent = record.geometry.as_ref().and_then(|g| g.bounding_rect());
        let use_type = non_empty(record.use_type).map(|raw| UseType::from_raw(&raw));

        match normalize_geometry(RecordKind::Building, &id, record.geometry) {
            Ok(geometry) => buildings.push(Building {
                id,
                geometry,
                use_type,
                unit_count: record
                    .unit_count
                    .filter(|&n| n >= 0)
                    .map(|n| u32::try_from(n).unwrap_or(u32::MAX)),
                ownership: record.ownership,
            }),
            Err(e) => {
                warn!(facility_id = %id, error = %e, "Building rejected");
                if let Some(extent) = extent {
                    rejected.push(RejectedBuilding {
                        facility_id: id,
                        extent,
                        is_dwelling: use_type.as_ref().is_some_and(UseType::is_dwelling),
                    });
                }
                failures.push(e);
            }
        }
    }

    debug!(
        valid = buildings.len(),
        rejected = failures.len(),
        "Buildings validated"
    );
    Ok(ValidatedBuildings {
        buildings,
        failures,
        rejected,
    })
}

/// Normalise une géométrie surfacique en MultiPolygon valide
pub fn normalize_geometry(
    kind: RecordKind,
    id: &str,
    geometry: Option<Geometry<f64>>,
) -> Result<MultiPolygon<f64>, CoopzoneError> {
    let geometry = geometry
        .ok_or_else(|| CoopzoneError::invalid_geometry(kind, id, "missing geometry"))?;

    let multi = match geometry {
        Geometry::Polygon(p) => MultiPolygon::new(vec![p]),
        Geometry::MultiPolygon(mp) => mp,
        other => {
            return Err(CoopzoneError::invalid_geometry(
                kind,
                id,
                format!("non-polygonal geometry ({})", geometry_type_name(&other)),
            ))
        }
    };

    if multi.0.is_empty() || multi.0.iter().any(|p| p.exterior().0.is_empty()) {
        return Err(CoopzoneError::invalid_geometry(kind, id, "empty geometry"));
    }

    multi
        .check_validation()
        .map_err(|e| CoopzoneError::invalid_geometry(kind, id, e.to_string()))?;

    Ok(multi)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn geometry_type_name(geometry: &Geometry<f64>) -> &'static str {
    match geometry {
        Geometry::Point(_) => "Point",
        Geometry::Line(_) => "Line",
        Geometry::LineString(_) => "LineString",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        Geometry::Rect(_) => "Rect",
        Geometry::Triangle(_) => "Triangle",
    }
}
