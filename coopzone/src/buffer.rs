//! Zones tampon autour des logements

use geo::{Buffer, MultiPolygon};
use rayon::prelude::*;
use tracing::debug;

use crate::types::{Building, FacilityId};

/// Rayon réglementaire, en pieds
pub const DEFAULT_BUFFER_RADIUS: f64 = 200.0;

/// Tampon d'un logement (éphémère, jamais persisté)
#[derive(Debug, Clone)]
pub struct DwellingBuffer {
    pub facility_id: FacilityId,
    /// Indice du logement dans la liste des bâtiments
    pub building_idx: usize,
    pub geometry: MultiPolygon<f64>,
}

/// Tampon d'une emprise au rayon donné (jonctions et extrémités arrondies)
///
/// Le rayon est exprimé dans l'unité linéaire du CRS projeté.
pub fn buffer_footprint(footprint: &MultiPolygon<f64>, radius: f64) -> MultiPolygon<f64> {
    footprint.buffer(radius)
}

/// Calcule un tampon par logement, indépendamment les uns des autres
pub fn generate_buffers(
    buildings: &[Building],
    dwellings: &[usize],
    radius: f64,
) -> Vec<DwellingBuffer> {
    let buffers: Vec<DwellingBuffer> = dwellings
        .par_iter()
        .map(|&idx| {
            let building = &buildings[idx];
            DwellingBuffer {
                facility_id: building.id.clone(),
                building_idx: idx,
                geometry: buffer_footprint(&building.geometry, radius),
            }
        })
        .collect();

    debug!(count = buffers.len(), radius = radius, "Dwelling buffers generated");
    buffers
}
