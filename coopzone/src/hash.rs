//! Empreinte stable des résultats (contrôle d'idempotence entre deux runs)
//!
//! Chaque anneau est normalisé pour commencer à son vertex lexicographiquement
//! le plus petit, et les coordonnées sont arrondies au millionième.

use blake3::Hasher;
use geo::{Coord, LineString, MultiPolygon};

use crate::types::EligibilityResult;

/// Hash d'un résultat de parcelle
pub fn result_hash(result: &EligibilityResult) -> [u8; 32] {
    let mut hasher = Hasher::new();
    hash_result(&mut hasher, result);
    *hasher.finalize().as_bytes()
}

/// Empreinte d'un ensemble de résultats, dans l'ordre fourni
///
/// Les résultats d'un run sont triés par identifiant de parcelle: deux runs sur
/// le même instantané produisent la même empreinte.
pub fn fingerprint(results: &[EligibilityResult]) -> [u8; 32] {
    let mut hasher = Hasher::new();
    for result in results {
        hash_result(&mut hasher, result);
    }
    *hasher.finalize().as_bytes()
}

/// Convertit une empreinte en hexadécimal
pub fn to_hex(hash: &[u8; 32]) -> String {
    hex::encode(hash)
}

fn hash_result(hasher: &mut Hasher, result: &EligibilityResult) {
    hasher.update(b"PARCEL");
    hasher.update(result.parcel_id.as_bytes());
    hasher.update(b"GEOM");
    hash_multipolygon(hasher, &result.parcel_geometry);
    hasher.update(b"ALLOWED");
    hash_multipolygon(hasher, &result.allowed_geometry);
    hasher.update(b"PROHIBITED");
    hash_multipolygon(hasher, &result.prohibited_geometry);
}

fn hash_multipolygon(hasher: &mut Hasher, mp: &MultiPolygon<f64>) {
    for poly in &mp.0 {
        hasher.update(b"POLY");
        hash_ring(hasher, poly.exterior());
        for interior in poly.interiors() {
            hasher.update(b"HOLE");
            hash_ring(hasher, interior);
        }
    }
}

/// Anneau parcouru depuis son plus petit sommet, sans le point de fermeture
fn hash_ring(hasher: &mut Hasher, ring: &LineString) {
    let coords = match ring.0.split_last() {
        Some((last, rest)) if !rest.is_empty() && rest.first() == Some(last) => rest,
        _ => ring.0.as_slice(),
    };

    let start = coords
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| a.x.total_cmp(&b.x).then_with(|| a.y.total_cmp(&b.y)))
        .map_or(0, |(idx, _)| idx);

    for coord in coords[start..].iter().chain(&coords[..start]) {
        hash_coord(hasher, *coord);
    }
}

fn hash_coord(hasher: &mut Hasher, coord: Coord) {
    for value in [coord.x, coord.y] {
        let rounded = (value * 1e6).round() as i64;
        hasher.update(&rounded.to_le_bytes());
    }
}
