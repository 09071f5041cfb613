//! Calcul des surfaces autorisées et interdites par parcelle
//!
//! Pour une parcelle P:
//! 1. sans logement sur P: tout est interdit;
//! 2. sinon, tampons qui touchent P, en retirant celui du logement de P si
//!    l'occupation est simple (propriétaire occupant unique);
//! 3. autorisé = P − ∪tampons;
//! 4. autorisé = autorisé − ∪emprises des bâtiments touchant P;
//! 5. interdit = P − autorisé.

use geo::{unary_union, BooleanOps, MultiPolygon};

use crate::buffer::DwellingBuffer;
use crate::occupancy::OccupancyTable;
use crate::spatial::Relation;
use crate::types::{empty_geometry, Building, EligibilityResult, Parcel, ParcelOccupancy};

/// Union d'un ensemble de géométries (vide si l'ensemble est vide)
pub fn union_all(geometries: &[&MultiPolygon<f64>]) -> MultiPolygon<f64> {
    match geometries {
        [] => empty_geometry(),
        [single] => (*single).clone(),
        many => unary_union(many.iter().copied()),
    }
}

/// Différence `minuend − subtrahend`; retirer du vide ne change rien
pub fn subtract(minuend: &MultiPolygon<f64>, subtrahend: &MultiPolygon<f64>) -> MultiPolygon<f64> {
    if minuend.0.is_empty() || subtrahend.0.is_empty() {
        return minuend.clone();
    }
    minuend.difference(subtrahend)
}

/// Tampons à retirer d'une parcelle occupée
///
/// En occupation simple, le tampon du logement de la parcelle est ignoré. En
/// occupation multiple, tous les tampons s'appliquent, y compris ceux des
/// logements de la parcelle elle-même.
pub fn select_buffers<'a>(
    buffers: &[&'a DwellingBuffer],
    occupancy: &ParcelOccupancy,
) -> Vec<&'a MultiPolygon<f64>> {
    buffers
        .iter()
        .filter(|buffer| {
            occupancy.is_multiple_occupancy
                || !occupancy.dwelling_ids.contains(&buffer.facility_id)
        })
        .map(|&buffer| &buffer.geometry)
        .collect()
}

/// Calcul pur pour une parcelle
///
/// `buffers`: tampons qui intersectent la parcelle; `footprints`: emprises de
/// tous les bâtiments qui l'intersectent; `occupancy`: `None` si aucun
/// logement n'est entièrement contenu dans la parcelle.
pub fn evaluate_parcel(
    parcel: &Parcel,
    buffers: &[&DwellingBuffer],
    footprints: &[&MultiPolygon<f64>],
    occupancy: Option<&ParcelOccupancy>,
) -> EligibilityResult {
    let Some(occupancy) = occupancy else {
        return EligibilityResult {
            parcel_id: parcel.id.clone(),
            parcel_geometry: parcel.geometry.clone(),
            allowed_geometry: empty_geometry(),
            prohibited_geometry: parcel.geometry.clone(),
        };
    };

    let selected = select_buffers(buffers, occupancy);
    let allowed = subtract(&parcel.geometry, &union_all(&selected));
    let allowed = subtract(&allowed, &union_all(footprints));

    let prohibited = if selected.is_empty() && footprints.is_empty() {
        empty_geometry()
    } else {
        subtract(&parcel.geometry, &allowed)
    };

    EligibilityResult {
        parcel_id: parcel.id.clone(),
        parcel_geometry: parcel.geometry.clone(),
        allowed_geometry: allowed,
        prohibited_geometry: prohibited,
    }
}

/// Tables partagées (immuables) nécessaires au calcul de chaque parcelle
pub struct EligibilityCalculator<'a> {
    pub parcels: &'a [Parcel],
    pub buildings: &'a [Building],
    pub buffers: &'a [DwellingBuffer],
    pub occupancy: &'a OccupancyTable,
    /// Parcelle -> indices dans `buffers`
    pub buffers_touching: &'a Relation,
    /// Parcelle -> indices dans `buildings`
    pub buildings_touching: &'a Relation,
}

impl EligibilityCalculator<'_> {
    /// Calcule le résultat de la parcelle `parcel_idx`
    pub fn calculate(&self, parcel_idx: usize) -> EligibilityResult {
        let parcel = &self.parcels[parcel_idx];
        let occupancy = self.occupancy.get(parcel_idx);

        // Sans logement, inutile de rassembler tampons et emprises
        if occupancy.is_none() {
            return evaluate_parcel(parcel, &[], &[], None);
        }

        let buffers: Vec<&DwellingBuffer> = self
            .buffers_touching
            .matches(parcel_idx)
            .iter()
            .map(|&b| &self.buffers[b])
            .collect();
        let footprints: Vec<&MultiPolygon<f64>> = self
            .buildings_touching
            .matches(parcel_idx)
            .iter()
            .map(|&b| &self.buildings[b].geometry)
            .collect();

        evaluate_parcel(parcel, &buffers, &footprints, occupancy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{coord, Area, Contains, Point, Rect};

    const EPS: f64 = 1e-6;

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> MultiPolygon<f64> {
        MultiPolygon::new(vec![
            Rect::new(coord! { x: x0, y: y0 }, coord! { x: x1, y: y1 }).to_polygon()
        ])
    }

    fn parcel(id: &str, geometry: MultiPolygon<f64>) -> Parcel {
        Parcel {
            id: id.to_string(),
            geometry,
            zoning_code: "R8".to_string(),
        }
    }

    fn buffer(id: &str, geometry: MultiPolygon<f64>) -> DwellingBuffer {
        DwellingBuffer {
            facility_id: id.to_string(),
            building_idx: 0,
            geometry,
        }
    }

    fn occupancy(ids: &[&str], multiple: bool) -> ParcelOccupancy {
        ParcelOccupancy {
            dwelling_ids: ids.iter().map(|s| s.to_string()).collect(),
            is_multiple_occupancy: multiple,
        }
    }

    fn assert_partition(result: &EligibilityResult) {
        let total = result.parcel_area();
        let sum = result.allowed_area() + result.prohibited_area();
        assert!(
            (sum - total).abs() <= EPS * total.max(1.0),
            "allowed + prohibited = {sum}, parcel = {total}"
        );
        let overlap = result
            .allowed_geometry
            .intersection(&result.prohibited_geometry)
            .unsigned_area();
        assert!(overlap <= EPS * total.max(1.0), "overlap area {overlap}");
    }

    #[test]
    fn test_union_all_and_subtract_edge_cases() {
        assert!(union_all(&[]).0.is_empty());

        let a = rect(0.0, 0.0, 10.0, 10.0);
        let b = rect(5.0, 0.0, 15.0, 10.0);
        assert_eq!(union_all(&[&a]), a);
        assert!((union_all(&[&a, &b]).unsigned_area() - 150.0).abs() < EPS);

        // Retirer le vide: no-op
        assert_eq!(subtract(&a, &empty_geometry()), a);
        // Retirer une géométrie extérieure: aucun effet au-delà du recouvrement
        let outside = rect(100.0, 100.0, 110.0, 110.0);
        assert!((subtract(&a, &outside).unsigned_area() - 100.0).abs() < EPS);
    }

    #[test]
    fn test_no_dwelling_everything_prohibited() {
        let p = parcel("1", rect(0.0, 0.0, 100.0, 100.0));
        let neighbour = buffer("N", rect(-50.0, -50.0, 50.0, 50.0));

        let result = evaluate_parcel(&p, &[&neighbour], &[], None);
        assert!(result.allowed_geometry.0.is_empty());
        assert_eq!(result.prohibited_geometry, p.geometry);
        assert!(result.is_fully_prohibited());
    }

    #[test]
    fn test_centered_house_only_footprint_removed() {
        // 10 000 ft² avec une maison de 1 000 ft² au centre
        let p = parcel("1", rect(0.0, 0.0, 100.0, 100.0));
        let house = rect(30.0, 37.5, 70.0, 62.5);
        let own = buffer("H", rect(-170.0, -162.5, 270.0, 262.5));

        let occupancy = occupancy(&["H"], false);
        let result = evaluate_parcel(&p, &[&own], &[&house], Some(&occupancy));

        assert!((result.allowed_area() - 9_000.0).abs() < EPS);
        assert!((result.prohibited_area() - 1_000.0).abs() < EPS);
        assert!(!result.allowed_geometry.contains(&Point::new(50.0, 50.0)));
        assert_partition(&result);
    }

    #[test]
    fn test_single_occupancy_still_removes_neighbour_buffer() {
        let p = parcel("1", rect(0.0, 0.0, 100.0, 100.0));
        let own = buffer("H", rect(-200.0, -200.0, 300.0, 300.0));
        let neighbour = buffer("N", rect(60.0, -100.0, 400.0, 200.0));

        let occupancy = occupancy(&["H"], false);
        let result = evaluate_parcel(&p, &[&own, &neighbour], &[], Some(&occupancy));

        assert!((result.allowed_area() - 6_000.0).abs() < EPS);
        assert!((result.prohibited_area() - 4_000.0).abs() < EPS);
        assert_partition(&result);
    }

    #[test]
    fn test_multiple_occupancy_removes_own_buffers() {
        let p = parcel("1", rect(0.0, 0.0, 100.0, 100.0));
        let a = buffer("A", rect(-200.0, -200.0, 300.0, 300.0));
        let b = buffer("B", rect(-200.0, -200.0, 300.0, 300.0));

        let occupancy = occupancy(&["A", "B"], true);
        let result = evaluate_parcel(&p, &[&a, &b], &[], Some(&occupancy));

        assert!(result.is_fully_prohibited());
        assert!((result.prohibited_area() - 10_000.0).abs() < EPS);
        assert_partition(&result);
    }

    #[test]
    fn test_nothing_to_subtract_keeps_whole_parcel() {
        let p = parcel("1", rect(0.0, 0.0, 100.0, 100.0));
        let own = buffer("H", rect(-200.0, -200.0, 300.0, 300.0));

        let result = evaluate_parcel(&p, &[&own], &[], Some(&occupancy(&["H"], false)));
        assert_eq!(result.allowed_geometry, p.geometry);
        assert!(result.prohibited_geometry.0.is_empty());
        assert_partition(&result);
    }

    #[test]
    fn test_select_buffers() {
        let a = buffer("A", rect(0.0, 0.0, 1.0, 1.0));
        let n = buffer("N", rect(0.0, 0.0, 1.0, 1.0));

        assert_eq!(select_buffers(&[&a, &n], &occupancy(&["A"], false)).len(), 1);
        assert_eq!(select_buffers(&[&a, &n], &occupancy(&["A"], true)).len(), 2);
    }
}
