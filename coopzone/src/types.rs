//! Types de données pour le crate coopzone

use std::cmp::Ordering;
use std::collections::BTreeSet;

use geo::{Area, MultiPolygon};

/// Identifiant stable d'une parcelle (entier ou texte dans la source)
pub type ParcelId = String;

/// Identifiant stable d'un bâtiment (FACILITYID)
pub type FacilityId = String;

/// Usage déclaré d'un bâtiment
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum UseType {
    Household,
    Dormitory,
    Other(String),
}

impl UseType {
    /// Interprète la valeur brute de la source ("Household", "Dormitory", ...)
    pub fn from_raw(raw: &str) -> Self {
        match raw.trim() {
            "Household" => UseType::Household,
            "Dormitory" => UseType::Dormitory,
            other => UseType::Other(other.to_string()),
        }
    }

    /// Un bâtiment est un logement s'il est à usage d'habitation ou de dortoir
    pub fn is_dwelling(&self) -> bool {
        matches!(self, UseType::Household | UseType::Dormitory)
    }

    pub fn label(&self) -> &str {
        match self {
            UseType::Household => "Household",
            UseType::Dormitory => "Dormitory",
            UseType::Other(label) => label,
        }
    }
}

/// Une parcelle validée (géométrie normalisée en MultiPolygon, unités du CRS projeté)
#[derive(Debug, Clone)]
pub struct Parcel {
    pub id: ParcelId,
    pub geometry: MultiPolygon<f64>,
    pub zoning_code: String,
}

/// Un bâtiment validé
#[derive(Debug, Clone)]
pub struct Building {
    pub id: FacilityId,
    pub geometry: MultiPolygon<f64>,
    /// `None` si la source ne renseigne pas l'usage
    pub use_type: Option<UseType>,
    /// `None` si non renseigné (compté comme 1 logement)
    pub unit_count: Option<u32>,
    /// Informatif uniquement, n'entre pas dans les règles
    pub ownership: Option<String>,
}

impl Building {
    /// Nombre de logements, 1 par défaut
    pub fn units(&self) -> u32 {
        self.unit_count.unwrap_or(1)
    }

    pub fn is_dwelling(&self) -> bool {
        self.use_type.as_ref().is_some_and(UseType::is_dwelling)
    }

    pub fn is_dormitory(&self) -> bool {
        self.use_type == Some(UseType::Dormitory)
    }
}

/// Occupation d'une parcelle portant au moins un logement
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParcelOccupancy {
    /// Logements entièrement contenus dans la parcelle
    pub dwelling_ids: BTreeSet<FacilityId>,

    /// Plusieurs occupants indépendants (plusieurs logements, dortoir ou bâtiment multi-logements)
    pub is_multiple_occupancy: bool,
}

/// Résultat par parcelle résidentielle
///
/// `allowed_geometry ∪ prohibited_geometry` couvre `parcel_geometry` et les deux
/// parties ne se recouvrent pas (aux tolérances flottantes près).
#[derive(Debug, Clone, PartialEq)]
pub struct EligibilityResult {
    pub parcel_id: ParcelId,
    pub parcel_geometry: MultiPolygon<f64>,
    pub allowed_geometry: MultiPolygon<f64>,
    pub prohibited_geometry: MultiPolygon<f64>,
}

impl EligibilityResult {
    pub fn parcel_area(&self) -> f64 {
        self.parcel_geometry.unsigned_area()
    }

    pub fn allowed_area(&self) -> f64 {
        self.allowed_geometry.unsigned_area()
    }

    pub fn prohibited_area(&self) -> f64 {
        self.prohibited_geometry.unsigned_area()
    }

    /// Vrai si aucune surface n'est autorisée
    pub fn is_fully_prohibited(&self) -> bool {
        self.allowed_geometry.0.is_empty() || self.allowed_area() <= 0.0
    }
}

/// Géométrie vide (résultat neutre des unions et des différences)
pub fn empty_geometry() -> MultiPolygon<f64> {
    MultiPolygon::new(Vec::new())
}

/// Ordre des identifiants: numérique si les deux sont des entiers, lexicographique sinon
///
/// Les OBJECTID de la source sont des entiers sérialisés en texte; "10" doit venir après "9".
pub fn compare_ids(a: &str, b: &str) -> Ordering {
    match (a.parse::<i64>(), b.parse::<i64>()) {
        // "1" et "01": même valeur, ordre textuel pour rester total
        (Ok(x), Ok(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_use_type_from_raw() {
        assert_eq!(UseType::from_raw("Household"), UseType::Household);
        assert_eq!(UseType::from_raw(" Dormitory "), UseType::Dormitory);
        assert_eq!(
            UseType::from_raw("Garage"),
            UseType::Other("Garage".to_string())
        );
        // La source est sensible à la casse
        assert!(!UseType::from_raw("household").is_dwelling());
    }

    #[test]
    fn test_building_defaults() {
        let building = Building {
            id: "B1".to_string(),
            geometry: empty_geometry(),
            use_type: None,
            unit_count: None,
            ownership: None,
        };
        assert_eq!(building.units(), 1);
        assert!(!building.is_dwelling());
        assert!(!building.is_dormitory());
    }

    #[test]
    fn test_compare_ids() {
        let mut ids = vec!["10", "9", "b", "a", "100"];
        ids.sort_by(|a, b| compare_ids(a, b));
        assert_eq!(ids, vec!["9", "10", "100", "a", "b"]);
    }

    #[test]
    fn test_compare_ids_same_number_different_text() {
        assert_eq!(compare_ids("01", "1"), Ordering::Less);
        assert_eq!(compare_ids("1", "01"), Ordering::Greater);
        assert_eq!(compare_ids("7", "7"), Ordering::Equal);

        let mut forward = vec!["1", "01", "2"];
        let mut backward = vec!["2", "01", "1"];
        forward.sort_by(|a, b| compare_ids(a, b));
        backward.sort_by(|a, b| compare_ids(a, b));
        assert_eq!(forward, backward);
    }
}
