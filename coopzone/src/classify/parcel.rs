//! Classification résidentielle des parcelles à partir du code de zonage

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, info, warn};

use crate::types::Parcel;

/// Table code de zonage normalisé -> description
#[derive(Debug, Clone, Default)]
pub struct ZoningLookup {
    descriptions: HashMap<String, String>,
}

impl ZoningLookup {
    /// Construit la table depuis des couples (code, description)
    ///
    /// Les codes sont normalisés (espaces retirés). En cas de doublon après
    /// normalisation, la première description est conservée.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut descriptions: HashMap<String, String> = HashMap::new();

        for (code, description) in pairs {
            let key = normalize_zoning_code(code.as_ref());
            let description = description.into();

            match descriptions.get(&key) {
                Some(existing) if *existing != description => {
                    warn!(
                        code = %key,
                        kept = %existing,
                        ignored = %description,
                        "Conflicting zoning descriptions"
                    );
                }
                Some(_) => {}
                None => {
                    descriptions.insert(key, description);
                }
            }
        }

        Self { descriptions }
    }

    /// Description d'un code brut (normalisé avant recherche)
    pub fn description(&self, code: &str) -> Option<&str> {
        self.descriptions
            .get(&normalize_zoning_code(code))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.descriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptions.is_empty()
    }
}

/// Retire tous les blancs d'un code ("R 8" et "R8" désignent la même zone)
pub fn normalize_zoning_code(code: &str) -> String {
    code.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Issue de la classification d'une parcelle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoningClass {
    Residential,
    NonResidential,
    /// Code absent de la table: non résidentiel par défaut, mais compté
    Unmatched,
}

impl ZoningClass {
    pub fn is_residential(self) -> bool {
        self == ZoningClass::Residential
    }
}

/// Classe un code de zonage
pub fn classify_zoning(lookup: &ZoningLookup, code: &str) -> ZoningClass {
    match lookup.description(code) {
        Some(description) if description.to_lowercase().contains("residential") => {
            ZoningClass::Residential
        }
        Some(_) => ZoningClass::NonResidential,
        None => ZoningClass::Unmatched,
    }
}

/// Parcelles réparties entre résidentielles et non résidentielles
#[derive(Debug, Default)]
pub struct ParcelClassification {
    pub residential: Vec<Parcel>,
    /// Inclut les parcelles dont le code est inconnu
    pub non_residential: Vec<Parcel>,
    /// Nombre de parcelles sans correspondance dans la table
    pub unmatched: usize,
    /// Codes normalisés sans correspondance -> nombre de parcelles
    pub unmatched_codes: BTreeMap<String, usize>,
}

impl ParcelClassification {
    pub fn total(&self) -> usize {
        self.residential.len() + self.non_residential.len()
    }
}

/// Répartit les parcelles selon leur zonage
pub fn classify_parcels(parcels: Vec<Parcel>, lookup: &ZoningLookup) -> ParcelClassification {
    let mut classification = ParcelClassification::default();

    for parcel in parcels {
        match classify_zoning(lookup, &parcel.zoning_code) {
            ZoningClass::Residential => classification.residential.push(parcel),
            ZoningClass::NonResidential => classification.non_residential.push(parcel),
            ZoningClass::Unmatched => {
                debug!(parcel_id = %parcel.id, zoning = %parcel.zoning_code, "Zoning code not found");
                classification.unmatched += 1;
                *classification
                    .unmatched_codes
                    .entry(normalize_zoning_code(&parcel.zoning_code))
                    .or_insert(0) += 1;
                classification.non_residential.push(parcel);
            }
        }
    }

    info!(
        residential = classification.residential.len(),
        non_residential = classification.non_residential.len(),
        unmatched = classification.unmatched,
        "Parcels classified"
    );

    classification
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::empty_geometry;

    fn lookup() -> ZoningLookup {
        ZoningLookup::from_pairs(vec![
            ("R8", "Single-family residential"),
            ("RB", "Townhouse Residential zone"),
            ("CD", "Commercial downtown"),
            ("R 8", "Something else"),
        ])
    }

    fn parcel(id: &str, zoning: &str) -> Parcel {
        Parcel {
            id: id.to_string(),
            geometry: empty_geometry(),
            zoning_code: zoning.to_string(),
        }
    }

    #[test]
    fn test_normalize_zoning_code() {
        assert_eq!(normalize_zoning_code("R 8"), "R8");
        assert_eq!(normalize_zoning_code(" R\t2-5 "), "R2-5");
        assert_eq!(normalize_zoning_code(""), "");
    }

    #[test]
    fn test_lookup_keeps_first_description() {
        let lookup = lookup();
        assert_eq!(lookup.len(), 3);
        assert_eq!(lookup.description("R  8"), Some("Single-family residential"));
    }

    #[test]
    fn test_classify_zoning() {
        let lookup = lookup();
        assert_eq!(classify_zoning(&lookup, "R 8"), ZoningClass::Residential);
        assert_eq!(classify_zoning(&lookup, "RB"), ZoningClass::Residential);
        assert_eq!(classify_zoning(&lookup, "CD"), ZoningClass::NonResidential);
        assert_eq!(classify_zoning(&lookup, "XX"), ZoningClass::Unmatched);
        // Correspondance exacte sur le code normalisé
        assert_eq!(classify_zoning(&lookup, "r8"), ZoningClass::Unmatched);
    }

    #[test]
    fn test_classify_parcels() {
        let parcels = vec![
            parcel("1", "R 8"),
            parcel("2", "CD"),
            parcel("3", "UNKNOWN"),
            parcel("4", "UNK NOWN"),
            parcel("5", "RB"),
        ];

        let classification = classify_parcels(parcels, &lookup());
        assert_eq!(classification.total(), 5);
        assert_eq!(classification.residential.len(), 2);
        assert_eq!(classification.non_residential.len(), 3);
        assert_eq!(classification.unmatched, 2);
        assert_eq!(classification.unmatched_codes.get("UNKNOWN"), Some(&2));
    }
}
