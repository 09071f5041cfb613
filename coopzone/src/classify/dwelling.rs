//! Repérage des logements parmi les bâtiments

use std::collections::BTreeMap;

use tracing::info;

use crate::types::{Building, UseType};

/// Libellé utilisé pour les bâtiments sans usage renseigné
pub const UNKNOWN_USE: &str = "(unknown)";

/// Recensement des logements
#[derive(Debug, Clone, Default)]
pub struct DwellingCensus {
    /// Indices (dans la liste des bâtiments) des logements
    pub dwellings: Vec<usize>,
    pub households: usize,
    pub dormitories: usize,
    /// Nombre de bâtiments par usage, y compris les non-logements
    pub use_types: BTreeMap<String, usize>,
}

impl DwellingCensus {
    /// Usages les plus fréquents, par nombre décroissant puis libellé
    pub fn top_use_types(&self, limit: usize) -> Vec<(String, usize)> {
        let mut counts: Vec<(String, usize)> = self
            .use_types
            .iter()
            .map(|(label, count)| (label.clone(), *count))
            .collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        counts.truncate(limit);
        counts
    }
}

/// Étiquette chaque bâtiment: logement si usage Household ou Dormitory
pub fn classify_buildings(buildings: &[Building]) -> DwellingCensus {
    let mut census = DwellingCensus::default();

    for (idx, building) in buildings.iter().enumerate() {
        let label = building
            .use_type
            .as_ref()
            .map_or(UNKNOWN_USE, UseType::label);
        *census.use_types.entry(label.to_string()).or_insert(0) += 1;

        match building.use_type {
            Some(UseType::Household) => census.households += 1,
            Some(UseType::Dormitory) => census.dormitories += 1,
            _ => continue,
        }
        census.dwellings.push(idx);
    }

    info!(
        buildings = buildings.len(),
        households = census.households,
        dormitories = census.dormitories,
        "Dwellings identified"
    );

    census
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::empty_geometry;

    fn building(id: &str, use_type: Option<&str>) -> Building {
        Building {
            id: id.to_string(),
            geometry: empty_geometry(),
            use_type: use_type.map(UseType::from_raw),
            unit_count: None,
            ownership: None,
        }
    }

    #[test]
    fn test_classify_buildings() {
        let buildings = vec![
            building("A", Some("Household")),
            building("B", Some("Garage")),
            building("C", Some("Dormitory")),
            building("D", None),
            building("E", Some("Household")),
        ];

        let census = classify_buildings(&buildings);
        assert_eq!(census.dwellings, vec![0, 2, 4]);
        assert_eq!(census.households, 2);
        assert_eq!(census.dormitories, 1);
        assert_eq!(census.use_types.get(UNKNOWN_USE), Some(&1));
    }

    #[test]
    fn test_top_use_types() {
        let buildings = vec![
            building("A", Some("Household")),
            building("B", Some("Garage")),
            building("C", Some("Household")),
            building("D", Some("Church")),
        ];

        let top = classify_buildings(&buildings).top_use_types(2);
        assert_eq!(
            top,
            vec![("Household".to_string(), 2), ("Church".to_string(), 1)]
        );
    }
}
