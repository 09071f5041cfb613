//! Statistiques de synthèse, calculées sans refaire de géométrie

use serde::Serialize;

use crate::classify::{DwellingCensus, ParcelClassification};
use crate::occupancy::OccupancyTable;
use crate::types::EligibilityResult;

/// Nombre d'usages de bâtiment conservés dans la synthèse
const TOP_USE_TYPES: usize = 10;

/// Synthèse de la classification (parcelles et bâtiments)
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClassificationSummary {
    pub parcels_total: usize,
    pub residential: usize,
    pub non_residential: usize,
    /// Parcelles dont le code de zonage est absent de la table
    pub unmatched_zoning: usize,
    pub unmatched_codes: Vec<(String, usize)>,
    pub buildings_total: usize,
    pub households: usize,
    pub dormitories: usize,
    pub top_use_types: Vec<(String, usize)>,
}

impl ClassificationSummary {
    pub fn from_stages(
        classification: &ParcelClassification,
        census: &DwellingCensus,
        buildings_total: usize,
    ) -> Self {
        Self {
            parcels_total: classification.total(),
            residential: classification.residential.len(),
            non_residential: classification.non_residential.len(),
            unmatched_zoning: classification.unmatched,
            unmatched_codes: classification
                .unmatched_codes
                .iter()
                .map(|(code, count)| (code.clone(), *count))
                .collect(),
            buildings_total,
            households: census.households,
            dormitories: census.dormitories,
            top_use_types: census.top_use_types(TOP_USE_TYPES),
        }
    }

    pub fn dwellings(&self) -> usize {
        self.households + self.dormitories
    }
}

/// Synthèse de l'occupation des parcelles résidentielles
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OccupancySummary {
    pub parcels_with_dwellings: usize,
    pub parcels_without_dwellings: usize,
    pub multiple_occupancy: usize,
}

impl OccupancySummary {
    pub fn from_table(table: &OccupancyTable) -> Self {
        Self {
            parcels_with_dwellings: table.parcels_with_dwellings(),
            parcels_without_dwellings: table.parcels_without_dwellings(),
            multiple_occupancy: table.multiple_occupancy(),
        }
    }
}

/// Synthèse des résultats d'éligibilité
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EligibilitySummary {
    pub evaluated: usize,
    pub with_allowed_area: usize,
    pub zero_allowed_area: usize,
    /// Part des parcelles évaluées où l'activité est possible (0..1)
    pub permitted_share: f64,
    pub parcel_area: f64,
    pub allowed_area: f64,
    pub prohibited_area: f64,
}

impl EligibilitySummary {
    pub fn from_results(results: &[EligibilityResult]) -> Self {
        let mut summary = Self {
            evaluated: results.len(),
            ..Default::default()
        };

        for result in results {
            if result.is_fully_prohibited() {
                summary.zero_allowed_area += 1;
            } else {
                summary.with_allowed_area += 1;
            }
            summary.parcel_area += result.parcel_area();
            summary.allowed_area += result.allowed_area();
            summary.prohibited_area += result.prohibited_area();
        }

        if summary.evaluated > 0 {
            summary.permitted_share = summary.with_allowed_area as f64 / summary.evaluated as f64;
        }

        summary
    }
}

/// Synthèse complète d'un run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    pub classification: ClassificationSummary,
    pub occupancy: OccupancySummary,
    /// Absent pour un recensement sans calcul géométrique
    pub eligibility: Option<EligibilitySummary>,
    pub failures: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::empty_geometry;
    use geo::{coord, MultiPolygon, Rect};

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> MultiPolygon<f64> {
        MultiPolygon::new(vec![
            Rect::new(coord! { x: x0, y: y0 }, coord! { x: x1, y: y1 }).to_polygon()
        ])
    }

    #[test]
    fn test_eligibility_summary() {
        let results = vec![
            EligibilityResult {
                parcel_id: "1".into(),
                parcel_geometry: rect(0.0, 0.0, 10.0, 10.0),
                allowed_geometry: rect(0.0, 0.0, 10.0, 4.0),
                prohibited_geometry: rect(0.0, 4.0, 10.0, 10.0),
            },
            EligibilityResult {
                parcel_id: "2".into(),
                parcel_geometry: rect(0.0, 0.0, 10.0, 10.0),
                allowed_geometry: empty_geometry(),
                prohibited_geometry: rect(0.0, 0.0, 10.0, 10.0),
            },
        ];

        let summary = EligibilitySummary::from_results(&results);
        assert_eq!(summary.evaluated, 2);
        assert_eq!(summary.with_allowed_area, 1);
        assert_eq!(summary.zero_allowed_area, 1);
        assert!((summary.permitted_share - 0.5).abs() < 1e-12);
        assert!((summary.parcel_area - 200.0).abs() < 1e-9);
        assert!((summary.allowed_area - 40.0).abs() < 1e-9);
        assert!((summary.prohibited_area - 160.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_results() {
        let summary = EligibilitySummary::from_results(&[]);
        assert_eq!(summary.evaluated, 0);
        assert_eq!(summary.permitted_share, 0.0);
    }
}
