//! Orchestration d'un run complet
//!
//! validation -> classification -> index spatial -> occupation -> tampons ->
//! calcul par parcelle (en parallèle) -> tri par identifiant -> synthèse.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use geo::{coord, MultiPolygon, Rect};
use rayon::prelude::*;
use tracing::{info, warn};

use crate::buffer::{generate_buffers, DEFAULT_BUFFER_RADIUS};
use crate::classify::{
    classify_buildings, classify_parcels, DwellingCensus, ParcelClassification, ZoningLookup,
};
use crate::eligibility::EligibilityCalculator;
use crate::error::{CoopzoneError, RecordKind};
use crate::input::{
    validate_buildings, validate_parcels, BuildingRecord, ParcelRecord, RejectedBuilding,
};
use crate::occupancy::{resolve_occupancy, OccupancyTable};
use crate::spatial::{Predicate, SpatialRelationIndex};
use crate::stats::{ClassificationSummary, EligibilitySummary, OccupancySummary, RunSummary};
use crate::types::{compare_ids, Building, EligibilityResult, Parcel};

/// Instantané des entrées d'un run (un seul CRS projeté, unité linéaire connue)
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub parcels: Vec<ParcelRecord>,
    pub buildings: Vec<BuildingRecord>,
    pub zoning: ZoningLookup,
}

/// Drapeau d'arrêt anticipé, consulté entre deux parcelles
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Paramètres d'un run
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Rayon des tampons, dans l'unité linéaire du CRS (200 pieds par défaut)
    pub buffer_radius: f64,
    /// Nombre de threads; `None` = pool rayon global
    pub jobs: Option<usize>,
    pub cancel: CancelFlag,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            buffer_radius: DEFAULT_BUFFER_RADIUS,
            jobs: None,
            cancel: CancelFlag::new(),
        }
    }
}

/// Sortie d'un run (succès partiel possible)
#[derive(Debug)]
pub struct RunOutput {
    /// Une entrée par parcelle résidentielle calculée, triée par identifiant
    pub results: Vec<EligibilityResult>,
    /// Erreurs par enregistrement (validation puis calcul)
    pub failures: Vec<CoopzoneError>,
    /// Parcelles non résidentielles (couche de carte)
    pub non_residential: Vec<Parcel>,
    pub summary: RunSummary,
    /// Vrai si le run a été interrompu avant la dernière parcelle
    pub cancelled: bool,
}

/// Recensement sans calcul géométrique des surfaces
#[derive(Debug)]
pub struct Survey {
    pub summary: RunSummary,
    pub failures: Vec<CoopzoneError>,
}

/// Étapes communes au run et au recensement
struct Prepared {
    classification: ParcelClassification,
    buildings: Vec<Building>,
    census: DwellingCensus,
    failures: Vec<CoopzoneError>,
    rejected: Vec<RejectedBuilding>,
}

impl Prepared {
    fn new(snapshot: Snapshot) -> Result<Self, CoopzoneError> {
        let Snapshot {
            parcels,
            buildings,
            zoning,
        } = snapshot;

        info!(
            parcels = parcels.len(),
            buildings = buildings.len(),
            zoning_codes = zoning.len(),
            "Starting run"
        );

        let parcels = validate_parcels(parcels)?;
        let buildings = validate_buildings(buildings)?;

        let mut failures = parcels.failures;
        failures.extend(buildings.failures);

        let classification = classify_parcels(parcels.items, &zoning);
        let census = classify_buildings(&buildings.buildings);

        Ok(Self {
            classification,
            buildings: buildings.buildings,
            census,
            failures,
            rejected: buildings.rejected,
        })
    }

    fn dwelling_geometries(&self) -> Vec<&MultiPolygon<f64>> {
        self.census
            .dwellings
            .iter()
            .map(|&idx| &self.buildings[idx].geometry)
            .collect()
    }

    fn occupancy(&self, index: &SpatialRelationIndex<'_>) -> OccupancyTable {
        let within = index.relate_all(&self.dwelling_geometries(), Predicate::Within);
        resolve_occupancy(
            self.classification.residential.len(),
            &self.buildings,
            &self.census.dwellings,
            &within,
        )
    }

    fn classification_summary(&self) -> ClassificationSummary {
        ClassificationSummary::from_stages(
            &self.classification,
            &self.census,
            self.buildings.len(),
        )
    }

    /// Parcelles qu'un bâtiment rejeté aurait pu restreindre -> identifiant du bâtiment
    ///
    /// L'emprise d'un logement rejeté est élargie du rayon des tampons: son
    /// tampon manquant ne doit rendre aucune parcelle voisine plus permissive.
    fn blocked_parcels(
        &self,
        index: &SpatialRelationIndex<'_>,
        buffer_radius: f64,
    ) -> BTreeMap<usize, String> {
        let mut blocked = BTreeMap::new();
        for rejected in &self.rejected {
            let reach = if rejected.is_dwelling {
                grow_rect(&rejected.extent, buffer_radius)
            } else {
                rejected.extent
            };
            for parcel_idx in index.candidates(&reach) {
                blocked
                    .entry(parcel_idx)
                    .or_insert_with(|| rejected.facility_id.clone());
            }
        }
        blocked
    }
}

/// Issue du calcul d'une parcelle
enum Outcome {
    Done(EligibilityResult),
    Failed(CoopzoneError),
    Skipped,
}

/// Calcule les surfaces autorisées/interdites de toutes les parcelles résidentielles
///
/// # Errors
///
/// `CoopzoneError::Schema` si un enregistrement n'a pas d'identifiant; aucune
/// parcelle n'est alors calculée. Les erreurs de géométrie ne sont pas
/// fatales: elles sont rendues dans `RunOutput::failures`.
pub fn run(snapshot: Snapshot, options: &RunOptions) -> Result<RunOutput, CoopzoneError> {
    let prepared = Prepared::new(snapshot)?;
    Ok(with_pool(options.jobs, || evaluate(prepared, options)))
}

/// Classification et occupation seulement (pas d'algèbre de polygones)
///
/// # Errors
///
/// `CoopzoneError::Schema` si un enregistrement n'a pas d'identifiant.
pub fn survey(snapshot: Snapshot, options: &RunOptions) -> Result<Survey, CoopzoneError> {
    let prepared = Prepared::new(snapshot)?;

    Ok(with_pool(options.jobs, || {
        let residential = &prepared.classification.residential;
        let index = SpatialRelationIndex::build(residential.iter().map(|p| &p.geometry));
        let occupancy = prepared.occupancy(&index);

        Survey {
            summary: RunSummary {
                classification: prepared.classification_summary(),
                occupancy: OccupancySummary::from_table(&occupancy),
                eligibility: None,
                failures: prepared.failures.len(),
            },
            failures: prepared.failures,
        }
    }))
}

fn evaluate(prepared: Prepared, options: &RunOptions) -> RunOutput {
    let residential = &prepared.classification.residential;
    let index = SpatialRelationIndex::build(residential.iter().map(|p| &p.geometry));

    let occupancy = prepared.occupancy(&index);

    let buffers = generate_buffers(
        &prepared.buildings,
        &prepared.census.dwellings,
        options.buffer_radius,
    );
    let buffer_geometries: Vec<&MultiPolygon<f64>> = buffers.iter().map(|b| &b.geometry).collect();
    let buffers_touching = index.relate_all(&buffer_geometries, Predicate::Intersects);

    let footprints: Vec<&MultiPolygon<f64>> =
        prepared.buildings.iter().map(|b| &b.geometry).collect();
    let buildings_touching = index.relate_all(&footprints, Predicate::Intersects);

    let blocked = prepared.blocked_parcels(&index, options.buffer_radius);
    if !blocked.is_empty() {
        warn!(
            parcels = blocked.len(),
            "Parcels skipped: overlapping an invalid building"
        );
    }

    let calculator = EligibilityCalculator {
        parcels: residential,
        buildings: &prepared.buildings,
        buffers: &buffers,
        occupancy: &occupancy,
        buffers_touching: &buffers_touching,
        buildings_touching: &buildings_touching,
    };

    let done = AtomicUsize::new(0);
    let outcomes: Vec<Outcome> = (0..residential.len())
        .into_par_iter()
        .map(|parcel_idx| {
            if options.cancel.is_cancelled() {
                return Outcome::Skipped;
            }

            if let Some(facility_id) = blocked.get(&parcel_idx) {
                return Outcome::Failed(CoopzoneError::invalid_geometry(
                    RecordKind::Parcel,
                    residential[parcel_idx].id.clone(),
                    format!("overlaps invalid building {}", facility_id),
                ));
            }

            let result = calculator.calculate(parcel_idx);

            let count = done.fetch_add(1, Ordering::Relaxed) + 1;
            if count % 10_000 == 0 {
                info!(processed = count, "Eligibility progress");
            }
            Outcome::Done(result)
        })
        .collect();

    let classification = prepared.classification_summary();
    let mut results = Vec::with_capacity(outcomes.len());
    let mut failures = prepared.failures;
    let mut skipped = 0usize;

    for outcome in outcomes {
        match outcome {
            Outcome::Done(result) => results.push(result),
            Outcome::Failed(error) => failures.push(error),
            Outcome::Skipped => skipped += 1,
        }
    }

    // Ordre déterministe pour des sorties reproductibles
    results.sort_by(|a, b| compare_ids(&a.parcel_id, &b.parcel_id));

    let cancelled = skipped > 0;
    if cancelled {
        warn!(skipped = skipped, "Run cancelled before completion");
    }

    let eligibility = EligibilitySummary::from_results(&results);
    info!(
        evaluated = eligibility.evaluated,
        with_allowed_area = eligibility.with_allowed_area,
        zero_allowed_area = eligibility.zero_allowed_area,
        failures = failures.len(),
        "Eligibility computed"
    );

    let summary = RunSummary {
        classification,
        occupancy: OccupancySummary::from_table(&occupancy),
        eligibility: Some(eligibility),
        failures: failures.len(),
    };

    RunOutput {
        results,
        failures,
        non_residential: prepared.classification.non_residential,
        summary,
        cancelled,
    }
}

fn grow_rect(rect: &Rect<f64>, margin: f64) -> Rect<f64> {
    let margin = margin.max(0.0);
    Rect::new(
        coord! { x: rect.min().x - margin, y: rect.min().y - margin },
        coord! { x: rect.max().x + margin, y: rect.max().y + margin },
    )
}

/// Exécute `op` dans un pool dédié de `jobs` threads, ou dans le pool global
fn with_pool<R, F>(jobs: Option<usize>, op: F) -> R
where
    R: Send,
    F: FnOnce() -> R + Send,
{
    let Some(jobs) = jobs.filter(|&n| n > 0) else {
        return op();
    };

    match rayon::ThreadPoolBuilder::new().num_threads(jobs).build() {
        Ok(pool) => pool.install(op),
        Err(e) => {
            warn!(jobs = jobs, error = %e, "Failed to build thread pool, using global pool");
            op()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, Geometry};

    fn square(x: f64, y: f64, size: f64) -> Geometry<f64> {
        Geometry::Polygon(
            Rect::new(coord! { x: x, y: y }, coord! { x: x + size, y: y + size }).to_polygon(),
        )
    }

    fn snapshot() -> Snapshot {
        let parcels = (0..4)
            .map(|i| ParcelRecord {
                parcel_id: Some(i.to_string()),
                zoning_code: Some(if i == 3 { "C 1" } else { "R 8" }.to_string()),
                geometry: Some(square(f64::from(i) * 1000.0, 0.0, 100.0)),
            })
            .collect();

        let buildings = vec![
            BuildingRecord {
                facility_id: Some("H0".into()),
                geometry: Some(square(40.0, 40.0, 20.0)),
                use_type: Some("Household".into()),
                unit_count: Some(1),
                ownership: None,
            },
            BuildingRecord {
                facility_id: Some("D1".into()),
                geometry: Some(square(1040.0, 40.0, 20.0)),
                use_type: Some("Dormitory".into()),
                unit_count: Some(1),
                ownership: None,
            },
        ];

        Snapshot {
            parcels,
            buildings,
            zoning: ZoningLookup::from_pairs(vec![
                ("R8", "Residential single family"),
                ("C1", "Commercial"),
            ]),
        }
    }

    #[test]
    fn test_cancel_flag() {
        let flag = CancelFlag::new();
        let shared = flag.clone();
        assert!(!shared.is_cancelled());
        flag.cancel();
        assert!(shared.is_cancelled());
    }

    #[test]
    fn test_run_small_snapshot() {
        let output = run(snapshot(), &RunOptions::default()).unwrap();

        assert!(!output.cancelled);
        assert_eq!(output.results.len(), 3);
        assert_eq!(output.non_residential.len(), 1);
        assert!(output.failures.is_empty());

        // 0: maison seule -> seule l'emprise est retirée
        assert!((output.results[0].allowed_area() - 9_600.0).abs() < 1e-6);
        // 1: dortoir -> son propre tampon couvre tout
        assert!(output.results[1].is_fully_prohibited());
        // 2: aucun logement
        assert!(output.results[2].is_fully_prohibited());

        let summary = &output.summary;
        assert_eq!(summary.classification.residential, 3);
        assert_eq!(summary.occupancy.multiple_occupancy, 1);
        assert_eq!(summary.occupancy.parcels_without_dwellings, 1);
        assert_eq!(summary.eligibility.as_ref().unwrap().with_allowed_area, 1);
    }

    #[test]
    fn test_run_cancelled_before_start() {
        let options = RunOptions::default();
        options.cancel.cancel();

        let output = run(snapshot(), &options).unwrap();
        assert!(output.cancelled);
        assert!(output.results.is_empty());
    }

    #[test]
    fn test_run_with_dedicated_pool() {
        let options = RunOptions {
            jobs: Some(2),
            ..Default::default()
        };
        let output = run(snapshot(), &options).unwrap();
        assert_eq!(output.results.len(), 3);
    }

    #[test]
    fn test_survey_skips_geometry() {
        let survey = survey(snapshot(), &RunOptions::default()).unwrap();
        assert!(survey.summary.eligibility.is_none());
        assert_eq!(survey.summary.classification.households, 1);
        assert_eq!(survey.summary.classification.dormitories, 1);
        assert_eq!(survey.summary.occupancy.parcels_with_dwellings, 2);
    }

    #[test]
    fn test_invalid_building_blocks_touched_parcels() {
        let mut snapshot = snapshot();
        snapshot.buildings.push(BuildingRecord {
            facility_id: Some("BAD".into()),
            geometry: Some(Geometry::Polygon(geo::polygon![
                (x: 2010.0, y: 10.0),
                (x: 2050.0, y: 50.0),
                (x: 2050.0, y: 10.0),
                (x: 2010.0, y: 50.0),
                (x: 2010.0, y: 10.0),
            ])),
            use_type: Some("Garage".into()),
            unit_count: None,
            ownership: None,
        });

        let output = run(snapshot, &RunOptions::default()).unwrap();
        assert_eq!(output.results.len(), 2);
        assert_eq!(output.failures.len(), 2);
        assert_eq!(
            output.failures[1].record(),
            Some((RecordKind::Parcel, "2"))
        );
        assert_eq!(output.summary.failures, 2);
    }
}
