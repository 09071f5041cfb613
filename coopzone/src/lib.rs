//! # coopzone
//!
//! Calcul des surfaces où un poulailler est autorisé sur les parcelles
//! résidentielles, d'après le zonage et l'usage des bâtiments.
//!
//! ## Règles
//!
//! - Seules les parcelles dont le zonage est résidentiel sont évaluées
//! - Une parcelle sans logement (Household/Dormitory) est entièrement interdite
//! - Chaque logement projette un tampon de 200 pieds (configurable)
//! - En occupation simple, le tampon du logement de la parcelle est ignoré
//! - Les emprises de tous les bâtiments touchant la parcelle sont retirées
//!
//! ## Usage
//!
//! ```rust,ignore
//! use coopzone::{run, RunOptions, Snapshot, ZoningLookup};
//!
//! let snapshot = Snapshot {
//!     parcels,
//!     buildings,
//!     zoning: ZoningLookup::from_pairs(zoning_rows),
//! };
//! let output = run(snapshot, &RunOptions::default())?;
//!
//! for result in &output.results {
//!     println!("{}: {:.0} ft² autorisés", result.parcel_id, result.allowed_area());
//! }
//! ```

pub mod buffer;
pub mod classify;
pub mod eligibility;
pub mod error;
pub mod hash;
pub mod input;
pub mod occupancy;
pub mod pipeline;
pub mod spatial;
pub mod stats;
pub mod types;

pub use buffer::{generate_buffers, DwellingBuffer, DEFAULT_BUFFER_RADIUS};
pub use classify::{
    classify_buildings, classify_parcels, normalize_zoning_code, DwellingCensus,
    ParcelClassification, ZoningClass, ZoningLookup,
};
pub use eligibility::{evaluate_parcel, EligibilityCalculator};
pub use error::{CoopzoneError, RecordKind};
pub use input::{
    require_fields, BuildingRecord, ParcelRecord, BUILDING_FIELDS, PARCEL_FIELDS,
};
pub use occupancy::{is_multiple_occupancy, resolve_occupancy, OccupancyTable};
pub use pipeline::{run, survey, CancelFlag, RunOptions, RunOutput, Snapshot, Survey};
pub use spatial::{Predicate, Relation, SpatialRelationIndex};
pub use stats::{ClassificationSummary, EligibilitySummary, OccupancySummary, RunSummary};
pub use types::{
    Building, EligibilityResult, FacilityId, Parcel, ParcelId, ParcelOccupancy, UseType,
};
