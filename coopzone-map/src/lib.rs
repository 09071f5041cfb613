//! # coopzone-map
//!
//! Carte des surfaces où un poulailler est autorisé, à partir des couches
//! parcelles/bâtiments (GeoJSON) et des tables de zonage/usage (CSV).
//!
//! ## Features
//!
//! - Presets de configuration (noms de propriétés, unité linéaire du CRS)
//! - Jointure optionnelle de la table d'usage des bâtiments
//! - Export des couches en GeoJSON (éligibilité, autorisé, interdit, non résidentiel)
//! - Rapport de run avec succès partiel et empreinte des résultats
//!
//! ## Usage CLI
//!
//! ```bash
//! coopzone-map run --parcels parcels.geojson --buildings buildings.geojson \
//!     --zoning land_use_codes.csv --building-use buildings-use.csv \
//!     --config alexandria --output ./map/
//!
//! coopzone-map summary --parcels parcels.geojson --buildings buildings.geojson \
//!     --zoning land_use_codes.csv
//! ```

pub mod config;
pub mod export;
pub mod job;
pub mod load;
pub mod report;

pub use config::{Config, LinearUnit};
pub use job::{run_job, survey_job};
pub use load::{load_snapshot, Inputs};
pub use report::{RunReport, RunStatus};
