//! Classification des parcelles (zonage) et des bâtiments (logements)

pub mod dwelling;
pub mod parcel;

pub use dwelling::{classify_buildings, DwellingCensus};
pub use parcel::{
    classify_parcels, normalize_zoning_code, ParcelClassification, ZoningClass, ZoningLookup,
};
