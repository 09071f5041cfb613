//! Détermination de l'occupation (simple ou multiple) des parcelles

use std::collections::BTreeSet;

use tracing::info;

use crate::spatial::Relation;
use crate::types::{Building, ParcelOccupancy};

/// Occupation multiple si l'une des conditions est vraie:
/// - plus d'un logement distinct sur la parcelle;
/// - un dortoir (toujours multiple, les unités y sont sous-déclarées);
/// - un bâtiment de plus d'un logement (copropriété, duplex).
pub fn is_multiple_occupancy<'a>(dwellings: impl IntoIterator<Item = &'a Building>) -> bool {
    let mut ids: BTreeSet<&str> = BTreeSet::new();

    for dwelling in dwellings {
        if dwelling.is_dormitory() || dwelling.units() > 1 {
            return true;
        }
        ids.insert(dwelling.id.as_str());
    }

    ids.len() > 1
}

/// Occupation par parcelle (indice de parcelle -> occupation si au moins un logement)
#[derive(Debug, Clone, Default)]
pub struct OccupancyTable {
    by_parcel: Vec<Option<ParcelOccupancy>>,
}

impl OccupancyTable {
    /// `None` pour une parcelle sans logement
    pub fn get(&self, parcel_idx: usize) -> Option<&ParcelOccupancy> {
        self.by_parcel.get(parcel_idx).and_then(Option::as_ref)
    }

    pub fn parcels_with_dwellings(&self) -> usize {
        self.by_parcel.iter().filter(|o| o.is_some()).count()
    }

    pub fn parcels_without_dwellings(&self) -> usize {
        self.by_parcel.len() - self.parcels_with_dwellings()
    }

    pub fn multiple_occupancy(&self) -> usize {
        self.by_parcel
            .iter()
            .flatten()
            .filter(|o| o.is_multiple_occupancy)
            .count()
    }
}

/// Résout l'occupation de chaque parcelle
///
/// `dwellings_within` associe chaque parcelle aux indices (dans `dwellings`)
/// des logements qu'elle contient entièrement.
pub fn resolve_occupancy(
    parcel_count: usize,
    buildings: &[Building],
    dwellings: &[usize],
    dwellings_within: &Relation,
) -> OccupancyTable {
    let by_parcel: Vec<Option<ParcelOccupancy>> = (0..parcel_count)
        .map(|parcel_idx| {
            let on_parcel: Vec<&Building> = dwellings_within
                .matches(parcel_idx)
                .iter()
                .map(|&d| &buildings[dwellings[d]])
                .collect();

            if on_parcel.is_empty() {
                return None;
            }

            Some(ParcelOccupancy {
                dwelling_ids: on_parcel.iter().map(|b| b.id.clone()).collect(),
                is_multiple_occupancy: is_multiple_occupancy(on_parcel.iter().copied()),
            })
        })
        .collect();

    let table = OccupancyTable { by_parcel };
    info!(
        with_dwellings = table.parcels_with_dwellings(),
        without_dwellings = table.parcels_without_dwellings(),
        multiple_occupancy = table.multiple_occupancy(),
        "Occupancy resolved"
    );
    table
}
