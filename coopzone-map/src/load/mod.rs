//! Chargement des jeux de données (GeoJSON et CSV) vers les enregistrements du moteur

use std::path::{Path, PathBuf};

use anyhow::Result;

use coopzone::Snapshot;

use crate::config::Config;

pub mod features;
pub mod tables;

pub use features::{load_buildings, load_parcels, read_feature_collection, FeatureTable};
pub use tables::{load_building_use, load_zoning, UseRow};

/// Fichiers d'entrée d'un run
#[derive(Debug, Clone)]
pub struct Inputs {
    pub parcels: PathBuf,
    pub buildings: PathBuf,
    pub zoning: PathBuf,
    pub building_use: Option<PathBuf>,
}

impl Inputs {
    /// Nom court du jeu de données (fichier des parcelles)
    pub fn dataset_name(&self) -> String {
        file_label(&self.parcels)
    }
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown")
        .to_string()
}

/// Charge les quatre jeux de données en un instantané pour le moteur
pub fn load_snapshot(inputs: &Inputs, config: &Config) -> Result<Snapshot> {
    let zoning = load_zoning(&inputs.zoning, &config.zoning)?;

    let usage = match (&inputs.building_use, &config.building_use) {
        (Some(path), Some(columns)) => Some(load_building_use(path, columns)?),
        (Some(path), None) => anyhow::bail!(
            "Building use table {} given but the configuration has no building_use columns",
            path.display()
        ),
        (None, _) => None,
    };

    let parcels = load_parcels(&inputs.parcels, &config.parcels)?;
    let buildings = load_buildings(&inputs.buildings, &config.buildings, usage.as_ref())?;

    Ok(Snapshot {
        parcels,
        buildings,
        zoning,
    })
}

/// Nettoie une valeur texte: vide ou blanc -> None
pub(crate) fn clean_text(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Lit un entier éventuellement sérialisé en flottant ("2", "2.0")
pub(crate) fn parse_count(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(n) = trimmed.parse::<i64>() {
        return Some(n);
    }
    match trimmed.parse::<f64>() {
        Ok(f) if f.is_finite() && f.fract() == 0.0 => Some(f as i64),
        _ => None,
    }
}
