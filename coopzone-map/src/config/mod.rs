//! Configuration des jeux de données (noms de propriétés, unité linéaire, rayon)

use serde::{Deserialize, Serialize};
use std::path::Path;

use anyhow::{Context, Result};

/// Mètres par pied international
const METRES_PER_FOOT: f64 = 0.3048;

/// Mètres par pied d'arpentage US (1200/3937)
const METRES_PER_US_SURVEY_FOOT: f64 = 1200.0 / 3937.0;

/// Configuration principale
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Unité linéaire du CRS projeté commun aux parcelles et bâtiments
    #[serde(default)]
    pub linear_unit: LinearUnit,

    /// Code EPSG du CRS des entrées, repris dans l'en-tête des couches exportées
    #[serde(default)]
    pub epsg: Option<u32>,

    /// Rayon des tampons autour des logements, en pieds
    #[serde(default = "default_radius_feet")]
    pub radius_feet: f64,

    pub parcels: ParcelFields,
    pub buildings: BuildingFields,
    pub zoning: ZoningColumns,

    /// Colonnes du CSV d'usage des bâtiments (jointure optionnelle)
    #[serde(default)]
    pub building_use: Option<BuildingFields>,
}

/// Propriétés GeoJSON des parcelles
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ParcelFields {
    pub id: String,
    pub zoning_code: String,
}

/// Propriétés des bâtiments (GeoJSON ou CSV d'usage)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BuildingFields {
    pub id: String,
    pub use_type: String,
    #[serde(default)]
    pub unit_count: Option<String>,
    #[serde(default)]
    pub ownership: Option<String>,
}

/// Colonnes du CSV de zonage
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ZoningColumns {
    pub code: String,
    pub description: String,
}

/// Unité linéaire du système de coordonnées
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LinearUnit {
    #[default]
    Foot,
    UsSurveyFoot,
    #[serde(alias = "meter")]
    Metre,
}

impl LinearUnit {
    pub fn metres_per_unit(self) -> f64 {
        match self {
            LinearUnit::Foot => METRES_PER_FOOT,
            LinearUnit::UsSurveyFoot => METRES_PER_US_SURVEY_FOOT,
            LinearUnit::Metre => 1.0,
        }
    }

    /// Convertit une distance en pieds dans cette unité
    pub fn convert_feet(self, feet: f64) -> f64 {
        feet * METRES_PER_FOOT / self.metres_per_unit()
    }
}

fn default_radius_feet() -> f64 {
    200.0
}

impl Config {
    /// Charge une configuration depuis un fichier
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;

        let config: Self = serde_json::from_str(&content).context("Failed to parse config JSON")?;
        config.validate()?;
        Ok(config)
    }

    /// Charge une configuration depuis un preset embarqué
    pub fn from_preset(preset: &str) -> Result<Self> {
        match preset {
            "alexandria" => Self::load_embedded(include_str!("presets/alexandria.json")),
            "generic" => Self::load_embedded(include_str!("presets/generic.json")),
            _ => anyhow::bail!("Unknown preset: {}. Use: alexandria, generic", preset),
        }
    }

    /// Nom de preset ou chemin vers un fichier JSON
    pub fn resolve(name_or_path: &str) -> Result<Self> {
        match name_or_path {
            "alexandria" | "generic" => Self::from_preset(name_or_path),
            _ => Self::load(Path::new(name_or_path)),
        }
    }

    fn load_embedded(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse embedded config")
    }

    /// Remplace le rayon (option de ligne de commande)
    pub fn with_radius_feet(mut self, feet: f64) -> Result<Self> {
        self.radius_feet = feet;
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<()> {
        if !self.radius_feet.is_finite() || self.radius_feet <= 0.0 {
            anyhow::bail!("radius_feet must be a positive number, got {}", self.radius_feet);
        }
        Ok(())
    }

    /// Rayon des tampons dans l'unité du CRS
    pub fn buffer_radius(&self) -> f64 {
        self.linear_unit.convert_feet(self.radius_feet)
    }
}
