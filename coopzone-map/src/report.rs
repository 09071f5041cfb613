//! Rapport de run avec succès partiel
//!
//! Ce module collecte la synthèse du moteur, les erreurs par enregistrement
//! et l'empreinte des résultats, puis les affiche ou les sauvegarde en JSON.

use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use serde::Serialize;

use coopzone::{CoopzoneError, RecordKind, RunSummary};

use crate::export::LayerCounts;

/// Nombre d'erreurs affichées sur la console
const DISPLAYED_FAILURES: usize = 20;

/// Statut global du run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunStatus {
    /// Run réussi sans erreur
    Success,
    /// Run réussi avec des erreurs non fatales
    PartialSuccess,
    /// Run interrompu avant la dernière parcelle
    Cancelled,
    /// Run échoué
    Failed,
}

/// Niveau de sévérité des erreurs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorLevel {
    /// Erreur fatale: run abandonné
    Fatal,
    /// Erreur: enregistrement ignoré
    Error,
}

/// Erreur de run avec contexte
#[derive(Debug, Clone, Serialize)]
pub struct RunError {
    pub level: ErrorLevel,
    /// Type de l'enregistrement (optionnel)
    pub kind: Option<RecordKind>,
    /// Identifiant de l'enregistrement (optionnel)
    pub id: Option<String>,
    pub message: String,
}

impl RunError {
    pub fn from_error(error: &CoopzoneError) -> Self {
        let (kind, id) = match error.record() {
            Some((kind, id)) => (Some(kind), Some(id.to_string())),
            None => (None, None),
        };
        Self {
            level: if error.is_fatal() {
                ErrorLevel::Fatal
            } else {
                ErrorLevel::Error
            },
            kind,
            id,
            message: error.to_string(),
        }
    }

    /// Erreur fatale hors moteur (lecture de fichier, configuration)
    pub fn fatal(message: impl Into<String>) -> Self {
        Self {
            level: ErrorLevel::Fatal,
            kind: None,
            id: None,
            message: message.into(),
        }
    }
}

/// Rapport complet d'un run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Jeu de données traité (nom de la couche des parcelles)
    pub dataset: String,
    /// Durée du run
    pub duration_secs: f64,
    /// Statut global
    pub status: RunStatus,
    /// Rayon des tampons dans l'unité du CRS
    pub buffer_radius: f64,
    pub summary: RunSummary,
    /// Vrai si le run a été interrompu
    pub cancelled: bool,
    /// Empreinte blake3 des résultats (hexadécimal)
    pub fingerprint: Option<String>,
    /// Couches écrites
    pub layers: Option<LayerCounts>,
    /// Liste des erreurs
    pub errors: Vec<RunError>,
}

impl RunReport {
    /// Crée un rapport vide pour un jeu de données
    pub fn new(dataset: &str, buffer_radius: f64) -> Self {
        Self {
            dataset: dataset.to_string(),
            duration_secs: 0.0,
            status: RunStatus::Success,
            buffer_radius,
            summary: RunSummary::default(),
            cancelled: false,
            fingerprint: None,
            layers: None,
            errors: Vec::new(),
        }
    }

    /// Enregistre les erreurs par enregistrement du moteur
    pub fn record_failures(&mut self, failures: &[CoopzoneError]) {
        self.errors.extend(failures.iter().map(RunError::from_error));
    }

    /// Enregistre une erreur
    pub fn record_error(&mut self, error: RunError) {
        self.errors.push(error);
    }

    /// Définit la durée du run
    pub fn set_duration(&mut self, duration: Duration) {
        self.duration_secs = duration.as_secs_f64();
    }

    /// Détermine le statut final basé sur les erreurs
    pub fn finalize(&mut self) {
        let has_fatal = self.errors.iter().any(|e| e.level == ErrorLevel::Fatal);
        let has_errors = !self.errors.is_empty();
        let has_success = match &self.summary.eligibility {
            Some(eligibility) => eligibility.evaluated > 0,
            None => self.summary.classification.parcels_total > 0,
        };

        self.status = if has_fatal {
            RunStatus::Failed
        } else if self.cancelled {
            RunStatus::Cancelled
        } else if has_errors && has_success {
            RunStatus::PartialSuccess
        } else if has_errors {
            RunStatus::Failed
        } else {
            RunStatus::Success
        };
    }

    /// Affiche le rapport sur la console
    pub fn display(&self) {
        println!("\n{}", "=".repeat(60));
        println!("RUN REPORT - {}", self.dataset);
        println!("{}", "=".repeat(60));

        println!("\nStatus: {:?}", self.status);
        println!("Duration: {:.2}s", self.duration_secs);
        println!("Buffer radius: {:.4} (CRS units)", self.buffer_radius);

        let c = &self.summary.classification;
        println!("\n--- PARCELS ---");
        println!(
            "Parcels: {} total, {} residential, {} non-residential ({} unmatched zoning)",
            c.parcels_total, c.residential, c.non_residential, c.unmatched_zoning
        );
        for (code, count) in c.unmatched_codes.iter().take(10) {
            println!("  unmatched {}: {}", code, count);
        }

        println!("\n--- BUILDINGS ---");
        println!(
            "Buildings: {} total, {} dwellings ({} households, {} dormitories)",
            c.buildings_total,
            c.dwellings(),
            c.households,
            c.dormitories
        );
        if !c.top_use_types.is_empty() {
            println!("Top use types:");
            for (use_type, count) in &c.top_use_types {
                println!("  {}: {}", use_type, count);
            }
        }

        let o = &self.summary.occupancy;
        println!("\n--- OCCUPANCY ---");
        println!(
            "Residential parcels: {} with dwellings, {} without, {} multi-occupancy",
            o.parcels_with_dwellings, o.parcels_without_dwellings, o.multiple_occupancy
        );

        if let Some(e) = &self.summary.eligibility {
            println!("\n--- ELIGIBILITY ---");
            println!(
                "Parcels: {} evaluated, {} with allowed area, {} fully prohibited",
                e.evaluated, e.with_allowed_area, e.zero_allowed_area
            );
            println!(
                "Share of residential parcels permitting the activity: {:.1}%",
                e.permitted_share * 100.0
            );
            println!(
                "Area: {:.0} parcel, {:.0} allowed, {:.0} prohibited",
                e.parcel_area, e.allowed_area, e.prohibited_area
            );
        }

        if let Some(layers) = &self.layers {
            println!("\n--- LAYERS ---");
            println!(
                "eligibility: {}, allowed: {}, prohibited: {}, non_residential: {}",
                layers.eligibility, layers.allowed, layers.prohibited, layers.non_residential
            );
        }

        if let Some(fingerprint) = &self.fingerprint {
            println!("\nFingerprint: {}", fingerprint);
        }

        if !self.errors.is_empty() {
            println!("\n--- ERRORS ({}) ---", self.errors.len());
            for e in self.errors.iter().take(DISPLAYED_FAILURES) {
                let location = match (&e.kind, &e.id) {
                    (Some(kind), Some(id)) => format!("[{}:{}]", kind, id),
                    (None, Some(id)) => format!("[{}]", id),
                    _ => String::new(),
                };
                println!("  {:?} {} {}", e.level, location, e.message);
            }
            if self.errors.len() > DISPLAYED_FAILURES {
                println!("  ... and {} more", self.errors.len() - DISPLAYED_FAILURES);
            }
        }

        println!("\n{}", "=".repeat(60));
    }

    /// Sauvegarde le rapport en JSON
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Affichage compact pour le résumé
    pub fn summary(&self) -> String {
        let (evaluated, permitted) = self
            .summary
            .eligibility
            .as_ref()
            .map_or((0, 0), |e| (e.evaluated, e.with_allowed_area));
        format!(
            "{}: {:?}, {} residential, {} evaluated, {} permitted, {} errors",
            self.dataset,
            self.status,
            self.summary.classification.residential,
            evaluated,
            permitted,
            self.errors.len()
        )
    }
}
