//! Types d'erreurs pour le crate coopzone

use std::fmt;

use thiserror::Error;

/// Nature de l'enregistrement concerné par une erreur
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
pub enum RecordKind {
    Parcel,
    Building,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKind::Parcel => f.write_str("parcel"),
            RecordKind::Building => f.write_str("building"),
        }
    }
}

/// Erreurs pouvant survenir pendant un calcul d'éligibilité
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoopzoneError {
    /// Champ obligatoire absent du jeu de données (fatal, aucun calcul lancé)
    #[error("Missing required field '{field}' in {dataset}")]
    Schema { dataset: String, field: String },

    /// Géométrie invalide (auto-intersection, vide, non polygonale)
    #[error("Invalid geometry for {kind} {id}: {reason}")]
    InvalidGeometry {
        kind: RecordKind,
        id: String,
        reason: String,
    },

    /// Identifiant déjà vu dans le même jeu de données
    #[error("Duplicate {kind} id: {id}")]
    DuplicateId { kind: RecordKind, id: String },
}

impl CoopzoneError {
    /// Crée une erreur de schéma
    pub fn schema(dataset: impl Into<String>, field: impl Into<String>) -> Self {
        Self::Schema {
            dataset: dataset.into(),
            field: field.into(),
        }
    }

    /// Crée une erreur de géométrie invalide
    pub fn invalid_geometry(
        kind: RecordKind,
        id: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidGeometry {
            kind,
            id: id.into(),
            reason: reason.into(),
        }
    }

    /// Vrai si l'erreur doit interrompre tout le run
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Schema { .. })
    }

    /// Enregistrement fautif, si l'erreur en désigne un
    pub fn record(&self) -> Option<(RecordKind, &str)> {
        match self {
            Self::Schema { .. } => None,
            Self::InvalidGeometry { kind, id, .. } | Self::DuplicateId { kind, id } => {
                Some((*kind, id.as_str()))
            }
        }
    }
}
