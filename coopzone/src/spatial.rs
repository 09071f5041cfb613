//! Index spatial R-tree pour les relations bâtiment/tampon -> parcelle
//!
//! L'index est construit une fois sur les parcelles puis interrogé par lots.
//! Le filtrage se fait en deux temps: recouvrement des emprises (R-tree),
//! puis prédicat exact sur les géométries (`within` ou `intersects`).

use geo::{BoundingRect, Intersects, MultiPolygon, Rect, Relate};
use rayon::prelude::*;
use rstar::{RTree, RTreeObject, AABB};
use tracing::debug;

/// Prédicat spatial entre une géométrie requête A et une géométrie indexée B
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Predicate {
    /// A entièrement dans B
    Within,
    /// A et B partagent au moins un point (intérieur ou bord)
    Intersects,
}

impl Predicate {
    /// Évalue le prédicat exact
    pub fn evaluate(self, query: &MultiPolygon<f64>, target: &MultiPolygon<f64>) -> bool {
        match self {
            Predicate::Within => query.relate(target).is_within(),
            Predicate::Intersects => query.intersects(target),
        }
    }
}

/// Emprise d'une géométrie indexée
struct IndexedEnvelope {
    idx: usize,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for IndexedEnvelope {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Relation cible -> requêtes appariées (indices triés)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Relation {
    by_target: Vec<Vec<usize>>,
}

impl Relation {
    /// Requêtes appariées à la cible `target`
    pub fn matches(&self, target: usize) -> &[usize] {
        self.by_target
            .get(target)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Nombre total de couples
    pub fn pair_count(&self) -> usize {
        self.by_target.iter().map(Vec::len).sum()
    }

    /// Nombre de cibles ayant au moins un couple
    pub fn targets_with_matches(&self) -> usize {
        self.by_target.iter().filter(|m| !m.is_empty()).count()
    }
}

/// Index spatial construit une fois, interrogé plusieurs fois
pub struct SpatialRelationIndex<'a> {
    tree: RTree<IndexedEnvelope>,
    geometries: Vec<&'a MultiPolygon<f64>>,
}

impl<'a> SpatialRelationIndex<'a> {
    /// Construit l'index (bulk load) sur les géométries cibles
    pub fn build(geometries: impl IntoIterator<Item = &'a MultiPolygon<f64>>) -> Self {
        let geometries: Vec<&'a MultiPolygon<f64>> = geometries.into_iter().collect();

        let entries = geometries
            .iter()
            .enumerate()
            .filter_map(|(idx, geometry)| {
                geometry.bounding_rect().map(|rect| IndexedEnvelope {
                    idx,
                    envelope: rect_to_aabb(&rect),
                })
            })
            .collect();

        let tree = RTree::bulk_load(entries);
        debug!(targets = geometries.len(), "Spatial index built");

        Self { tree, geometries }
    }

    pub fn len(&self) -> usize {
        self.geometries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.geometries.is_empty()
    }

    /// Cibles dont l'emprise recoupe le rectangle
    pub fn candidates(&self, rect: &Rect<f64>) -> Vec<usize> {
        let mut hits: Vec<usize> = self
            .tree
            .locate_in_envelope_intersecting(&rect_to_aabb(rect))
            .map(|entry| entry.idx)
            .collect();
        hits.sort_unstable();
        hits
    }

    /// Cibles vérifiant le prédicat pour une géométrie requête
    pub fn query(&self, geometry: &MultiPolygon<f64>, predicate: Predicate) -> Vec<usize> {
        let Some(rect) = geometry.bounding_rect() else {
            return Vec::new();
        };

        self.candidates(&rect)
            .into_iter()
            .filter(|&idx| predicate.evaluate(geometry, self.geometries[idx]))
            .collect()
    }

    /// Évalue le prédicat pour toutes les requêtes (en parallèle) et regroupe par cible
    pub fn relate_all(&self, queries: &[&MultiPolygon<f64>], predicate: Predicate) -> Relation {
        let pairs: Vec<(usize, Vec<usize>)> = queries
            .par_iter()
            .enumerate()
            .map(|(query_idx, geometry)| (query_idx, self.query(geometry, predicate)))
            .collect();

        let mut by_target: Vec<Vec<usize>> = vec![Vec::new(); self.geometries.len()];
        // Les couples arrivent dans l'ordre des requêtes: chaque liste reste triée
        for (query_idx, targets) in pairs {
            for target in targets {
                by_target[target].push(query_idx);
            }
        }

        let relation = Relation { by_target };
        debug!(
            predicate = ?predicate,
            queries = queries.len(),
            pairs = relation.pair_count(),
            "Spatial relation computed"
        );
        relation
    }
}

fn rect_to_aabb(rect: &Rect<f64>) -> AABB<[f64; 2]> {
    AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y])
}
