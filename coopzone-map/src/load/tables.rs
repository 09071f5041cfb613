//! Tables CSV: codes de zonage et usage des bâtiments

use std::collections::{BTreeSet, HashMap};
use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, warn};

use coopzone::{require_fields, ZoningLookup};

use super::{clean_text, parse_count};
use crate::config::{BuildingFields, ZoningColumns};

/// Attributs d'usage d'un bâtiment issus du CSV
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UseRow {
    pub use_type: Option<String>,
    pub unit_count: Option<i64>,
    pub ownership: Option<String>,
}

/// CSV ouvert avec ses en-têtes nettoyés
struct CsvTable {
    reader: csv::Reader<File>,
    headers: Vec<String>,
}

impl CsvTable {
    fn open(path: &Path) -> Result<Self> {
        let file =
            File::open(path).with_context(|| format!("Cannot open {}", path.display()))?;
        let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(file);

        // Les exports ArcGIS commencent souvent par un BOM
        let headers = reader
            .headers()
            .with_context(|| format!("Failed to read CSV header: {}", path.display()))?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
            .collect();

        Ok(Self { reader, headers })
    }

    fn columns(&self) -> BTreeSet<String> {
        self.headers.iter().cloned().collect()
    }

    fn index_of(&self, column: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == column)
    }
}

/// Charge la table des codes de zonage
pub fn load_zoning(path: &Path, columns: &ZoningColumns) -> Result<ZoningLookup> {
    let mut table = CsvTable::open(path)?;
    require_fields(
        "zoning",
        &table.columns(),
        &[columns.code.as_str(), columns.description.as_str()],
    )?;

    let code_idx = table.index_of(&columns.code).unwrap_or_default();
    let description_idx = table.index_of(&columns.description).unwrap_or_default();

    let mut pairs = Vec::new();
    for record in table.reader.records() {
        let record =
            record.with_context(|| format!("Failed to read CSV row: {}", path.display()))?;
        let code = record.get(code_idx).and_then(clean_text);
        let description = record.get(description_idx).and_then(clean_text);

        if let (Some(code), Some(description)) = (code, description) {
            pairs.push((code, description));
        }
    }

    let lookup = ZoningLookup::from_pairs(pairs);
    info!(path = %path.display(), codes = lookup.len(), "Zoning codes loaded");
    Ok(lookup)
}

/// Charge le CSV d'usage des bâtiments, indexé par identifiant
///
/// En cas d'identifiant répété, la première ligne est conservée.
pub fn load_building_use(path: &Path, columns: &BuildingFields) -> Result<HashMap<String, UseRow>> {
    let mut table = CsvTable::open(path)?;
    require_fields(
        "building_use",
        &table.columns(),
        &[columns.id.as_str(), columns.use_type.as_str()],
    )?;

    let id_idx = table.index_of(&columns.id).unwrap_or_default();
    let use_idx = table.index_of(&columns.use_type).unwrap_or_default();
    let units_idx = columns.unit_count.as_deref().and_then(|c| table.index_of(c));
    let ownership_idx = columns.ownership.as_deref().and_then(|c| table.index_of(c));

    let mut rows: HashMap<String, UseRow> = HashMap::new();
    let mut duplicates = 0usize;

    for record in table.reader.records() {
        let record =
            record.with_context(|| format!("Failed to read CSV row: {}", path.display()))?;

        let Some(id) = record.get(id_idx).and_then(clean_text) else {
            continue;
        };

        let row = UseRow {
            use_type: record.get(use_idx).and_then(clean_text),
            unit_count: units_idx
                .and_then(|i| record.get(i))
                .and_then(parse_count),
            ownership: ownership_idx
                .and_then(|i| record.get(i))
                .and_then(clean_text),
        };

        if rows.contains_key(&id) {
            duplicates += 1;
            continue;
        }
        rows.insert(id, row);
    }

    if duplicates > 0 {
        warn!(duplicates = duplicates, "Repeated facility ids in building use table, first row kept");
    }
    info!(path = %path.display(), rows = rows.len(), "Building use loaded");
    Ok(rows)
}
