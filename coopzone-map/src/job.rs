//! Exécution d'un run complet: chargement -> moteur -> export -> rapport

use std::path::Path;
use std::time::Instant;

use anyhow::Result;
use tracing::{error, info};

use coopzone::hash::{fingerprint, to_hex};
use coopzone::RunOptions;

use crate::config::Config;
use crate::export::export_layers;
use crate::load::{load_snapshot, Inputs};
use crate::report::{RunError, RunReport};

/// Calcule l'éligibilité et écrit les couches dans `output`
///
/// Les erreurs de chargement et de schéma ne remontent pas: elles sont
/// consignées dans le rapport (statut `Failed`). Seules les erreurs
/// d'écriture des couches sont propagées.
pub fn run_job(
    inputs: &Inputs,
    config: &Config,
    options: &RunOptions,
    output: &Path,
) -> Result<RunReport> {
    let started_at = Instant::now();
    let mut report = RunReport::new(&inputs.dataset_name(), options.buffer_radius);

    let snapshot = match load_snapshot(inputs, config) {
        Ok(snapshot) => snapshot,
        Err(e) => return Ok(failed(report, &e, started_at)),
    };

    let run = match coopzone::run(snapshot, options) {
        Ok(run) => run,
        Err(e) => return Ok(failed(report, &anyhow::Error::from(e), started_at)),
    };

    report.record_failures(&run.failures);
    report.summary = run.summary.clone();
    report.cancelled = run.cancelled;
    report.fingerprint = Some(to_hex(&fingerprint(&run.results)));

    let layers = export_layers(&run, config.epsg, output)?;
    info!(
        output = %output.display(),
        eligibility = layers.eligibility,
        allowed = layers.allowed,
        prohibited = layers.prohibited,
        non_residential = layers.non_residential,
        "Layers written"
    );
    report.layers = Some(layers);

    report.set_duration(started_at.elapsed());
    report.finalize();
    Ok(report)
}

/// Statistiques de classification et d'occupation seulement
pub fn survey_job(inputs: &Inputs, config: &Config, options: &RunOptions) -> RunReport {
    let started_at = Instant::now();
    let mut report = RunReport::new(&inputs.dataset_name(), options.buffer_radius);

    let snapshot = match load_snapshot(inputs, config) {
        Ok(snapshot) => snapshot,
        Err(e) => return failed(report, &e, started_at),
    };

    match coopzone::survey(snapshot, options) {
        Ok(survey) => {
            report.record_failures(&survey.failures);
            report.summary = survey.summary;
        }
        Err(e) => return failed(report, &anyhow::Error::from(e), started_at),
    }

    report.set_duration(started_at.elapsed());
    report.finalize();
    report
}

fn failed(mut report: RunReport, e: &anyhow::Error, started_at: Instant) -> RunReport {
    error!(error = %format!("{e:#}"), "Run aborted");
    report.record_error(RunError::fatal(format!("{e:#}")));
    report.set_duration(started_at.elapsed());
    report.finalize();
    report
}
