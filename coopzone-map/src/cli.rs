//! Définition et implémentation des commandes CLI
//!
//! - `run`: calcul d'éligibilité et export des couches GeoJSON
//! - `summary`: statistiques de classification seulement

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use coopzone::{CancelFlag, RunOptions};
use coopzone_map::{run_job, survey_job, Config, Inputs, RunReport, RunStatus};

#[derive(Subcommand)]
pub enum Commands {
    /// Compute allowed/prohibited areas and export the map layers
    Run {
        #[command(flatten)]
        input: InputArgs,

        /// Output directory for GeoJSON layers
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Classification and occupancy statistics only (no polygon algebra)
    Summary {
        #[command(flatten)]
        input: InputArgs,
    },
}

/// Entrées communes aux deux commandes
#[derive(Args, Debug, Clone)]
pub struct InputArgs {
    /// Parcels layer (GeoJSON FeatureCollection)
    #[arg(long)]
    pub parcels: PathBuf,

    /// Buildings layer (GeoJSON FeatureCollection), same CRS as parcels
    #[arg(long)]
    pub buildings: PathBuf,

    /// Zoning codes table (CSV)
    #[arg(long)]
    pub zoning: PathBuf,

    /// Building use table (CSV), joined on facility id
    #[arg(long)]
    pub building_use: Option<PathBuf>,

    /// Config preset name (alexandria/generic) or path to a JSON config
    #[arg(long, default_value = "generic")]
    pub config: String,

    /// Buffer radius in feet (overrides the config)
    #[arg(long)]
    pub radius_feet: Option<f64>,

    /// Number of worker threads
    #[arg(long, alias = "threads")]
    pub jobs: Option<usize>,

    /// Save the run report as JSON
    #[arg(long)]
    pub report: Option<PathBuf>,
}

impl InputArgs {
    fn inputs(&self) -> Inputs {
        Inputs {
            parcels: self.parcels.clone(),
            buildings: self.buildings.clone(),
            zoning: self.zoning.clone(),
            building_use: self.building_use.clone(),
        }
    }

    fn load_config(&self) -> Result<Config> {
        let config = Config::resolve(&self.config)
            .with_context(|| format!("Invalid config: {}", self.config))?;
        match self.radius_feet {
            Some(feet) => config.with_radius_feet(feet),
            None => Ok(config),
        }
    }

    fn run_options(&self, config: &Config) -> Result<RunOptions> {
        if self.jobs == Some(0) {
            anyhow::bail!("--jobs must be at least 1");
        }
        Ok(RunOptions {
            buffer_radius: config.buffer_radius(),
            jobs: self.jobs,
            cancel: CancelFlag::new(),
        })
    }
}

/// Exécute la commande run
pub async fn cmd_run(input: &InputArgs, output: &Path) -> Result<()> {
    let config = input.load_config()?;
    let options = input.run_options(&config)?;

    println!("=== Run {} ===", input.parcels.display());
    println!("Config: {}", input.config);
    println!("Linear unit: {:?}", config.linear_unit);
    println!(
        "Radius: {} ft ({:.4} CRS units)",
        config.radius_feet,
        config.buffer_radius()
    );
    println!(
        "Jobs: {}",
        input
            .jobs
            .map_or_else(|| "auto".to_string(), |n| n.to_string())
    );
    println!("Output: {}", output.display());

    let cancel = options.cancel.clone();
    let inputs = input.inputs();
    let output = output.to_path_buf();
    let task =
        tokio::task::spawn_blocking(move || run_job(&inputs, &config, &options, &output));

    let report = until_interrupted(task, cancel).await??;
    finish(&report, input.report.as_deref())
}

/// Exécute la commande summary
pub async fn cmd_summary(input: &InputArgs) -> Result<()> {
    let config = input.load_config()?;
    let options = input.run_options(&config)?;

    let cancel = options.cancel.clone();
    let inputs = input.inputs();
    let task = tokio::task::spawn_blocking(move || survey_job(&inputs, &config, &options));

    let report = until_interrupted(task, cancel).await?;
    finish(&report, input.report.as_deref())
}

/// Attend la fin du calcul; un Ctrl-C lève le drapeau d'annulation et laisse
/// le moteur terminer les parcelles en cours.
async fn until_interrupted<T>(mut task: JoinHandle<T>, cancel: CancelFlag) -> Result<T> {
    tokio::select! {
        joined = &mut task => Ok(joined?),
        Ok(()) = tokio::signal::ctrl_c() => {
            warn!("Interrupt received, stopping after current parcels");
            cancel.cancel();
            Ok(task.await?)
        }
    }
}

fn finish(report: &RunReport, report_path: Option<&Path>) -> Result<()> {
    report.display();

    if let Some(path) = report_path {
        report
            .save_to_file(path)
            .with_context(|| format!("Failed to save report: {}", path.display()))?;
        info!(path = %path.display(), "Report saved");
    }

    println!("{}", report.summary());

    if report.status == RunStatus::Failed {
        anyhow::bail!("Run failed ({} errors)", report.errors.len());
    }
    Ok(())
}
