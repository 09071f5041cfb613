//! Point d'entrée CLI pour coopzone-map

use anyhow::Result;
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::{fmt, EnvFilter};

/// `.env` du répertoire courant, sinon celui posé à côté du binaire
fn load_env() {
    if dotenvy::dotenv().is_ok() {
        return;
    }
    let beside_binary = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(".env")));
    if let Some(path) = beside_binary {
        let _ = dotenvy::from_path(path);
    }
}

mod cli;

use cli::Commands;

/// Calculer où un poulailler est autorisé sur les parcelles résidentielles
#[derive(Parser)]
#[command(name = "coopzone-map")]
#[command(author, version)]
#[command(about = "Compute where backyard poultry is allowed on residential parcels")]
#[command(long_about = "Classifies parcels by zoning, finds dwellings, applies 200 ft dwelling buffers and exports allowed/prohibited areas as GeoJSON layers.\n\nUse 'summary' for classification statistics without polygon algebra.")]
struct Cli {
    /// Augmenter la verbosité (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Mode silencieux
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    load_env();

    let cli = Cli::parse();

    init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Run { input, output } => {
            info!(parcels = %input.parcels.display(), output = %output.display(), "Eligibility run");
            cli::cmd_run(&input, &output).await?;
        }
        Commands::Summary { input } => {
            info!(parcels = %input.parcels.display(), "Classification summary");
            cli::cmd_summary(&input).await?;
        }
    }

    Ok(())
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => Level::WARN,
        (_, 0) => Level::INFO,
        (_, 1) => Level::DEBUG,
        (_, _) => Level::TRACE,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .init();
}
