mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "lensmatch-cli")]
#[command(about = "LensMatch price pipeline command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Apply pending database migrations.
    Migrate,
    /// Fetch, store and alert-check every catalogue lens once.
    RunBatch,
    /// Refresh prices for a single lens.
    Refresh {
        lens_id: String,
    },
    /// Print the stored prices for a lens as JSON.
    Prices {
        lens_id: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        println!("lensmatch-cli: pass --help to list commands");
        return Ok(());
    };

    let config = lensmatch_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    match command {
        Commands::Migrate => commands::run_migrate(&config).await,
        Commands::RunBatch => commands::run_batch(&config).await,
        Commands::Refresh { lens_id } => commands::run_refresh(&config, &lens_id).await,
        Commands::Prices { lens_id } => commands::run_prices(&config, &lens_id).await,
    }
}

#[cfg(test)]
mod tests;
