use clap::{Parser, Subcommand};
use round_vault_core::ConfigLoader;
use tracing_subscriber::EnvFilter;

mod config;
mod demo;

use config::AppConfig;

#[derive(Parser)]
#[command(name = "round-vault")]
#[command(about = "Round-based options-selling vault", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scripted two-round vault lifecycle against the simulated market
    Demo {
        /// Config file path
        #[arg(short, long, default_value = "config/Config.toml")]
        config: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Demo { config } => {
            let app_config: AppConfig = ConfigLoader::load_path(&config)?;
            demo::run(app_config).await?;
        }
    }
    Ok(())
}
