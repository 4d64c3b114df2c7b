//! Sweeper CLI
//!
//! Command-line interface for rendering radio sweepers.

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use sweeper::cli::{commands, Cli, Commands};
use sweeper::config::SweeperConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("Sweeper v{}", env!("CARGO_PKG_VERSION"));

    let config = match &cli.config {
        Some(path) => SweeperConfig::load(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => SweeperConfig::default(),
    };

    match cli.command {
        Some(cmd) => handle_command(&config, cmd).await,
        None => {
            println!("Sweeper v{}", env!("CARGO_PKG_VERSION"));
            println!("Use --help for available commands");
            Ok(())
        }
    }
}

async fn handle_command(config: &SweeperConfig, cmd: Commands) -> anyhow::Result<()> {
    let result = match cmd {
        Commands::Render(args) => commands::render_command(config, &args).await,
        Commands::Presets => commands::list_presets(),
        Commands::RenderPreset { id, output } => commands::render_preset(config, &id, output.as_deref())
            .await
            .map(|_| ()),
    };

    if let Err(e) = &result {
        eprintln!("{}", e.friendly_message());
        for suggestion in e.recovery_suggestions() {
            eprintln!("  - {}", suggestion);
        }
    }
    Ok(result?)
}
