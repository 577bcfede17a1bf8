//! CLI entry point.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use syncstream_cli::{Cli, CliConfig, Commands, handlers, load_settings};

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables before anything reads them
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let settings = load_settings(&CliConfig {
        config_path: cli.config.clone(),
    })?;

    match &cli.command {
        Commands::Demo(args) => handlers::demo::execute(&settings, args).await,
        Commands::Replay { file } => handlers::replay::execute(&settings, file),
        Commands::Settings => handlers::settings::execute(&settings),
    }
}
