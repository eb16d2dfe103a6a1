use anyhow::{Result, bail};
use clap::Parser;
use tracing_appender::non_blocking::WorkerGuard;

use ipinfo::cli::{Cli, Commands, ConfigCommands};
use ipinfo::config::{init_config, validate_static_config};
use ipinfo::errors::IpInfoError;
use ipinfo::runtime::modes;
use ipinfo::system::init_logging;

/// Load and validate the global configuration, then start logging
fn bootstrap(config_path: Option<&str>) -> Result<WorkerGuard> {
    let config = init_config(config_path);

    if let Err(problems) = validate_static_config(&config) {
        for problem in &problems {
            eprintln!("{}", IpInfoError::configuration(problem.clone()).format_colored());
        }
        bail!("invalid configuration ({} problems)", problems.len());
    }

    init_logging(&config.logging)
}

#[actix_web::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Config {
            action: ConfigCommands::Generate { output },
        } => modes::generate_config(output.as_deref()),
        Commands::Serve => {
            let _guard = bootstrap(cli.config.as_deref())?;
            modes::run_server().await
        }
        Commands::Refresh { once } => {
            let _guard = bootstrap(cli.config.as_deref())?;
            modes::run_refresher(once).await
        }
    }
}
