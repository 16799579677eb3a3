//! transfermarkt-tui: a terminal dashboard for the Transfermarkt football datasets
//!
//! Browse the prepared CSV assets, filter them by date, league and club,
//! preview the result and export it to Excel. Every dashboard action also
//! has a headless subcommand.

mod app;
mod bootstrap;
mod cli;
mod commands;
mod data;
mod export;
mod selection;
mod ui;

use std::fs::{File, OpenOptions};

use anyhow::Result;
use bootstrap::Platform;
use cli::{AppConfig, Cli, Commands};
use log::LevelFilter;

const DEFAULT_LOG_FILTER: &str = "warn";

/// Append-mode log file under the user cache directory
fn log_file() -> Option<File> {
    let dir = dirs::cache_dir()?.join("transfermarkt-tui");
    std::fs::create_dir_all(&dir).ok()?;
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join("tui.log"))
        .ok()
}

/// Initialize logging. `RUST_LOG` overrides the default filter.
///
/// The dashboard owns the terminal, so it logs to a file or not at all.
fn init_logging(tui: bool) {
    let mut builder = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(DEFAULT_LOG_FILTER),
    );
    if tui {
        match log_file() {
            Some(file) => {
                builder.target(env_logger::Target::Pipe(Box::new(file)));
            }
            None => {
                builder.filter_level(LevelFilter::Off);
            }
        }
    }
    builder.init();
}

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse_args();
    let config = AppConfig::from_cli(cli.data_dir, cli.output_dir, cli.pull);

    // Answer health checks before anything else is set up
    if let Commands::Health { deep } = cli.command {
        return commands::health(&config, deep);
    }

    init_logging(matches!(cli.command, Commands::Show { .. }));

    if !matches!(cli.command, Commands::Pull) && (config.pull || Platform::detect().should_pull()) {
        let report = bootstrap::pull_data(&config.data_dir);
        if let Some(error) = report.error {
            // Keep going with whatever files are already present
            log::warn!("{error}");
        }
    }

    match cli.command {
        Commands::Show { asset } => {
            // Run the TUI application
            app::run(config.with_initial_asset(asset))?;
        }
        Commands::Assets { json } => commands::assets(&config, json)?,
        Commands::Query {
            asset,
            filters,
            rows,
        } => commands::query(&config, &asset, &filters, rows)?,
        Commands::Export {
            asset,
            filters,
            prefix,
        } => commands::export(&config, &asset, &filters, &prefix)?,
        Commands::Clubs { leagues } => commands::clubs(&config, &leagues)?,
        Commands::Probe { asset, json } => commands::probe(&config, &asset, json)?,
        Commands::Pull => commands::pull(&config)?,
        Commands::Health { deep } => commands::health(&config, deep)?,
    }

    Ok(())
}
