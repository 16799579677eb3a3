//! Command-line interface argument parsing for transfermarkt-tui.
//!
//! - `transfermarkt-tui show` opens the dashboard
//! - `transfermarkt-tui export games --from 2020-01-01 --to 2020-12-31`
//! - `transfermarkt-tui query games --where stadium="Emirates Stadium"`
//! - `transfermarkt-tui health` answers a health check without loading data

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::data::ColumnMatch;
use crate::export::{DEFAULT_FILE_PREFIX, DEFAULT_MAX_FILE_BYTES};

/// Environment variable holding the prep directory
pub const DATA_DIR_ENV: &str = "TRANSFERMARKT_DATA_DIR";

/// A terminal dashboard for browsing, filtering and exporting the
/// Transfermarkt football datasets.
#[derive(Parser, Debug)]
#[command(name = "transfermarkt-tui")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory holding the prepared CSV files
    /// Defaults to ./data/prep
    #[arg(long, global = true, env = DATA_DIR_ENV)]
    pub data_dir: Option<String>,

    /// Directory exported workbooks are written to
    #[arg(short, long, global = true)]
    pub output_dir: Option<String>,

    /// Pull the data with dvc before reading it
    #[arg(long, global = true)]
    pub pull: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Filters shared by the headless query and export commands
#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// First day of the date range (YYYY-MM-DD)
    #[arg(long)]
    pub from: Option<String>,

    /// Last day of the date range (YYYY-MM-DD), inclusive
    #[arg(long)]
    pub to: Option<String>,

    /// Club display name, repeatable
    #[arg(short, long = "club")]
    pub clubs: Vec<String>,

    /// Exact column match, repeatable; all must hold
    #[arg(short = 'w', long = "where", value_name = "COLUMN=VALUE", value_parser = ColumnMatch::parse)]
    pub matches: Vec<ColumnMatch>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Launch the TUI dashboard
    Show {
        /// Asset selected on start
        #[arg(short, long)]
        asset: Option<String>,
    },

    /// List the assets with their size and date coverage
    Assets {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Run a filtered read and print the first rows
    Query {
        asset: String,

        #[command(flatten)]
        filters: FilterArgs,

        /// Number of rows to print
        #[arg(short = 'n', long, default_value = "20")]
        rows: usize,
    },

    /// Run a filtered read and write it to an Excel file
    Export {
        asset: String,

        #[command(flatten)]
        filters: FilterArgs,

        /// Filename prefix
        #[arg(long, default_value = DEFAULT_FILE_PREFIX)]
        prefix: String,
    },

    /// List the clubs that played in the given leagues over the last 20 seasons
    Clubs {
        /// Competition code (GB1, ES1, L1, IT1, FR1), repeatable
        #[arg(short, long = "league")]
        leagues: Vec<String>,
    },

    /// Check that an asset file can be read and show a sample
    Probe {
        asset: String,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Answer a health check
    Health {
        /// Also verify the required asset files exist
        #[arg(long)]
        deep: bool,
    },

    /// Pull the prep directory with dvc
    Pull,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

/// Configuration derived from CLI arguments and the environment
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub output_dir: PathBuf,
    pub pull: bool,
    pub file_prefix: String,
    pub max_export_bytes: usize,
    pub initial_asset: Option<String>,
}

impl AppConfig {
    /// Create AppConfig from the global CLI options
    pub fn from_cli(data_dir: Option<String>, output_dir: Option<String>, pull: bool) -> Self {
        let data_dir = data_dir
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("data").join("prep"));

        let output_dir = output_dir
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));

        AppConfig {
            data_dir,
            output_dir,
            pull,
            file_prefix: DEFAULT_FILE_PREFIX.to_string(),
            max_export_bytes: DEFAULT_MAX_FILE_BYTES,
            initial_asset: None,
        }
    }

    pub fn with_initial_asset(mut self, asset: Option<String>) -> Self {
        self.initial_asset = asset;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::from_cli(None, None, false);
        assert_eq!(config.data_dir, PathBuf::from("data/prep"));
        assert_eq!(config.output_dir, PathBuf::from("."));
        assert_eq!(config.file_prefix, "transfermarkt");
        assert!(!config.pull);
    }

    #[test]
    fn test_custom_dirs() {
        let config = AppConfig::from_cli(
            Some("/srv/prep".to_string()),
            Some("/tmp/out".to_string()),
            true,
        )
        .with_initial_asset(Some("games".to_string()));
        assert_eq!(config.data_dir, PathBuf::from("/srv/prep"));
        assert_eq!(config.output_dir, PathBuf::from("/tmp/out"));
        assert_eq!(config.initial_asset.as_deref(), Some("games"));
    }

    #[test]
    fn test_parse_export_command() {
        let cli = Cli::try_parse_from([
            "transfermarkt-tui",
            "export",
            "transfers",
            "--club",
            "Arsenal FC",
            "--club",
            "Chelsea FC",
            "--from",
            "2020-01-01",
            "--where",
            "to_club_name=Real Madrid",
        ])
        .unwrap();
        match cli.command {
            Commands::Export {
                asset,
                filters,
                prefix,
            } => {
                assert_eq!(asset, "transfers");
                assert_eq!(filters.clubs, vec!["Arsenal FC", "Chelsea FC"]);
                assert_eq!(filters.from.as_deref(), Some("2020-01-01"));
                assert_eq!(filters.to, None);
                assert_eq!(filters.matches.len(), 1);
                assert_eq!(filters.matches[0].column, "to_club_name");
                assert_eq!(filters.matches[0].value, "Real Madrid");
                assert_eq!(prefix, "transfermarkt");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_malformed_where_is_rejected() {
        let parsed = Cli::try_parse_from(["transfermarkt-tui", "query", "games", "--where", "stadium"]);
        assert!(parsed.is_err());
    }
}
