//! Headless subcommands: asset listing, filtered reads, exports and data pulls.

use std::collections::BTreeSet;

use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDate};

use crate::bootstrap::{self, Health};
use crate::cli::{AppConfig, FilterArgs};
use crate::data::{
    league_code, Asset, AssetSummary, Catalog, ClubDirectory, DateRange, FilterSpec, Storage, Table,
    DATE_FORMAT, TOP_LEAGUES,
};
use crate::export::{self, estimated_size_mb, ExportLimits};

/// Days counted as "recent" in the asset listing
const RECENT_DAYS: i64 = 7;

/// Widest column printed by the text table
const MAX_PRINT_WIDTH: usize = 30;

/// Translate command-line filters into a [`FilterSpec`] for `asset`.
///
/// A missing bound falls back to the asset's first or last date. Date and
/// club filters the asset cannot take are ignored with a warning. Column
/// matches apply to every asset.
pub fn filter_spec(
    storage: &Storage,
    asset: &Asset,
    clubs: &ClubDirectory,
    args: &FilterArgs,
) -> Result<FilterSpec> {
    let range = if args.from.is_none() && args.to.is_none() {
        None
    } else if !asset.is_date_filterable() {
        log::warn!("{} is not date-filterable, ignoring --from/--to", asset.name);
        None
    } else {
        let bounds = storage.date_bounds(asset);
        let bound = |given: &Option<String>, pick: fn((NaiveDate, NaiveDate)) -> NaiveDate| {
            match given {
                Some(value) => Ok(value.clone()),
                None => bounds
                    .map(|b| pick(b).format(DATE_FORMAT).to_string())
                    .with_context(|| format!("{} has no dates to default the range to", asset.name)),
            }
        };
        let start = bound(&args.from, |b| b.0)?;
        let end = bound(&args.to, |b| b.1)?;
        let (range, swapped) = DateRange::parse(&start, &end)?;
        if swapped {
            log::warn!("Start date was after end date, swapped to {range}");
        }
        Some(range)
    };

    let club_ids = if args.clubs.is_empty() {
        BTreeSet::new()
    } else if !asset.is_club_filterable() {
        log::warn!("{} is not club-filterable, ignoring --club", asset.name);
        BTreeSet::new()
    } else {
        for name in args.clubs.iter().filter(|n| clubs.id_of(n).is_none()) {
            log::warn!("Unknown club '{name}'");
        }
        let ids = clubs.resolve(&args.clubs);
        if ids.is_empty() {
            bail!("None of the given clubs are known, see `transfermarkt-tui clubs`");
        }
        ids
    };

    Ok(FilterSpec::for_asset(asset, range, &club_ids).with_matches(args.matches.iter().cloned()))
}

/// Open the catalog, failing when a required asset is missing
fn open_catalog(config: &AppConfig) -> Result<Catalog> {
    let catalog = Catalog::new(&config.data_dir);
    catalog.validate().with_context(|| {
        format!(
            "The dataset in {} is incomplete, run `transfermarkt-tui pull` or pass --data-dir",
            config.data_dir.display()
        )
    })?;
    Ok(catalog)
}

/// Print `table` as aligned text columns
fn print_table(table: &Table) {
    let widths: Vec<usize> = table
        .columns
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            table
                .rows
                .iter()
                .filter_map(|row| row.get(idx))
                .map(|cell| cell.to_string().chars().count())
                .chain(std::iter::once(name.chars().count()))
                .max()
                .unwrap_or(0)
                .min(MAX_PRINT_WIDTH)
        })
        .collect();

    let line = |cells: Vec<String>| {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| {
                let cell: String = cell.chars().take(*width).collect();
                format!("{cell:<width$}")
            })
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    println!("{}", line(table.columns.clone()));
    for row in &table.rows {
        println!("{}", line(row.iter().map(|c| c.to_string()).collect()));
    }
}

/// `assets`: one summary per asset
pub fn assets(config: &AppConfig, json: bool) -> Result<()> {
    let catalog = open_catalog(config)?;
    let storage = Storage::new();
    let today = Local::now().date_naive();

    let summaries: Vec<AssetSummary> = catalog
        .assets()
        .iter()
        .filter(|a| a.public)
        .map(|asset| {
            let bounds = storage.date_bounds(asset);
            AssetSummary {
                name: asset.name.clone(),
                display_name: asset.display_name.clone(),
                description: asset.description.clone(),
                row_count: storage.row_count(asset).ok(),
                records_last_week: storage.records_delta(asset, RECENT_DAYS, today),
                first_date: bounds.map(|b| b.0),
                last_date: bounds.map(|b| b.1),
            }
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }

    let or_dash = |v: Option<String>| v.unwrap_or_else(|| "-".to_string());
    println!(
        "{:<18} {:>10} {:>12} {:<10} {:<10}",
        "ASSET", "ROWS", "LAST 7 DAYS", "FIRST", "LAST"
    );
    for s in &summaries {
        println!(
            "{:<18} {:>10} {:>12} {:<10} {:<10}",
            s.name,
            or_dash(s.row_count.map(|n| n.to_string())),
            or_dash(s.records_last_week.map(|n| format!("+{n}"))),
            or_dash(s.first_date.map(|d| d.to_string())),
            or_dash(s.last_date.map(|d| d.to_string())),
        );
    }
    Ok(())
}

/// `query`: run a filtered read and print the first `rows` rows
pub fn query(config: &AppConfig, asset_name: &str, args: &FilterArgs, rows: usize) -> Result<()> {
    let catalog = open_catalog(config)?;
    let asset = catalog.asset(asset_name)?;
    let storage = Storage::new();
    let clubs = ClubDirectory::load(&storage, &catalog);

    let spec = filter_spec(&storage, asset, &clubs, args)?;
    if spec.is_empty() {
        log::info!("{}: no filters, reading the whole asset", asset.name);
    }
    let mut result = storage.query(asset, &spec);
    if let Some(message) = result.error_message() {
        log::debug!("Failed query: {} [{}]", result.sql, result.params.join(", "));
        bail!("{message}");
    }

    let matched = result.total_rows;
    let read = result.row_count();
    result.table.truncate(rows);
    print_table(&result.table);

    if read > rows {
        eprintln!("The table size ({read}) exceeded the maximum and has been truncated to {rows} rows");
    } else {
        eprintln!("{read} rows");
    }
    if read < matched {
        eprintln!("Found {matched} rows, limited to {read} for performance");
    }
    Ok(())
}

/// `export`: run a filtered read and write it as an Excel workbook
pub fn export(config: &AppConfig, asset_name: &str, args: &FilterArgs, prefix: &str) -> Result<()> {
    let catalog = open_catalog(config)?;
    let asset = catalog.asset(asset_name)?;
    let storage = Storage::new();
    let clubs = ClubDirectory::load(&storage, &catalog);

    let spec = filter_spec(&storage, asset, &clubs, args)?;
    let result = storage.query(asset, &spec);
    if let Some(error) = &result.error {
        bail!(error.clone());
    }
    if result.table.is_empty() {
        bail!("No data matches the current filters");
    }
    if result.truncated() {
        log::warn!(
            "Found {} rows, limited to {} for performance",
            result.total_rows,
            result.row_count()
        );
    }
    log::info!(
        "{}: about {:.1} MB of data to export",
        asset.name,
        estimated_size_mb(result.row_count(), result.table.columns.len())
    );

    let prepared = export::build_excel(
        prefix,
        &asset.name,
        &result.table,
        ExportLimits::for_asset(asset, config.max_export_bytes),
        Local::now().naive_local(),
    )?;
    if let Some(total) = prepared.truncated_from {
        eprintln!("Export limited to the first {} of {total} rows", prepared.rows);
    }

    let path = export::save_export(&prepared, &config.output_dir)?;
    println!(
        "{} ({} rows x {} columns, {:.1} MB)",
        path.display(),
        prepared.rows,
        prepared.columns,
        prepared.size_mb()
    );
    Ok(())
}

/// `clubs`: list club names, narrowed to leagues when any are given.
///
/// Leagues may be given by code or by display name.
pub fn clubs(config: &AppConfig, leagues: &[String]) -> Result<()> {
    let catalog = open_catalog(config)?;
    let storage = Storage::new();
    let directory = ClubDirectory::load(&storage, &catalog);
    if directory.is_empty() {
        bail!("No club data available in {}", config.data_dir.display());
    }

    let mut codes = Vec::new();
    for league in leagues {
        let code = TOP_LEAGUES
            .iter()
            .map(|(_, code)| *code)
            .find(|code| code.eq_ignore_ascii_case(league))
            .or_else(|| league_code(league));
        match code {
            Some(code) => codes.push(code),
            None => bail!(
                "Unknown league '{league}', expected one of: {}",
                TOP_LEAGUES
                    .iter()
                    .map(|(name, code)| format!("{code} ({name})"))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        }
    }

    let names = if codes.is_empty() {
        directory.names().to_vec()
    } else {
        let today = Local::now().date_naive();
        let names = directory.clubs_for_leagues(&storage, &catalog, &codes, today)?;
        if names.is_empty() {
            log::warn!("No clubs found for the selected leagues and recent seasons, showing all clubs");
            directory.names().to_vec()
        } else {
            names
        }
    };

    for name in names {
        println!("{name}");
    }
    Ok(())
}

/// `probe`: file, size, row count and a sample of one asset
pub fn probe(config: &AppConfig, asset_name: &str, json: bool) -> Result<()> {
    let catalog = Catalog::new(&config.data_dir);
    let asset = catalog.asset(asset_name)?;
    let report = Storage::new().probe(asset);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("asset:   {}", report.asset);
        println!("path:    {}", report.path);
        println!("exists:  {}", report.exists);
        if let Some(size) = report.size_mb {
            println!("size:    {size:.1} MB");
        }
        if let Some(rows) = report.row_count {
            println!("rows:    {rows}");
        }
        if !report.columns.is_empty() {
            println!("columns: {}", report.columns.join(", "));
            let mut sample = Table::new(report.columns.clone());
            sample.rows = report.sample.clone();
            println!();
            print_table(&sample);
        }
    }

    match report.error {
        Some(error) => bail!(error),
        None => Ok(()),
    }
}

/// `health`: "OK", or a failure naming the missing assets when `deep`
pub fn health(config: &AppConfig, deep: bool) -> Result<()> {
    let catalog = deep.then(|| Catalog::new(&config.data_dir));
    match bootstrap::health_check(catalog.as_ref()) {
        Health::Ok => {
            println!("OK");
            Ok(())
        }
        Health::MissingAssets(missing) => bail!("Missing required assets: {}", missing.join(", ")),
    }
}

/// `pull`: fetch the prep directory and show the command output
pub fn pull(config: &AppConfig) -> Result<()> {
    let report = bootstrap::pull_data(&config.data_dir);
    if !report.stdout.is_empty() {
        println!("{}", report.stdout);
    }
    if !report.stderr.is_empty() {
        eprintln!("{}", report.stderr);
    }
    match report.error {
        Some(error) => bail!(error),
        None => {
            println!("Data pull completed");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::testing::{fixture_catalog, ARSENAL};
    use crate::data::ColumnMatch;

    fn args(from: Option<&str>, to: Option<&str>, clubs: &[&str]) -> FilterArgs {
        FilterArgs {
            from: from.map(str::to_string),
            to: to.map(str::to_string),
            clubs: clubs.iter().map(|c| c.to_string()).collect(),
            matches: Vec::new(),
        }
    }

    fn config_for(dir: &tempfile::TempDir, catalog: &Catalog) -> AppConfig {
        AppConfig::from_cli(
            Some(catalog.prep_dir().display().to_string()),
            Some(dir.path().join("out").display().to_string()),
            false,
        )
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DATE_FORMAT).unwrap()
    }

    #[test]
    fn test_no_filters() {
        let (_dir, catalog) = fixture_catalog();
        let storage = Storage::new();
        let clubs = ClubDirectory::load(&storage, &catalog);
        let games = catalog.get("games").unwrap();
        let spec = filter_spec(&storage, games, &clubs, &FilterArgs::default()).unwrap();
        assert!(spec.is_empty());
    }

    #[test]
    fn test_missing_bound_defaults_to_asset_dates() {
        let (_dir, catalog) = fixture_catalog();
        let storage = Storage::new();
        let clubs = ClubDirectory::load(&storage, &catalog);
        let games = catalog.get("games").unwrap();

        let spec = filter_spec(&storage, games, &clubs, &args(Some("2020-06-01"), None, &[])).unwrap();
        let range = spec.date.unwrap().range;
        assert_eq!(range.start(), date("2020-06-01"));
        assert_eq!(range.end(), date("2021-03-01"));
    }

    #[test]
    fn test_reversed_bounds_are_swapped() {
        let (_dir, catalog) = fixture_catalog();
        let storage = Storage::new();
        let clubs = ClubDirectory::load(&storage, &catalog);
        let games = catalog.get("games").unwrap();

        let spec = filter_spec(
            &storage,
            games,
            &clubs,
            &args(Some("2020-12-31"), Some("2020-01-01"), &[]),
        )
        .unwrap();
        let range = spec.date.unwrap().range;
        assert_eq!(range.start(), date("2020-01-01"));
        assert_eq!(range.end(), date("2020-12-31"));
    }

    #[test]
    fn test_club_names_resolve_and_unknown_are_dropped() {
        let (_dir, catalog) = fixture_catalog();
        let storage = Storage::new();
        let clubs = ClubDirectory::load(&storage, &catalog);
        let transfers = catalog.get("transfers").unwrap();

        let spec = filter_spec(
            &storage,
            transfers,
            &clubs,
            &args(None, None, &["Arsenal FC", "Nowhere United"]),
        )
        .unwrap();
        let ids: Vec<i64> = spec.club.unwrap().club_ids.into_iter().collect();
        assert_eq!(ids, vec![ARSENAL]);

        assert!(filter_spec(&storage, transfers, &clubs, &args(None, None, &["Nowhere United"])).is_err());
    }

    #[test]
    fn test_filters_ignored_where_not_applicable() {
        let (_dir, catalog) = fixture_catalog();
        let storage = Storage::new();
        let clubs = ClubDirectory::load(&storage, &catalog);
        let club_table = catalog.get("clubs").unwrap();

        let spec = filter_spec(
            &storage,
            club_table,
            &clubs,
            &args(Some("2020-01-01"), None, &["Arsenal FC"]),
        )
        .unwrap();
        assert!(spec.is_empty());
    }

    #[test]
    fn test_column_matches_apply_to_any_asset() {
        let (_dir, catalog) = fixture_catalog();
        let storage = Storage::new();
        let clubs = ClubDirectory::load(&storage, &catalog);
        let club_table = catalog.get("clubs").unwrap();

        let mut filters = FilterArgs::default();
        filters.matches.push(ColumnMatch::parse("domestic_competition_id=GB1").unwrap());
        let spec = filter_spec(&storage, club_table, &clubs, &filters).unwrap();
        assert_eq!(spec.matches.len(), 1);

        let result = storage.query(club_table, &spec);
        let names: Vec<&str> = result.table.column("name").filter_map(|c| c.as_str()).collect();
        assert_eq!(names, vec!["Arsenal FC", "Chelsea FC"]);
    }

    #[test]
    fn test_data_commands_need_required_assets() {
        let (dir, catalog) = fixture_catalog();
        std::fs::remove_file(catalog.get("players").unwrap().prep_path()).unwrap();
        let config = config_for(&dir, &catalog);

        for err in [
            assets(&config, false).unwrap_err(),
            query(&config, "games", &FilterArgs::default(), 5).unwrap_err(),
            export(&config, "games", &FilterArgs::default(), "report").unwrap_err(),
            clubs(&config, &[]).unwrap_err(),
        ] {
            assert!(format!("{err:#}").contains("players"), "{err:#}");
        }
        assert!(!dir.path().join("out").exists());
        // A single asset can still be inspected
        assert!(probe(&config, "games", false).is_ok());
    }

    #[test]
    fn test_export_writes_workbook() {
        let (dir, catalog) = fixture_catalog();
        let config = AppConfig::from_cli(
            Some(catalog.prep_dir().display().to_string()),
            Some(dir.path().join("out").display().to_string()),
            false,
        );
        export(&config, "games", &args(None, None, &["Chelsea FC"]), "report").unwrap();

        let written: Vec<String> = std::fs::read_dir(dir.path().join("out"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(written.len(), 1);
        assert!(written[0].starts_with("report_games_"));
        assert!(written[0].ends_with(".xlsx"));
    }

    #[test]
    fn test_export_with_no_matches_fails() {
        let (dir, catalog) = fixture_catalog();
        let config = AppConfig::from_cli(
            Some(catalog.prep_dir().display().to_string()),
            Some(dir.path().join("out").display().to_string()),
            false,
        );
        let err = export(
            &config,
            "games",
            &args(Some("1990-01-01"), Some("1990-12-31"), &[]),
            "report",
        )
        .unwrap_err();
        assert!(err.to_string().contains("No data"));
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn test_unknown_asset_is_rejected() {
        let (dir, catalog) = fixture_catalog();
        let config = config_for(&dir, &catalog);
        let err = query(&config, "fixtures", &FilterArgs::default(), 5).unwrap_err();
        assert!(err.to_string().contains("games"));
    }

    #[test]
    fn test_deep_health_reports_missing_assets() {
        let empty = tempfile::tempdir().unwrap();
        let config = AppConfig::from_cli(Some(empty.path().display().to_string()), None, false);
        assert!(health(&config, false).is_ok());
        let err = health(&config, true).unwrap_err();
        assert!(err.to_string().contains("games"));
    }
}
