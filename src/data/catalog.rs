//! Registry of the prepared dataset assets.
//!
//! The catalog is built once from a prep directory and lent to every
//! component that needs to locate an asset. Each asset knows its CSV file,
//! how it can be filtered, and how many rows a read or an export may return.

use std::path::{Path, PathBuf};

use serde::Serialize;

use super::error::CatalogError;

/// Row ceiling for a single filtered read
pub const DEFAULT_QUERY_ROW_CAP: usize = 200_000;

/// Lower ceiling for the assets with one row per player per game
pub const LARGE_ASSET_QUERY_ROW_CAP: usize = 100_000;

/// Row ceiling for an Excel export
pub const DEFAULT_EXPORT_ROW_CAP: usize = 50_000;

/// Assets the dashboard cannot run without
pub const REQUIRED_ASSETS: [&str; 3] = ["games", "clubs", "players"];

/// How a club filter matches against its columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Membership {
    /// A row matches if any of the columns holds a selected club
    Any,
    /// Only the first column is checked
    Single,
}

/// Which columns identify a club in an asset
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClubColumns {
    pub columns: Vec<String>,
    pub mode: Membership,
}

/// A named tabular resource backed by a CSV file
#[derive(Debug, Clone, Serialize)]
pub struct Asset {
    pub name: String,
    pub file_name: String,
    pub display_name: String,
    pub description: String,
    pub public: bool,
    pub date_column: Option<String>,
    pub club_columns: Option<ClubColumns>,
    pub query_row_cap: usize,
    pub export_row_cap: usize,
    #[serde(skip)]
    prep_dir: PathBuf,
}

impl Asset {
    /// Location of the asset's CSV file
    pub fn prep_path(&self) -> PathBuf {
        let file = Path::new(&self.file_name);
        if file.is_absolute() {
            file.to_path_buf()
        } else {
            self.prep_dir.join(file)
        }
    }

    pub fn is_date_filterable(&self) -> bool {
        self.date_column.is_some()
    }

    pub fn is_club_filterable(&self) -> bool {
        self.club_columns.is_some()
    }
}

struct AssetDef {
    name: &'static str,
    display_name: &'static str,
    description: &'static str,
    date_column: Option<&'static str>,
    club_columns: &'static [&'static str],
    mode: Membership,
    query_row_cap: usize,
}

const ASSET_DEFS: &[AssetDef] = &[
    AssetDef {
        name: "appearances",
        display_name: "Player Appearances",
        description: "One row per player appearance in a game",
        date_column: Some("date"),
        club_columns: &["player_club_id"],
        mode: Membership::Single,
        query_row_cap: LARGE_ASSET_QUERY_ROW_CAP,
    },
    AssetDef {
        name: "club_games",
        display_name: "Club Games",
        description: "One row per club per game, from that club's point of view",
        date_column: None,
        club_columns: &["club_id"],
        mode: Membership::Single,
        query_row_cap: DEFAULT_QUERY_ROW_CAP,
    },
    AssetDef {
        name: "clubs",
        display_name: "Clubs",
        description: "Club details and current squad figures",
        date_column: None,
        club_columns: &[],
        mode: Membership::Single,
        query_row_cap: DEFAULT_QUERY_ROW_CAP,
    },
    AssetDef {
        name: "competitions",
        display_name: "Competitions",
        description: "Leagues and cups covered by the dataset",
        date_column: None,
        club_columns: &[],
        mode: Membership::Single,
        query_row_cap: DEFAULT_QUERY_ROW_CAP,
    },
    AssetDef {
        name: "game_events",
        display_name: "Game Events",
        description: "Goals, cards and substitutions within games",
        date_column: Some("date"),
        club_columns: &[],
        mode: Membership::Single,
        query_row_cap: LARGE_ASSET_QUERY_ROW_CAP,
    },
    AssetDef {
        name: "game_lineups",
        display_name: "Game Lineups",
        description: "Starting and bench lineups per game",
        date_column: Some("date"),
        club_columns: &[],
        mode: Membership::Single,
        query_row_cap: LARGE_ASSET_QUERY_ROW_CAP,
    },
    AssetDef {
        name: "games",
        display_name: "Games",
        description: "One row per game with score, clubs and attendance",
        date_column: Some("date"),
        club_columns: &["home_club_id", "away_club_id"],
        mode: Membership::Any,
        query_row_cap: DEFAULT_QUERY_ROW_CAP,
    },
    AssetDef {
        name: "player_valuations",
        display_name: "Player Valuations",
        description: "Market value history per player",
        date_column: Some("date"),
        club_columns: &[],
        mode: Membership::Single,
        query_row_cap: LARGE_ASSET_QUERY_ROW_CAP,
    },
    AssetDef {
        name: "players",
        display_name: "Players",
        description: "Player profiles and current market values",
        date_column: None,
        club_columns: &["current_club_id"],
        mode: Membership::Single,
        query_row_cap: DEFAULT_QUERY_ROW_CAP,
    },
    AssetDef {
        name: "transfers",
        display_name: "Transfers",
        description: "Player transfers between clubs with fees",
        date_column: Some("transfer_date"),
        club_columns: &["from_club_id", "to_club_id"],
        mode: Membership::Any,
        query_row_cap: DEFAULT_QUERY_ROW_CAP,
    },
];

/// The set of assets in a prep directory
#[derive(Debug, Clone)]
pub struct Catalog {
    prep_dir: PathBuf,
    assets: Vec<Asset>,
}

impl Catalog {
    /// Register every known asset under `prep_dir`
    pub fn new(prep_dir: impl Into<PathBuf>) -> Self {
        let prep_dir = prep_dir.into();
        let assets = ASSET_DEFS
            .iter()
            .map(|def| Asset {
                name: def.name.to_string(),
                file_name: format!("{}.csv", def.name),
                display_name: def.display_name.to_string(),
                description: def.description.to_string(),
                public: true,
                date_column: def.date_column.map(str::to_string),
                club_columns: (!def.club_columns.is_empty()).then(|| ClubColumns {
                    columns: def.club_columns.iter().map(|c| c.to_string()).collect(),
                    mode: def.mode,
                }),
                query_row_cap: def.query_row_cap,
                export_row_cap: DEFAULT_EXPORT_ROW_CAP,
                prep_dir: prep_dir.clone(),
            })
            .collect();

        Catalog { prep_dir, assets }
    }

    pub fn prep_dir(&self) -> &Path {
        &self.prep_dir
    }

    pub fn assets(&self) -> &[Asset] {
        &self.assets
    }

    pub fn asset_names(&self) -> Vec<&str> {
        self.assets.iter().map(|a| a.name.as_str()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&Asset> {
        self.assets.iter().find(|a| a.name == name)
    }

    /// Look up an asset, failing with the list of valid names
    pub fn asset(&self, name: &str) -> Result<&Asset, CatalogError> {
        self.get(name).ok_or_else(|| CatalogError::UnknownAsset {
            name: name.to_string(),
            available: self.asset_names().join(", "),
        })
    }

    /// Names of required assets whose CSV file is absent
    pub fn missing_required(&self) -> Vec<String> {
        REQUIRED_ASSETS
            .iter()
            .filter(|name| {
                self.get(name)
                    .map(|a| !a.prep_path().exists())
                    .unwrap_or(true)
            })
            .map(|name| name.to_string())
            .collect()
    }

    /// Fail when any required asset is missing
    pub fn validate(&self) -> Result<(), CatalogError> {
        let missing = self.missing_required();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(CatalogError::MissingRequired(missing))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_contents() {
        let catalog = Catalog::new("/data/prep");
        assert_eq!(catalog.assets().len(), 10);

        let games = catalog.get("games").unwrap();
        assert_eq!(games.date_column.as_deref(), Some("date"));
        let clubs = games.club_columns.as_ref().unwrap();
        assert_eq!(clubs.mode, Membership::Any);
        assert_eq!(clubs.columns, vec!["home_club_id", "away_club_id"]);
        assert_eq!(games.prep_path(), PathBuf::from("/data/prep/games.csv"));

        let transfers = catalog.get("transfers").unwrap();
        assert_eq!(transfers.date_column.as_deref(), Some("transfer_date"));

        assert!(!catalog.get("clubs").unwrap().is_club_filterable());
    }

    #[test]
    fn test_large_assets_have_lower_ceiling() {
        let catalog = Catalog::new(".");
        for asset in catalog.assets() {
            assert!(asset.query_row_cap <= DEFAULT_QUERY_ROW_CAP);
            assert!(asset.export_row_cap <= asset.query_row_cap);
        }
        assert_eq!(
            catalog.get("appearances").unwrap().query_row_cap,
            LARGE_ASSET_QUERY_ROW_CAP
        );
    }

    #[test]
    fn test_unknown_asset_lists_available() {
        let catalog = Catalog::new(".");
        let err = catalog.asset("matches").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("matches"));
        assert!(msg.contains("games"));
    }

    #[test]
    fn test_validate_reports_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = Catalog::new(dir.path());
        match catalog.validate() {
            Err(CatalogError::MissingRequired(missing)) => {
                assert_eq!(missing, vec!["games", "clubs", "players"]);
            }
            other => panic!("expected missing assets, got {other:?}"),
        }
    }
}
