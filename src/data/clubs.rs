//! Club name/id directory and league-based club lists.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Datelike, NaiveDate};
use moka::sync::Cache;

use super::catalog::Catalog;
use super::error::QueryError;
use super::filter::{quote_ident, SelectQuery, SqlParam};
use super::storage::{Storage, CACHE_TTL, SOURCE_TABLE};

/// Leagues offered in the league filter, as (display name, competition code)
pub const TOP_LEAGUES: [(&str, &str); 5] = [
    ("Premier League (England)", "GB1"),
    ("La Liga (Spain)", "ES1"),
    ("Bundesliga (Germany)", "L1"),
    ("Serie A (Italy)", "IT1"),
    ("Ligue 1 (France)", "FR1"),
];

/// Seasons considered when listing a league's clubs
pub const LEAGUE_WINDOW_YEARS: i32 = 20;

const LEAGUE_CACHE_ENTRIES: u64 = 10;

/// Competition code for a league display name
pub fn league_code(display_name: &str) -> Option<&'static str> {
    TOP_LEAGUES
        .iter()
        .find(|(name, _)| *name == display_name)
        .map(|(_, code)| *code)
}

/// Lookup tables between club display names and ids
pub struct ClubDirectory {
    names: Vec<String>,
    name_to_id: BTreeMap<String, i64>,
    id_to_name: BTreeMap<i64, String>,
    league_cache: Cache<(Vec<String>, i32), Vec<String>>,
}

impl ClubDirectory {
    /// Empty directory: no club filtering is possible
    pub fn empty() -> Self {
        Self::from_pairs(std::iter::empty())
    }

    /// Build from `(club_id, name)` pairs; the first id seen for a name wins
    pub fn from_pairs(pairs: impl IntoIterator<Item = (i64, String)>) -> Self {
        let mut name_to_id = BTreeMap::new();
        for (id, name) in pairs {
            let name = name.trim().to_string();
            if name.is_empty() {
                continue;
            }
            name_to_id.entry(name).or_insert(id);
        }
        let id_to_name = name_to_id
            .iter()
            .map(|(name, id)| (*id, name.clone()))
            .collect();
        let names = name_to_id.keys().cloned().collect();

        ClubDirectory {
            names,
            name_to_id,
            id_to_name,
            league_cache: Cache::builder()
                .time_to_live(CACHE_TTL)
                .max_capacity(LEAGUE_CACHE_ENTRIES)
                .build(),
        }
    }

    /// Read the `clubs` asset. A missing or unreadable asset yields an empty
    /// directory so the rest of the dashboard keeps working.
    pub fn load(storage: &Storage, catalog: &Catalog) -> Self {
        let Some(clubs) = catalog.get("clubs") else {
            log::warn!("No clubs asset registered, club filtering disabled");
            return Self::empty();
        };
        match storage.read_columns(clubs, &["club_id", "name"]) {
            Ok(table) => {
                let pairs = table
                    .column("club_id")
                    .zip(table.column("name"))
                    .filter_map(|(id, name)| Some((id.as_i64()?, name.as_str()?.to_string())));
                let directory = Self::from_pairs(pairs);
                log::info!("Loaded {} club names", directory.len());
                directory
            }
            Err(e) => {
                log::warn!("Could not load club data: {e}");
                Self::empty()
            }
        }
    }

    /// All club names, sorted
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn id_of(&self, name: &str) -> Option<i64> {
        self.name_to_id.get(name).copied()
    }

    pub fn name_of(&self, id: i64) -> Option<&str> {
        self.id_to_name.get(&id).map(String::as_str)
    }

    /// Ids for the given names; names without an entry are dropped
    pub fn resolve<S: AsRef<str>>(&self, names: &[S]) -> BTreeSet<i64> {
        names
            .iter()
            .filter_map(|n| self.id_of(n.as_ref()))
            .collect()
    }

    /// Names of the clubs that played in any of the leagues during the last
    /// [`LEAGUE_WINDOW_YEARS`] seasons up to `today`'s year.
    ///
    /// Ids without a directory entry are dropped. Results are cached per
    /// (league codes, year).
    pub fn clubs_for_leagues(
        &self,
        storage: &Storage,
        catalog: &Catalog,
        codes: &[&str],
        today: NaiveDate,
    ) -> Result<Vec<String>, QueryError> {
        if codes.is_empty() || self.is_empty() {
            return Ok(Vec::new());
        }
        let mut key_codes: Vec<String> = codes.iter().map(|c| c.to_string()).collect();
        key_codes.sort();
        let key = (key_codes, today.year());
        if let Some(hit) = self.league_cache.get(&key) {
            return Ok(hit);
        }

        let games = catalog
            .get("games")
            .ok_or_else(|| QueryError::InvalidFilter("no games asset registered".to_string()))?;
        let query = league_clubs_query(codes, today.year());
        let table = storage.fetch(games, &query)?;

        let names: BTreeSet<String> = table
            .rows
            .iter()
            .filter_map(|row| row.first()?.as_i64())
            .filter_map(|id| self.name_of(id).map(str::to_string))
            .collect();
        let names: Vec<String> = names.into_iter().collect();

        self.league_cache.insert(key, names.clone());
        Ok(names)
    }
}

/// Distinct home and away club ids for the leagues within the season window
fn league_clubs_query(codes: &[&str], end_year: i32) -> SelectQuery {
    let start_year = end_year - LEAGUE_WINDOW_YEARS;
    let mut params = Vec::new();
    let mut branch = |column: &str| {
        let placeholders: Vec<&str> = codes
            .iter()
            .map(|code| {
                params.push(SqlParam::Text(code.to_string()));
                "?"
            })
            .collect();
        params.push(SqlParam::Int(start_year as i64));
        params.push(SqlParam::Int(end_year as i64));
        format!(
            "SELECT {} AS club_id FROM {} WHERE competition_id IN ({}) \
             AND CAST(season AS INTEGER) BETWEEN ? AND ?",
            quote_ident(column),
            quote_ident(SOURCE_TABLE),
            placeholders.join(", ")
        )
    };
    let home = branch("home_club_id");
    let away = branch("away_club_id");

    SelectQuery::from_parts(
        format!(
            "SELECT DISTINCT club_id FROM ({home} UNION ALL {away}) \
             WHERE club_id IS NOT NULL AND club_id <> ''"
        ),
        params,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::testing::{fixture_catalog, ARSENAL, CHELSEA};

    fn june(year: i32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, 6, 1).unwrap()
    }

    #[test]
    fn test_first_id_wins_for_duplicate_names() {
        let dir = ClubDirectory::from_pairs([
            (1, "Alpha".to_string()),
            (2, "Alpha".to_string()),
            (3, "Beta".to_string()),
            (4, "  ".to_string()),
        ]);
        assert_eq!(dir.names(), ["Alpha", "Beta"]);
        assert_eq!(dir.id_of("Alpha"), Some(1));
        assert_eq!(dir.name_of(2), None);
    }

    #[test]
    fn test_resolve_drops_unknown_names() {
        let dir = ClubDirectory::from_pairs([(11, "Arsenal FC".to_string())]);
        let ids = dir.resolve(&["Arsenal FC", "Nowhere United"]);
        assert_eq!(ids.into_iter().collect::<Vec<_>>(), vec![11]);
    }

    #[test]
    fn test_load_from_clubs_asset() {
        let (_dir, catalog) = fixture_catalog();
        let storage = Storage::new();
        let dir = ClubDirectory::load(&storage, &catalog);
        assert_eq!(dir.len(), 6);
        assert_eq!(dir.id_of("Arsenal FC"), Some(ARSENAL));
        assert_eq!(dir.name_of(CHELSEA), Some("Chelsea FC"));
    }

    #[test]
    fn test_clubs_for_premier_league() {
        let (_dir, catalog) = fixture_catalog();
        let storage = Storage::new();
        let dir = ClubDirectory::load(&storage, &catalog);
        let names = dir
            .clubs_for_leagues(&storage, &catalog, &["GB1"], june(2021))
            .unwrap();
        // Club 5000 also played in GB1 but has no name entry
        assert_eq!(names, vec!["Arsenal FC", "Chelsea FC"]);
    }

    #[test]
    fn test_season_window_excludes_old_seasons() {
        let (_dir, catalog) = fixture_catalog();
        let storage = Storage::new();
        let dir = ClubDirectory::load(&storage, &catalog);
        // 2019 and 2020 seasons fall outside [2041, 2061]
        let names = dir
            .clubs_for_leagues(&storage, &catalog, &["GB1", "ES1"], june(2061))
            .unwrap();
        assert!(names.is_empty());
    }

    #[test]
    fn test_no_leagues_means_no_clubs() {
        let (_dir, catalog) = fixture_catalog();
        let storage = Storage::new();
        let dir = ClubDirectory::load(&storage, &catalog);
        assert!(dir
            .clubs_for_leagues(&storage, &catalog, &[], june(2021))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_league_clubs_are_cached_per_year() {
        let (_dir, catalog) = fixture_catalog();
        let storage = Storage::new();
        let dir = ClubDirectory::load(&storage, &catalog);
        let first = dir
            .clubs_for_leagues(&storage, &catalog, &["GB1"], june(2021))
            .unwrap();

        std::fs::remove_file(catalog.get("games").unwrap().prep_path()).unwrap();
        let again = dir
            .clubs_for_leagues(&storage, &catalog, &["GB1"], NaiveDate::from_ymd_opt(2021, 9, 1).unwrap())
            .unwrap();
        assert_eq!(again, first);
        assert!(dir
            .clubs_for_leagues(&storage, &catalog, &["GB1"], june(2022))
            .is_err());
    }

    #[test]
    fn test_league_code_lookup() {
        assert_eq!(league_code("Bundesliga (Germany)"), Some("L1"));
        assert_eq!(league_code("Eredivisie"), None);
    }
}
