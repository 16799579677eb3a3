//! Small prep directory used by the data-layer tests.

use tempfile::TempDir;

use super::catalog::Catalog;

pub const ARSENAL: i64 = 11;
pub const CHELSEA: i64 = 631;

const CLUBS_CSV: &str = "\
club_id,name,domestic_competition_id
11,Arsenal FC,GB1
631,Chelsea FC,GB1
418,Real Madrid,ES1
27,Bayern Munich,L1
583,Paris Saint-Germain,FR1
777,Reserve Side,IT1
";

// Club 5000 has no entry in clubs.csv
const GAMES_CSV: &str = "\
game_id,competition_id,season,round,date,home_club_id,away_club_id,home_club_goals,away_club_goals,stadium,attendance
1,GB1,2019,1. Matchday,2019-08-10,11,631,2,1,Emirates Stadium,60000
2,GB1,2019,20. Matchday,2020-01-05,631,11,0,0,Stamford Bridge,40000
3,ES1,2020,5. Matchday,2020-06-15,418,27,1,3,Santiago Bernabeu,
4,GB1,2020,10. Matchday,2020-12-31,11,5000,4,0,Emirates Stadium,59000
5,L1,2020,30. Matchday,2021-01-01,27,583,2,2,Allianz Arena,75000
6,FR1,2020,32. Matchday,2021-03-01,583,418,1,0,Parc des Princes,47000
";

const TRANSFERS_CSV: &str = "\
player_id,transfer_date,transfer_season,from_club_id,to_club_id,from_club_name,to_club_name,transfer_fee,player_name
100,2020-07-01,20/21,631,11,Chelsea FC,Arsenal FC,25000000,Player A
101,2021-01-15,20/21,11,418,Arsenal FC,Real Madrid,10000000.5,Player B
102,2020-08-20,20/21,27,583,Bayern Munich,Paris Saint-Germain,,Player C
";

const PLAYERS_CSV: &str = "\
player_id,name,current_club_id,current_club_name,market_value_in_eur
100,Player A,11,Arsenal FC,30000000
101,Player B,418,Real Madrid,12000000
102,Player C,583,Paris Saint-Germain,
";

/// Write the fixture CSV files and return a catalog over them.
///
/// The directory is removed when the returned guard is dropped.
pub fn fixture_catalog() -> (TempDir, Catalog) {
    let dir = tempfile::tempdir().expect("create temp dir");
    for (file, contents) in [
        ("clubs.csv", CLUBS_CSV),
        ("games.csv", GAMES_CSV),
        ("transfers.csv", TRANSFERS_CSV),
        ("players.csv", PLAYERS_CSV),
    ] {
        std::fs::write(dir.path().join(file), contents).expect("write fixture");
    }
    let catalog = Catalog::new(dir.path());
    (dir, catalog)
}
