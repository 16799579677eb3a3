//! Data layer for the prepared Transfermarkt CSV assets.
//!
//! Locates assets, translates filters into SQL, runs them through an
//! embedded SQLite connection and resolves club names.

mod catalog;
mod clubs;
mod error;
mod filter;
mod models;
mod storage;

#[cfg(test)]
pub mod testing;

pub use catalog::{Asset, Catalog};
pub use clubs::{league_code, ClubDirectory, TOP_LEAGUES};
pub use filter::{ColumnMatch, DateRange, FilterSpec, DATE_FORMAT};
pub use models::{AssetSummary, Cell, QueryResult, Table};
pub use storage::Storage;
