//! Excel export of filtered tables.
//!
//! Builds a single-sheet workbook in memory. The caller decides where the
//! bytes go; nothing is written to disk here except by [`save_export`].

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use rust_xlsxwriter::{Format, Workbook, XlsxError};
use thiserror::Error;

use crate::data::{Asset, Cell, Table};

pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Largest workbook we are willing to hand out
pub const DEFAULT_MAX_FILE_BYTES: usize = 100 * 1024 * 1024;

pub const DEFAULT_FILE_PREFIX: &str = "transfermarkt";

const SHEET_NAME: &str = "Data";

/// Technical column name to spreadsheet header
const FRIENDLY_COLUMN_NAMES: &[(&str, &str)] = &[
    ("game_id", "Game ID"),
    ("competition_id", "Competition ID"),
    ("season", "Season"),
    ("round", "Round"),
    ("date", "Date"),
    ("home_club_id", "Home Club ID"),
    ("away_club_id", "Away Club ID"),
    ("home_club_goals", "Home Club Goals"),
    ("away_club_goals", "Away Club Goals"),
    ("home_club_position", "Home Club Position"),
    ("away_club_position", "Away Club Position"),
    ("home_club_manager_name", "Home Club Manager"),
    ("away_club_manager_name", "Away Club Manager"),
    ("stadium", "Stadium"),
    ("attendance", "Attendance"),
    ("referee", "Referee"),
    ("url", "URL"),
    ("player_id", "Player ID"),
    ("current_club_id", "Current Club ID"),
    ("current_club_name", "Current Club"),
    ("country_of_birth", "Country of Birth"),
    ("city_of_birth", "City of Birth"),
    ("country_of_citizenship", "Country of Citizenship"),
    ("date_of_birth", "Date of Birth"),
    ("sub_position", "Sub-Position"),
    ("foot", "Preferred Foot"),
    ("height_in_cm", "Height (cm)"),
    ("market_value_in_eur", "Market Value (EUR)"),
    ("highest_market_value_in_eur", "Highest Market Value (EUR)"),
    ("transfer_date", "Transfer Date"),
    ("transfer_season", "Transfer Season"),
    ("from_club_id", "From Club ID"),
    ("to_club_id", "To Club ID"),
    ("from_club_name", "From Club"),
    ("to_club_name", "To Club"),
    ("transfer_fee", "Transfer Fee (EUR)"),
];

/// Spreadsheet header for a column, or the column name itself
pub fn friendly_name(column: &str) -> &str {
    FRIENDLY_COLUMN_NAMES
        .iter()
        .find(|(technical, _)| *technical == column)
        .map(|(_, label)| *label)
        .unwrap_or(column)
}

/// `<prefix>_<asset>_<YYYYMMDD_HHMMSS>.xlsx`
pub fn export_filename(prefix: &str, asset: &str, at: NaiveDateTime) -> String {
    format!("{prefix}_{asset}_{}.xlsx", at.format("%Y%m%d_%H%M%S"))
}

/// Rough in-memory size of a table, eight bytes per cell, in MB
pub fn estimated_size_mb(rows: usize, cols: usize) -> f64 {
    (rows * cols * 8) as f64 / (1024.0 * 1024.0)
}

fn megabytes(bytes: &usize) -> f64 {
    *bytes as f64 / (1024.0 * 1024.0)
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("No rows to export, adjust the filters and try again")]
    Empty,

    #[error(
        "Generated file is too large ({:.1} MB). Maximum allowed: {:.1} MB. Apply more filters to reduce the data size",
        megabytes(.size),
        megabytes(.max)
    )]
    TooLarge { size: usize, max: usize },

    #[error("Error creating Excel file: {0}")]
    Xlsx(#[from] XlsxError),
}

/// Ceilings applied to one export
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportLimits {
    pub max_rows: usize,
    pub max_bytes: usize,
}

impl ExportLimits {
    pub fn for_asset(asset: &Asset, max_bytes: usize) -> Self {
        ExportLimits {
            max_rows: asset.export_row_cap,
            max_bytes,
        }
    }
}

/// A finished workbook ready to be saved
#[derive(Debug, Clone)]
pub struct ExcelExport {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub mime: &'static str,
    pub rows: usize,
    pub columns: usize,
    /// Row count before the export ceiling, when it was applied
    pub truncated_from: Option<usize>,
}

impl ExcelExport {
    pub fn size_mb(&self) -> f64 {
        megabytes(&self.bytes.len())
    }
}

/// Serialize `table` as a single `Data` sheet with friendly headers.
///
/// Rows beyond `limits.max_rows` are dropped before serialization; a
/// workbook larger than `limits.max_bytes` is discarded.
pub fn build_excel(
    prefix: &str,
    asset_name: &str,
    table: &Table,
    limits: ExportLimits,
    at: NaiveDateTime,
) -> Result<ExcelExport, ExportError> {
    if table.is_empty() {
        return Err(ExportError::Empty);
    }

    let rows = table.len().min(limits.max_rows);
    let truncated_from = (table.len() > rows).then_some(table.len());
    if let Some(total) = truncated_from {
        log::warn!("{asset_name}: exporting the first {rows} of {total} rows");
    }

    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(SHEET_NAME)?;

    for (col, name) in table.columns.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, friendly_name(name), &header)?;
    }

    for (r, row) in table.rows.iter().take(rows).enumerate() {
        let sheet_row = (r + 1) as u32;
        for (col, cell) in row.iter().enumerate() {
            let col = col as u16;
            match cell {
                Cell::Null => {}
                Cell::Int(v) => {
                    worksheet.write_number(sheet_row, col, *v as f64)?;
                }
                Cell::Float(v) => {
                    worksheet.write_number(sheet_row, col, *v)?;
                }
                Cell::Text(v) => {
                    worksheet.write_string(sheet_row, col, v)?;
                }
            }
        }
    }

    let bytes = workbook.save_to_buffer()?;
    if bytes.len() > limits.max_bytes {
        return Err(ExportError::TooLarge {
            size: bytes.len(),
            max: limits.max_bytes,
        });
    }

    Ok(ExcelExport {
        bytes,
        filename: export_filename(prefix, asset_name, at),
        mime: XLSX_MIME,
        rows,
        columns: table.columns.len(),
        truncated_from,
    })
}

/// Write a prepared export into `dir`, returning the full path
pub fn save_export(export: &ExcelExport, dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory: {dir:?}"))?;
    let path = dir.join(&export.filename);
    std::fs::write(&path, &export.bytes)
        .with_context(|| format!("Failed to write export: {path:?}"))?;
    log::info!(
        "Saved {} ({}, {:.1} MB)",
        path.display(),
        export.mime,
        export.size_mb()
    );
    Ok(path)
}
