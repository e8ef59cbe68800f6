//! CSV loader for local bracket tables, used to calculate without the API.
//!
//! ## CSV Format
//!
//! Headers are matched by name, so column order does not matter. Header
//! names are case-sensitive.
//!
//! | Column | Required | Type    | Notes                                        |
//! |--------|----------|---------|----------------------------------------------|
//! | `min`  | yes      | decimal | Lower bound, inclusive. First row must be 0. |
//! | `max`  | yes      | decimal | Upper bound. Leave empty for the top bracket. |
//! | `rate` | yes      | decimal | Fraction in `[0, 1]`, e.g. `0.205`.          |
//!
//! Amounts may carry thousands separators when quoted (`"50,197"`).
//!
//! ### Example
//!
//! ```csv
//! min,max,rate
//! 0,50197,0.15
//! 50197,100392,0.205
//! 100392,,0.33
//! ```
//!
//! The rows are validated as a whole with [`BracketTable::try_new`].

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tax_core::{BracketTable, BracketTableError, TaxBracket};
use tracing::debug;

use crate::utils::{ParseDecimalError, parse_decimal, parse_optional_decimal};

// ---------------------------------------------------------------------------
// Serde-compatible row that mirrors the CSV layout exactly
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct CsvRow {
    min: String,
    max: String,
    rate: String,
}

// ---------------------------------------------------------------------------
// Public error type
// ---------------------------------------------------------------------------

/// Errors that can occur while loading a bracket table from CSV.
#[derive(Debug, thiserror::Error)]
pub enum CsvLoadError {
    #[error("cannot read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Bad structure, a missing column, or a wrong column count.
    #[error("CSV parse error: {0}")]
    Parse(#[from] csv::Error),

    /// A cell could not be read as a number. `row` is 1-based (header = row 0).
    #[error("column '{column}' on row {row}: {source}")]
    InvalidNumber {
        column: &'static str,
        row: usize,
        #[source]
        source: ParseDecimalError,
    },

    /// The rows parsed but do not form a valid bracket table.
    #[error("invalid bracket table: {0}")]
    Table(#[from] BracketTableError),
}

// ---------------------------------------------------------------------------
// Core loader
// ---------------------------------------------------------------------------

fn cell<T>(
    column: &'static str,
    row: usize,
    result: Result<T, ParseDecimalError>,
) -> Result<T, CsvLoadError> {
    result.map_err(|source| CsvLoadError::InvalidNumber {
        column,
        row,
        source,
    })
}

fn convert_row(
    row: CsvRow,
    row_number: usize,
) -> Result<TaxBracket, CsvLoadError> {
    let min = cell("min", row_number, parse_decimal(&row.min))?;
    let max = cell("max", row_number, parse_optional_decimal(&row.max))?;
    let rate = cell("rate", row_number, parse_decimal(&row.rate))?;

    Ok(TaxBracket::new(min, max, rate))
}

/// Parse CSV text into a validated [`BracketTable`].
///
/// # Errors
///
/// * [`CsvLoadError::Parse`] if the CSV is structurally invalid.
/// * [`CsvLoadError::InvalidNumber`] if a cell is not a number.
/// * [`CsvLoadError::Table`] if the rows break a table rule (empty,
///   gaps between brackets, rate out of range, ...).
pub fn load_from_str(input: &str) -> Result<BracketTable, CsvLoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .flexible(false)
        .from_reader(input.as_bytes());

    let brackets = reader
        .deserialize::<CsvRow>()
        .enumerate()
        .map(|(idx, result)| convert_row(result?, idx + 1))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(BracketTable::try_new(brackets)?)
}

/// Read a file from disk and delegate to [`load_from_str`].
pub fn load_from_file(path: &Path) -> Result<BracketTable, CsvLoadError> {
    let contents = std::fs::read_to_string(path).map_err(|source| CsvLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let table = load_from_str(&contents)?;
    debug!(path = %path.display(), brackets = table.len(), "loaded bracket table from CSV");
    Ok(table)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
