//! Loads bracket tables from on-disk fixtures and runs the calculator over
//! them, covering the read-from-disk path the unit tests skip.

use std::path::{Path, PathBuf};

use pretty_assertions::assert_eq;
use rust_decimal_macros::dec;
use tax_cli::csv_loader::{self, CsvLoadError};
use tax_core::MarginalTaxCalculator;

fn fixture_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("brackets_2022.csv")
}

#[test]
fn fixture_loads_all_brackets() {
    let table = csv_loader::load_from_file(&fixture_path()).unwrap();

    assert_eq!(table.len(), 5);
    assert_eq!(table.brackets()[0].min, dec!(0));
    assert_eq!(table.brackets()[1].rate, dec!(0.205));
    assert_eq!(table.upper_bound(), None);
}

#[test]
fn fixture_table_calculates_reference_income() {
    let table = csv_loader::load_from_file(&fixture_path()).unwrap();

    let result = MarginalTaxCalculator::new(&table)
        .calculate(dec!(100000))
        .unwrap();

    assert_eq!(result.total_tax, dec!(17739.165));
    assert_eq!(result.per_bracket.len(), 2);
}

#[test]
fn fixture_table_reaches_top_bracket() {
    let table = csv_loader::load_from_file(&fixture_path()).unwrap();

    let result = MarginalTaxCalculator::new(&table)
        .calculate(dec!(250000))
        .unwrap();

    // 7529.55 + 10289.975 + 14360.58 + 19164.07 + 9336.36
    assert_eq!(result.total_tax, dec!(60680.535));
    assert_eq!(result.marginal_rate(), dec!(0.33));
    assert_eq!(result.taxed_income(), dec!(250000));
}

#[test]
fn nonexistent_file_is_an_io_error() {
    let result = csv_loader::load_from_file(Path::new("/this/path/does/not/exist.csv"));

    assert!(matches!(result, Err(CsvLoadError::Io { .. })));
}
