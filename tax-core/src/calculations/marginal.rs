//! Marginal tax calculation over a progressive bracket table.
//!
//! Income is walked upward through the brackets. Each bracket taxes only the
//! slice of income that falls inside it, at that bracket's rate:
//!
//! | Step | Value |
//! |------|-------|
//! | 1    | `remaining = annual_income` |
//! | 2    | `width = max - min` (unbounded for the top bracket) |
//! | 3    | `taxable = min(remaining, width)` |
//! | 4    | `tax = taxable × rate`, accumulated into the total |
//! | 5    | `remaining -= taxable`; stop once nothing remains |
//! | 6    | `effective_rate = total_tax / annual_income` (0 for zero income) |
//!
//! All arithmetic uses [`Decimal`] at full precision. Nothing is rounded here;
//! see [`crate::calculations::common`] for display rounding.
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use tax_core::calculations::MarginalTaxCalculator;
//! use tax_core::{BracketTable, TaxBracket};
//!
//! let table = BracketTable::try_new(vec![
//!     TaxBracket::new(dec!(0), Some(dec!(50197)), dec!(0.15)),
//!     TaxBracket::new(dec!(50197), Some(dec!(100392)), dec!(0.205)),
//!     TaxBracket::new(dec!(100392), None, dec!(0.33)),
//! ])
//! .unwrap();
//!
//! let result = MarginalTaxCalculator::new(&table).calculate(dec!(100000)).unwrap();
//!
//! assert_eq!(result.total_tax, dec!(17739.165));
//! assert_eq!(result.effective_rate, dec!(0.17739165));
//! assert_eq!(result.per_bracket.len(), 2);
//! ```

use rust_decimal::Decimal;
use thiserror::Error;
use tracing::trace;

use crate::models::{BracketAllocation, BracketTable, TaxBracket, TaxCalculationResult};

/// Errors that can occur during a marginal tax calculation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MarginalTaxError {
    /// Income below zero cannot be taxed.
    #[error("annual income cannot be negative (got {0})")]
    InvalidIncome(Decimal),

    /// The table's top bracket is bounded below the income, so part of the
    /// income would go untaxed.
    #[error("income {income} exceeds the bracket table's upper bound {upper_bound}")]
    IncomeExceedsTable {
        income: Decimal,
        upper_bound: Decimal,
    },
}

/// Calculator for marginal tax over a single [`BracketTable`].
///
/// Pure and synchronous; the table is borrowed and never modified.
#[derive(Debug, Clone)]
pub struct MarginalTaxCalculator<'a> {
    table: &'a BracketTable,
}

impl<'a> MarginalTaxCalculator<'a> {
    pub fn new(table: &'a BracketTable) -> Self {
        Self { table }
    }

    /// Calculates total tax, effective rate and the per-bracket breakdown for
    /// `annual_income`.
    ///
    /// # Errors
    ///
    /// Returns [`MarginalTaxError`] if:
    /// - `annual_income` is negative (checked before the table is read)
    /// - the table does not extend far enough to cover `annual_income`
    pub fn calculate(
        &self,
        annual_income: Decimal,
    ) -> Result<TaxCalculationResult, MarginalTaxError> {
        if annual_income < Decimal::ZERO {
            return Err(MarginalTaxError::InvalidIncome(annual_income));
        }

        match self.table.upper_bound() {
            Some(upper_bound) if annual_income > upper_bound => {
                return Err(MarginalTaxError::IncomeExceedsTable {
                    income: annual_income,
                    upper_bound,
                });
            }
            _ => {}
        }

        let mut remaining = annual_income;
        let mut total_tax = Decimal::ZERO;
        let mut per_bracket = Vec::new();

        for bracket in self.table {
            if remaining <= Decimal::ZERO {
                break;
            }

            let taxable_amount = self.taxable_in_bracket(bracket, remaining);
            if taxable_amount > Decimal::ZERO {
                let tax_amount = taxable_amount * bracket.rate;
                total_tax += tax_amount;
                remaining -= taxable_amount;

                trace!(
                    min = %bracket.min,
                    rate = %bracket.rate,
                    %taxable_amount,
                    %tax_amount,
                    "allocated income to bracket"
                );

                per_bracket.push(BracketAllocation {
                    bracket: bracket.clone(),
                    taxable_amount,
                    tax_amount,
                });
            }
        }

        Ok(TaxCalculationResult {
            total_tax,
            effective_rate: self.effective_rate(total_tax, annual_income),
            per_bracket,
        })
    }

    /// Portion of `remaining` income that falls inside `bracket`.
    fn taxable_in_bracket(
        &self,
        bracket: &TaxBracket,
        remaining: Decimal,
    ) -> Decimal {
        match bracket.width() {
            Some(width) => remaining.min(width),
            None => remaining,
        }
    }

    /// Total tax over income, or exactly zero when there is no income.
    fn effective_rate(
        &self,
        total_tax: Decimal,
        annual_income: Decimal,
    ) -> Decimal {
        if annual_income > Decimal::ZERO {
            total_tax / annual_income
        } else {
            Decimal::ZERO
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    fn federal_2022() -> BracketTable {
        BracketTable::try_new(vec![
            TaxBracket::new(dec!(0), Some(dec!(50197)), dec!(0.15)),
            TaxBracket::new(dec!(50197), Some(dec!(100392)), dec!(0.205)),
            TaxBracket::new(dec!(100392), None, dec!(0.33)),
        ])
        .unwrap()
    }

    fn bounded_table() -> BracketTable {
        BracketTable::try_new(vec![
            TaxBracket::new(dec!(0), Some(dec!(10000)), dec!(0.10)),
            TaxBracket::new(dec!(10000), Some(dec!(20000)), dec!(0.20)),
        ])
        .unwrap()
    }

    // =========================================================================
    // taxable_in_bracket tests
    // =========================================================================

    #[test]
    fn taxable_in_bracket_caps_at_width() {
        let table = federal_2022();
        let calculator = MarginalTaxCalculator::new(&table);

        let result = calculator.taxable_in_bracket(&table.brackets()[1], dec!(80000));

        assert_eq!(result, dec!(50195));
    }

    #[test]
    fn taxable_in_bracket_takes_remaining_when_smaller() {
        let table = federal_2022();
        let calculator = MarginalTaxCalculator::new(&table);

        let result = calculator.taxable_in_bracket(&table.brackets()[1], dec!(49803));

        assert_eq!(result, dec!(49803));
    }

    #[test]
    fn taxable_in_unbounded_bracket_is_all_remaining() {
        let table = federal_2022();
        let calculator = MarginalTaxCalculator::new(&table);

        let result = calculator.taxable_in_bracket(&table.brackets()[2], dec!(1000000));

        assert_eq!(result, dec!(1000000));
    }

    // =========================================================================
    // effective_rate tests
    // =========================================================================

    #[test]
    fn effective_rate_is_zero_for_zero_income() {
        let table = federal_2022();
        let calculator = MarginalTaxCalculator::new(&table);

        let result = calculator.effective_rate(dec!(0), dec!(0));

        assert_eq!(result, Decimal::ZERO);
    }

    #[test]
    fn effective_rate_divides_tax_by_income() {
        let table = federal_2022();
        let calculator = MarginalTaxCalculator::new(&table);

        let result = calculator.effective_rate(dec!(7500), dec!(50000));

        assert_eq!(result, dec!(0.15));
    }

    // =========================================================================
    // calculate: reference cases
    // =========================================================================

    #[test]
    fn calculate_income_within_first_bracket() {
        let table = federal_2022();

        let result = MarginalTaxCalculator::new(&table)
            .calculate(dec!(50000))
            .unwrap();

        assert_eq!(result.total_tax, dec!(7500.0));
        assert_eq!(result.effective_rate, dec!(0.15));
        assert_eq!(result.per_bracket.len(), 1);
        assert_eq!(result.per_bracket[0].taxable_amount, dec!(50000));
    }

    #[test]
    fn calculate_income_spanning_two_brackets() {
        let table = federal_2022();

        let result = MarginalTaxCalculator::new(&table)
            .calculate(dec!(100000))
            .unwrap();

        // 50197 × 0.15 = 7529.55; 49803 × 0.205 = 10209.615
        assert_eq!(result.per_bracket.len(), 2);
        assert_eq!(result.per_bracket[0].tax_amount, dec!(7529.55));
        assert_eq!(result.per_bracket[1].tax_amount, dec!(10209.615));
        assert_eq!(result.total_tax, dec!(17739.165));
        assert_eq!(result.effective_rate, dec!(0.17739165));
    }

    #[test]
    fn calculate_zero_income() {
        let table = federal_2022();

        let result = MarginalTaxCalculator::new(&table)
            .calculate(dec!(0))
            .unwrap();

        assert_eq!(result.total_tax, Decimal::ZERO);
        assert_eq!(result.effective_rate, Decimal::ZERO);
        assert!(result.per_bracket.is_empty());
    }

    #[test]
    fn calculate_income_reaching_top_bracket() {
        let table = federal_2022();

        let result = MarginalTaxCalculator::new(&table)
            .calculate(dec!(200000))
            .unwrap();

        // 7529.55 + 50195 × 0.205 + 99608 × 0.33 = 7529.55 + 10289.975 + 32870.64
        assert_eq!(result.per_bracket.len(), 3);
        assert_eq!(result.per_bracket[2].taxable_amount, dec!(99608));
        assert_eq!(result.total_tax, dec!(50690.165));
        assert_eq!(result.marginal_rate(), dec!(0.33));
    }

    #[test]
    fn calculate_income_on_bracket_boundary_stops_there() {
        let table = federal_2022();

        let result = MarginalTaxCalculator::new(&table)
            .calculate(dec!(50197))
            .unwrap();

        assert_eq!(result.per_bracket.len(), 1);
        assert_eq!(result.total_tax, dec!(7529.55));
    }

    #[test]
    fn calculate_keeps_fractional_cents_unrounded() {
        let table = federal_2022();

        let result = MarginalTaxCalculator::new(&table)
            .calculate(dec!(0.01))
            .unwrap();

        assert_eq!(result.total_tax, dec!(0.0015));
    }

    // =========================================================================
    // calculate: errors
    // =========================================================================

    #[test]
    fn calculate_rejects_negative_income() {
        let table = federal_2022();

        let result = MarginalTaxCalculator::new(&table).calculate(dec!(-1000));

        assert_eq!(result, Err(MarginalTaxError::InvalidIncome(dec!(-1000))));
    }

    #[test]
    fn calculate_rejects_income_beyond_bounded_table() {
        let table = bounded_table();

        let result = MarginalTaxCalculator::new(&table).calculate(dec!(25000));

        assert_eq!(
            result,
            Err(MarginalTaxError::IncomeExceedsTable {
                income: dec!(25000),
                upper_bound: dec!(20000),
            })
        );
    }

    #[test]
    fn calculate_accepts_income_at_bounded_table_top() {
        let table = bounded_table();

        let result = MarginalTaxCalculator::new(&table)
            .calculate(dec!(20000))
            .unwrap();

        assert_eq!(result.total_tax, dec!(3000));
        assert_eq!(result.taxed_income(), dec!(20000));
    }

    // =========================================================================
    // calculate: properties
    // =========================================================================

    #[test]
    fn taxable_amounts_sum_to_income() {
        let table = federal_2022();
        let calculator = MarginalTaxCalculator::new(&table);

        for income in [dec!(1), dec!(50197), dec!(75000.50), dec!(100392), dec!(987654.32)] {
            let result = calculator.calculate(income).unwrap();

            assert_eq!(result.taxed_income(), income, "income {income}");
        }
    }

    #[test]
    fn total_tax_equals_sum_of_bracket_taxes() {
        let table = federal_2022();
        let calculator = MarginalTaxCalculator::new(&table);

        for income in [dec!(12345.67), dec!(100000), dec!(250000)] {
            let result = calculator.calculate(income).unwrap();
            let sum: Decimal = result.per_bracket.iter().map(|a| a.tax_amount).sum();

            assert_eq!(result.total_tax, sum, "income {income}");
        }
    }

    #[test]
    fn effective_rate_rises_with_income_and_stays_below_top_rate() {
        let table = federal_2022();
        let calculator = MarginalTaxCalculator::new(&table);

        let incomes = [dec!(60000), dec!(100000), dec!(150000), dec!(1000000)];
        let rates: Vec<Decimal> = incomes
            .iter()
            .map(|income| calculator.calculate(*income).unwrap().effective_rate)
            .collect();

        for pair in rates.windows(2) {
            assert!(pair[0] < pair[1], "{} should be below {}", pair[0], pair[1]);
        }
        assert!(rates.iter().all(|rate| *rate < table.max_rate()));
    }

    #[test]
    fn repeated_calculation_is_identical() {
        let table = federal_2022();
        let calculator = MarginalTaxCalculator::new(&table);

        let first = calculator.calculate(dec!(123456.78)).unwrap();
        let second = calculator.calculate(dec!(123456.78)).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn many_narrow_brackets_accumulate_exactly() {
        let brackets = (0..100)
            .map(|i| {
                let min = Decimal::from(i) * dec!(0.1);
                TaxBracket::new(min, Some(min + dec!(0.1)), dec!(0.1))
            })
            .collect();
        let table = BracketTable::try_new(brackets).unwrap();

        let result = MarginalTaxCalculator::new(&table)
            .calculate(dec!(10))
            .unwrap();

        assert_eq!(result.per_bracket.len(), 100);
        assert_eq!(result.total_tax, dec!(1));
    }
}
